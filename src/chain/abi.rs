//! Minimal Solidity ABI codec for the Random Orca registry contract.
//!
//! Only the shapes the registry uses are supported: calls taking `string`
//! arguments, the `tuple(address,string,string,uint256,uint256)[]` returned by
//! `getMessages()`, `Error(string)` revert data, and the ERC-721 `Transfer`
//! event used to recover a minted token id.

use sha3::{Digest, Keccak256};
use thiserror::Error;

use super::types::Message;

/// Size of an ABI word in bytes.
pub const WORD: usize = 32;

/// `safeMint(string author, string content)`.
pub const SAFE_MINT_SIGNATURE: &str = "safeMint(string,string)";

/// `getMessages()` returning every stored message.
pub const GET_MESSAGES_SIGNATURE: &str = "getMessages()";

/// Event emitted by the registry when a token is minted.
pub const TRANSFER_EVENT_SIGNATURE: &str = "Transfer(address,address,uint256)";

/// `keccak256(TRANSFER_EVENT_SIGNATURE)`.
pub const TRANSFER_TOPIC: &str =
    "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

/// Selector of Solidity's `Error(string)` revert payload.
pub const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// ABI codec errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AbiError {
    /// A read ran past the end of the data.
    #[error("ABI data too short: need {needed} bytes, have {len}")]
    OutOfBounds { needed: usize, len: usize },

    /// A uint256 does not fit the target integer.
    #[error("ABI integer does not fit in 64 bits")]
    Overflow,

    /// A string was not valid UTF-8.
    #[error("ABI string is not valid UTF-8")]
    InvalidUtf8,

    /// A hex string could not be decoded.
    #[error("invalid hex data: {0}")]
    InvalidHex(String),

    /// An address was not 20 bytes of hex.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

/// Keccak-256 hash.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// First four bytes of the hash of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Encode a call to `signature` whose arguments are all `string`.
pub fn encode_call(signature: &str, args: &[&str]) -> Vec<u8> {
    let mut data = selector(signature).to_vec();
    data.extend(encode_strings(args));
    data
}

fn encode_strings(args: &[&str]) -> Vec<u8> {
    let head_len = args.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for arg in args {
        head.extend_from_slice(&u64_to_word((head_len + tail.len()) as u64));
        tail.extend(encode_bytes(arg.as_bytes()));
    }

    head.extend(tail);
    head
}

fn encode_bytes(bytes: &[u8]) -> Vec<u8> {
    let padded = bytes.len().div_ceil(WORD) * WORD;
    let mut out = Vec::with_capacity(WORD + padded);
    out.extend_from_slice(&u64_to_word(bytes.len() as u64));
    out.extend_from_slice(bytes);
    out.resize(WORD + padded, 0);
    out
}

/// A big-endian uint256 word holding `value`.
pub fn u64_to_word(value: u64) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Read a uint256 word as `u64`.
pub fn word_to_u64(word: &[u8]) -> Result<u64, AbiError> {
    if word.len() != WORD {
        return Err(AbiError::OutOfBounds {
            needed: WORD,
            len: word.len(),
        });
    }
    if word[..WORD - 8].iter().any(|b| *b != 0) {
        return Err(AbiError::Overflow);
    }
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&word[WORD - 8..]);
    Ok(u64::from_be_bytes(bytes))
}

/// Read the low 20 bytes of a word as a lowercase `0x` address.
pub fn word_to_address(word: &[u8]) -> String {
    let start = word.len().saturating_sub(20);
    to_hex(&word[start..])
}

/// Left-pad an address into a word.
pub fn address_to_word(address: &str) -> Result<[u8; WORD], AbiError> {
    let bytes = from_hex(address).map_err(|_| AbiError::InvalidAddress(address.to_string()))?;
    if bytes.len() != 20 {
        return Err(AbiError::InvalidAddress(address.to_string()));
    }
    let mut word = [0u8; WORD];
    word[WORD - 20..].copy_from_slice(&bytes);
    Ok(word)
}

/// `0x`-prefixed lowercase hex.
pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Decode hex with or without a `0x` prefix.
pub fn from_hex(s: &str) -> Result<Vec<u8>, AbiError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    hex::decode(digits).map_err(|e| AbiError::InvalidHex(e.to_string()))
}

/// Compare two hex strings (topics, addresses) ignoring case.
pub fn hex_eq(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Bounds-checked view over ABI-encoded data.
struct Reader<'a> {
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn slice(&self, offset: usize, len: usize) -> Result<&'a [u8], AbiError> {
        let end = offset.checked_add(len).ok_or(AbiError::Overflow)?;
        self.data.get(offset..end).ok_or(AbiError::OutOfBounds {
            needed: end,
            len: self.data.len(),
        })
    }

    fn word(&self, offset: usize) -> Result<&'a [u8], AbiError> {
        self.slice(offset, WORD)
    }

    fn uint(&self, offset: usize) -> Result<u64, AbiError> {
        word_to_u64(self.word(offset)?)
    }

    fn offset(&self, offset: usize) -> Result<usize, AbiError> {
        usize::try_from(self.uint(offset)?).map_err(|_| AbiError::Overflow)
    }

    fn string(&self, offset: usize) -> Result<String, AbiError> {
        let len = self.offset(offset)?;
        let bytes = self.slice(offset + WORD, len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| AbiError::InvalidUtf8)
    }
}

/// Decode the return data of `getMessages()`.
pub fn decode_messages(data: &[u8]) -> Result<Vec<Message>, AbiError> {
    let reader = Reader::new(data);
    let array = reader.offset(0)?;
    let count = reader.offset(array)?;
    let elements = array.checked_add(WORD).ok_or(AbiError::Overflow)?;

    // Every element needs at least its offset word.
    let offsets_len = count.checked_mul(WORD).ok_or(AbiError::Overflow)?;
    reader.slice(elements, offsets_len)?;

    (0..count)
        .map(|i| {
            let tuple = elements
                .checked_add(reader.offset(elements + i * WORD)?)
                .ok_or(AbiError::Overflow)?;
            decode_message(&reader, tuple)
        })
        .collect()
}

fn decode_message(reader: &Reader<'_>, base: usize) -> Result<Message, AbiError> {
    let from_address = word_to_address(reader.word(base)?);
    let author = reader.string(base + reader.offset(base + WORD)?)?;
    let content = reader.string(base + reader.offset(base + 2 * WORD)?)?;
    let token_id = reader.uint(base + 3 * WORD)?;
    let timestamp_secs = reader.uint(base + 4 * WORD)?;

    Ok(Message {
        from_address,
        author,
        content,
        token_id,
        timestamp_secs,
    })
}

/// Encode messages the way `getMessages()` returns them.
///
/// Used by local tooling and fake providers.
pub fn encode_messages(messages: &[Message]) -> Result<Vec<u8>, AbiError> {
    let mut tuples = Vec::with_capacity(messages.len());
    for message in messages {
        let author = encode_bytes(message.author.as_bytes());
        let content = encode_bytes(message.content.as_bytes());

        let mut tuple = Vec::with_capacity(5 * WORD + author.len() + content.len());
        tuple.extend_from_slice(&address_to_word(&message.from_address)?);
        tuple.extend_from_slice(&u64_to_word((5 * WORD) as u64));
        tuple.extend_from_slice(&u64_to_word((5 * WORD + author.len()) as u64));
        tuple.extend_from_slice(&u64_to_word(message.token_id));
        tuple.extend_from_slice(&u64_to_word(message.timestamp_secs));
        tuple.extend(author);
        tuple.extend(content);
        tuples.push(tuple);
    }

    let mut out = Vec::new();
    out.extend_from_slice(&u64_to_word(WORD as u64));
    out.extend_from_slice(&u64_to_word(messages.len() as u64));

    let mut next = tuples.len() * WORD;
    for tuple in &tuples {
        out.extend_from_slice(&u64_to_word(next as u64));
        next += tuple.len();
    }
    for tuple in tuples {
        out.extend(tuple);
    }
    Ok(out)
}

/// Extract the reason from `Error(string)` revert data.
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
    let payload = data.strip_prefix(&ERROR_STRING_SELECTOR[..])?;
    let reader = Reader::new(payload);
    let offset = reader.offset(0).ok()?;
    reader.string(offset).ok()
}

/// Encode `Error(string)` revert data.
pub fn encode_revert_reason(reason: &str) -> Vec<u8> {
    let mut data = ERROR_STRING_SELECTOR.to_vec();
    data.extend(encode_strings(&[reason]));
    data
}
