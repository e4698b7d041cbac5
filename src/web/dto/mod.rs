//! Data Transfer Objects for the relay API.

pub mod extract;
pub mod request;
pub mod response;

pub use extract::JsonOrForm;
pub use request::*;
pub use response::*;
