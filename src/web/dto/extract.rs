//! Request body extraction for the relay API.

use axum::{
    async_trait,
    extract::{
        rejection::{FormRejection, JsonRejection},
        FromRequest, Request,
    },
    http::header::CONTENT_TYPE,
    Form, Json,
};
use serde::de::DeserializeOwned;

use crate::web::error::ApiError;

/// A body extractor accepting either JSON or a url-encoded form.
///
/// The form is chosen when the request declares
/// `application/x-www-form-urlencoded`; everything else is read as JSON.
/// Validation is left to the handler so that every failed field can be
/// reported together.
pub struct JsonOrForm<T>(pub T);

fn is_form(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
}

#[async_trait]
impl<S, T> FromRequest<S> for JsonOrForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    Form<T>: FromRequest<S, Rejection = FormRejection>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_form(&req) {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|e| ApiError::bad_request(format!("Invalid form body: {}", e.body_text())))?;
            return Ok(JsonOrForm(value));
        }

        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid JSON: {}", e.body_text())))?;
        Ok(JsonOrForm(value))
    }
}
