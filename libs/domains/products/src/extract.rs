//! JSON extractor with validation using the validator crate.

use axum::extract::{FromRequest, Json, Request};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::ProductError;

/// Deserializes and validates a JSON body.
///
/// Field errors become [`ProductError::Validation`], so the client gets a
/// 400 with the list of messages. A body that cannot be parsed at all is
/// reported the same way with the parser's message.
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ProductError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ProductError::Validation(vec![rejection.body_text()]))?;

        data.validate()?;
        Ok(ValidatedJson(data))
    }
}
