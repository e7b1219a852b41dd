//! JSON body extractor that runs `validator` rules before the handler.
//!
//! Rejections happen before the action envelope, so they reach the client as
//! a plain `VALIDATION_ERROR` and leave no audit entry.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use crate::errors::AppError;

/// A request body that deserialized and passed its field rules.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(body_error)?;

        value.validate().map_err(|e| {
            let message = field_messages(&e);
            tracing::debug!(%message, "Request body failed validation");
            AppError::validation(message)
        })?;

        Ok(ValidatedJson(value))
    }
}

fn body_error(rejection: JsonRejection) -> AppError {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            AppError::validation("Request body must be JSON (Content-Type: application/json)")
        }
        JsonRejection::JsonSyntaxError(_) => AppError::validation("Request body is not valid JSON"),
        JsonRejection::JsonDataError(e) => {
            AppError::validation(format!("Invalid request body: {}", e.body_text()))
        }
        other => AppError::validation(other.body_text()),
    }
}

/// `field: message` pairs sorted by field name, so the text is stable.
fn field_messages(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => format!("{}: {}", field, message),
                None => format!("{}: invalid value", field),
            })
        })
        .collect::<Vec<_>>()
        .join(", ")
}
