//! Custom request extractors.

mod request_context;
mod validated_json;

pub use request_context::ClientContext;
pub use validated_json::ValidatedJson;
