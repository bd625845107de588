//! Shared data models for the composite gateway

mod prompt;
mod status;
mod tool;

pub use prompt::*;
pub use status::*;
pub use tool::*;

/// JSON object used for call arguments and input schemas
pub type JsonObject = serde_json::Map<String, serde_json::Value>;
