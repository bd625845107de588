//! Tool catalog and call result models

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool as advertised by one backend (backend-local name)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Backend-local tool name
    pub name: String,
    /// Human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON schema of the tool arguments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
}

impl ToolInfo {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            input_schema: None,
        }
    }

    /// Description as rendered in catalogs; missing descriptions render empty
    pub fn description_text(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }
}

/// One part of a tool or prompt result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentPart {
    /// Textual content
    Text { text: String },
    /// Any non-textual content (image, resource, ...) in its JSON form
    Other(Value),
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    /// Text for textual parts, compact JSON otherwise
    pub fn render(&self) -> String {
        match self {
            ContentPart::Text { text } => text.clone(),
            ContentPart::Other(value) => value.to_string(),
        }
    }
}

/// Result of a tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallToolOutput {
    pub content: Vec<ContentPart>,
    /// Set when the tool itself reported failure
    #[serde(default)]
    pub is_error: bool,
}

impl CallToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentPart::text(text)],
            is_error: false,
        }
    }

    /// Render every part and join them with newlines
    pub fn render_text(&self) -> String {
        self.content
            .iter()
            .map(ContentPart::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
