//! Prompt catalog and prompt result models

use serde::{Deserialize, Serialize};

use super::ContentPart;

/// A prompt template advertised by one backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptInfo {
    /// Backend-local prompt name
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<PromptArgumentInfo>,
}

impl PromptInfo {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            arguments: Vec::new(),
        }
    }

    pub fn description_text(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }
}

/// An argument accepted by a prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptArgumentInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
}

/// A single message of a rendered prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    /// "user" or "assistant"
    pub role: String,
    pub content: ContentPart,
}

/// Result of fetching a prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub messages: Vec<PromptMessage>,
}

impl PromptOutput {
    /// Render messages as `{role}: {content}` lines
    pub fn render_text(&self) -> String {
        self.messages
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content.render()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_prefixes_role() {
        let output = PromptOutput {
            description: None,
            messages: vec![
                PromptMessage {
                    role: "user".into(),
                    content: ContentPart::text("Summarise the README"),
                },
                PromptMessage {
                    role: "assistant".into(),
                    content: ContentPart::text("Sure."),
                },
            ],
        };
        assert_eq!(
            output.render_text(),
            "user: Summarise the README\nassistant: Sure."
        );
    }
}
