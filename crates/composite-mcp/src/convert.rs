//! Conversions from MCP protocol types to gateway models

use rmcp::model::{
    CallToolResult, Content, GetPromptResult, Prompt, PromptMessageContent, PromptMessageRole,
    RawContent, Tool,
};
use rmcp::ServiceError;
use serde_json::Value;

use composite_core::{
    CallToolOutput, ContentPart, PromptArgumentInfo, PromptInfo, PromptMessage, PromptOutput,
    SessionError, ToolInfo,
};

/// Protocol errors stay with the request; transport errors end the session
pub(crate) fn session_error(err: ServiceError) -> SessionError {
    match err {
        ServiceError::McpError(data) => SessionError::Remote(data.message.to_string()),
        ServiceError::TransportClosed => SessionError::Closed("transport closed".into()),
        ServiceError::TransportSend(e) => SessionError::Closed(e.to_string()),
        ServiceError::Cancelled { reason } => {
            SessionError::Closed(reason.unwrap_or_else(|| "session cancelled".into()))
        }
        other => SessionError::Remote(other.to_string()),
    }
}

pub(crate) fn tool_info(tool: Tool) -> ToolInfo {
    ToolInfo {
        name: tool.name.into_owned(),
        description: tool.description.map(|d| d.into_owned()),
        input_schema: Some(Value::Object(tool.input_schema.as_ref().clone())),
    }
}

pub(crate) fn content_part(content: Content) -> ContentPart {
    match content.raw {
        RawContent::Text(text) => ContentPart::Text { text: text.text },
        raw => ContentPart::Other(serde_json::to_value(&raw).unwrap_or(Value::Null)),
    }
}

pub(crate) fn call_tool_output(result: CallToolResult) -> CallToolOutput {
    CallToolOutput {
        content: result.content.into_iter().map(content_part).collect(),
        is_error: result.is_error.unwrap_or(false),
    }
}

pub(crate) fn prompt_info(prompt: Prompt) -> PromptInfo {
    PromptInfo {
        name: prompt.name,
        description: prompt.description,
        arguments: prompt
            .arguments
            .unwrap_or_default()
            .into_iter()
            .map(|a| PromptArgumentInfo {
                name: a.name,
                description: a.description,
                required: a.required.unwrap_or(false),
            })
            .collect(),
    }
}

pub(crate) fn prompt_output(result: GetPromptResult) -> PromptOutput {
    PromptOutput {
        description: result.description,
        messages: result
            .messages
            .into_iter()
            .map(|m| PromptMessage {
                role: match m.role {
                    PromptMessageRole::User => "user".to_string(),
                    PromptMessageRole::Assistant => "assistant".to_string(),
                },
                content: match m.content {
                    PromptMessageContent::Text { text } => ContentPart::Text { text },
                    other => {
                        ContentPart::Other(serde_json::to_value(&other).unwrap_or(Value::Null))
                    }
                },
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::PromptArgument;
    use std::sync::Arc;

    #[test]
    fn tool_keeps_name_description_and_schema() {
        let mut schema = serde_json::Map::new();
        schema.insert("type".into(), Value::String("object".into()));
        let tool = Tool::new("read", "Read a document", Arc::new(schema));

        let info = tool_info(tool);
        assert_eq!(info.name, "read");
        assert_eq!(info.description.as_deref(), Some("Read a document"));
        assert_eq!(info.input_schema.unwrap()["type"], "object");
    }

    #[test]
    fn text_and_image_parts() {
        let result = CallToolResult::success(vec![
            Content::text("hello"),
            Content::image("aGk=", "image/png"),
        ]);
        let output = call_tool_output(result);

        assert!(!output.is_error);
        assert_eq!(output.content[0], ContentPart::text("hello"));
        match &output.content[1] {
            ContentPart::Other(value) => assert_eq!(value["mimeType"], "image/png"),
            other => panic!("expected non-text part, got {:?}", other),
        }
    }

    #[test]
    fn error_results_are_flagged() {
        let output = call_tool_output(CallToolResult::error(vec![Content::text("bad input")]));
        assert!(output.is_error);
        assert_eq!(output.render_text(), "bad input");
    }

    #[test]
    fn prompt_arguments_default_to_optional() {
        let prompt = Prompt::new(
            "review",
            Some("Review code"),
            Some(vec![PromptArgument {
                name: "diff".into(),
                title: None,
                description: None,
                required: None,
            }]),
        );
        let info = prompt_info(prompt);
        assert_eq!(info.arguments.len(), 1);
        assert!(!info.arguments[0].required);
    }

    #[test]
    fn prompt_messages_keep_roles() {
        let result = GetPromptResult {
            description: None,
            messages: vec![
                rmcp::model::PromptMessage::new_text(PromptMessageRole::User, "Hi"),
                rmcp::model::PromptMessage::new_text(PromptMessageRole::Assistant, "Hello"),
            ],
        };
        assert_eq!(prompt_output(result).render_text(), "user: Hi\nassistant: Hello");
    }

    #[test]
    fn transport_errors_are_terminal() {
        assert!(session_error(ServiceError::TransportClosed).is_terminal());
        assert!(!session_error(ServiceError::UnexpectedResponse).is_terminal());
    }
}
