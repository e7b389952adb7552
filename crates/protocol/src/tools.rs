//! MCP capability shapes: tool descriptors, call parameters, and results.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol revision advertised in the initialize handshake.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Descriptor for one callable capability, as listed by `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Parameters of a `tools/call` request.
#[derive(Debug, Clone, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Outcome of a tool invocation.
///
/// `is_error` distinguishes "the task failed" from a protocol failure: the
/// envelope around this result is still a success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolResult {
    pub content: Vec<ContentItem>,
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl CallToolResult {
    /// Successful result carrying a single text item.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentItem::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Application-level failure carrying a single text item.
    pub fn error_text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentItem::Text { text: text.into() }],
            is_error: true,
        }
    }
}

/// One piece of tool output content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    Text {
        text: String,
    },
    Image {
        /// Base64-encoded image bytes.
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

/// Result of the `initialize` handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

/// Capability sets advertised by the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerCapabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompts: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// Result of `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListToolsResult {
    pub tools: Vec<Tool>,
}

/// Result of `resources/list`. Resource metadata is owned by collaborators;
/// the core surface always reports an empty set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListResourcesResult {
    pub resources: Vec<Value>,
}

/// Result of `prompts/list`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListPromptsResult {
    pub prompts: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn call_tool_result_uses_wire_field_names() {
        let wire = serde_json::to_value(CallToolResult::error_text("boom")).unwrap();
        assert_eq!(wire["isError"], json!(true));
        assert_eq!(wire["content"][0]["type"], json!("text"));
        assert_eq!(wire["content"][0]["text"], json!("boom"));
    }

    #[test]
    fn call_params_default_arguments_to_null() {
        let params: CallToolParams =
            serde_json::from_value(json!({"name": "navigate"})).unwrap();
        assert_eq!(params.name, "navigate");
        assert!(params.arguments.is_null());
    }

    #[test]
    fn image_content_carries_mime_type() {
        let item = ContentItem::Image {
            data: "aGk=".into(),
            mime_type: "image/png".into(),
        };
        let wire = serde_json::to_value(&item).unwrap();
        assert_eq!(wire["type"], json!("image"));
        assert_eq!(wire["mimeType"], json!("image/png"));
    }
}
