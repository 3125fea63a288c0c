use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub(crate) struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<UserMessage>,
    pub tools: Vec<WebSearchTool>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct UserMessage {
    pub role: &'static str,
    pub content: String,
}

/// Server-side web search tool; Anthropic runs the searches and returns
/// `web_search_tool_result` blocks plus cited text blocks.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct WebSearchTool {
    #[serde(rename = "type")]
    pub tool_type: &'static str,
    pub name: &'static str,
    pub max_uses: u32,
}

impl Default for WebSearchTool {
    fn default() -> Self {
        Self {
            tool_type: "web_search_20250305",
            name: "web_search",
            max_uses: 5,
        }
    }
}
