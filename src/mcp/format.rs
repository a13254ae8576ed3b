// Tool response envelopes.
//
// Success: one text item holding the pretty-printed service response.
// Failure: one text item "Error querying resources: <message>", isError set.

use rmcp::model::{CallToolResult, Content};
use serde_json::Value;

use azrg_mcp::error::{AzrgError, Result};

pub const ERROR_PREFIX: &str = "Error querying resources: ";

/// Turn the outcome of a remote query into a tool result. Never fails.
pub fn query_result(result: Result<Value>) -> CallToolResult {
    let text = result.and_then(|value| Ok(serde_json::to_string_pretty(&value)?));
    match text {
        Ok(text) => CallToolResult::success(vec![Content::text(text)]),
        Err(err) => query_error(&err),
    }
}

/// Error envelope for a failed query.
pub fn query_error(err: &AzrgError) -> CallToolResult {
    CallToolResult::error(vec![Content::text(format!("{}{}", ERROR_PREFIX, err))])
}

/// Concatenate the text items of a result.
pub fn envelope_text(result: &CallToolResult) -> String {
    result
        .content
        .iter()
        .filter_map(|c| c.as_text())
        .map(|t| t.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn success_is_pretty_json() {
        let value = json!({"count": 1, "data": [{"name": "vm1", "location": "westeurope"}]});
        let result = query_result(Ok(value.clone()));

        assert_ne!(result.is_error, Some(true));
        assert_eq!(
            envelope_text(&result),
            serde_json::to_string_pretty(&value).unwrap()
        );
        assert!(envelope_text(&result).starts_with("{\n  \"count\": 1,"));
    }

    #[test]
    fn service_error_message_is_prefixed() {
        let err = AzrgError::Api {
            status: 429,
            code: Some("RateLimiting".into()),
            message: "Request throttled".into(),
        };
        let result = query_result(Err(err));

        assert_eq!(result.is_error, Some(true));
        assert_eq!(
            envelope_text(&result),
            "Error querying resources: Request throttled"
        );
    }

    #[test]
    fn credential_error_uses_display_string() {
        let result = query_error(&AzrgError::Credential("no credential source".into()));
        assert_eq!(result.is_error, Some(true));
        assert_eq!(
            envelope_text(&result),
            "Error querying resources: credential error: no credential source"
        );
    }
}
