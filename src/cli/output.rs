use std::io::Write;

use rmcp::model::CallToolResult;

use crate::cli::OutputFormat;
use crate::mcp::format::envelope_text;

/// Write a tool result in the requested output format.
pub fn output_result(
    result: &CallToolResult,
    format: OutputFormat,
    writer: &mut dyn Write,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *writer, result)?;
            writeln!(writer)?;
        }
        OutputFormat::Human => {
            writeln!(writer, "{}", envelope_text(result))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::mcp::format::query_result;

    #[test]
    fn human_output_is_envelope_text() {
        let result = query_result(Ok(json!({"count": 0})));
        let mut buf = Vec::new();
        output_result(&result, OutputFormat::Human, &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "{\n  \"count\": 0\n}\n");
    }

    #[test]
    fn json_output_is_the_envelope() {
        let result = query_result(Ok(json!({"count": 0})));
        let mut buf = Vec::new();
        output_result(&result, OutputFormat::Json, &mut buf).unwrap();

        let parsed: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(parsed["content"][0]["type"], "text");
        assert_eq!(parsed["content"][0]["text"], "{\n  \"count\": 0\n}");
    }
}
