//! Output renderers and formatting helpers for CLI commands.

use std::io::{self, Write};

use serde::Serialize;

/// Render `value` as JSON indented with two spaces.
pub(crate) fn render_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

/// Write `text` and a trailing newline, then flush.
pub(crate) fn write_line(out: &mut (dyn Write + Send), text: &str) -> io::Result<()> {
    writeln!(out, "{text}")?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn render_json_indents_with_two_spaces() -> serde_json::Result<()> {
        let text = render_json(&json!({"version": "1.0.0"}))?;
        assert_eq!(text, "{\n  \"version\": \"1.0.0\"\n}");
        Ok(())
    }

    #[test]
    fn write_line_appends_newline() -> io::Result<()> {
        let mut buffer = Vec::new();
        write_line(&mut buffer, "OK")?;
        assert_eq!(buffer, b"OK\n");
        Ok(())
    }
}
