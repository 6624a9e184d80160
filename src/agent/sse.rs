//! Shared helpers for parsing chat-completion SSE streams.
//!
//! The line parser is a pure function so the chunk-assembly contract can be
//! tested against scripted streams without a network.

use crate::agent::types::ChatCompletionChunk;

/// A content delta extracted from one streamed chunk
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDelta {
    /// Content fragment (may be empty on the finishing chunk)
    pub content: String,
    /// Finish reason, set on the final chunk
    pub finish_reason: Option<String>,
}

/// Result of processing a single SSE line
#[derive(Debug)]
pub enum SseLine {
    /// No actionable event (empty line, comment, non-data prefix)
    Skip,
    /// Stream is done
    Done,
    /// A delta to yield
    Delta(StreamDelta),
}

/// Process a single SSE line from an OpenAI-compatible streaming response.
///
/// Lines look like `data: {json}` with a final `data: [DONE]` terminator.
pub fn parse_sse_line(line: &str) -> SseLine {
    let Some(data) = line.strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let data = data.trim();

    if data == "[DONE]" {
        return SseLine::Done;
    }

    let Ok(chunk) = serde_json::from_str::<ChatCompletionChunk>(data) else {
        return SseLine::Skip;
    };

    let Some(choice) = chunk.choices.into_iter().next() else {
        return SseLine::Skip;
    };

    let content = choice.delta.content.unwrap_or_default();
    if content.is_empty() && choice.finish_reason.is_none() {
        return SseLine::Skip;
    }

    SseLine::Delta(StreamDelta {
        content,
        finish_reason: choice.finish_reason,
    })
}

/// Drain complete lines out of a streaming byte buffer.
///
/// Returns the parsed events for every full line; partial trailing data
/// stays in `buf` for the next network chunk.
pub fn drain_lines(buf: &mut String) -> Vec<SseLine> {
    let mut events = Vec::new();
    while let Some(pos) = buf.find('\n') {
        let line: String = buf.drain(..=pos).collect();
        events.push(parse_sse_line(line.trim_end()));
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_done_terminator() {
        assert!(matches!(parse_sse_line("data: [DONE]"), SseLine::Done));
    }

    #[test]
    fn test_non_data_lines_skipped() {
        assert!(matches!(parse_sse_line(""), SseLine::Skip));
        assert!(matches!(parse_sse_line(": keep-alive"), SseLine::Skip));
        assert!(matches!(parse_sse_line("event: ping"), SseLine::Skip));
    }

    #[test]
    fn test_content_delta() {
        let data = r#"data: {"id":"c1","model":"gpt-4o","choices":[{"index":0,"delta":{"content":"Hello"},"finish_reason":null}]}"#;
        match parse_sse_line(data) {
            SseLine::Delta(d) => {
                assert_eq!(d.content, "Hello");
                assert!(d.finish_reason.is_none());
            }
            other => panic!("expected delta, got {:?}", other),
        }
    }

    #[test]
    fn test_finish_chunk_without_content() {
        let data = r#"data: {"id":"c1","model":"gpt-4o","choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#;
        match parse_sse_line(data) {
            SseLine::Delta(d) => {
                assert!(d.content.is_empty());
                assert_eq!(d.finish_reason.as_deref(), Some("stop"));
            }
            other => panic!("expected delta, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_json_skipped() {
        assert!(matches!(parse_sse_line("data: {not json"), SseLine::Skip));
    }

    // The chat loop's transcript contract: the assembled assistant message
    // equals the concatenation of all streamed content deltas, in order.
    #[test]
    fn test_scripted_stream_assembles_full_message() {
        let script = [
            r#"data: {"id":"c1","model":"m","choices":[{"index":0,"delta":{"role":"assistant","content":""},"finish_reason":null}]}"#,
            r#"data: {"id":"c1","model":"m","choices":[{"index":0,"delta":{"content":"Hel"},"finish_reason":null}]}"#,
            "",
            r#"data: {"id":"c1","model":"m","choices":[{"index":0,"delta":{"content":"lo, "},"finish_reason":null}]}"#,
            r#"data: {"id":"c1","model":"m","choices":[{"index":0,"delta":{"content":"world"},"finish_reason":null}]}"#,
            r#"data: {"id":"c1","model":"m","choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#,
            "data: [DONE]",
        ];

        let mut text = String::new();
        for line in script {
            match parse_sse_line(line) {
                SseLine::Delta(d) => text.push_str(&d.content),
                SseLine::Done => break,
                SseLine::Skip => {}
            }
        }

        assert_eq!(text, "Hello, world");
    }

    #[test]
    fn test_drain_lines_keeps_partial_tail() {
        let mut buf = String::from("data: [DONE]\ndata: {\"partial");
        let events = drain_lines(&mut buf);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], SseLine::Done));
        assert_eq!(buf, "data: {\"partial");
    }
}
