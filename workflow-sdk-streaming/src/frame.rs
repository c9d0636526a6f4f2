//! Line framing of event-stream bodies.
//!
//! [`FrameParser`] turns raw body chunks into [`StreamEvent`]s. Chunks may
//! split lines anywhere; the parser keeps the partial line until its `\n`
//! arrives. A trailing `\r` is stripped from every line.
//!
//! With [`Framing::JsonLines`] every non-blank line is read as a JSON object
//! and becomes its own event. With [`Framing::EventStream`] lines of the
//! form `field: value` accumulate until a blank line.

use crate::error::{StreamError, StreamResult};
use crate::event::StreamEvent;
use serde::Deserialize;
use serde_json::value::RawValue;
use std::collections::VecDeque;
use tracing::{debug, trace};
use workflow_sdk_http::Framing;

/// Longest line the parser will buffer.
pub const MAX_LINE_LEN: usize = 10 * 1024 * 1024;

#[derive(Deserialize)]
struct WireFrame<'a> {
    #[serde(borrow, default)]
    event: Option<&'a RawValue>,
    #[serde(borrow, default)]
    data: Option<&'a RawValue>,
    #[serde(borrow, default)]
    metadata: Option<&'a RawValue>,
}

/// Text of one field of a JSON-lines frame.
///
/// Strings are unquoted, `null` is empty, anything else is kept as the raw
/// JSON text it was sent as.
fn field_text(raw: Option<&RawValue>) -> String {
    let Some(raw) = raw else {
        return String::new();
    };
    let text = raw.get().trim();
    if text.starts_with('"') {
        serde_json::from_str::<String>(text).unwrap_or_default()
    } else if text == "null" {
        String::new()
    } else {
        text.to_string()
    }
}

/// Extract `event`, `data` and `metadata` from a JSON-object line.
///
/// Anything that is not a JSON object yields an empty event.
pub fn parse_json_line(line: &str) -> StreamEvent {
    if !line.trim_start().starts_with('{') {
        return StreamEvent::default();
    }
    match serde_json::from_str::<WireFrame<'_>>(line) {
        Ok(frame) => StreamEvent {
            event: field_text(frame.event),
            data: field_text(frame.data),
            metadata: field_text(frame.metadata),
        },
        Err(e) => {
            debug!(error = %e, "Skipping malformed frame");
            StreamEvent::default()
        }
    }
}

/// Incremental parser for event-stream bodies.
#[derive(Debug, Default)]
pub struct FrameParser {
    framing: Framing,
    buffer: Vec<u8>,
    pending: StreamEvent,
    data_lines: Vec<String>,
    events: VecDeque<StreamEvent>,
}

impl FrameParser {
    /// Create a parser with the given framing.
    #[must_use]
    pub fn new(framing: Framing) -> Self {
        Self {
            framing,
            ..Default::default()
        }
    }

    /// The framing in use.
    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// Feed a chunk of the body. Returns how many events became ready.
    ///
    /// Events completed by this chunk are queued even when an error is
    /// returned; drain them with [`FrameParser::next_event`].
    pub fn feed(&mut self, chunk: &[u8]) -> StreamResult<usize> {
        let before = self.events.len();
        // The retained tail never holds a newline, so only new bytes are scanned.
        let mut scan_from = self.buffer.len();
        self.buffer.extend_from_slice(chunk);

        let mut consumed = 0;
        let mut too_long = false;
        let mut lines = Vec::new();
        while let Some(offset) = self.buffer[scan_from..].iter().position(|b| *b == b'\n') {
            let end = scan_from + offset;
            if end - consumed > MAX_LINE_LEN {
                too_long = true;
                break;
            }
            lines.push(decode_line(&self.buffer[consumed..end]));
            consumed = end + 1;
            scan_from = consumed;
        }
        self.buffer.drain(..consumed);

        for line in lines {
            self.process_line(&line);
        }

        if too_long || self.buffer.len() > MAX_LINE_LEN {
            self.buffer.clear();
            return Err(StreamError::LineTooLong {
                limit: MAX_LINE_LEN,
            });
        }

        Ok(self.events.len() - before)
    }

    /// Feed a string chunk.
    pub fn feed_str(&mut self, s: &str) -> StreamResult<usize> {
        self.feed(s.as_bytes())
    }

    /// Call at end of input: the unterminated last line counts as a line and
    /// an event still being accumulated is emitted.
    pub fn finish(&mut self) -> StreamResult<usize> {
        let before = self.events.len();

        if !self.buffer.is_empty() {
            let line = decode_line(&self.buffer);
            self.buffer.clear();
            self.process_line(&line);
        }
        self.flush_pending();

        Ok(self.events.len() - before)
    }

    /// Get the next parsed event.
    pub fn next_event(&mut self) -> Option<StreamEvent> {
        self.events.pop_front()
    }

    /// Check if there are queued events.
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Clear all parser state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.events.clear();
        self.pending = StreamEvent::default();
        self.data_lines.clear();
    }

    fn process_line(&mut self, line: &str) {
        if line.is_empty() {
            self.flush_pending();
            return;
        }

        match self.framing {
            Framing::JsonLines => {
                let event = parse_json_line(line);
                self.pending = StreamEvent::default();
                self.data_lines.clear();
                self.emit(event);
            }
            Framing::EventStream => self.accumulate_field(line),
        }
    }

    fn accumulate_field(&mut self, line: &str) {
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.pending.event = value.to_string(),
            "data" => self.data_lines.push(value.to_string()),
            "metadata" => self.pending.metadata = value.to_string(),
            _ => trace!(field, "Ignoring event-stream field"),
        }
    }

    fn flush_pending(&mut self) {
        let mut event = std::mem::take(&mut self.pending);
        if !self.data_lines.is_empty() {
            event.data = self.data_lines.join("\n");
            self.data_lines.clear();
        }
        self.emit(event);
    }

    fn emit(&mut self, event: StreamEvent) {
        if event.is_empty() {
            return;
        }
        trace!(event = %event.event, "Parsed frame");
        self.events.push_back(event);
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn drain(parser: &mut FrameParser) -> Vec<StreamEvent> {
        std::iter::from_fn(|| parser.next_event()).collect()
    }

    #[test]
    fn test_json_lines_blank_line_separated() {
        let mut parser = FrameParser::new(Framing::JsonLines);
        parser
            .feed_str("{\"event\":\"a\",\"data\":\"1\"}\n\n{\"event\":\"b\",\"data\":\"2\"}\n")
            .unwrap();

        assert_eq!(
            drain(&mut parser),
            vec![
                StreamEvent::new("a").with_data("1"),
                StreamEvent::new("b").with_data("2"),
            ]
        );
    }

    #[test]
    fn test_each_line_is_its_own_event() {
        let mut parser = FrameParser::new(Framing::JsonLines);
        let ready = parser
            .feed_str("{\"event\":\"a\"}\n{\"data\":\"x\"}\n")
            .unwrap();

        assert_eq!(ready, 2);
        assert_eq!(
            drain(&mut parser),
            vec![StreamEvent::new("a"), StreamEvent::default().with_data("x")]
        );
    }

    #[rstest]
    #[case::empty_object("{}")]
    #[case::all_fields_empty(r#"{"event":"","data":"","metadata":""}"#)]
    #[case::nulls(r#"{"event":null,"data":null}"#)]
    #[case::unrelated_keys(r#"{"type":"ping"}"#)]
    #[case::not_json("event: values")]
    #[case::truncated(r#"{"event":"a""#)]
    #[case::array(r#"["a","b","c"]"#)]
    #[case::scalar("42")]
    fn test_lines_without_fields_emit_nothing(#[case] line: &str) {
        let mut parser = FrameParser::new(Framing::JsonLines);
        assert_eq!(parser.feed_str(&format!("{line}\n\n")).unwrap(), 0);
        assert!(!parser.has_events());
    }

    #[test]
    fn test_non_string_fields_keep_raw_json() {
        let event = parse_json_line(
            r#"{"event":"values","data":{"messages":[1, 2]},"metadata":{"run_id":"r"}}"#,
        );
        assert_eq!(event.event, "values");
        assert_eq!(event.data, r#"{"messages":[1, 2]}"#);
        assert_eq!(event.metadata, r#"{"run_id":"r"}"#);

        let event = parse_json_line(r#"{"data": 7, "metadata": true}"#);
        assert_eq!(event.data, "7");
        assert_eq!(event.metadata, "true");
    }

    #[test]
    fn test_string_escapes_are_decoded() {
        let event = parse_json_line(r#"{"data":"line\nbreak \"quoted\""}"#);
        assert_eq!(event.data, "line\nbreak \"quoted\"");
    }

    #[test]
    fn test_partial_chunks() {
        let mut parser = FrameParser::new(Framing::JsonLines);
        assert_eq!(parser.feed_str("{\"event\":\"me").unwrap(), 0);
        assert_eq!(parser.feed_str("ta\",\"data\"").unwrap(), 0);
        assert_eq!(parser.feed_str(":\"ok\"}\r").unwrap(), 0);
        assert_eq!(parser.feed_str("\n").unwrap(), 1);

        assert_eq!(parser.next_event(), Some(StreamEvent::new("meta").with_data("ok")));
    }

    #[test]
    fn test_line_split_inside_multibyte_char() {
        let line = "{\"data\":\"héllo\"}\n".as_bytes();
        let split = line.iter().position(|b| *b == 0xc3).unwrap() + 1;

        let mut parser = FrameParser::new(Framing::JsonLines);
        parser.feed(&line[..split]).unwrap();
        parser.feed(&line[split..]).unwrap();

        assert_eq!(parser.next_event().unwrap().data, "héllo");
    }

    #[test]
    fn test_finish_flushes_unterminated_line() {
        let mut parser = FrameParser::new(Framing::JsonLines);
        parser.feed_str("{\"event\":\"end\"}").unwrap();
        assert!(!parser.has_events());

        assert_eq!(parser.finish().unwrap(), 1);
        assert_eq!(parser.next_event(), Some(StreamEvent::new("end")));
        assert_eq!(parser.finish().unwrap(), 0);
    }

    #[test]
    fn test_line_too_long_keeps_completed_events() {
        let mut parser = FrameParser::new(Framing::JsonLines);
        let mut chunk = b"{\"event\":\"a\"}\n".to_vec();
        chunk.extend(std::iter::repeat(b'x').take(MAX_LINE_LEN + 1));

        let err = parser.feed(&chunk).unwrap_err();
        assert!(matches!(err, StreamError::LineTooLong { limit } if limit == MAX_LINE_LEN));
        assert_eq!(parser.next_event(), Some(StreamEvent::new("a")));
    }

    #[test]
    fn test_terminated_line_too_long() {
        let mut parser = FrameParser::new(Framing::JsonLines);
        let mut chunk = b"{\"event\":\"a\"}\n".to_vec();
        chunk.extend(std::iter::repeat(b'x').take(MAX_LINE_LEN + 1));
        chunk.extend_from_slice(b"\n{\"event\":\"b\"}\n");

        let err = parser.feed(&chunk).unwrap_err();
        assert!(matches!(err, StreamError::LineTooLong { .. }));
        assert_eq!(drain(&mut parser), vec![StreamEvent::new("a")]);
    }

    #[test]
    fn test_long_line_in_small_chunks() {
        let payload = "x".repeat(4 * 1024 * 1024);
        let line = format!("{{\"event\":\"big\",\"data\":\"{payload}\"}}\n");

        let mut parser = FrameParser::new(Framing::JsonLines);
        let started = std::time::Instant::now();
        let mut ready = 0;
        for chunk in line.as_bytes().chunks(1024) {
            ready += parser.feed(chunk).unwrap();
        }

        assert_eq!(ready, 1);
        let event = parser.next_event().unwrap();
        assert_eq!(event.event, "big");
        assert_eq!(event.data.len(), payload.len());
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }

    #[test]
    fn test_event_stream_accumulates_until_blank_line() {
        let mut parser = FrameParser::new(Framing::EventStream);
        parser
            .feed_str("event: values\ndata: {\"a\":\ndata: 1}\nmetadata: {\"run_id\":\"r\"}\n")
            .unwrap();
        assert!(!parser.has_events());

        parser.feed_str("\n").unwrap();
        assert_eq!(
            parser.next_event(),
            Some(
                StreamEvent::new("values")
                    .with_data("{\"a\":\n1}")
                    .with_metadata("{\"run_id\":\"r\"}")
            )
        );
    }

    #[test]
    fn test_event_stream_ignores_comments_and_unknown_fields() {
        let mut parser = FrameParser::new(Framing::EventStream);
        parser
            .feed_str(": keep-alive\n\nid: 7\nretry: 100\n\nevent:end\ndata\n\n")
            .unwrap();

        assert_eq!(drain(&mut parser), vec![StreamEvent::new("end")]);
    }

    #[test]
    fn test_event_stream_finish_dispatches_pending() {
        let mut parser = FrameParser::new(Framing::EventStream);
        parser.feed_str("event: end\ndata: null").unwrap();
        parser.finish().unwrap();

        assert_eq!(
            parser.next_event(),
            Some(StreamEvent::new("end").with_data("null"))
        );
    }

    #[test]
    fn test_clear() {
        let mut parser = FrameParser::new(Framing::EventStream);
        parser.feed_str("event: a\n").unwrap();
        parser.clear();
        parser.finish().unwrap();
        assert!(!parser.has_events());
    }
}
