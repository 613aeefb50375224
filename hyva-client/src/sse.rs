//! Incremental SSE frame decoding
//!
//! The validation service streams events as `text/event-stream`: one JSON
//! object per `data:` line, blank lines as event boundaries, `:` lines as
//! keep-alive comments. Transport chunks arrive at arbitrary byte
//! boundaries, so the decoder buffers partial lines (including split
//! multi-byte UTF-8 sequences) across `push` calls. Bare JSON-lines
//! framing is also accepted for servers that skip the `data:` prefix.

use hyva_common::{Error, Result};

#[derive(Debug, Default)]
pub struct SseFrameDecoder {
    buf: Vec<u8>,
}

impl SseFrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one transport chunk; returns the JSON payload of every event
    /// line completed by this chunk, in arrival order.
    ///
    /// Invalid UTF-8 in a completed line is a malformed frame
    /// (`Error::Transport`).
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>> {
        self.buf.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let raw_line: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = std::str::from_utf8(&raw_line[..pos])
                .map_err(|e| Error::Transport(format!("malformed frame: {}", e)))?;
            if let Some(payload) = Self::payload_of(line) {
                payloads.push(payload.to_string());
            }
        }
        Ok(payloads)
    }

    /// Extract the event payload from one complete line, if any.
    fn payload_of(line: &str) -> Option<&str> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            // Event boundary
            return None;
        }
        if let Some(rest) = line.strip_prefix("data:") {
            let rest = rest.strip_prefix(' ').unwrap_or(rest);
            return Some(rest);
        }
        if line.starts_with(':') {
            // Keep-alive comment
            return None;
        }
        // Non-data SSE fields (event:, id:, retry:) carry no payload;
        // a bare JSON object line is accepted as JSON-lines framing
        let trimmed = line.trim();
        if trimmed.starts_with('{') {
            return Some(trimmed);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_event() {
        let mut decoder = SseFrameDecoder::new();
        let payloads = decoder
            .push(b"data: {\"status\":\"validating\",\"progress\":40}\n\n")
            .unwrap();
        assert_eq!(payloads, vec![r#"{"status":"validating","progress":40}"#]);
    }

    #[test]
    fn test_payload_split_across_chunks() {
        let mut decoder = SseFrameDecoder::new();
        assert!(decoder.push(b"data: {\"status\":\"vali").unwrap().is_empty());
        let payloads = decoder.push(b"dating\"}\n").unwrap();
        assert_eq!(payloads, vec![r#"{"status":"validating"}"#]);
    }

    #[test]
    fn test_multiple_events_in_one_chunk() {
        let mut decoder = SseFrameDecoder::new();
        let payloads = decoder
            .push(b"data: {\"progress\":1}\n\ndata: {\"progress\":2}\n\n")
            .unwrap();
        assert_eq!(payloads.len(), 2);
    }

    #[test]
    fn test_comments_and_field_lines_skipped() {
        let mut decoder = SseFrameDecoder::new();
        let payloads = decoder
            .push(b": heartbeat\nevent: progress\nid: 7\ndata: {\"progress\":9}\n\n")
            .unwrap();
        assert_eq!(payloads, vec![r#"{"progress":9}"#]);
    }

    #[test]
    fn test_crlf_line_endings() {
        let mut decoder = SseFrameDecoder::new();
        let payloads = decoder.push(b"data: {\"progress\":5}\r\n\r\n").unwrap();
        assert_eq!(payloads, vec![r#"{"progress":5}"#]);
    }

    #[test]
    fn test_bare_json_lines_framing() {
        let mut decoder = SseFrameDecoder::new();
        let payloads = decoder.push(b"{\"status\":\"completed\"}\n").unwrap();
        assert_eq!(payloads, vec![r#"{"status":"completed"}"#]);
    }

    #[test]
    fn test_utf8_sequence_split_across_chunks() {
        let mut decoder = SseFrameDecoder::new();
        let line = "data: {\"message\":\"σ = 3.2\"}\n".as_bytes();
        // Split inside the two-byte sigma
        let split = line.iter().position(|&b| b == 0xcf).unwrap() + 1;
        assert!(decoder.push(&line[..split]).unwrap().is_empty());
        let payloads = decoder.push(&line[split..]).unwrap();
        assert_eq!(payloads, vec![r#"{"message":"σ = 3.2"}"#]);
    }

    #[test]
    fn test_invalid_utf8_line_is_transport_error() {
        let mut decoder = SseFrameDecoder::new();
        assert!(decoder.push(b"data: \xff\xfe\n").is_err());
    }
}
