//! Server-Sent-Events wire format decoding for the subscriber client.
//!
//! Frames arrive as `data: <json>\n\n` blocks; comment lines beginning with
//! `:` carry no payload (keep-alives) and are ignored, as a standards
//! compliant SSE parser does.

/// Incremental SSE frame decoder.
///
/// Feed it raw chunks as they arrive off the transport; it yields the
/// payloads of completed data frames. Partial frames are buffered across
/// chunks.
#[derive(Default)]
pub struct FrameDecoder {
    buffer: String,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one transport chunk and returns the data payloads of every
    /// frame completed by it.
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        self.buffer.push_str(chunk);

        let mut payloads = Vec::new();

        // A frame ends at a blank line.
        while let Some(end) = self.buffer.find("\n\n") {
            let block: String = self.buffer.drain(..end + 2).collect();
            if let Some(payload) = decode_block(&block) {
                payloads.push(payload);
            }
        }

        payloads
    }
}

/// Extracts the data payload from one complete frame block.
///
/// Comment lines and fields other than `data` are skipped; multiple data
/// lines are joined with newlines per the SSE specification. Returns `None`
/// for frames without any data field (e.g. keep-alive comments).
fn decode_block(block: &str) -> Option<String> {
    let mut data_lines: Vec<&str> = Vec::new();

    for line in block.lines() {
        if line.starts_with(':') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }

    if data_lines.is_empty() {
        None
    } else {
        Some(data_lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_data_frame() {
        let mut decoder = FrameDecoder::new();
        let payloads = decoder.push("data: {\"a\":1}\n\n");
        assert_eq!(payloads, vec!["{\"a\":1}".to_string()]);
    }

    #[test]
    fn test_frame_split_across_chunks() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push("data: {\"a\"").is_empty());
        assert!(decoder.push(":1}").is_empty());
        let payloads = decoder.push("\n\n");
        assert_eq!(payloads, vec!["{\"a\":1}".to_string()]);
    }

    #[test]
    fn test_comment_frames_are_ignored() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(": keep-alive\n\n").is_empty());
        let payloads = decoder.push(": ping\n\ndata: x\n\n");
        assert_eq!(payloads, vec!["x".to_string()]);
    }

    #[test]
    fn test_multiple_frames_in_one_chunk() {
        let mut decoder = FrameDecoder::new();
        let payloads = decoder.push("data: 1\n\ndata: 2\n\n");
        assert_eq!(payloads, vec!["1".to_string(), "2".to_string()]);
    }

    #[test]
    fn test_multiline_data_joined() {
        let mut decoder = FrameDecoder::new();
        let payloads = decoder.push("data: line1\ndata: line2\n\n");
        assert_eq!(payloads, vec!["line1\nline2".to_string()]);
    }

    #[test]
    fn test_other_fields_skipped() {
        let mut decoder = FrameDecoder::new();
        let payloads = decoder.push("event: update\nid: 7\ndata: x\n\n");
        assert_eq!(payloads, vec!["x".to_string()]);
    }
}
