use wiregate::{
    parse_response, DocumentParser, Handler, HeadersAction, MessageHead, MessageKind, Method,
    ParseError, Parser,
};

// =========================================================================
// Status line parsing
// =========================================================================

const OK_RESPONSE: &[u8] = b"HTTP/1.1 200 OK\r\n\
    Accept: XAccept\r\n\
    Host: domain.com\r\n\
    Connection: Keep-Alive\r\n\
    Content-Length: 3\r\n\
    \r\nxyz";

#[test]
fn single_shot_response() {
    let mut session = DocumentParser::response();
    let consumed = session.feed(OK_RESPONSE);
    assert_eq!(consumed, OK_RESPONSE.len());
    assert!(session.error().is_none());
    assert!(session.is_done());

    let doc = session.document();
    assert_eq!(doc.status_code(), Some(200));
    assert_eq!(doc.reason(), "OK");
    assert_eq!(doc.major, 1);
    assert_eq!(doc.minor, 1);
    assert_eq!(doc.header_value("Accept"), Some("XAccept"));
    assert_eq!(doc.header_value("Connection"), Some("Keep-Alive"));
    assert_eq!(doc.body_as_str(), Some("xyz"));
}

#[test]
fn split_feed_at_every_offset() {
    for split in 0..OK_RESPONSE.len() {
        let mut session = DocumentParser::response();
        session.feed(&OK_RESPONSE[..split]);
        assert!(session.error().is_none(), "split at {split}");
        assert!(!session.is_done(), "split at {split}");

        session.feed(&OK_RESPONSE[split..]);
        assert!(session.error().is_none(), "split at {split}");
        assert!(session.is_done(), "split at {split}");

        let doc = session.document();
        assert_eq!(doc.status_code(), Some(200));
        assert_eq!(doc.reason(), "OK");
        assert_eq!(doc.body_as_str(), Some("xyz"));
    }
}

#[test]
fn missing_space_before_status_code_is_invalid() {
    let raw = b"HTTP/1.1200 OK\r\nHost: domain.com\r\n\r\n";
    let mut session = DocumentParser::response();
    session.feed(raw);
    assert_eq!(session.error(), Some(ParseError::InvalidVersion));
}

#[test]
fn status_code_glued_to_reason_is_invalid() {
    let raw = b"HTTP/1.1 200OK\r\nHost: domain.com\r\n\r\n";
    let mut session = DocumentParser::response();
    session.feed(raw);
    assert_eq!(session.error(), Some(ParseError::InvalidStatus));
}

#[test]
fn extra_spaces_before_status_code_are_tolerated() {
    let doc = parse_response(b"HTTP/1.1   404 Not Found\r\nContent-Length: 0\r\n\r\n").unwrap();
    assert_eq!(doc.status_code(), Some(404));
    assert_eq!(doc.reason(), "Not Found");
}

#[test]
fn reason_phrase_may_be_absent() {
    let doc = parse_response(b"HTTP/1.1 200\r\nContent-Length: 0\r\n\r\n").unwrap();
    assert_eq!(doc.status_code(), Some(200));
    assert_eq!(doc.reason(), "");
}

#[test]
fn four_digit_status_is_invalid() {
    let mut session = DocumentParser::response();
    session.feed(b"HTTP/1.1 2000 Huge\r\n\r\n");
    assert_eq!(session.error(), Some(ParseError::InvalidStatus));
}

// =========================================================================
// EOF-framed bodies
// =========================================================================

#[test]
fn response_without_length_reads_until_eof() {
    let raw = b"HTTP/1.1 404 Not Found\r\n\
        Accept: XAccept\r\n\
        Host: domain.com\r\n\
        User-Agent: gtest.proxy\r\n\
        \r\n";
    let mut session = DocumentParser::response();
    let consumed = session.feed(raw);
    assert_eq!(consumed, raw.len());
    assert!(session.error().is_none());
    assert!(!session.is_done());

    assert!(session.feed_eof());
    assert!(session.error().is_none());
    assert!(session.is_done());

    let doc = session.document();
    assert_eq!(doc.status_code(), Some(404));
    assert_eq!(doc.reason(), "Not Found");
    assert_eq!(doc.header_value("User-Agent"), Some("gtest.proxy"));
    assert!(doc.body.is_empty());
}

#[test]
fn eof_framed_body_accumulates_across_feeds() {
    let mut session = DocumentParser::response();
    session.feed(b"HTTP/1.1 200 OK\r\n\r\nfirst ");
    session.feed(b"second");
    assert!(!session.is_done());
    assert!(session.feed_eof());
    assert_eq!(session.document().body_as_str(), Some("first second"));
    // an EOF-framed message can never keep the connection alive
    assert!(!session.should_keep_alive());
}

#[test]
fn status_204_and_304_have_no_body() {
    for status in [204u16, 304] {
        let raw = format!("HTTP/1.1 {status} X\r\n\r\n");
        let mut session = DocumentParser::response();
        assert_eq!(session.feed(raw.as_bytes()), raw.len());
        assert!(session.is_done(), "status {status}");
        assert!(session.document().body.is_empty());
    }
}

// =========================================================================
// Chunked bodies
// =========================================================================

/// Counts chunk events while collecting the body.
#[derive(Default)]
struct ChunkCounter {
    headers: Vec<u64>,
    completes: usize,
    body: Vec<u8>,
}

impl Handler for ChunkCounter {
    fn on_body(&mut self, data: &[u8]) -> bool {
        self.body.extend_from_slice(data);
        true
    }
    fn on_chunk_header(&mut self, size: u64) -> bool {
        self.headers.push(size);
        true
    }
    fn on_chunk_complete(&mut self) -> bool {
        self.completes += 1;
        true
    }
}

#[test]
fn chunked_response_fires_chunk_callbacks() {
    let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n";
    let mut parser = Parser::new(MessageKind::Response);
    let mut counter = ChunkCounter::default();
    assert_eq!(parser.feed(raw, &mut counter), raw.len());
    assert!(parser.error().is_none());
    assert!(parser.is_chunked());
    assert_eq!(counter.body, b"hello");
    assert_eq!(counter.headers, vec![5, 0]);
    assert_eq!(counter.completes, 2);
}

#[test]
fn chunked_response_document() {
    let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n";
    let doc = parse_response(raw).unwrap();
    assert_eq!(doc.body_as_str(), Some("hello"));
    assert!(doc.is_chunked());
}

#[test]
fn transfer_encoding_with_other_final_coding_reads_until_eof() {
    let mut session = DocumentParser::response();
    session.feed(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: gzip\r\n\r\ncompressed");
    assert!(session.error().is_none());
    assert!(!session.is_done());
    assert!(session.feed_eof());
    assert_eq!(session.document().body_as_str(), Some("compressed"));
}

// =========================================================================
// Keep-alive and skip-body decisions
// =========================================================================

#[test]
fn keep_alive_by_version_and_connection_header() {
    // HTTP/1.1 with a length: alive unless told otherwise
    let mut session = DocumentParser::response();
    session.feed(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
    assert!(session.should_keep_alive());

    // HTTP/1.1 + Connection: close
    let mut session = DocumentParser::response();
    session.feed(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
    assert!(!session.should_keep_alive());

    // HTTP/1.0 needs an explicit keep-alive
    let mut session = DocumentParser::response();
    session.feed(b"HTTP/1.0 200 OK\r\nContent-Length: 0\r\n\r\n");
    assert!(!session.should_keep_alive());

    let mut session = DocumentParser::response();
    session.feed(b"HTTP/1.0 200 OK\r\nContent-Length: 0\r\nConnection: keep-alive\r\n\r\n");
    assert!(session.should_keep_alive());
}

#[test]
fn connection_header_token_scan_handles_lists() {
    let mut session = DocumentParser::response();
    session.feed(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: foo, close, bar\r\n\r\n");
    assert!(session.is_done());
    assert!(!session.should_keep_alive());
}

/// A client that knows it sent a HEAD request skips the announced body.
struct HeadClient {
    done: bool,
}

impl Handler for HeadClient {
    fn on_headers_complete(&mut self, _head: &MessageHead) -> HeadersAction {
        HeadersAction::SkipBody
    }
    fn on_message_complete(&mut self) -> bool {
        self.done = true;
        true
    }
}

#[test]
fn head_response_body_can_be_skipped() {
    let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 12345\r\n\r\n";
    let mut parser = Parser::new(MessageKind::Response);
    let mut client = HeadClient { done: false };
    assert_eq!(parser.feed(raw, &mut client), raw.len());
    assert!(parser.error().is_none());
    assert!(client.done);
}

// =========================================================================
// Upgrade
// =========================================================================

#[test]
fn switching_protocols_hands_off() {
    let head = b"HTTP/1.1 101 Switching Protocols\r\n\
        Upgrade: websocket\r\n\
        Connection: Upgrade\r\n\
        \r\n";
    let mut raw = head.to_vec();
    raw.extend_from_slice(b"ws-frames");

    let mut session = DocumentParser::response();
    let consumed = session.feed(&raw);
    assert_eq!(consumed, head.len());
    assert!(session.upgrade());
    assert!(session.is_done());
}

#[test]
fn non_101_upgrade_announcement_is_informational() {
    let raw = b"HTTP/1.1 200 OK\r\n\
        Content-Length: 0\r\n\
        Upgrade: h2c\r\n\
        Connection: Upgrade\r\n\
        \r\n";
    let mut session = DocumentParser::response();
    assert_eq!(session.feed(raw), raw.len());
    assert!(session.is_done());
    assert!(!session.upgrade());
}

// =========================================================================
// Mixed sessions
// =========================================================================

#[test]
fn either_session_parses_both_kinds() {
    let mut session = DocumentParser::either();
    let req = b"PUT /x HTTP/1.1\r\nContent-Length: 0\r\n\r\n";
    assert_eq!(session.feed(req), req.len());
    assert!(session.is_done());
    assert_eq!(session.document().method(), Some(Method::PUT));

    let mut session = DocumentParser::either();
    let res = b"HTTP/1.1 201 Created\r\nContent-Length: 0\r\n\r\n";
    assert_eq!(session.feed(res), res.len());
    assert!(session.is_done());
    assert_eq!(session.document().status_code(), Some(201));
}
