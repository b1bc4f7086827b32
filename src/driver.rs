use crate::document::{Document, Header, StartLine};
use crate::error::ParseError;
use crate::parser::{Handler, HeadersAction, MessageHead, MessageKind, Parser, ParserConfig};

/// Whether a header value is pending behind the current name/value pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KvState {
    AwaitingField,
    HaveValue,
}

/// Accumulates parser callbacks into an owned [`Document`].
///
/// Header names and values arrive in fragments across feed boundaries; a
/// pair is flushed onto the header list when the next name begins (or the
/// header block ends), which keeps reassembly correct for any byte split.
struct DocumentSink {
    doc: Document,
    pending_name: String,
    pending_value: String,
    kv: KvState,
    done: bool,
}

impl DocumentSink {
    fn new() -> Self {
        Self {
            doc: Document::new(),
            pending_name: String::new(),
            pending_value: String::new(),
            kv: KvState::AwaitingField,
            done: false,
        }
    }

    fn reset(&mut self) {
        self.doc.reset();
        self.pending_name.clear();
        self.pending_value.clear();
        self.kv = KvState::AwaitingField;
        self.done = false;
    }

    fn flush_pending(&mut self) {
        if self.kv == KvState::HaveValue {
            self.doc.headers.push(Header {
                name: std::mem::take(&mut self.pending_name),
                value: std::mem::take(&mut self.pending_value),
            });
            self.kv = KvState::AwaitingField;
        }
    }
}

impl Handler for DocumentSink {
    fn on_url(&mut self, data: &[u8]) -> bool {
        self.doc
            .target_or_reason
            .push_str(&String::from_utf8_lossy(data));
        true
    }

    fn on_status(&mut self, data: &[u8]) -> bool {
        self.doc
            .target_or_reason
            .push_str(&String::from_utf8_lossy(data));
        true
    }

    fn on_header_field(&mut self, data: &[u8]) -> bool {
        self.flush_pending();
        self.pending_name.push_str(&String::from_utf8_lossy(data));
        true
    }

    fn on_header_value(&mut self, data: &[u8]) -> bool {
        self.kv = KvState::HaveValue;
        self.pending_value.push_str(&String::from_utf8_lossy(data));
        true
    }

    fn on_headers_complete(&mut self, head: &MessageHead) -> HeadersAction {
        match head.kind {
            MessageKind::Request => {
                if let Some(method) = head.method {
                    self.doc.start = Some(StartLine::Request { method });
                }
            }
            MessageKind::Response => {
                if let Some(status) = head.status_code {
                    self.doc.start = Some(StartLine::Response { status });
                }
            }
            MessageKind::Either => {}
        }
        self.doc.major = head.major;
        self.doc.minor = head.minor;
        self.flush_pending();
        HeadersAction::Proceed
    }

    fn on_body(&mut self, data: &[u8]) -> bool {
        self.doc.body.extend_from_slice(data);
        true
    }

    fn on_message_complete(&mut self) -> bool {
        self.done = true;
        // Stop the parser here so trailing bytes (a pipelined next message)
        // are left unconsumed; the session absorbs this sentinel.
        false
    }
}

/// Streaming parser session that materializes each message as a
/// [`Document`].
///
/// Wraps a [`Parser`] and owns the storage the zero-copy callbacks do not:
/// accumulated target/reason, reassembled header pairs, body bytes.
///
/// A session parses messages back to back: feeding data after a message
/// completed (or failed) starts over on the new bytes automatically, so a
/// keep-alive connection can just keep calling [`feed`](Self::feed).
///
/// ```rust
/// use wiregate::DocumentParser;
///
/// let mut session = DocumentParser::request();
/// session.feed(b"GET /x HTTP/1.1\r\nHost: h\r\n\r\n");
/// assert!(session.is_done());
/// assert_eq!(session.document().target(), "/x");
/// ```
pub struct DocumentParser {
    parser: Parser,
    sink: DocumentSink,
}

impl DocumentParser {
    /// A session for the given message kind with default configuration.
    pub fn new(kind: MessageKind) -> Self {
        Self::with_config(kind, ParserConfig::default())
    }

    /// A session with explicit parser configuration.
    pub fn with_config(kind: MessageKind, config: ParserConfig) -> Self {
        Self {
            parser: Parser::with_config(kind, config),
            sink: DocumentSink::new(),
        }
    }

    /// A request-parsing session.
    pub fn request() -> Self {
        Self::new(MessageKind::Request)
    }

    /// A response-parsing session.
    pub fn response() -> Self {
        Self::new(MessageKind::Response)
    }

    /// A session that decides request vs response from the first byte.
    pub fn either() -> Self {
        Self::new(MessageKind::Either)
    }

    /// Feed a fragment of input; returns the number of bytes consumed.
    ///
    /// If the previous message already completed or failed, the session
    /// resets itself first and the bytes begin a new message. A short count
    /// with [`error`](Self::error) set marks the offending byte.
    pub fn feed(&mut self, data: &[u8]) -> usize {
        let stale_error = self
            .parser
            .error()
            .is_some_and(|e| e != ParseError::Paused);
        if self.sink.done || stale_error {
            self.reset();
        }
        let consumed = self.parser.feed(data, &mut self.sink);
        self.absorb_stop();
        consumed
    }

    /// Signal end of input; returns whether the message completed.
    ///
    /// Required to finish response bodies framed by connection close.
    pub fn feed_eof(&mut self) -> bool {
        if self.sink.done || self.parser.error().is_some() {
            return false;
        }
        self.parser.feed_eof(&mut self.sink);
        self.absorb_stop();
        self.sink.done
    }

    /// The sink stops the parser at each message boundary; that stop is not
    /// an error from the session's point of view.
    fn absorb_stop(&mut self) {
        if self.sink.done && self.parser.error() == Some(ParseError::MessageCompleteCallback) {
            self.parser.clear_error();
        }
    }

    /// Has a complete message been parsed?
    pub fn is_done(&self) -> bool {
        self.sink.done
    }

    /// The latched parse error, if any.
    pub fn error(&self) -> Option<ParseError> {
        self.parser.error()
    }

    /// Suspend or resume parsing (see [`Parser::pause`]).
    pub fn pause(&mut self, paused: bool) {
        self.parser.pause(paused);
    }

    /// Discard all progress and start a fresh message of the same kind.
    pub fn reset(&mut self) {
        self.parser.reset();
        self.sink.reset();
    }

    /// The document assembled so far.
    pub fn document(&self) -> &Document {
        &self.sink.doc
    }

    /// Move the document out, leaving an empty one behind.
    pub fn take_document(&mut self) -> Document {
        std::mem::take(&mut self.sink.doc)
    }

    /// Consume the session, keeping only the document.
    pub fn into_document(self) -> Document {
        self.sink.doc
    }

    /// See [`Parser::should_keep_alive`].
    pub fn should_keep_alive(&self) -> bool {
        self.parser.should_keep_alive()
    }

    /// See [`Parser::upgrade`].
    pub fn upgrade(&self) -> bool {
        self.parser.upgrade()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::Method;

    #[test]
    fn assembles_request_document() {
        let raw = b"POST /uri/abc HTTP/1.1\r\nAccept: XAccept\r\nContent-Length: 3\r\n\r\nabc";
        let mut session = DocumentParser::request();
        assert_eq!(session.feed(raw), raw.len());
        assert!(session.is_done());
        let doc = session.document();
        assert_eq!(doc.method(), Some(Method::POST));
        assert_eq!(doc.target(), "/uri/abc");
        assert_eq!(doc.header_value("Accept"), Some("XAccept"));
        assert_eq!(doc.body_as_str(), Some("abc"));
    }

    #[test]
    fn header_pair_flush_survives_any_split() {
        let raw = b"GET / HTTP/1.1\r\nHost: domain.com\r\nAccept: XAccept\r\n\r\n";
        for split in 0..raw.len() {
            let mut session = DocumentParser::request();
            session.feed(&raw[..split]);
            assert!(session.error().is_none(), "split at {split}");
            session.feed(&raw[split..]);
            assert!(session.is_done(), "split at {split}");
            let doc = session.document();
            assert_eq!(doc.header_value("Host"), Some("domain.com"));
            assert_eq!(doc.header_value("Accept"), Some("XAccept"));
            assert_eq!(doc.headers.len(), 2);
        }
    }

    #[test]
    fn back_to_back_messages_reset_automatically() {
        let first = b"GET /a HTTP/1.1\r\nHost: h\r\n\r\n";
        let second = b"POST /b HTTP/1.1\r\nContent-Length: 2\r\n\r\nOK";
        let mut session = DocumentParser::request();
        assert_eq!(session.feed(first), first.len());
        assert!(session.is_done());
        assert_eq!(session.feed(second), second.len());
        assert!(session.is_done());
        let doc = session.document();
        assert_eq!(doc.method(), Some(Method::POST));
        assert_eq!(doc.target(), "/b");
        assert_eq!(doc.body_as_str(), Some("OK"));
    }

    #[test]
    fn pipelined_messages_stop_at_the_boundary() {
        let first = b"GET /a HTTP/1.1\r\nHost: h\r\n\r\n";
        let second = b"GET /b HTTP/1.1\r\nHost: h\r\n\r\n";
        let mut raw = first.to_vec();
        raw.extend_from_slice(second);

        let mut session = DocumentParser::request();
        let consumed = session.feed(&raw);
        assert_eq!(consumed, first.len());
        assert!(session.is_done());
        assert!(session.error().is_none());
        assert_eq!(session.document().target(), "/a");

        let consumed2 = session.feed(&raw[consumed..]);
        assert_eq!(consumed2, second.len());
        assert!(session.is_done());
        assert_eq!(session.document().target(), "/b");
    }

    #[test]
    fn take_document_leaves_a_fresh_one() {
        let raw = b"GET /a HTTP/1.1\r\n\r\n";
        let mut session = DocumentParser::request();
        session.feed(raw);
        let doc = session.take_document();
        assert_eq!(doc.target(), "/a");
        assert_eq!(session.document().target(), "");
        // the next feed starts a new message
        session.feed(raw);
        assert!(session.is_done());
        assert_eq!(session.document().target(), "/a");
    }

    #[test]
    fn either_kind_disambiguates() {
        let mut session = DocumentParser::either();
        let res = b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n";
        session.feed(res);
        assert!(session.is_done());
        assert!(session.document().is_response());
        assert_eq!(session.document().status_code(), Some(200));

        let mut session = DocumentParser::either();
        let req = b"HEAD / HTTP/1.1\r\n\r\n";
        session.feed(req);
        assert!(session.is_done());
        assert_eq!(session.document().method(), Some(Method::HEAD));
    }
}
