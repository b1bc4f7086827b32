use crate::chars;
use crate::error::ParseError;
use crate::method::Method;
use crate::url::url_step;

/// Compile-time strictness switch (cargo feature `strict`, on by default).
const STRICT: bool = cfg!(feature = "strict");

/// `content_length` value meaning "no Content-Length header seen".
const UNSET: u64 = u64::MAX;

// Flag bits accumulated while the header block is parsed.
const F_CHUNKED: u8 = 1 << 0;
const F_CONNECTION_KEEP_ALIVE: u8 = 1 << 1;
const F_CONNECTION_CLOSE: u8 = 1 << 2;
const F_CONNECTION_UPGRADE: u8 = 1 << 3;
const F_TRAILING: u8 = 1 << 4;
const F_UPGRADE: u8 = 1 << 5;
const F_SKIPBODY: u8 = 1 << 6;
const F_CONTENTLENGTH: u8 = 1 << 7;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Per-parser configuration.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Byte cap for the start line plus header block (default: 80 KiB).
    ///
    /// Protects against a peer that trickles an endless header section.
    pub max_header_size: u32,
    /// Accept header-value bytes outside the RFC set (default: `false`).
    pub lenient_headers: bool,
    /// Accept `Content-Length` together with `Transfer-Encoding: chunked`
    /// (default: `false`).
    pub allow_chunked_length: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_header_size: 80 * 1024,
            lenient_headers: false,
            allow_chunked_length: false,
        }
    }
}

/// What a parser instance is prepared to accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Parse requests only.
    Request,
    /// Parse responses only.
    Response,
    /// Decide from the first byte of the message.
    Either,
}

// ---------------------------------------------------------------------------
// Callbacks
// ---------------------------------------------------------------------------

/// Directive returned by [`Handler::on_headers_complete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadersAction {
    /// Continue into the body as framed by the headers.
    Proceed,
    /// There is no body; used when a client knows it issued a HEAD request.
    SkipBody,
    /// There is no body and the remainder of the stream belongs to another
    /// protocol; used for responses to CONNECT.
    SkipBodyUpgrade,
    /// Abort parsing.
    Abort,
}

/// Snapshot of the parsed start line, handed to
/// [`Handler::on_headers_complete`].
#[derive(Debug, Clone)]
pub struct MessageHead {
    /// [`MessageKind::Request`] or [`MessageKind::Response`]; never
    /// [`MessageKind::Either`].
    pub kind: MessageKind,
    /// The request method, for requests.
    pub method: Option<Method>,
    /// The status code, for responses.
    pub status_code: Option<u16>,
    /// HTTP major version digit.
    pub major: u8,
    /// HTTP minor version digit.
    pub minor: u8,
    /// Whether the message requests a protocol upgrade handoff.
    pub upgrade: bool,
    /// Whether the connection can carry another message after this one.
    pub keep_alive: bool,
    /// Declared body length, when a `Content-Length` header was seen.
    pub content_length: Option<u64>,
}

/// Event sink driven by [`Parser::feed`].
///
/// Data callbacks receive byte runs borrowed from the caller's buffer and
/// may fire several times for one logical field, once per chunk boundary;
/// accumulate if you need the whole value. Returning `false` aborts the
/// message with the matching callback error.
///
/// All methods default to no-ops, so a handler only implements what it
/// observes. `()` implements `Handler` and ignores everything.
pub trait Handler {
    /// A new message has started.
    fn on_message_begin(&mut self) -> bool {
        true
    }

    /// A run of request-target bytes.
    fn on_url(&mut self, data: &[u8]) -> bool {
        let _ = data;
        true
    }

    /// A run of reason-phrase bytes.
    fn on_status(&mut self, data: &[u8]) -> bool {
        let _ = data;
        true
    }

    /// A run of header-name bytes.
    fn on_header_field(&mut self, data: &[u8]) -> bool {
        let _ = data;
        true
    }

    /// A run of header-value bytes.
    fn on_header_value(&mut self, data: &[u8]) -> bool {
        let _ = data;
        true
    }

    /// The blank line ending the header block was consumed.
    fn on_headers_complete(&mut self, head: &MessageHead) -> HeadersAction {
        let _ = head;
        HeadersAction::Proceed
    }

    /// A run of (decoded) body bytes.
    fn on_body(&mut self, data: &[u8]) -> bool {
        let _ = data;
        true
    }

    /// The message is complete.
    fn on_message_complete(&mut self) -> bool {
        true
    }

    /// A chunk-size line was consumed; `size` is the decoded chunk length
    /// (0 for the final chunk).
    fn on_chunk_header(&mut self, size: u64) -> bool {
        let _ = size;
        true
    }

    /// A chunk's data and trailing CRLF were consumed.
    fn on_chunk_complete(&mut self) -> bool {
        true
    }
}

impl Handler for () {}

// ---------------------------------------------------------------------------
// States
// ---------------------------------------------------------------------------

/// Main parser state.
///
/// Declaration order matters: every state up to and including
/// [`State::HeadersDone`] is a "header" state whose bytes count against
/// `max_header_size` (see [`State::is_parsing_header`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum State {
    /// Terminal state after a completed `Connection: close` message.
    Dead,

    StartReqOrRes,
    ResOrRespH,
    StartRes,
    ResH,
    ResHT,
    ResHTT,
    ResHTTP,
    ResHttpMajor,
    ResHttpDot,
    ResHttpMinor,
    ResHttpEnd,
    ResFirstStatusCode,
    ResStatusCode,
    ResStatusStart,
    ResStatus,
    ResLineAlmostDone,

    StartReq,

    ReqMethod,
    ReqSpacesBeforeUrl,
    ReqSchema,
    ReqSchemaSlash,
    ReqSchemaSlashSlash,
    ReqServerStart,
    ReqServer,
    ReqServerWithAt,
    ReqPath,
    ReqQueryStringStart,
    ReqQueryString,
    ReqFragmentStart,
    ReqFragment,
    ReqHttpStart,
    ReqHttpH,
    ReqHttpHT,
    ReqHttpHTT,
    ReqHttpHTTP,
    ReqHttpI,
    ReqHttpIC,
    ReqHttpMajor,
    ReqHttpDot,
    ReqHttpMinor,
    ReqHttpEnd,
    ReqLineAlmostDone,

    HeaderFieldStart,
    HeaderField,
    HeaderValueDiscardWs,
    HeaderValueDiscardWsAlmostDone,
    HeaderValueDiscardLws,
    HeaderValueStart,
    HeaderValue,
    HeaderValueLws,

    HeaderAlmostDone,

    ChunkSizeStart,
    ChunkSize,
    ChunkParameters,
    ChunkSizeAlmostDone,

    HeadersAlmostDone,
    HeadersDone,

    ChunkData,
    ChunkDataAlmostDone,
    ChunkDataDone,

    BodyIdentity,
    BodyIdentityEof,

    MessageDone,
}

impl State {
    #[inline]
    fn is_parsing_header(self) -> bool {
        self <= State::HeadersDone
    }
}

/// Header keyword recognizer state, nested inside [`State::HeaderField`] /
/// [`State::HeaderValue`].
///
/// Walks prefixes of the framing-relevant header names and values so a
/// header can be classified without buffering it first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderState {
    General,
    C,
    CO,
    CON,

    MatchingConnection,
    MatchingProxyConnection,
    MatchingContentLength,
    MatchingTransferEncoding,
    MatchingUpgrade,

    Connection,
    ContentLength,
    ContentLengthNum,
    ContentLengthWs,
    TransferEncoding,
    Upgrade,

    MatchingTransferEncodingTokenStart,
    MatchingTransferEncodingChunked,
    MatchingTransferEncodingToken,

    MatchingConnectionTokenStart,
    MatchingConnectionKeepAlive,
    MatchingConnectionClose,
    MatchingConnectionUpgrade,
    MatchingConnectionToken,

    TransferEncodingChunked,
    ConnectionKeepAlive,
    ConnectionClose,
    ConnectionUpgrade,
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// The streaming HTTP/1.x message state machine.
///
/// The parser owns no buffers: field data is surfaced through [`Handler`]
/// callbacks as slices into the caller's input, so it can be fed input in
/// arbitrarily small fragments without re-buffering. One instance parses one
/// message at a time and can be reused for the next message on the same
/// connection.
///
/// For the common "give me the whole message as an owned value" case, see
/// [`DocumentParser`](crate::DocumentParser).
pub struct Parser {
    kind: MessageKind,
    ty: MessageKind,
    config: ParserConfig,

    state: State,
    header_state: HeaderState,
    index: u32,
    flags: u8,
    uses_transfer_encoding: bool,
    nread: u32,
    content_length: u64,

    http_major: u8,
    http_minor: u8,
    status_code: u16,
    method: Method,
    upgrade: bool,
    errno: Option<ParseError>,
}

impl Parser {
    /// Create a parser for the given message kind with default limits.
    pub fn new(kind: MessageKind) -> Self {
        Self::with_config(kind, ParserConfig::default())
    }

    /// Create a parser with explicit configuration.
    pub fn with_config(kind: MessageKind, config: ParserConfig) -> Self {
        let mut parser = Self {
            kind,
            ty: kind,
            config,
            state: State::StartReqOrRes,
            header_state: HeaderState::General,
            index: 0,
            flags: 0,
            uses_transfer_encoding: false,
            nread: 0,
            content_length: UNSET,
            http_major: 0,
            http_minor: 0,
            status_code: 0,
            method: Method::GET,
            upgrade: false,
            errno: None,
        };
        parser.reset();
        parser
    }

    /// Re-initialize, preserving the declared kind and configuration.
    pub fn reset(&mut self) {
        self.ty = self.kind;
        self.state = match self.kind {
            MessageKind::Request => State::StartReq,
            MessageKind::Response => State::StartRes,
            MessageKind::Either => State::StartReqOrRes,
        };
        self.header_state = HeaderState::General;
        self.index = 0;
        self.flags = 0;
        self.uses_transfer_encoding = false;
        self.nread = 0;
        self.content_length = UNSET;
        self.http_major = 0;
        self.http_minor = 0;
        self.status_code = 0;
        self.method = Method::GET;
        self.upgrade = false;
        self.errno = None;
    }

    /// The latched error, if parsing has failed (or is paused).
    pub fn error(&self) -> Option<ParseError> {
        self.errno
    }

    /// Clear a latched callback-stop so parsing can continue. Used by the
    /// document driver, which aborts on purpose at message boundaries.
    pub(crate) fn clear_error(&mut self) {
        self.errno = None;
    }

    /// Suspend or resume the parser.
    ///
    /// While paused, [`feed`](Self::feed) consumes nothing and returns 0.
    /// Pausing a parser that is in a real error state is ignored.
    pub fn pause(&mut self, paused: bool) {
        if self.errno.is_none() || self.errno == Some(ParseError::Paused) {
            self.errno = if paused { Some(ParseError::Paused) } else { None };
        }
    }

    /// True once the final byte of the current message has been consumed.
    pub fn body_is_final(&self) -> bool {
        self.state == State::MessageDone
    }

    /// Whether the connection may carry another message after this one.
    ///
    /// HTTP/1.1: keep alive unless `Connection: close` was seen. HTTP/1.0
    /// and earlier: keep alive only with `Connection: keep-alive`. Either
    /// way, a message whose end is signalled by EOF cannot keep the
    /// connection alive.
    pub fn should_keep_alive(&self) -> bool {
        if self.http_major > 0 && self.http_minor > 0 {
            if self.flags & F_CONNECTION_CLOSE != 0 {
                return false;
            }
        } else if self.flags & F_CONNECTION_KEEP_ALIVE == 0 {
            return false;
        }
        !self.message_needs_eof()
    }

    /// True when the message requests a protocol handoff (Upgrade or
    /// CONNECT); everything past the header terminator belongs to the next
    /// protocol and must not be fed to this parser.
    pub fn upgrade(&self) -> bool {
        self.upgrade
    }

    /// Major version digit of the current message (0 until parsed).
    pub fn http_major(&self) -> u8 {
        self.http_major
    }

    /// Minor version digit of the current message.
    pub fn http_minor(&self) -> u8 {
        self.http_minor
    }

    /// The request method, once recognized.
    pub fn method(&self) -> Option<Method> {
        (self.ty == MessageKind::Request).then_some(self.method)
    }

    /// The response status code, once parsed.
    pub fn status_code(&self) -> Option<u16> {
        (self.ty == MessageKind::Response && self.status_code != 0).then_some(self.status_code)
    }

    /// Declared `Content-Length`, if one was seen.
    pub fn content_length(&self) -> Option<u64> {
        (self.content_length != UNSET).then_some(self.content_length)
    }

    /// Whether the current message uses chunked body framing.
    pub fn is_chunked(&self) -> bool {
        self.flags & F_CHUNKED != 0
    }

    /// Signal end of input.
    ///
    /// Completes a message framed by connection close; elsewhere it is
    /// either a no-op (terminal and start states) or latches
    /// [`ParseError::InvalidEofState`].
    pub fn feed_eof<H: Handler>(&mut self, handler: &mut H) {
        self.feed(&[], handler);
    }

    /// Does the current message need EOF to locate its end?
    fn message_needs_eof(&self) -> bool {
        if self.ty == MessageKind::Request {
            return false;
        }

        // See RFC 7230 section 3.3.3.
        if self.status_code / 100 == 1
            || self.status_code == 204
            || self.status_code == 304
            || self.flags & F_SKIPBODY != 0
        {
            return false;
        }

        if self.uses_transfer_encoding && self.flags & F_CHUNKED == 0 {
            return true;
        }

        if self.flags & F_CHUNKED != 0 || self.content_length != UNSET {
            return false;
        }

        true
    }

    fn start_state(&self) -> State {
        if self.ty == MessageKind::Request {
            State::StartReq
        } else {
            State::StartRes
        }
    }

    /// State to enter once a message completes. Strict builds refuse
    /// further messages on a connection that cannot be kept alive.
    fn new_message_state(&self) -> State {
        if STRICT && !self.should_keep_alive() {
            State::Dead
        } else {
            self.start_state()
        }
    }

    /// Count `n` header-block bytes against the configured cap.
    #[inline]
    fn add_header_bytes(&mut self, n: usize) -> bool {
        self.nread = self.nread.saturating_add(n as u32);
        if self.nread > self.config.max_header_size {
            self.errno = Some(ParseError::HeaderOverflow);
            return false;
        }
        true
    }

    /// Drive the state machine over `data`, invoking `handler` callbacks.
    ///
    /// Returns the number of bytes consumed. A short count means the parser
    /// stopped: either an error was latched (see [`error`](Self::error)),
    /// the parser is paused, or an upgrade handoff occurred (in which case
    /// the count points one byte past the header terminator and
    /// [`upgrade`](Self::upgrade) is `true`).
    ///
    /// After an error, further calls consume nothing until
    /// [`reset`](Self::reset).
    pub fn feed<H: Handler>(&mut self, data: &[u8], handler: &mut H) -> usize {
        let len = data.len();
        let lenient = self.config.lenient_headers;

        if self.errno.is_some() {
            return 0;
        }

        if len == 0 {
            match self.state {
                State::BodyIdentityEof => {
                    if !handler.on_message_complete() {
                        self.errno = Some(ParseError::MessageCompleteCallback);
                    }
                }
                State::Dead | State::StartReqOrRes | State::StartRes | State::StartReq => {}
                _ => {
                    self.errno = Some(ParseError::InvalidEofState);
                }
            }
            return 0;
        }

        // Marks track the start of the data run currently being walked, so
        // a single callback can cover many bytes. A run that continues past
        // the end of `data` is flushed below and re-marked at offset 0 by
        // the next feed.
        let mut header_field_mark = (self.state == State::HeaderField).then_some(0usize);
        let mut header_value_mark = (self.state == State::HeaderValue).then_some(0usize);
        let mut status_mark = (self.state == State::ResStatus).then_some(0usize);
        let mut body_mark: Option<usize> = None;
        let mut url_mark = matches!(
            self.state,
            State::ReqPath
                | State::ReqSchema
                | State::ReqSchemaSlash
                | State::ReqSchemaSlashSlash
                | State::ReqServerStart
                | State::ReqServer
                | State::ReqServerWithAt
                | State::ReqQueryStringStart
                | State::ReqQueryString
                | State::ReqFragmentStart
                | State::ReqFragment
        )
        .then_some(0usize);

        let mut i = 0usize;
        while i < len {
            let ch = data[i];

            if self.state.is_parsing_header() && !self.add_header_bytes(1) {
                return i;
            }

            // One pass of this loop handles one state for the byte at `i`.
            // `break` consumes the byte; `continue` re-runs the new state on
            // the same byte (the original's "reexecute").
            loop {
                match self.state {
                    // ============== START LINE DISPATCH ==============
                    State::Dead => {
                        // Seen after a 'Connection: close' message; anything
                        // but blank lines is a protocol violation.
                        if ch == b'\r' || ch == b'\n' {
                            break;
                        }
                        self.errno = Some(ParseError::ClosedConnection);
                        return i;
                    }

                    State::StartReqOrRes => {
                        if ch == b'\r' || ch == b'\n' {
                            break;
                        }
                        self.flags = 0;
                        self.uses_transfer_encoding = false;
                        self.content_length = UNSET;

                        if ch == b'H' {
                            self.state = State::ResOrRespH;
                            if !handler.on_message_begin() {
                                self.errno = Some(ParseError::MessageBeginCallback);
                                return i + 1;
                            }
                            break;
                        }
                        self.ty = MessageKind::Request;
                        self.state = State::StartReq;
                        continue;
                    }

                    State::ResOrRespH => {
                        if ch == b'T' {
                            self.ty = MessageKind::Response;
                            self.state = State::ResHT;
                        } else {
                            if ch != b'E' {
                                self.errno = Some(ParseError::InvalidConstant);
                                return i;
                            }
                            self.ty = MessageKind::Request;
                            self.method = Method::HEAD;
                            self.index = 2;
                            self.state = State::ReqMethod;
                        }
                        break;
                    }

                    // ============== RESPONSE LINE ==============
                    State::StartRes => {
                        if ch == b'\r' || ch == b'\n' {
                            break;
                        }
                        self.flags = 0;
                        self.uses_transfer_encoding = false;
                        self.content_length = UNSET;

                        if ch != b'H' {
                            self.errno = Some(ParseError::InvalidConstant);
                            return i;
                        }
                        self.state = State::ResH;
                        if !handler.on_message_begin() {
                            self.errno = Some(ParseError::MessageBeginCallback);
                            return i + 1;
                        }
                        break;
                    }

                    State::ResH => {
                        if STRICT && ch != b'T' {
                            self.errno = Some(ParseError::Strict);
                            return i;
                        }
                        self.state = State::ResHT;
                        break;
                    }

                    State::ResHT => {
                        if STRICT && ch != b'T' {
                            self.errno = Some(ParseError::Strict);
                            return i;
                        }
                        self.state = State::ResHTT;
                        break;
                    }

                    State::ResHTT => {
                        if STRICT && ch != b'P' {
                            self.errno = Some(ParseError::Strict);
                            return i;
                        }
                        self.state = State::ResHTTP;
                        break;
                    }

                    State::ResHTTP => {
                        if STRICT && ch != b'/' {
                            self.errno = Some(ParseError::Strict);
                            return i;
                        }
                        self.state = State::ResHttpMajor;
                        break;
                    }

                    State::ResHttpMajor => {
                        if !chars::is_num(ch) {
                            self.errno = Some(ParseError::InvalidVersion);
                            return i;
                        }
                        self.http_major = ch - b'0';
                        self.state = State::ResHttpDot;
                        break;
                    }

                    State::ResHttpDot => {
                        if ch != b'.' {
                            self.errno = Some(ParseError::InvalidVersion);
                            return i;
                        }
                        self.state = State::ResHttpMinor;
                        break;
                    }

                    State::ResHttpMinor => {
                        if !chars::is_num(ch) {
                            self.errno = Some(ParseError::InvalidVersion);
                            return i;
                        }
                        self.http_minor = ch - b'0';
                        self.state = State::ResHttpEnd;
                        break;
                    }

                    State::ResHttpEnd => {
                        if ch != b' ' {
                            self.errno = Some(ParseError::InvalidVersion);
                            return i;
                        }
                        self.state = State::ResFirstStatusCode;
                        break;
                    }

                    State::ResFirstStatusCode => {
                        if !chars::is_num(ch) {
                            if ch == b' ' {
                                // extra spaces before the code are tolerated
                                break;
                            }
                            self.errno = Some(ParseError::InvalidStatus);
                            return i;
                        }
                        self.status_code = (ch - b'0') as u16;
                        self.state = State::ResStatusCode;
                        break;
                    }

                    State::ResStatusCode => {
                        if !chars::is_num(ch) {
                            match ch {
                                b' ' => {
                                    self.state = State::ResStatusStart;
                                    break;
                                }
                                b'\r' | b'\n' => {
                                    self.state = State::ResStatusStart;
                                    continue;
                                }
                                _ => {
                                    self.errno = Some(ParseError::InvalidStatus);
                                    return i;
                                }
                            }
                        }
                        self.status_code = self.status_code * 10 + (ch - b'0') as u16;
                        if self.status_code > 999 {
                            self.errno = Some(ParseError::InvalidStatus);
                            return i;
                        }
                        break;
                    }

                    State::ResStatusStart => {
                        if status_mark.is_none() {
                            status_mark = Some(i);
                        }
                        self.state = State::ResStatus;
                        self.index = 0;
                        if ch == b'\r' || ch == b'\n' {
                            continue;
                        }
                        break;
                    }

                    State::ResStatus => {
                        if ch == b'\r' {
                            self.state = State::ResLineAlmostDone;
                            if let Some(mark) = status_mark.take() {
                                if !handler.on_status(&data[mark..i]) {
                                    self.errno = Some(ParseError::StatusCallback);
                                    return i + 1;
                                }
                            }
                            break;
                        }
                        if ch == b'\n' {
                            self.state = State::HeaderFieldStart;
                            if let Some(mark) = status_mark.take() {
                                if !handler.on_status(&data[mark..i]) {
                                    self.errno = Some(ParseError::StatusCallback);
                                    return i + 1;
                                }
                            }
                            break;
                        }
                        break;
                    }

                    State::ResLineAlmostDone => {
                        if STRICT && ch != b'\n' {
                            self.errno = Some(ParseError::Strict);
                            return i;
                        }
                        self.state = State::HeaderFieldStart;
                        break;
                    }

                    // ============== REQUEST LINE ==============
                    State::StartReq => {
                        if ch == b'\r' || ch == b'\n' {
                            break;
                        }
                        self.flags = 0;
                        self.uses_transfer_encoding = false;
                        self.content_length = UNSET;

                        if !chars::is_alpha(ch) {
                            self.errno = Some(ParseError::InvalidMethod);
                            return i;
                        }
                        self.method = match Method::from_first_byte(ch) {
                            Some(method) => method,
                            None => {
                                self.errno = Some(ParseError::InvalidMethod);
                                return i;
                            }
                        };
                        self.index = 1;
                        self.state = State::ReqMethod;
                        if !handler.on_message_begin() {
                            self.errno = Some(ParseError::MessageBeginCallback);
                            return i + 1;
                        }
                        break;
                    }

                    State::ReqMethod => {
                        if ch == 0 {
                            self.errno = Some(ParseError::InvalidMethod);
                            return i;
                        }
                        let matcher = self.method.as_str().as_bytes();
                        let idx = self.index as usize;
                        if ch == b' ' && idx == matcher.len() {
                            self.state = State::ReqSpacesBeforeUrl;
                        } else if idx < matcher.len() && ch == matcher[idx] {
                            // still on the literal
                        } else if ch.is_ascii_uppercase() || ch == b'-' {
                            match self.method.shift(self.index, ch) {
                                Some(method) => self.method = method,
                                None => {
                                    self.errno = Some(ParseError::InvalidMethod);
                                    return i;
                                }
                            }
                        } else {
                            self.errno = Some(ParseError::InvalidMethod);
                            return i;
                        }
                        self.index += 1;
                        break;
                    }

                    State::ReqSpacesBeforeUrl => {
                        if ch == b' ' {
                            break;
                        }
                        if url_mark.is_none() {
                            url_mark = Some(i);
                        }
                        if self.method == Method::CONNECT {
                            self.state = State::ReqServerStart;
                        }
                        self.state = url_step(self.state, ch);
                        if self.state == State::Dead {
                            self.errno = Some(ParseError::InvalidUrl);
                            return i;
                        }
                        break;
                    }

                    State::ReqSchema
                    | State::ReqSchemaSlash
                    | State::ReqSchemaSlashSlash
                    | State::ReqServerStart => {
                        match ch {
                            // no whitespace allowed here
                            b' ' | b'\r' | b'\n' => {
                                self.errno = Some(ParseError::InvalidUrl);
                                return i;
                            }
                            _ => {
                                self.state = url_step(self.state, ch);
                                if self.state == State::Dead {
                                    self.errno = Some(ParseError::InvalidUrl);
                                    return i;
                                }
                            }
                        }
                        break;
                    }

                    State::ReqServer
                    | State::ReqServerWithAt
                    | State::ReqPath
                    | State::ReqQueryStringStart
                    | State::ReqQueryString
                    | State::ReqFragmentStart
                    | State::ReqFragment => {
                        match ch {
                            b' ' => {
                                self.state = State::ReqHttpStart;
                                if let Some(mark) = url_mark.take() {
                                    if !handler.on_url(&data[mark..i]) {
                                        self.errno = Some(ParseError::UrlCallback);
                                        return i + 1;
                                    }
                                }
                            }
                            b'\r' | b'\n' => {
                                // request line ends without a version
                                self.http_major = 0;
                                self.http_minor = 9;
                                self.state = if ch == b'\r' {
                                    State::ReqLineAlmostDone
                                } else {
                                    State::HeaderFieldStart
                                };
                                if let Some(mark) = url_mark.take() {
                                    if !handler.on_url(&data[mark..i]) {
                                        self.errno = Some(ParseError::UrlCallback);
                                        return i + 1;
                                    }
                                }
                            }
                            _ => {
                                self.state = url_step(self.state, ch);
                                if self.state == State::Dead {
                                    self.errno = Some(ParseError::InvalidUrl);
                                    return i;
                                }
                            }
                        }
                        break;
                    }

                    State::ReqHttpStart => {
                        match ch {
                            b' ' => {}
                            b'H' => self.state = State::ReqHttpH,
                            b'I' if self.method == Method::SOURCE => {
                                self.state = State::ReqHttpI;
                            }
                            _ => {
                                self.errno = Some(ParseError::InvalidConstant);
                                return i;
                            }
                        }
                        break;
                    }

                    State::ReqHttpH => {
                        if STRICT && ch != b'T' {
                            self.errno = Some(ParseError::Strict);
                            return i;
                        }
                        self.state = State::ReqHttpHT;
                        break;
                    }

                    State::ReqHttpHT => {
                        if STRICT && ch != b'T' {
                            self.errno = Some(ParseError::Strict);
                            return i;
                        }
                        self.state = State::ReqHttpHTT;
                        break;
                    }

                    State::ReqHttpHTT => {
                        if STRICT && ch != b'P' {
                            self.errno = Some(ParseError::Strict);
                            return i;
                        }
                        self.state = State::ReqHttpHTTP;
                        break;
                    }

                    State::ReqHttpI => {
                        if STRICT && ch != b'C' {
                            self.errno = Some(ParseError::Strict);
                            return i;
                        }
                        self.state = State::ReqHttpIC;
                        break;
                    }

                    State::ReqHttpIC => {
                        if STRICT && ch != b'E' {
                            self.errno = Some(ParseError::Strict);
                            return i;
                        }
                        // "ICE/x.y" from a SOURCE client is treated as HTTP/x.y
                        self.state = State::ReqHttpHTTP;
                        break;
                    }

                    State::ReqHttpHTTP => {
                        if STRICT && ch != b'/' {
                            self.errno = Some(ParseError::Strict);
                            return i;
                        }
                        self.state = State::ReqHttpMajor;
                        break;
                    }

                    State::ReqHttpMajor => {
                        if !chars::is_num(ch) {
                            self.errno = Some(ParseError::InvalidVersion);
                            return i;
                        }
                        self.http_major = ch - b'0';
                        self.state = State::ReqHttpDot;
                        break;
                    }

                    State::ReqHttpDot => {
                        if ch != b'.' {
                            self.errno = Some(ParseError::InvalidVersion);
                            return i;
                        }
                        self.state = State::ReqHttpMinor;
                        break;
                    }

                    State::ReqHttpMinor => {
                        if !chars::is_num(ch) {
                            self.errno = Some(ParseError::InvalidVersion);
                            return i;
                        }
                        self.http_minor = ch - b'0';
                        self.state = State::ReqHttpEnd;
                        break;
                    }

                    State::ReqHttpEnd => {
                        if ch == b'\r' {
                            self.state = State::ReqLineAlmostDone;
                            break;
                        }
                        if ch == b'\n' {
                            self.state = State::HeaderFieldStart;
                            break;
                        }
                        self.errno = Some(ParseError::InvalidVersion);
                        return i;
                    }

                    State::ReqLineAlmostDone => {
                        if ch != b'\n' {
                            self.errno = Some(ParseError::LfExpected);
                            return i;
                        }
                        self.state = State::HeaderFieldStart;
                        break;
                    }

                    // ============== HEADER BLOCK ==============
                    State::HeaderFieldStart => {
                        if ch == b'\r' {
                            self.state = State::HeadersAlmostDone;
                            break;
                        }
                        if ch == b'\n' {
                            // bare LF can be the second newline ending the block
                            self.state = State::HeadersAlmostDone;
                            continue;
                        }
                        let c = chars::token(ch);
                        if c == 0 {
                            self.errno = Some(ParseError::InvalidHeaderToken);
                            return i;
                        }
                        if header_field_mark.is_none() {
                            header_field_mark = Some(i);
                        }
                        self.index = 0;
                        self.state = State::HeaderField;
                        self.header_state = match c {
                            b'c' => HeaderState::C,
                            b'p' => HeaderState::MatchingProxyConnection,
                            b't' => HeaderState::MatchingTransferEncoding,
                            b'u' => HeaderState::MatchingUpgrade,
                            _ => HeaderState::General,
                        };
                        break;
                    }

                    State::HeaderField => {
                        let start = i;
                        while i < len {
                            let b = data[i];
                            let c = chars::token(b);
                            if c == 0 {
                                break;
                            }
                            match self.header_state {
                                HeaderState::General => {
                                    // bulk-advance across ordinary name bytes
                                    let end =
                                        i + (len - i).min(self.config.max_header_size as usize);
                                    while i + 1 < end && chars::token(data[i + 1]) != 0 {
                                        i += 1;
                                    }
                                }
                                HeaderState::C => {
                                    self.index += 1;
                                    self.header_state = if c == b'o' {
                                        HeaderState::CO
                                    } else {
                                        HeaderState::General
                                    };
                                }
                                HeaderState::CO => {
                                    self.index += 1;
                                    self.header_state = if c == b'n' {
                                        HeaderState::CON
                                    } else {
                                        HeaderState::General
                                    };
                                }
                                HeaderState::CON => {
                                    self.index += 1;
                                    self.header_state = match c {
                                        b'n' => HeaderState::MatchingConnection,
                                        b't' => HeaderState::MatchingContentLength,
                                        _ => HeaderState::General,
                                    };
                                }
                                HeaderState::MatchingConnection => {
                                    self.index += 1;
                                    let lit = b"connection";
                                    let idx = self.index as usize;
                                    if idx >= lit.len() || c != lit[idx] {
                                        self.header_state = HeaderState::General;
                                    } else if idx == lit.len() - 1 {
                                        self.header_state = HeaderState::Connection;
                                    }
                                }
                                HeaderState::MatchingProxyConnection => {
                                    self.index += 1;
                                    let lit = b"proxy-connection";
                                    let idx = self.index as usize;
                                    if idx >= lit.len() || c != lit[idx] {
                                        self.header_state = HeaderState::General;
                                    } else if idx == lit.len() - 1 {
                                        self.header_state = HeaderState::Connection;
                                    }
                                }
                                HeaderState::MatchingContentLength => {
                                    self.index += 1;
                                    let lit = b"content-length";
                                    let idx = self.index as usize;
                                    if idx >= lit.len() || c != lit[idx] {
                                        self.header_state = HeaderState::General;
                                    } else if idx == lit.len() - 1 {
                                        self.header_state = HeaderState::ContentLength;
                                    }
                                }
                                HeaderState::MatchingTransferEncoding => {
                                    self.index += 1;
                                    let lit = b"transfer-encoding";
                                    let idx = self.index as usize;
                                    if idx >= lit.len() || c != lit[idx] {
                                        self.header_state = HeaderState::General;
                                    } else if idx == lit.len() - 1 {
                                        self.header_state = HeaderState::TransferEncoding;
                                        self.uses_transfer_encoding = true;
                                    }
                                }
                                HeaderState::MatchingUpgrade => {
                                    self.index += 1;
                                    let lit = b"upgrade";
                                    let idx = self.index as usize;
                                    if idx >= lit.len() || c != lit[idx] {
                                        self.header_state = HeaderState::General;
                                    } else if idx == lit.len() - 1 {
                                        self.header_state = HeaderState::Upgrade;
                                    }
                                }
                                HeaderState::Connection
                                | HeaderState::ContentLength
                                | HeaderState::TransferEncoding
                                | HeaderState::Upgrade => {
                                    // a longer name ("Content-Lengths") is ordinary
                                    if b != b' ' {
                                        self.header_state = HeaderState::General;
                                    }
                                }
                                _ => {
                                    self.header_state = HeaderState::General;
                                }
                            }
                            i += 1;
                        }

                        if i == len {
                            i -= 1;
                            if !self.add_header_bytes(i - start) {
                                return i;
                            }
                            break;
                        }

                        if !self.add_header_bytes(i - start) {
                            return i;
                        }

                        if data[i] == b':' {
                            self.state = State::HeaderValueDiscardWs;
                            if let Some(mark) = header_field_mark.take() {
                                if !handler.on_header_field(&data[mark..i]) {
                                    self.errno = Some(ParseError::HeaderFieldCallback);
                                    return i + 1;
                                }
                            }
                            break;
                        }

                        self.errno = Some(ParseError::InvalidHeaderToken);
                        return i;
                    }

                    State::HeaderValueDiscardWs => {
                        if ch == b' ' || ch == b'\t' {
                            break;
                        }
                        if ch == b'\r' {
                            self.state = State::HeaderValueDiscardWsAlmostDone;
                            break;
                        }
                        if ch == b'\n' {
                            self.state = State::HeaderValueDiscardLws;
                            break;
                        }
                        self.state = State::HeaderValueStart;
                        continue;
                    }

                    State::HeaderValueStart => {
                        if header_value_mark.is_none() {
                            header_value_mark = Some(i);
                        }
                        self.state = State::HeaderValue;
                        self.index = 0;
                        let c = chars::lower(ch);

                        match self.header_state {
                            HeaderState::Upgrade => {
                                self.flags |= F_UPGRADE;
                                self.header_state = HeaderState::General;
                            }
                            HeaderState::TransferEncoding => {
                                self.header_state = if c == b'c' {
                                    HeaderState::MatchingTransferEncodingChunked
                                } else {
                                    HeaderState::MatchingTransferEncodingToken
                                };
                            }
                            // multi-value Transfer-Encoding header
                            HeaderState::MatchingTransferEncodingTokenStart => {}
                            HeaderState::ContentLength => {
                                if !chars::is_num(ch) {
                                    self.errno = Some(ParseError::InvalidContentLength);
                                    return i;
                                }
                                if self.flags & F_CONTENTLENGTH != 0 {
                                    self.errno = Some(ParseError::UnexpectedContentLength);
                                    return i;
                                }
                                self.flags |= F_CONTENTLENGTH;
                                self.content_length = (ch - b'0') as u64;
                                self.header_state = HeaderState::ContentLengthNum;
                            }
                            // obsolete line folding inside a content-length value
                            HeaderState::ContentLengthWs => {}
                            HeaderState::Connection => {
                                self.header_state = match c {
                                    b'k' => HeaderState::MatchingConnectionKeepAlive,
                                    b'c' => HeaderState::MatchingConnectionClose,
                                    b'u' => HeaderState::MatchingConnectionUpgrade,
                                    _ => HeaderState::MatchingConnectionToken,
                                };
                            }
                            // multi-value Connection header
                            HeaderState::MatchingConnectionTokenStart => {}
                            _ => self.header_state = HeaderState::General,
                        }
                        break;
                    }

                    State::HeaderValue => {
                        let start = i;
                        let mut h = self.header_state;
                        let mut seen_cr = false;
                        let mut reexecute = false;

                        while i < len {
                            let b = data[i];

                            if b == b'\r' {
                                self.state = State::HeaderAlmostDone;
                                self.header_state = h;
                                if let Some(mark) = header_value_mark.take() {
                                    if !handler.on_header_value(&data[mark..i]) {
                                        self.errno = Some(ParseError::HeaderValueCallback);
                                        return i + 1;
                                    }
                                }
                                seen_cr = true;
                                break;
                            }

                            if b == b'\n' {
                                self.state = State::HeaderAlmostDone;
                                if !self.add_header_bytes(i - start) {
                                    return i;
                                }
                                self.header_state = h;
                                if let Some(mark) = header_value_mark.take() {
                                    if !handler.on_header_value(&data[mark..i]) {
                                        self.errno = Some(ParseError::HeaderValueCallback);
                                        return i;
                                    }
                                }
                                reexecute = true;
                                break;
                            }

                            if !lenient && !chars::is_header_value_char(b) {
                                self.errno = Some(ParseError::InvalidHeaderToken);
                                return i;
                            }

                            let c = chars::lower(b);

                            match h {
                                HeaderState::General => {
                                    // bulk-advance until something interesting
                                    let end =
                                        i + (len - i).min(self.config.max_header_size as usize);
                                    while i < end {
                                        let bb = data[i];
                                        if bb == b'\r' || bb == b'\n' {
                                            i -= 1;
                                            break;
                                        }
                                        if !lenient && !chars::is_header_value_char(bb) {
                                            self.errno = Some(ParseError::InvalidHeaderToken);
                                            return i;
                                        }
                                        i += 1;
                                    }
                                    if i == len {
                                        i -= 1;
                                    }
                                }

                                HeaderState::ContentLength | HeaderState::ContentLengthNum
                                    if !(h == HeaderState::ContentLength && b == b' ') =>
                                {
                                    h = HeaderState::ContentLengthNum;
                                    if b == b' ' {
                                        h = HeaderState::ContentLengthWs;
                                    } else if !chars::is_num(b) {
                                        self.header_state = h;
                                        self.errno = Some(ParseError::InvalidContentLength);
                                        return i;
                                    } else {
                                        // conservative overflow guard before the multiply
                                        if (u64::MAX - 10) / 10 < self.content_length {
                                            self.header_state = h;
                                            self.errno = Some(ParseError::InvalidContentLength);
                                            return i;
                                        }
                                        self.content_length =
                                            self.content_length * 10 + (b - b'0') as u64;
                                    }
                                }
                                HeaderState::ContentLength => {
                                    // leading space inside the value, keep looking
                                }

                                HeaderState::ContentLengthWs => {
                                    if b != b' ' {
                                        self.header_state = h;
                                        self.errno = Some(ParseError::InvalidContentLength);
                                        return i;
                                    }
                                }

                                HeaderState::MatchingTransferEncodingTokenStart => {
                                    if c == b'c' {
                                        h = HeaderState::MatchingTransferEncodingChunked;
                                    } else if chars::strict_token(c) != 0 {
                                        // the token state below deliberately does
                                        // not apply this classification
                                        h = HeaderState::MatchingTransferEncodingToken;
                                    } else if c == b' ' || c == b'\t' {
                                        // skip lws
                                    } else {
                                        h = HeaderState::General;
                                    }
                                }

                                HeaderState::MatchingTransferEncodingChunked => {
                                    self.index += 1;
                                    let lit = b"chunked";
                                    let idx = self.index as usize;
                                    if idx >= lit.len() || c != lit[idx] {
                                        h = HeaderState::MatchingTransferEncodingToken;
                                    } else if idx == lit.len() - 1 {
                                        h = HeaderState::TransferEncodingChunked;
                                    }
                                }

                                HeaderState::MatchingTransferEncodingToken => {
                                    if b == b',' {
                                        h = HeaderState::MatchingTransferEncodingTokenStart;
                                        self.index = 0;
                                    }
                                }

                                HeaderState::MatchingConnectionTokenStart => {
                                    if c == b'k' {
                                        h = HeaderState::MatchingConnectionKeepAlive;
                                    } else if c == b'c' {
                                        h = HeaderState::MatchingConnectionClose;
                                    } else if c == b'u' {
                                        h = HeaderState::MatchingConnectionUpgrade;
                                    } else if chars::strict_token(c) != 0 {
                                        h = HeaderState::MatchingConnectionToken;
                                    } else if c == b' ' || c == b'\t' {
                                        // skip lws
                                    } else {
                                        h = HeaderState::General;
                                    }
                                }

                                HeaderState::MatchingConnectionKeepAlive => {
                                    self.index += 1;
                                    let lit = b"keep-alive";
                                    let idx = self.index as usize;
                                    if idx >= lit.len() || c != lit[idx] {
                                        h = HeaderState::MatchingConnectionToken;
                                    } else if idx == lit.len() - 1 {
                                        h = HeaderState::ConnectionKeepAlive;
                                    }
                                }

                                HeaderState::MatchingConnectionClose => {
                                    self.index += 1;
                                    let lit = b"close";
                                    let idx = self.index as usize;
                                    if idx >= lit.len() || c != lit[idx] {
                                        h = HeaderState::MatchingConnectionToken;
                                    } else if idx == lit.len() - 1 {
                                        h = HeaderState::ConnectionClose;
                                    }
                                }

                                HeaderState::MatchingConnectionUpgrade => {
                                    self.index += 1;
                                    let lit = b"upgrade";
                                    let idx = self.index as usize;
                                    if idx >= lit.len() || c != lit[idx] {
                                        h = HeaderState::MatchingConnectionToken;
                                    } else if idx == lit.len() - 1 {
                                        h = HeaderState::ConnectionUpgrade;
                                    }
                                }

                                HeaderState::MatchingConnectionToken => {
                                    if b == b',' {
                                        h = HeaderState::MatchingConnectionTokenStart;
                                        self.index = 0;
                                    }
                                }

                                HeaderState::TransferEncodingChunked => {
                                    // only trailing space keeps the match alive
                                    if b != b' ' {
                                        h = HeaderState::MatchingTransferEncodingToken;
                                    }
                                }

                                HeaderState::ConnectionKeepAlive
                                | HeaderState::ConnectionClose
                                | HeaderState::ConnectionUpgrade => {
                                    if b == b',' {
                                        match h {
                                            HeaderState::ConnectionKeepAlive => {
                                                self.flags |= F_CONNECTION_KEEP_ALIVE;
                                            }
                                            HeaderState::ConnectionClose => {
                                                self.flags |= F_CONNECTION_CLOSE;
                                            }
                                            HeaderState::ConnectionUpgrade => {
                                                self.flags |= F_CONNECTION_UPGRADE;
                                            }
                                            _ => {}
                                        }
                                        h = HeaderState::MatchingConnectionTokenStart;
                                        self.index = 0;
                                    } else if b != b' ' {
                                        h = HeaderState::MatchingConnectionToken;
                                    }
                                }

                                _ => {
                                    h = HeaderState::General;
                                }
                            }
                            i += 1;
                        }

                        if reexecute {
                            continue;
                        }

                        self.header_state = h;

                        if seen_cr {
                            if !self.add_header_bytes(i - start) {
                                return i;
                            }
                            break;
                        }

                        // ran off the end of the buffer
                        i -= 1;
                        if !self.add_header_bytes(i - start) {
                            return i;
                        }
                        break;
                    }

                    State::HeaderAlmostDone => {
                        if ch != b'\n' {
                            self.errno = Some(ParseError::LfExpected);
                            return i;
                        }
                        self.state = State::HeaderValueLws;
                        break;
                    }

                    State::HeaderValueLws => {
                        if ch == b' ' || ch == b'\t' {
                            if self.header_state == HeaderState::ContentLengthNum {
                                // obsolete line folding acts as a space
                                self.header_state = HeaderState::ContentLengthWs;
                            }
                            self.state = State::HeaderValueStart;
                            continue;
                        }

                        // finished the header
                        match self.header_state {
                            HeaderState::ConnectionKeepAlive => {
                                self.flags |= F_CONNECTION_KEEP_ALIVE;
                            }
                            HeaderState::ConnectionClose => {
                                self.flags |= F_CONNECTION_CLOSE;
                            }
                            HeaderState::TransferEncodingChunked => {
                                self.flags |= F_CHUNKED;
                            }
                            HeaderState::ConnectionUpgrade => {
                                self.flags |= F_CONNECTION_UPGRADE;
                            }
                            _ => {}
                        }
                        self.state = State::HeaderFieldStart;
                        continue;
                    }

                    State::HeaderValueDiscardWsAlmostDone => {
                        if STRICT && ch != b'\n' {
                            self.errno = Some(ParseError::Strict);
                            return i;
                        }
                        self.state = State::HeaderValueDiscardLws;
                        break;
                    }

                    State::HeaderValueDiscardLws => {
                        if ch == b' ' || ch == b'\t' {
                            self.state = State::HeaderValueDiscardWs;
                            break;
                        }
                        match self.header_state {
                            HeaderState::ConnectionKeepAlive => {
                                self.flags |= F_CONNECTION_KEEP_ALIVE;
                            }
                            HeaderState::ConnectionClose => {
                                self.flags |= F_CONNECTION_CLOSE;
                            }
                            HeaderState::ConnectionUpgrade => {
                                self.flags |= F_CONNECTION_UPGRADE;
                            }
                            HeaderState::TransferEncodingChunked => {
                                self.flags |= F_CHUNKED;
                            }
                            HeaderState::ContentLength => {
                                // do not allow an empty content length
                                self.errno = Some(ParseError::InvalidContentLength);
                                return i;
                            }
                            _ => {}
                        }
                        // the header value was empty
                        self.state = State::HeaderFieldStart;
                        if !handler.on_header_value(&data[i..i]) {
                            self.errno = Some(ParseError::HeaderValueCallback);
                            return i;
                        }
                        continue;
                    }

                    // ============== END OF HEADERS ==============
                    State::HeadersAlmostDone => {
                        if STRICT && ch != b'\n' {
                            self.errno = Some(ParseError::Strict);
                            return i;
                        }

                        if self.flags & F_TRAILING != 0 {
                            // end of a chunked message
                            self.state = State::MessageDone;
                            if !handler.on_chunk_complete() {
                                self.errno = Some(ParseError::ChunkCompleteCallback);
                                return i;
                            }
                            continue;
                        }

                        // Transfer-Encoding and Content-Length together cannot
                        // frame a message (RFC 7230 section 3.3.3)
                        if self.uses_transfer_encoding && self.flags & F_CONTENTLENGTH != 0 {
                            if self.flags & F_CHUNKED != 0 {
                                if !self.config.allow_chunked_length {
                                    self.errno = Some(ParseError::UnexpectedContentLength);
                                    return i;
                                }
                            } else if !lenient {
                                self.errno = Some(ParseError::UnexpectedContentLength);
                                return i;
                            }
                        }

                        self.state = State::HeadersDone;

                        // For responses, upgrade headers are binding only on a
                        // 101; elsewhere they merely announce support.
                        if self.flags & F_UPGRADE != 0 && self.flags & F_CONNECTION_UPGRADE != 0 {
                            self.upgrade =
                                self.ty == MessageKind::Request || self.status_code == 101;
                        } else {
                            self.upgrade = self.method == Method::CONNECT
                                && self.ty == MessageKind::Request;
                        }

                        let head = self.message_head();
                        match handler.on_headers_complete(&head) {
                            HeadersAction::Proceed => {}
                            HeadersAction::SkipBody => self.flags |= F_SKIPBODY,
                            HeadersAction::SkipBodyUpgrade => {
                                self.upgrade = true;
                                self.flags |= F_SKIPBODY;
                            }
                            HeadersAction::Abort => {
                                self.errno = Some(ParseError::HeadersCompleteCallback);
                                return i;
                            }
                        }
                        continue;
                    }

                    State::HeadersDone => {
                        if STRICT && ch != b'\n' {
                            self.errno = Some(ParseError::Strict);
                            return i;
                        }
                        self.nread = 0;

                        let has_body = self.flags & F_CHUNKED != 0
                            || (self.content_length > 0 && self.content_length != UNSET);
                        if self.upgrade
                            && ((self.method == Method::CONNECT && self.ty == MessageKind::Request)
                                || self.flags & F_SKIPBODY != 0
                                || !has_body)
                        {
                            // the rest of the stream is another protocol
                            self.state = self.new_message_state();
                            if !handler.on_message_complete() {
                                self.errno = Some(ParseError::MessageCompleteCallback);
                            }
                            return i + 1;
                        }

                        if self.flags & F_SKIPBODY != 0 {
                            self.state = self.new_message_state();
                            if !handler.on_message_complete() {
                                self.errno = Some(ParseError::MessageCompleteCallback);
                                return i + 1;
                            }
                        } else if self.flags & F_CHUNKED != 0 {
                            // chunked framing wins over any Content-Length
                            self.state = State::ChunkSizeStart;
                        } else if self.uses_transfer_encoding {
                            if self.ty == MessageKind::Request && !lenient {
                                // a request with a non-chunked final coding has
                                // no determinable length (RFC 7230 3.3.3)
                                self.errno = Some(ParseError::InvalidTransferEncoding);
                                return i;
                            }
                            // for responses, read until the connection closes
                            self.state = State::BodyIdentityEof;
                        } else if self.content_length == 0 {
                            self.state = self.new_message_state();
                            if !handler.on_message_complete() {
                                self.errno = Some(ParseError::MessageCompleteCallback);
                                return i + 1;
                            }
                        } else if self.content_length != UNSET {
                            self.state = State::BodyIdentity;
                        } else if !self.message_needs_eof() {
                            // assume content-length 0, read the next message
                            self.state = self.new_message_state();
                            if !handler.on_message_complete() {
                                self.errno = Some(ParseError::MessageCompleteCallback);
                                return i + 1;
                            }
                        } else {
                            self.state = State::BodyIdentityEof;
                        }
                        break;
                    }

                    // ============== BODY ==============
                    State::BodyIdentity => {
                        let to_read = self.content_length.min((len - i) as u64) as usize;
                        if body_mark.is_none() {
                            body_mark = Some(i);
                        }
                        self.content_length -= to_read as u64;
                        i += to_read - 1;

                        if self.content_length == 0 {
                            self.state = State::MessageDone;
                            // deliver the final byte along with this run so
                            // completion is observed on the length boundary,
                            // not on the next feed
                            if let Some(mark) = body_mark.take() {
                                if !handler.on_body(&data[mark..i + 1]) {
                                    self.errno = Some(ParseError::BodyCallback);
                                    return i;
                                }
                            }
                            continue;
                        }
                        break;
                    }

                    State::BodyIdentityEof => {
                        if body_mark.is_none() {
                            body_mark = Some(i);
                        }
                        i = len - 1;
                        break;
                    }

                    State::MessageDone => {
                        self.state = self.new_message_state();
                        if !handler.on_message_complete() {
                            self.errno = Some(ParseError::MessageCompleteCallback);
                            return i + 1;
                        }
                        if self.upgrade {
                            // everything after this byte is another protocol
                            return i + 1;
                        }
                        break;
                    }

                    // ============== CHUNKED FRAMING ==============
                    State::ChunkSizeStart => {
                        let v = chars::unhex(ch);
                        if v == -1 {
                            self.errno = Some(ParseError::InvalidChunkSize);
                            return i;
                        }
                        self.content_length = v as u64;
                        self.state = State::ChunkSize;
                        break;
                    }

                    State::ChunkSize => {
                        if ch == b'\r' {
                            self.state = State::ChunkSizeAlmostDone;
                            break;
                        }
                        let v = chars::unhex(ch);
                        if v == -1 {
                            if ch == b';' || ch == b' ' {
                                self.state = State::ChunkParameters;
                                break;
                            }
                            self.errno = Some(ParseError::InvalidChunkSize);
                            return i;
                        }
                        // same conservative guard as content-length
                        if (u64::MAX - 16) / 16 < self.content_length {
                            self.errno = Some(ParseError::InvalidContentLength);
                            return i;
                        }
                        self.content_length = self.content_length * 16 + v as u64;
                        break;
                    }

                    State::ChunkParameters => {
                        // chunk extensions are recognized but ignored
                        if ch == b'\r' {
                            self.state = State::ChunkSizeAlmostDone;
                        }
                        break;
                    }

                    State::ChunkSizeAlmostDone => {
                        if STRICT && ch != b'\n' {
                            self.errno = Some(ParseError::Strict);
                            return i;
                        }
                        self.nread = 0;

                        let size = self.content_length;
                        if size == 0 {
                            // last chunk; trailers reuse the header block states
                            self.flags |= F_TRAILING;
                            self.state = State::HeaderFieldStart;
                        } else {
                            self.state = State::ChunkData;
                        }
                        if !handler.on_chunk_header(size) {
                            self.errno = Some(ParseError::ChunkHeaderCallback);
                            return i + 1;
                        }
                        break;
                    }

                    State::ChunkData => {
                        let to_read = self.content_length.min((len - i) as u64) as usize;
                        if body_mark.is_none() {
                            body_mark = Some(i);
                        }
                        self.content_length -= to_read as u64;
                        i += to_read - 1;
                        if self.content_length == 0 {
                            self.state = State::ChunkDataAlmostDone;
                        }
                        break;
                    }

                    State::ChunkDataAlmostDone => {
                        if STRICT && ch != b'\r' {
                            self.errno = Some(ParseError::Strict);
                            return i;
                        }
                        self.state = State::ChunkDataDone;
                        if let Some(mark) = body_mark.take() {
                            if !handler.on_body(&data[mark..i]) {
                                self.errno = Some(ParseError::BodyCallback);
                                return i + 1;
                            }
                        }
                        break;
                    }

                    State::ChunkDataDone => {
                        if STRICT && ch != b'\n' {
                            self.errno = Some(ParseError::Strict);
                            return i;
                        }
                        self.nread = 0;
                        self.state = State::ChunkSizeStart;
                        if !handler.on_chunk_complete() {
                            self.errno = Some(ParseError::ChunkCompleteCallback);
                            return i + 1;
                        }
                        break;
                    }
                }
            }
            i += 1;
        }

        // Flush whichever single mark is still open; the run continues in
        // the next feed.
        if let Some(mark) = header_field_mark {
            if !handler.on_header_field(&data[mark..len]) {
                self.errno = Some(ParseError::HeaderFieldCallback);
                return len;
            }
        }
        if let Some(mark) = header_value_mark {
            if !handler.on_header_value(&data[mark..len]) {
                self.errno = Some(ParseError::HeaderValueCallback);
                return len;
            }
        }
        if let Some(mark) = url_mark {
            if !handler.on_url(&data[mark..len]) {
                self.errno = Some(ParseError::UrlCallback);
                return len;
            }
        }
        if let Some(mark) = body_mark {
            if !handler.on_body(&data[mark..len]) {
                self.errno = Some(ParseError::BodyCallback);
                return len;
            }
        }
        if let Some(mark) = status_mark {
            if !handler.on_status(&data[mark..len]) {
                self.errno = Some(ParseError::StatusCallback);
                return len;
            }
        }

        len
    }

    fn message_head(&self) -> MessageHead {
        MessageHead {
            kind: self.ty,
            method: self.method(),
            status_code: (self.ty == MessageKind::Response).then_some(self.status_code),
            major: self.http_major,
            minor: self.http_minor,
            upgrade: self.upgrade,
            keep_alive: self.should_keep_alive(),
            content_length: self.content_length(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Handler that records every callback for assertions.
    #[derive(Default)]
    struct Recorder {
        url: Vec<u8>,
        status: Vec<u8>,
        fields: Vec<u8>,
        values: Vec<u8>,
        body: Vec<u8>,
        began: usize,
        completed: usize,
        chunks_completed: usize,
        headers_done: bool,
    }

    impl Handler for Recorder {
        fn on_message_begin(&mut self) -> bool {
            self.began += 1;
            true
        }
        fn on_url(&mut self, data: &[u8]) -> bool {
            self.url.extend_from_slice(data);
            true
        }
        fn on_status(&mut self, data: &[u8]) -> bool {
            self.status.extend_from_slice(data);
            true
        }
        fn on_header_field(&mut self, data: &[u8]) -> bool {
            self.fields.extend_from_slice(data);
            true
        }
        fn on_header_value(&mut self, data: &[u8]) -> bool {
            self.values.extend_from_slice(data);
            true
        }
        fn on_headers_complete(&mut self, _head: &MessageHead) -> HeadersAction {
            self.headers_done = true;
            HeadersAction::Proceed
        }
        fn on_body(&mut self, data: &[u8]) -> bool {
            self.body.extend_from_slice(data);
            true
        }
        fn on_message_complete(&mut self) -> bool {
            self.completed += 1;
            true
        }
        fn on_chunk_complete(&mut self) -> bool {
            self.chunks_completed += 1;
            true
        }
    }

    #[test]
    fn get_request_callbacks() {
        let raw = b"GET /uri/abc HTTP/1.1\r\nHost: h\r\n\r\n";
        let mut parser = Parser::new(MessageKind::Request);
        let mut rec = Recorder::default();
        assert_eq!(parser.feed(raw, &mut rec), raw.len());
        assert_eq!(parser.error(), None);
        assert_eq!(rec.began, 1);
        assert_eq!(rec.completed, 1);
        assert_eq!(rec.url, b"/uri/abc");
        assert_eq!(rec.fields, b"Host");
        assert_eq!(rec.values, b"h");
        assert!(rec.headers_done);
        assert_eq!(parser.http_major(), 1);
        assert_eq!(parser.http_minor(), 1);
        assert_eq!(parser.method(), Some(Method::GET));
    }

    #[test]
    fn byte_at_a_time_is_equivalent() {
        let raw = b"POST /p HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello";
        let mut parser = Parser::new(MessageKind::Request);
        let mut rec = Recorder::default();
        for &b in raw.iter() {
            assert_eq!(parser.feed(&[b], &mut rec), 1);
            assert_eq!(parser.error(), None);
        }
        assert_eq!(rec.body, b"hello");
        assert_eq!(rec.completed, 1);
        assert!(parser.body_is_final());
    }

    #[test]
    fn chunked_body_with_extension_and_trailer() {
        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n\
                    5;x=1\r\nhello\r\n0\r\nX-T: v\r\n\r\n";
        let mut parser = Parser::new(MessageKind::Response);
        let mut rec = Recorder::default();
        assert_eq!(parser.feed(raw, &mut rec), raw.len());
        assert_eq!(parser.error(), None);
        assert_eq!(rec.status, b"OK");
        assert_eq!(rec.body, b"hello");
        assert!(parser.is_chunked());
        assert_eq!(rec.chunks_completed, 2);
        assert_eq!(rec.completed, 1);
    }

    #[test]
    fn pause_and_resume() {
        let raw = b"GET / HTTP/1.1\r\nHost: h\r\n\r\n";
        let mut parser = Parser::new(MessageKind::Request);
        let mut rec = Recorder::default();
        parser.pause(true);
        assert_eq!(parser.feed(raw, &mut rec), 0);
        assert_eq!(parser.error(), Some(ParseError::Paused));
        parser.pause(false);
        assert_eq!(parser.feed(raw, &mut rec), raw.len());
        assert_eq!(rec.completed, 1);
    }

    #[test]
    fn error_latches_until_reset() {
        let raw = b"NONSENSE-METHOD / HTTP/1.1\r\n\r\n";
        let mut parser = Parser::new(MessageKind::Request);
        let mut rec = Recorder::default();
        let consumed = parser.feed(raw, &mut rec);
        assert!(consumed < raw.len());
        assert_eq!(parser.error(), Some(ParseError::InvalidMethod));
        assert_eq!(parser.feed(b"GET / HTTP/1.1\r\n\r\n", &mut rec), 0);
        parser.reset();
        assert_eq!(
            parser.feed(b"GET / HTTP/1.1\r\n\r\n", &mut rec),
            b"GET / HTTP/1.1\r\n\r\n".len()
        );
    }

    #[test]
    fn eof_in_headers_is_an_error() {
        let mut parser = Parser::new(MessageKind::Request);
        let mut rec = Recorder::default();
        parser.feed(b"GET / HTTP/1.1\r\nHos", &mut rec);
        parser.feed_eof(&mut rec);
        assert_eq!(parser.error(), Some(ParseError::InvalidEofState));
    }

    #[test]
    fn eof_completes_identity_eof_response() {
        let raw = b"HTTP/1.1 200 OK\r\n\r\nbody bytes";
        let mut parser = Parser::new(MessageKind::Response);
        let mut rec = Recorder::default();
        assert_eq!(parser.feed(raw, &mut rec), raw.len());
        assert_eq!(rec.completed, 0);
        parser.feed_eof(&mut rec);
        assert_eq!(parser.error(), None);
        assert_eq!(rec.completed, 1);
        assert_eq!(rec.body, b"body bytes");
    }

    #[test]
    fn connect_stops_after_headers() {
        let raw = b"CONNECT example.com:443 HTTP/1.1\r\nHost: example.com\r\n\r\nTLSTLS";
        let mut parser = Parser::new(MessageKind::Request);
        let mut rec = Recorder::default();
        let consumed = parser.feed(raw, &mut rec);
        assert!(parser.upgrade());
        assert_eq!(consumed, raw.len() - 6);
        assert_eq!(rec.completed, 1);
    }

    #[test]
    fn transfer_encoding_final_token_must_be_chunked() {
        // chunked followed by another coding clears the flag
        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked, gzip\r\n\r\n";
        let mut parser = Parser::new(MessageKind::Response);
        let mut rec = Recorder::default();
        parser.feed(raw, &mut rec);
        assert_eq!(parser.error(), None);
        assert!(!parser.is_chunked());
    }

    #[test]
    fn content_length_overflow_is_rejected() {
        let raw = b"POST / HTTP/1.1\r\nContent-Length: 99999999999999999999\r\n\r\n";
        let mut parser = Parser::new(MessageKind::Request);
        let mut rec = Recorder::default();
        parser.feed(raw, &mut rec);
        assert_eq!(parser.error(), Some(ParseError::InvalidContentLength));
    }

    #[test]
    fn header_overflow_is_bounded() {
        let mut parser = Parser::with_config(
            MessageKind::Request,
            ParserConfig {
                max_header_size: 32,
                ..ParserConfig::default()
            },
        );
        let mut rec = Recorder::default();
        let raw = b"GET / HTTP/1.1\r\nX-Padding: aaaaaaaaaaaaaaaaaaaaaaaa\r\n\r\n";
        let consumed = parser.feed(raw, &mut rec);
        assert!(consumed < raw.len());
        assert_eq!(parser.error(), Some(ParseError::HeaderOverflow));
    }
}
