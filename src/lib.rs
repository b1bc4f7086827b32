//! # wiregate
//!
//! A **streaming HTTP/1.x message parser and serializer**: requests,
//! responses, chunked bodies, HTTP/0.9 fallback, and the inverse wire-form
//! emission, for embedding in proxies, servers and clients.
//!
//! Input may arrive in arbitrarily small fragments; the state machine
//! resumes across feed boundaries without re-buffering and never allocates
//! on its own. Two surfaces are exposed:
//!
//! - [`Parser`] + [`Handler`] — the zero-copy core. Field data is delivered
//!   as byte runs borrowed from the caller's buffer.
//! - [`DocumentParser`] — owns the accumulation and hands back a
//!   [`Document`], which can be edited and serialized back to the wire.
//!
//! ## Quick start — one-shot parsing
//!
//! ```rust
//! use wiregate::parse_request;
//!
//! let raw = b"GET /hello HTTP/1.1\r\nHost: example.com\r\n\r\n";
//! let doc = parse_request(raw).expect("valid request");
//! assert_eq!(doc.method().unwrap().as_str(), "GET");
//! assert_eq!(doc.target(), "/hello");
//! ```
//!
//! ## Quick start — incremental parsing
//!
//! ```rust
//! use wiregate::DocumentParser;
//!
//! let mut session = DocumentParser::request();
//! session.feed(b"POST /upload HTTP/1.1\r\nContent-");
//! session.feed(b"Length: 5\r\n\r\nhello");
//! assert!(session.is_done());
//! assert_eq!(session.document().body_as_str(), Some("hello"));
//! ```
//!
//! ## Round trip
//!
//! ```rust
//! use wiregate::{parse_request, Document, Method};
//!
//! let mut doc = Document::request(Method::PUT, "/res");
//! doc.add_header("Content-Length", "2");
//! doc.body = b"ok".to_vec();
//! let wire = doc.to_bytes().unwrap();
//! assert_eq!(parse_request(&wire).unwrap(), doc);
//! ```

mod chars;
mod document;
mod driver;
mod error;
mod host;
mod method;
mod output;
mod parser;
mod status;
mod url;

pub use document::{Document, Header, StartLine};
pub use driver::DocumentParser;
pub use error::ParseError;
pub use method::{Method, METHODS};
pub use output::{format_debug, format_headers_only, format_json};
pub use parser::{Handler, HeadersAction, MessageHead, MessageKind, Parser, ParserConfig};
pub use status::reason_phrase;
pub use url::{parse_url, Url};

/// Library version digits.
pub const VERSION_MAJOR: u32 = 0;
/// Library version digits.
pub const VERSION_MINOR: u32 = 1;
/// Library version digits.
pub const VERSION_PATCH: u32 = 0;

/// The library version packed as `(major << 16) | (minor << 8) | patch`.
pub fn version() -> u32 {
    (VERSION_MAJOR << 16) | (VERSION_MINOR << 8) | VERSION_PATCH
}

/// Parse a **complete** request from a byte slice in one call.
///
/// A convenience wrapper around [`DocumentParser`]; for streaming input,
/// use that directly.
///
/// # Errors
///
/// Any parse error, or [`ParseError::InvalidEofState`] when the input ends
/// before the message does.
pub fn parse_request(data: &[u8]) -> Result<Document, ParseError> {
    let mut session = DocumentParser::request();
    session.feed(data);
    if let Some(e) = session.error() {
        return Err(e);
    }
    if !session.is_done() {
        return Err(ParseError::InvalidEofState);
    }
    Ok(session.into_document())
}

/// Parse a **complete** response from a byte slice in one call.
///
/// The end of input is treated as connection close, so identity-EOF framed
/// bodies (no `Content-Length`, no chunking) parse successfully.
///
/// # Errors
///
/// Any parse error, or [`ParseError::InvalidEofState`] when the input ends
/// before the message does.
pub fn parse_response(data: &[u8]) -> Result<Document, ParseError> {
    let mut session = DocumentParser::response();
    session.feed(data);
    if let Some(e) = session.error() {
        return Err(e);
    }
    if !session.is_done() {
        session.feed_eof();
    }
    if let Some(e) = session.error() {
        return Err(e);
    }
    if !session.is_done() {
        return Err(ParseError::InvalidEofState);
    }
    Ok(session.into_document())
}
