use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::method::Method;
use crate::status::reason_phrase;

/// A single header field. Name casing and insertion order are preserved
/// exactly as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    /// Header field name.
    pub name: String,
    /// Header field value.
    pub value: String,
}

/// What kind of message a document is, with the kind-specific datum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartLine {
    /// A request line; the target lives in
    /// [`Document::target_or_reason`].
    Request {
        /// The request method.
        method: Method,
    },
    /// A status line; the reason phrase lives in
    /// [`Document::target_or_reason`].
    Response {
        /// The status code.
        status: u16,
    },
}

/// A parsed (or hand-built) HTTP/1.x message.
///
/// The inverse of parsing: [`byte_size`](Self::byte_size) and
/// [`serialize`](Self::serialize) emit an equivalent wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// HTTP major version digit (default 1).
    pub major: u8,
    /// HTTP minor version digit (default 1).
    pub minor: u8,
    /// Request/response discriminant; `None` until known.
    pub start: Option<StartLine>,
    /// The request target, or the reason phrase for responses.
    pub target_or_reason: String,
    /// Ordered header list; duplicates preserved.
    pub headers: Vec<Header>,
    /// Body bytes. For chunked messages this is the decoded payload.
    pub body: Vec<u8>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document, versioned HTTP/1.1.
    pub fn new() -> Self {
        Self {
            major: 1,
            minor: 1,
            start: None,
            target_or_reason: String::new(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// A request document.
    pub fn request(method: Method, target: impl Into<String>) -> Self {
        Self {
            start: Some(StartLine::Request { method }),
            target_or_reason: target.into(),
            ..Self::new()
        }
    }

    /// A response document with the canonical reason phrase for `status`.
    pub fn response(status: u16) -> Self {
        Self::response_with_reason(status, reason_phrase(status).unwrap_or(""))
    }

    /// A response document with an explicit reason phrase.
    pub fn response_with_reason(status: u16, reason: impl Into<String>) -> Self {
        Self {
            start: Some(StartLine::Response { status }),
            target_or_reason: reason.into(),
            ..Self::new()
        }
    }

    /// Clear everything back to the freshly-constructed state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Is this a request document?
    pub fn is_request(&self) -> bool {
        matches!(self.start, Some(StartLine::Request { .. }))
    }

    /// Is this a response document?
    pub fn is_response(&self) -> bool {
        matches!(self.start, Some(StartLine::Response { .. }))
    }

    /// The request method, for requests.
    pub fn method(&self) -> Option<Method> {
        match self.start {
            Some(StartLine::Request { method }) => Some(method),
            _ => None,
        }
    }

    /// The status code, for responses.
    pub fn status_code(&self) -> Option<u16> {
        match self.start {
            Some(StartLine::Response { status }) => Some(status),
            _ => None,
        }
    }

    /// The request target. For responses this is the reason phrase.
    pub fn target(&self) -> &str {
        &self.target_or_reason
    }

    /// The reason phrase. For requests this is the target.
    pub fn reason(&self) -> &str {
        &self.target_or_reason
    }

    /// Append a header field.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.push(Header {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// First value of the header `name` (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    /// All values of the header `name` (case-insensitive), in order.
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
            .collect()
    }

    /// Parsed `Content-Length` header, if present and numeric.
    pub fn content_length(&self) -> Option<u64> {
        self.header_value("content-length")
            .and_then(|v| v.trim().parse().ok())
    }

    /// Does the `Transfer-Encoding` header mention `chunked`?
    pub fn is_chunked(&self) -> bool {
        self.header_value("transfer-encoding")
            .map(|v| v.to_ascii_lowercase().contains("chunked"))
            .unwrap_or(false)
    }

    /// The body as UTF-8, if valid.
    pub fn body_as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    // ----- serialization ---------------------------------------------------

    /// Whether the document is complete enough to serialize.
    ///
    /// Requests need a method and a target starting with `/` (HTTP/0.9
    /// documents are exempt from the target check); responses need a status
    /// in [100, 1000). The reason phrase may be empty. Version digits must
    /// be single digits.
    pub fn is_initialized(&self) -> bool {
        if self.major > 9 || self.minor > 9 {
            return false;
        }
        match self.start {
            Some(StartLine::Request { .. }) => {
                self.target_or_reason.as_bytes().first() == Some(&b'/')
                    || (self.major == 0 && self.minor == 9)
            }
            Some(StartLine::Response { status }) => (100..1000).contains(&status),
            None => false,
        }
    }

    /// Exact size of the wire form, or 0 when the document is not
    /// [initialized](Self::is_initialized).
    pub fn byte_size(&self) -> usize {
        if !self.is_initialized() {
            return 0;
        }

        let mut bytes = 0;
        match self.start {
            Some(StartLine::Request { method }) => {
                bytes += method.as_str().len() + 1; // GET SP
                bytes += self.target_or_reason.len() + 1; // /uri SP
                bytes += 10; // HTTP/1.1 CR LF
            }
            Some(StartLine::Response { .. }) => {
                bytes += 9; // HTTP/1.1 SP
                bytes += 3 + 1; // 200 SP
                bytes += self.target_or_reason.len() + 2; // OK CR LF
            }
            None => unreachable!(),
        }
        for header in &self.headers {
            bytes += header.name.len() + 2 + header.value.len() + 2;
        }
        bytes += 2;
        bytes += self.body.len();
        bytes
    }

    /// Write the wire form into `buf`.
    ///
    /// Writes exactly [`byte_size`](Self::byte_size) bytes and returns
    /// `true`. Returns `false` without writing when the document is not
    /// initialized or `buf` is too small.
    pub fn serialize(&self, buf: &mut [u8]) -> bool {
        let size = self.byte_size();
        if size == 0 || buf.len() < size {
            return false;
        }

        let mut pos = 0usize;
        let mut put = |buf: &mut [u8], bytes: &[u8]| {
            buf[pos..pos + bytes.len()].copy_from_slice(bytes);
            pos += bytes.len();
        };

        match self.start {
            Some(StartLine::Request { method }) => {
                put(buf, method.as_str().as_bytes());
                put(buf, b" ");
                put(buf, self.target_or_reason.as_bytes());
                put(buf, b" HTTP/");
                put(buf, &[self.major + b'0', b'.', self.minor + b'0']);
            }
            Some(StartLine::Response { status }) => {
                put(buf, b"HTTP/");
                put(buf, &[self.major + b'0', b'.', self.minor + b'0', b' ']);
                put(
                    buf,
                    &[
                        (status / 100) as u8 + b'0',
                        ((status % 100) / 10) as u8 + b'0',
                        (status % 10) as u8 + b'0',
                        b' ',
                    ],
                );
                put(buf, self.target_or_reason.as_bytes());
            }
            None => return false,
        }
        put(buf, b"\r\n");
        for header in &self.headers {
            put(buf, header.name.as_bytes());
            put(buf, b": ");
            put(buf, header.value.as_bytes());
            put(buf, b"\r\n");
        }
        put(buf, b"\r\n");
        put(buf, &self.body);

        debug_assert_eq!(pos, size);
        true
    }

    /// The wire form as an owned buffer, or `None` when the document is not
    /// initialized.
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        let size = self.byte_size();
        if size == 0 {
            return None;
        }
        let mut buf = vec![0u8; size];
        if !self.serialize(&mut buf) {
            return None;
        }
        Some(buf)
    }
}

impl fmt::Display for StartLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request { method } => write!(f, "{method}"),
            Self::Response { status } => write!(f, "{status}"),
        }
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Document", 6)?;
        match self.start {
            Some(StartLine::Request { method }) => {
                s.serialize_field("kind", "request")?;
                s.serialize_field("method", &method)?;
                s.serialize_field("target", &self.target_or_reason)?;
            }
            Some(StartLine::Response { status }) => {
                s.serialize_field("kind", "response")?;
                s.serialize_field("status", &status)?;
                s.serialize_field("reason", &self.target_or_reason)?;
            }
            None => {
                s.serialize_field("kind", "unknown")?;
                s.skip_field("method")?;
                s.serialize_field("target", &self.target_or_reason)?;
            }
        }
        s.serialize_field("version", &format!("HTTP/{}.{}", self.major, self.minor))?;
        s.serialize_field("headers", &self.headers)?;
        if self.body.is_empty() {
            s.serialize_field("body", &None::<String>)?;
        } else {
            s.serialize_field("body", &String::from_utf8_lossy(&self.body))?;
        }
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_wire_form_is_exact() {
        let mut doc = Document::request(Method::GET, "/uri/abc");
        doc.add_header("Accept", "XAccept")
            .add_header("Host", "domain.com")
            .add_header("Connection", "Keep-Alive");
        let expected = b"GET /uri/abc HTTP/1.1\r\n\
                         Accept: XAccept\r\n\
                         Host: domain.com\r\n\
                         Connection: Keep-Alive\r\n\r\n";
        assert_eq!(doc.byte_size(), expected.len());
        assert_eq!(doc.to_bytes().unwrap(), expected.to_vec());
    }

    #[test]
    fn response_wire_form_is_exact() {
        let mut doc = Document::response(404);
        doc.add_header("Host", "h");
        doc.body = b"xyz".to_vec();
        let expected = b"HTTP/1.1 404 Not Found\r\nHost: h\r\n\r\nxyz";
        assert_eq!(doc.byte_size(), expected.len());
        assert_eq!(doc.to_bytes().unwrap(), expected.to_vec());
    }

    #[test]
    fn serialize_refuses_small_buffers() {
        let doc = Document::request(Method::GET, "/");
        let size = doc.byte_size();
        let mut small = vec![0u8; size - 1];
        assert!(!doc.serialize(&mut small));
        let mut exact = vec![0u8; size];
        assert!(doc.serialize(&mut exact));
    }

    #[test]
    fn uninitialized_documents_do_not_serialize() {
        assert_eq!(Document::new().byte_size(), 0);

        // a request target must be origin-form
        let doc = Document::request(Method::GET, "example.com");
        assert_eq!(doc.byte_size(), 0);
        assert!(doc.to_bytes().is_none());

        // out-of-range status
        let doc = Document::response_with_reason(99, "Too Low");
        assert_eq!(doc.byte_size(), 0);

        // out-of-range version digit
        let mut doc = Document::request(Method::GET, "/");
        doc.major = 10;
        assert_eq!(doc.byte_size(), 0);
    }

    #[test]
    fn empty_reason_phrase_serializes() {
        let doc = Document::response_with_reason(200, "");
        let expected = b"HTTP/1.1 200 \r\n\r\n";
        assert_eq!(doc.to_bytes().unwrap(), expected.to_vec());
    }

    #[test]
    fn header_lookup_is_case_insensitive_and_ordered() {
        let mut doc = Document::request(Method::GET, "/");
        doc.add_header("Set-Cookie", "a=1")
            .add_header("set-cookie", "b=2");
        assert_eq!(doc.header_value("SET-COOKIE"), Some("a=1"));
        assert_eq!(doc.header_values("Set-Cookie"), vec!["a=1", "b=2"]);
    }

    #[test]
    fn clone_preserves_version_digits() {
        let mut doc = Document::request(Method::GET, "/");
        doc.major = 1;
        doc.minor = 0;
        let copy = doc.clone();
        assert_eq!(copy.major, 1);
        assert_eq!(copy.minor, 0);
    }

    #[test]
    fn default_reason_comes_from_the_status_table() {
        assert_eq!(Document::response(200).reason(), "OK");
        assert_eq!(Document::response(404).reason(), "Not Found");
        assert_eq!(Document::response(599).reason(), "");
    }
}
