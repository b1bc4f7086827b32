use std::fmt;

/// Errors reported by the streaming parser and the URL decomposer.
///
/// The first group corresponds to an aborting return from one of the
/// [`Handler`](crate::Handler) callbacks; the rest are protocol violations.
/// Every variant carries a stable machine-readable [`name`](Self::name) and
/// a human-readable [`description`](Self::description).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The `on_message_begin` callback aborted parsing.
    MessageBeginCallback,
    /// The `on_url` callback aborted parsing.
    UrlCallback,
    /// The `on_header_field` callback aborted parsing.
    HeaderFieldCallback,
    /// The `on_header_value` callback aborted parsing.
    HeaderValueCallback,
    /// The `on_headers_complete` callback aborted parsing.
    HeadersCompleteCallback,
    /// The `on_body` callback aborted parsing.
    BodyCallback,
    /// The `on_message_complete` callback aborted parsing.
    MessageCompleteCallback,
    /// The `on_status` callback aborted parsing.
    StatusCallback,
    /// The `on_chunk_header` callback aborted parsing.
    ChunkHeaderCallback,
    /// The `on_chunk_complete` callback aborted parsing.
    ChunkCompleteCallback,

    /// EOF was signalled in a state that cannot end a message.
    InvalidEofState,
    /// The start line and header block exceeded the configured size cap.
    HeaderOverflow,
    /// Data arrived after a completed `Connection: close` message.
    ClosedConnection,
    /// Malformed HTTP version.
    InvalidVersion,
    /// Malformed or out-of-range status code.
    InvalidStatus,
    /// Unrecognized request method.
    InvalidMethod,
    /// Illegal byte or structure in the request target.
    InvalidUrl,
    /// Illegal host component in a URL.
    InvalidHost,
    /// Illegal or out-of-range port component in a URL.
    InvalidPort,
    /// Illegal path component in a URL.
    InvalidPath,
    /// Illegal query string in a URL.
    InvalidQueryString,
    /// Illegal fragment in a URL.
    InvalidFragment,
    /// A CR was not followed by LF.
    LfExpected,
    /// Illegal byte in a header name or value.
    InvalidHeaderToken,
    /// Illegal byte, duplicate digit run, or overflow in `Content-Length`.
    InvalidContentLength,
    /// `Content-Length` seen where framing forbids it.
    UnexpectedContentLength,
    /// Illegal byte in a chunk-size line.
    InvalidChunkSize,
    /// A required literal (e.g. `HTTP/`) did not match.
    InvalidConstant,
    /// The state machine reached an impossible state.
    InvalidInternalState,
    /// A strict-mode-only check failed.
    Strict,
    /// The parser was paused by the caller.
    Paused,
    /// An unknown error occurred.
    Unknown,
    /// `Transfer-Encoding` present on a request without a final `chunked`
    /// coding.
    InvalidTransferEncoding,
}

impl ParseError {
    /// Stable upper-case identifier, suitable for logs and wire diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::MessageBeginCallback => "CB_MESSAGE_BEGIN",
            Self::UrlCallback => "CB_URL",
            Self::HeaderFieldCallback => "CB_HEADER_FIELD",
            Self::HeaderValueCallback => "CB_HEADER_VALUE",
            Self::HeadersCompleteCallback => "CB_HEADERS_COMPLETE",
            Self::BodyCallback => "CB_BODY",
            Self::MessageCompleteCallback => "CB_MESSAGE_COMPLETE",
            Self::StatusCallback => "CB_STATUS",
            Self::ChunkHeaderCallback => "CB_CHUNK_HEADER",
            Self::ChunkCompleteCallback => "CB_CHUNK_COMPLETE",
            Self::InvalidEofState => "INVALID_EOF_STATE",
            Self::HeaderOverflow => "HEADER_OVERFLOW",
            Self::ClosedConnection => "CLOSED_CONNECTION",
            Self::InvalidVersion => "INVALID_VERSION",
            Self::InvalidStatus => "INVALID_STATUS",
            Self::InvalidMethod => "INVALID_METHOD",
            Self::InvalidUrl => "INVALID_URL",
            Self::InvalidHost => "INVALID_HOST",
            Self::InvalidPort => "INVALID_PORT",
            Self::InvalidPath => "INVALID_PATH",
            Self::InvalidQueryString => "INVALID_QUERY_STRING",
            Self::InvalidFragment => "INVALID_FRAGMENT",
            Self::LfExpected => "LF_EXPECTED",
            Self::InvalidHeaderToken => "INVALID_HEADER_TOKEN",
            Self::InvalidContentLength => "INVALID_CONTENT_LENGTH",
            Self::UnexpectedContentLength => "UNEXPECTED_CONTENT_LENGTH",
            Self::InvalidChunkSize => "INVALID_CHUNK_SIZE",
            Self::InvalidConstant => "INVALID_CONSTANT",
            Self::InvalidInternalState => "INVALID_INTERNAL_STATE",
            Self::Strict => "STRICT",
            Self::Paused => "PAUSED",
            Self::Unknown => "UNKNOWN",
            Self::InvalidTransferEncoding => "INVALID_TRANSFER_ENCODING",
        }
    }

    /// Human-readable description of the error.
    pub fn description(&self) -> &'static str {
        match self {
            Self::MessageBeginCallback => "the on_message_begin callback failed",
            Self::UrlCallback => "the on_url callback failed",
            Self::HeaderFieldCallback => "the on_header_field callback failed",
            Self::HeaderValueCallback => "the on_header_value callback failed",
            Self::HeadersCompleteCallback => "the on_headers_complete callback failed",
            Self::BodyCallback => "the on_body callback failed",
            Self::MessageCompleteCallback => "the on_message_complete callback failed",
            Self::StatusCallback => "the on_status callback failed",
            Self::ChunkHeaderCallback => "the on_chunk_header callback failed",
            Self::ChunkCompleteCallback => "the on_chunk_complete callback failed",
            Self::InvalidEofState => "stream ended at an unexpected time",
            Self::HeaderOverflow => "too many header bytes seen; overflow detected",
            Self::ClosedConnection => {
                "data received after completed connection: close message"
            }
            Self::InvalidVersion => "invalid HTTP version",
            Self::InvalidStatus => "invalid HTTP status code",
            Self::InvalidMethod => "invalid HTTP method",
            Self::InvalidUrl => "invalid URL",
            Self::InvalidHost => "invalid host",
            Self::InvalidPort => "invalid port",
            Self::InvalidPath => "invalid path",
            Self::InvalidQueryString => "invalid query string",
            Self::InvalidFragment => "invalid fragment",
            Self::LfExpected => "LF character expected",
            Self::InvalidHeaderToken => "invalid character in header",
            Self::InvalidContentLength => "invalid character in content-length header",
            Self::UnexpectedContentLength => "unexpected content-length header",
            Self::InvalidChunkSize => "invalid character in chunk size header",
            Self::InvalidConstant => "invalid constant string",
            Self::InvalidInternalState => "encountered unexpected internal state",
            Self::Strict => "strict mode assertion failed",
            Self::Paused => "parser is paused",
            Self::Unknown => "an unknown error occurred",
            Self::InvalidTransferEncoding => "request has invalid transfer-encoding",
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_and_description_are_stable() {
        assert_eq!(ParseError::InvalidMethod.name(), "INVALID_METHOD");
        assert_eq!(ParseError::InvalidMethod.description(), "invalid HTTP method");
        assert_eq!(
            ParseError::HeaderOverflow.to_string(),
            "too many header bytes seen; overflow detected"
        );
        assert_eq!(ParseError::UrlCallback.name(), "CB_URL");
    }
}
