use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::ParseError;

/// Request methods recognized on the wire.
///
/// Covers RFC 9110 plus the WebDAV, CalDAV, UPnP/SSDP and icecast
/// extensions. The wire string of each variant is [`as_str`](Self::as_str);
/// note `MSEARCH` serializes as `M-SEARCH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    DELETE,
    GET,
    HEAD,
    POST,
    PUT,
    CONNECT,
    OPTIONS,
    TRACE,
    // WebDAV
    COPY,
    LOCK,
    MKCOL,
    MOVE,
    PROPFIND,
    PROPPATCH,
    SEARCH,
    UNLOCK,
    BIND,
    REBIND,
    UNBIND,
    ACL,
    // Subversion
    REPORT,
    MKACTIVITY,
    CHECKOUT,
    MERGE,
    // UPnP
    MSEARCH,
    NOTIFY,
    SUBSCRIBE,
    UNSUBSCRIBE,
    // RFC 5789
    PATCH,
    PURGE,
    // CalDAV
    MKCALENDAR,
    // RFC 2068
    LINK,
    UNLINK,
    // icecast
    SOURCE,
}

/// Every method, in wire-table order.
pub const METHODS: [Method; 34] = [
    Method::DELETE,
    Method::GET,
    Method::HEAD,
    Method::POST,
    Method::PUT,
    Method::CONNECT,
    Method::OPTIONS,
    Method::TRACE,
    Method::COPY,
    Method::LOCK,
    Method::MKCOL,
    Method::MOVE,
    Method::PROPFIND,
    Method::PROPPATCH,
    Method::SEARCH,
    Method::UNLOCK,
    Method::BIND,
    Method::REBIND,
    Method::UNBIND,
    Method::ACL,
    Method::REPORT,
    Method::MKACTIVITY,
    Method::CHECKOUT,
    Method::MERGE,
    Method::MSEARCH,
    Method::NOTIFY,
    Method::SUBSCRIBE,
    Method::UNSUBSCRIBE,
    Method::PATCH,
    Method::PURGE,
    Method::MKCALENDAR,
    Method::LINK,
    Method::UNLINK,
    Method::SOURCE,
];

impl Method {
    /// The method as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DELETE => "DELETE",
            Self::GET => "GET",
            Self::HEAD => "HEAD",
            Self::POST => "POST",
            Self::PUT => "PUT",
            Self::CONNECT => "CONNECT",
            Self::OPTIONS => "OPTIONS",
            Self::TRACE => "TRACE",
            Self::COPY => "COPY",
            Self::LOCK => "LOCK",
            Self::MKCOL => "MKCOL",
            Self::MOVE => "MOVE",
            Self::PROPFIND => "PROPFIND",
            Self::PROPPATCH => "PROPPATCH",
            Self::SEARCH => "SEARCH",
            Self::UNLOCK => "UNLOCK",
            Self::BIND => "BIND",
            Self::REBIND => "REBIND",
            Self::UNBIND => "UNBIND",
            Self::ACL => "ACL",
            Self::REPORT => "REPORT",
            Self::MKACTIVITY => "MKACTIVITY",
            Self::CHECKOUT => "CHECKOUT",
            Self::MERGE => "MERGE",
            Self::MSEARCH => "M-SEARCH",
            Self::NOTIFY => "NOTIFY",
            Self::SUBSCRIBE => "SUBSCRIBE",
            Self::UNSUBSCRIBE => "UNSUBSCRIBE",
            Self::PATCH => "PATCH",
            Self::PURGE => "PURGE",
            Self::MKCALENDAR => "MKCALENDAR",
            Self::LINK => "LINK",
            Self::UNLINK => "UNLINK",
            Self::SOURCE => "SOURCE",
        }
    }

    /// Parse a method from its exact wire bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        METHODS
            .iter()
            .copied()
            .find(|m| m.as_str().as_bytes() == bytes)
            .ok_or(ParseError::InvalidMethod)
    }

    /// The provisional method chosen from the first request-line byte.
    ///
    /// Several methods share a first letter; the matcher starts from the
    /// entry below and re-routes on the first diverging byte via
    /// [`shift`](Self::shift).
    pub(crate) fn from_first_byte(b: u8) -> Option<Self> {
        Some(match b {
            b'A' => Self::ACL,
            b'B' => Self::BIND,
            b'C' => Self::CONNECT, // or COPY, CHECKOUT
            b'D' => Self::DELETE,
            b'G' => Self::GET,
            b'H' => Self::HEAD,
            b'L' => Self::LOCK,  // or LINK
            b'M' => Self::MKCOL, // or MOVE, MKACTIVITY, MERGE, M-SEARCH, MKCALENDAR
            b'N' => Self::NOTIFY,
            b'O' => Self::OPTIONS,
            b'P' => Self::POST, // or PROPFIND, PROPPATCH, PUT, PATCH, PURGE
            b'R' => Self::REPORT, // or REBIND
            b'S' => Self::SUBSCRIBE, // or SEARCH, SOURCE
            b'T' => Self::TRACE,
            b'U' => Self::UNLOCK, // or UNSUBSCRIBE, UNBIND, UNLINK
            _ => return None,
        })
    }

    /// Re-route the method matcher when byte `b` at position `index`
    /// diverges from the provisional method's literal.
    pub(crate) fn shift(self, index: u32, b: u8) -> Option<Self> {
        Some(match (self, index, b) {
            (Self::POST, 1, b'U') => Self::PUT,
            (Self::POST, 1, b'A') => Self::PATCH,
            (Self::POST, 1, b'R') => Self::PROPFIND,
            (Self::PUT, 2, b'R') => Self::PURGE,
            (Self::CONNECT, 1, b'H') => Self::CHECKOUT,
            (Self::CONNECT, 2, b'P') => Self::COPY,
            (Self::MKCOL, 1, b'O') => Self::MOVE,
            (Self::MKCOL, 1, b'E') => Self::MERGE,
            (Self::MKCOL, 1, b'-') => Self::MSEARCH,
            (Self::MKCOL, 2, b'A') => Self::MKACTIVITY,
            (Self::MKCOL, 3, b'A') => Self::MKCALENDAR,
            (Self::SUBSCRIBE, 1, b'E') => Self::SEARCH,
            (Self::SUBSCRIBE, 1, b'O') => Self::SOURCE,
            (Self::REPORT, 2, b'B') => Self::REBIND,
            (Self::PROPFIND, 4, b'P') => Self::PROPPATCH,
            (Self::LOCK, 1, b'I') => Self::LINK,
            (Self::UNLOCK, 2, b'S') => Self::UNSUBSCRIBE,
            (Self::UNLOCK, 2, b'B') => Self::UNBIND,
            (Self::UNLOCK, 3, b'I') => Self::UNLINK,
            _ => return None,
        })
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bytes(s.as_bytes())
    }
}

impl Serialize for Method {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_strings_round_trip() {
        for method in METHODS {
            assert_eq!(Method::from_bytes(method.as_str().as_bytes()), Ok(method));
        }
    }

    #[test]
    fn msearch_uses_dashed_wire_form() {
        assert_eq!(Method::MSEARCH.as_str(), "M-SEARCH");
        assert_eq!("M-SEARCH".parse(), Ok(Method::MSEARCH));
        assert!("MSEARCH".parse::<Method>().is_err());
    }

    #[test]
    fn unknown_methods_are_rejected() {
        assert_eq!(Method::from_bytes(b"FOOBAR"), Err(ParseError::InvalidMethod));
        assert_eq!(Method::from_bytes(b"get"), Err(ParseError::InvalidMethod));
        assert_eq!(Method::from_bytes(b""), Err(ParseError::InvalidMethod));
    }

    #[test]
    fn shift_table_reroutes_shared_prefixes() {
        assert_eq!(Method::POST.shift(1, b'A'), Some(Method::PATCH));
        assert_eq!(Method::MKCOL.shift(1, b'-'), Some(Method::MSEARCH));
        assert_eq!(Method::PROPFIND.shift(4, b'P'), Some(Method::PROPPATCH));
        assert_eq!(Method::GET.shift(1, b'X'), None);
    }
}
