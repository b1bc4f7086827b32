use crate::chars;
use crate::error::ParseError;
use crate::host::parse_host;
use crate::parser::State;

/// One step of the URL recognizer.
///
/// A pure transition function over single bytes, shared between the message
/// state machine (which walks the request-target in-line) and
/// [`parse_url`]. Illegal bytes land in [`State::Dead`]; the caller decides
/// what that means.
///
/// Only ever invoked with non-space bytes by the message parser; the
/// standalone walk below relies on the SP/CR/LF rejection here instead.
pub(crate) fn url_step(s: State, ch: u8) -> State {
    if ch == b' ' || ch == b'\r' || ch == b'\n' {
        return State::Dead;
    }
    if cfg!(feature = "strict") && (ch == b'\t' || ch == 0x0C) {
        return State::Dead;
    }

    match s {
        State::ReqSpacesBeforeUrl => {
            // Proxied requests start with the scheme of an absolute URI.
            // All methods except CONNECT are followed by '/' or '*'.
            if ch == b'/' || ch == b'*' {
                return State::ReqPath;
            }
            if chars::is_alpha(ch) {
                return State::ReqSchema;
            }
        }

        State::ReqSchema => {
            if chars::is_alpha(ch) {
                return s;
            }
            if ch == b':' {
                return State::ReqSchemaSlash;
            }
        }

        State::ReqSchemaSlash => {
            if ch == b'/' {
                return State::ReqSchemaSlashSlash;
            }
        }

        State::ReqSchemaSlashSlash => {
            if ch == b'/' {
                return State::ReqServerStart;
            }
        }

        State::ReqServerWithAt | State::ReqServerStart | State::ReqServer => {
            // a second '@' in the authority is malformed
            if s == State::ReqServerWithAt && ch == b'@' {
                return State::Dead;
            }
            if ch == b'/' {
                return State::ReqPath;
            }
            if ch == b'?' {
                return State::ReqQueryStringStart;
            }
            if ch == b'@' {
                return State::ReqServerWithAt;
            }
            if chars::is_userinfo_char(ch) || ch == b'[' || ch == b']' {
                return State::ReqServer;
            }
        }

        State::ReqPath => {
            if chars::is_url_char(ch) {
                return s;
            }
            match ch {
                b'?' => return State::ReqQueryStringStart,
                b'#' => return State::ReqFragmentStart,
                _ => {}
            }
        }

        State::ReqQueryStringStart | State::ReqQueryString => {
            if chars::is_url_char(ch) {
                return State::ReqQueryString;
            }
            match ch {
                // allow extra '?' in query string
                b'?' => return State::ReqQueryString,
                b'#' => return State::ReqFragmentStart,
                _ => {}
            }
        }

        State::ReqFragmentStart => {
            if chars::is_url_char(ch) {
                return State::ReqFragment;
            }
            match ch {
                b'?' => return State::ReqFragment,
                b'#' => return s,
                _ => {}
            }
        }

        State::ReqFragment => {
            if chars::is_url_char(ch) {
                return s;
            }
            if ch == b'?' || ch == b'#' {
                return s;
            }
        }

        _ => {}
    }

    State::Dead
}

/// A request-target decomposed into its components.
///
/// Every component borrows from the parsed buffer. Absent components are
/// `None`; the port is additionally decoded to its numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Url<'a> {
    /// Scheme, without the trailing `:`.
    pub schema: Option<&'a [u8]>,
    /// Userinfo, without the trailing `@`.
    pub userinfo: Option<&'a [u8]>,
    /// Host: registered name or IPv6 literal content (brackets stripped,
    /// zone id included).
    pub host: Option<&'a [u8]>,
    /// Decoded port number.
    pub port: Option<u16>,
    /// Path, including the leading `/` (or `*` for asterisk-form).
    pub path: Option<&'a [u8]>,
    /// Query string, without the leading `?`.
    pub query: Option<&'a [u8]>,
    /// Fragment, without the leading `#`.
    pub fragment: Option<&'a [u8]>,
}

/// Decompose an origin-form or absolute-form request target.
///
/// With `is_connect`, the input must instead be authority-form: exactly
/// `host:port`, nothing else.
///
/// # Errors
///
/// [`ParseError::InvalidUrl`] for structural violations,
/// [`ParseError::InvalidHost`] when the authority does not parse, and
/// [`ParseError::InvalidPort`] when the port exceeds 65535.
pub fn parse_url(buf: &[u8], is_connect: bool) -> Result<Url<'_>, ParseError> {
    if buf.is_empty() {
        return Err(ParseError::InvalidUrl);
    }

    let mut s = if is_connect {
        State::ReqServerStart
    } else {
        State::ReqSpacesBeforeUrl
    };

    let mut schema: Option<(usize, usize)> = None;
    let mut server: Option<(usize, usize)> = None;
    let mut path: Option<(usize, usize)> = None;
    let mut query: Option<(usize, usize)> = None;
    let mut fragment: Option<(usize, usize)> = None;
    let mut found_at = false;

    // Walk the bytes, attributing each run of non-delimiter bytes to the
    // component its state implies.
    for (i, &b) in buf.iter().enumerate() {
        s = url_step(s, b);

        let field = match s {
            State::Dead => return Err(ParseError::InvalidUrl),

            // delimiters belong to no component
            State::ReqSchemaSlash
            | State::ReqSchemaSlashSlash
            | State::ReqServerStart
            | State::ReqQueryStringStart
            | State::ReqFragmentStart => continue,

            State::ReqSchema => &mut schema,
            State::ReqServerWithAt => {
                found_at = true;
                &mut server
            }
            State::ReqServer => &mut server,
            State::ReqPath => &mut path,
            State::ReqQueryString => &mut query,
            State::ReqFragment => &mut fragment,

            _ => return Err(ParseError::InvalidUrl),
        };

        match field {
            Some(span) => span.1 += 1,
            None => *field = Some((i, 1)),
        }
    }

    // a scheme without a host ("http:///x") is malformed
    if schema.is_some() && server.is_none() {
        return Err(ParseError::InvalidUrl);
    }

    let mut host: Option<(usize, usize)> = None;
    let mut port_span: Option<(usize, usize)> = None;
    let mut userinfo: Option<(usize, usize)> = None;

    if let Some((off, len)) = server {
        let spans = parse_host(buf, off, len, found_at).ok_or(ParseError::InvalidHost)?;
        host = Some(spans.host);
        port_span = spans.port;
        userinfo = spans.userinfo;
    }

    // authority-form may contain nothing but host:port
    if is_connect
        && (host.is_none()
            || port_span.is_none()
            || schema.is_some()
            || path.is_some()
            || query.is_some()
            || fragment.is_some()
            || userinfo.is_some())
    {
        return Err(ParseError::InvalidUrl);
    }

    let port = match port_span {
        Some((off, len)) => {
            // bytes are already known to be digits
            let mut v: u32 = 0;
            for &d in &buf[off..off + len] {
                v = v * 10 + (d - b'0') as u32;
                if v > 0xFFFF {
                    return Err(ParseError::InvalidPort);
                }
            }
            Some(v as u16)
        }
        None => None,
    };

    let slice = |span: Option<(usize, usize)>| span.map(|(off, len)| &buf[off..off + len]);

    Ok(Url {
        schema: slice(schema),
        userinfo: slice(userinfo),
        host: slice(host),
        port,
        path: slice(path),
        query: slice(query),
        fragment: slice(fragment),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_form() {
        let url = parse_url(b"/search?q=rust#top", false).unwrap();
        assert_eq!(url.path, Some(&b"/search"[..]));
        assert_eq!(url.query, Some(&b"q=rust"[..]));
        assert_eq!(url.fragment, Some(&b"top"[..]));
        assert_eq!(url.schema, None);
        assert_eq!(url.host, None);
    }

    #[test]
    fn absolute_form_with_port_and_userinfo() {
        let url = parse_url(b"http://user:pw@example.com:8080/a/b?x=1", false).unwrap();
        assert_eq!(url.schema, Some(&b"http"[..]));
        assert_eq!(url.userinfo, Some(&b"user:pw"[..]));
        assert_eq!(url.host, Some(&b"example.com"[..]));
        assert_eq!(url.port, Some(8080));
        assert_eq!(url.path, Some(&b"/a/b"[..]));
        assert_eq!(url.query, Some(&b"x=1"[..]));
    }

    #[test]
    fn ipv6_literal_with_zone() {
        let url = parse_url(b"http://[fe80::1%25eth0]:80/", false).unwrap();
        assert_eq!(url.host, Some(&b"fe80::1%25eth0"[..]));
        assert_eq!(url.port, Some(80));
        assert_eq!(url.path, Some(&b"/"[..]));
    }

    #[test]
    fn connect_form() {
        let url = parse_url(b"example.com:443", true).unwrap();
        assert_eq!(url.host, Some(&b"example.com"[..]));
        assert_eq!(url.port, Some(443));
        assert_eq!(url.path, None);

        assert!(parse_url(b"example.com", true).is_err());
        assert!(parse_url(b"http://example.com:443/", true).is_err());
    }

    #[test]
    fn schema_requires_host() {
        assert!(parse_url(b"http:///toto", false).is_err());
    }

    #[test]
    fn port_overflow_is_rejected() {
        assert_eq!(
            parse_url(b"http://example.com:65536/", false),
            Err(ParseError::InvalidPort)
        );
        assert_eq!(parse_url(b"http://example.com:65535/", false).unwrap().port, Some(65535));
    }

    #[test]
    fn whitespace_is_rejected() {
        assert!(parse_url(b"/a b", false).is_err());
        assert!(parse_url(b"", false).is_err());
    }

    #[test]
    fn double_at_is_rejected() {
        assert!(parse_url(b"http://a@b@c/", false).is_err());
    }
}
