//! Sub-parser for the authority component found by the URL walk.
//!
//! Splits `userinfo@host:port`, where the host may be a registered name or
//! a bracketed IPv6 literal with an optional RFC 6874 zone id.

use crate::chars;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HostState {
    Dead,
    UserinfoStart,
    Userinfo,
    HostStart,
    HostV6Start,
    Host,
    HostV6,
    HostV6End,
    HostV6ZoneStart,
    HostV6Zone,
    PortStart,
    Port,
}

fn host_step(s: HostState, ch: u8) -> HostState {
    match s {
        HostState::UserinfoStart | HostState::Userinfo => {
            if ch == b'@' {
                return HostState::HostStart;
            }
            if chars::is_userinfo_char(ch) {
                return HostState::Userinfo;
            }
        }

        HostState::HostStart => {
            if ch == b'[' {
                return HostState::HostV6Start;
            }
            if chars::is_host_char(ch) {
                return HostState::Host;
            }
        }

        HostState::Host | HostState::HostV6End => {
            if s == HostState::Host && chars::is_host_char(ch) {
                return HostState::Host;
            }
            if ch == b':' {
                return HostState::PortStart;
            }
        }

        HostState::HostV6 | HostState::HostV6Start => {
            if s == HostState::HostV6 && ch == b']' {
                return HostState::HostV6End;
            }
            if chars::is_hex(ch) || ch == b':' || ch == b'.' {
                return HostState::HostV6;
            }
            if s == HostState::HostV6 && ch == b'%' {
                return HostState::HostV6ZoneStart;
            }
        }

        HostState::HostV6Zone | HostState::HostV6ZoneStart => {
            if s == HostState::HostV6Zone && ch == b']' {
                return HostState::HostV6End;
            }
            // a zone id is 1*(unreserved / pct-encoded)
            if chars::is_alphanum(ch)
                || matches!(ch, b'%' | b'.' | b'-' | b'_' | b'~')
            {
                return HostState::HostV6Zone;
            }
        }

        HostState::PortStart | HostState::Port => {
            if chars::is_num(ch) {
                return HostState::Port;
            }
        }

        HostState::Dead => {}
    }
    HostState::Dead
}

/// Offsets and lengths carved out of the authority span.
pub(crate) struct HostSpans {
    pub host: (usize, usize),
    pub port: Option<(usize, usize)>,
    pub userinfo: Option<(usize, usize)>,
}

/// Split the authority bytes `buf[start..start + len]`.
///
/// `found_at` says whether the URL walk saw a `@`, i.e. whether the span
/// begins with userinfo. Returns `None` when the authority is malformed or
/// ends mid-component (unclosed `[`, trailing `@`, dangling `:`).
pub(crate) fn parse_host(
    buf: &[u8],
    start: usize,
    len: usize,
    found_at: bool,
) -> Option<HostSpans> {
    let mut s = if found_at {
        HostState::UserinfoStart
    } else {
        HostState::HostStart
    };

    let mut host: Option<(usize, usize)> = None;
    let mut port: Option<(usize, usize)> = None;
    let mut userinfo: Option<(usize, usize)> = None;

    for (i, &b) in buf[start..start + len].iter().enumerate() {
        let p = start + i;
        let new_s = host_step(s, b);

        match new_s {
            HostState::Dead => return None,

            HostState::Host => {
                if s != HostState::Host {
                    host = Some((p, 0));
                }
                if let Some(span) = host.as_mut() {
                    span.1 += 1;
                }
            }

            HostState::HostV6 => {
                if s != HostState::HostV6 {
                    host = Some((p, 0));
                }
                if let Some(span) = host.as_mut() {
                    span.1 += 1;
                }
            }

            // the zone id (including '%') stays part of the host
            HostState::HostV6ZoneStart | HostState::HostV6Zone => {
                if let Some(span) = host.as_mut() {
                    span.1 += 1;
                }
            }

            HostState::Port => {
                if s != HostState::Port {
                    port = Some((p, 0));
                }
                if let Some(span) = port.as_mut() {
                    span.1 += 1;
                }
            }

            HostState::Userinfo => {
                if s != HostState::Userinfo {
                    userinfo = Some((p, 0));
                }
                if let Some(span) = userinfo.as_mut() {
                    span.1 += 1;
                }
            }

            _ => {}
        }
        s = new_s;
    }

    // make sure the walk did not end somewhere unexpected
    match s {
        HostState::HostStart
        | HostState::HostV6Start
        | HostState::HostV6
        | HostState::HostV6ZoneStart
        | HostState::HostV6Zone
        | HostState::PortStart
        | HostState::Userinfo
        | HostState::UserinfoStart => None,
        _ => Some(HostSpans {
            host: host?,
            port,
            userinfo,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host_of(buf: &[u8], found_at: bool) -> Option<(Vec<u8>, Option<Vec<u8>>, Option<Vec<u8>>)> {
        let spans = parse_host(buf, 0, buf.len(), found_at)?;
        let get = |(off, len): (usize, usize)| buf[off..off + len].to_vec();
        Some((
            get(spans.host),
            spans.port.map(get),
            spans.userinfo.map(get),
        ))
    }

    #[test]
    fn plain_host_and_port() {
        let (host, port, userinfo) = host_of(b"example.com:8080", false).unwrap();
        assert_eq!(host, b"example.com");
        assert_eq!(port.as_deref(), Some(&b"8080"[..]));
        assert_eq!(userinfo, None);
    }

    #[test]
    fn userinfo_is_split_off() {
        let (host, port, userinfo) = host_of(b"alice:secret@example.com", true).unwrap();
        assert_eq!(host, b"example.com");
        assert_eq!(port, None);
        assert_eq!(userinfo.as_deref(), Some(&b"alice:secret"[..]));
    }

    #[test]
    fn ipv6_brackets_are_stripped() {
        let (host, port, _) = host_of(b"[::1]:80", false).unwrap();
        assert_eq!(host, b"::1");
        assert_eq!(port.as_deref(), Some(&b"80"[..]));
    }

    #[test]
    fn unterminated_forms_fail() {
        assert!(host_of(b"[::1", false).is_none());
        assert!(host_of(b"example.com:", false).is_none());
        assert!(host_of(b"user@", true).is_none());
        assert!(host_of(b"", false).is_none());
    }
}
