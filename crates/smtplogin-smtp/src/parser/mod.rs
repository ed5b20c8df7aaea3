//! Reply parsing.
//!
//! Every reply line starts with a three-digit code. A `-` after the code
//! means more lines follow; a space, or nothing at all, ends the reply:
//!
//! ```text
//! 250-mail.example.com
//! 250-STARTTLS
//! 250 AUTH PLAIN LOGIN
//! ```

use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

/// A single reply line split into its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyLine<'a> {
    /// The line's code.
    pub code: ReplyCode,
    /// True if this line ends the reply.
    pub last: bool,
    /// Text after the separator.
    pub text: &'a str,
}

/// Splits one reply line (without its CRLF).
///
/// # Errors
///
/// Returns [`Error::Protocol`] if the line does not start with a
/// three-digit code followed by `-`, a space, or the end of the line.
pub fn parse_line(line: &str) -> Result<ReplyLine<'_>> {
    let malformed = || Error::Protocol(format!("Malformed reply line: {line:?}"));

    let digits = line.get(..3).ok_or_else(malformed)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    let code = digits.parse().map_err(|_| malformed())?;

    let (last, text) = match line.as_bytes().get(3) {
        None => (true, ""),
        Some(b' ') => (true, &line[4..]),
        Some(b'-') => (false, &line[4..]),
        Some(_) => return Err(malformed()),
    };

    Ok(ReplyLine {
        code: ReplyCode::new(code),
        last,
        text,
    })
}

/// Assembles a reply from its lines.
///
/// # Errors
///
/// Returns [`Error::Protocol`] if there are no lines, a line is malformed,
/// the codes disagree, or the reply ends early.
pub fn parse_reply(lines: &[String]) -> Result<Reply> {
    let (first, rest) = lines
        .split_first()
        .ok_or_else(|| Error::Protocol("Empty reply".into()))?;
    let head = parse_line(first)?;

    let mut text = vec![head.text.to_string()];
    let mut last = head.last;
    for line in rest {
        if last {
            return Err(Error::Protocol(format!("Line after end of reply: {line:?}")));
        }
        let parsed = parse_line(line)?;
        if parsed.code != head.code {
            return Err(Error::Protocol(format!(
                "Reply code changed from {} to {}",
                head.code, parsed.code
            )));
        }
        text.push(parsed.text.to_string());
        last = parsed.last;
    }

    if !last {
        return Err(Error::Protocol("Reply ended without a final line".into()));
    }
    Ok(Reply::new(head.code, text))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn owned(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|l| (*l).to_string()).collect()
    }

    #[test]
    fn test_parse_line() {
        let line = parse_line("250-PIPELINING").unwrap();
        assert_eq!(line.code, ReplyCode::OK);
        assert!(!line.last);
        assert_eq!(line.text, "PIPELINING");

        let line = parse_line("235 2.7.0 Accepted").unwrap();
        assert!(line.last);
        assert_eq!(line.text, "2.7.0 Accepted");
    }

    #[test]
    fn test_bare_code_ends_reply() {
        // An empty 334 challenge arrives as "334 " and the space is trimmed
        let line = parse_line("334").unwrap();
        assert_eq!(line.code, ReplyCode::AUTH_CONTINUE);
        assert!(line.last);
        assert_eq!(line.text, "");
    }

    #[test]
    fn test_malformed_lines() {
        for line in ["", "25", "ABC OK", "25O OK", "250_OK", "+OK", "2é0 x"] {
            assert!(parse_line(line).is_err(), "{line:?}");
        }
    }

    #[test]
    fn test_parse_ehlo_reply() {
        let reply = parse_reply(&owned(&[
            "250-smtp.example.com",
            "250-STARTTLS",
            "250 AUTH LOGIN PLAIN",
        ]))
        .unwrap();
        assert_eq!(reply.code, ReplyCode::OK);
        assert_eq!(reply.lines[1..], ["STARTTLS", "AUTH LOGIN PLAIN"]);
    }

    #[test]
    fn test_parse_challenge() {
        let reply = parse_reply(&owned(&["334 VXNlcm5hbWU6"])).unwrap();
        assert_eq!(reply.first_line(), "VXNlcm5hbWU6");
    }

    #[test]
    fn test_reject_inconsistent_replies() {
        assert!(parse_reply(&[]).is_err());
        assert!(parse_reply(&owned(&["250-first", "550 second"])).is_err());
        assert!(parse_reply(&owned(&["250 done", "250 again"])).is_err());
        assert!(parse_reply(&owned(&["250-more to come"])).is_err());
    }
}
