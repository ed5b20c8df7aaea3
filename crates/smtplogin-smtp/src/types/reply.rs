//! SMTP reply types.

use crate::error::Error;

/// A complete server reply, possibly spanning several lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Reply code shared by every line.
    pub code: ReplyCode,
    /// Text of each line with the code and separator removed.
    pub lines: Vec<String>,
}

impl Reply {
    /// Creates a reply.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(code: ReplyCode, lines: Vec<String>) -> Self {
        Self { code, lines }
    }

    /// Returns true for a 2xx completion reply.
    #[must_use]
    pub const fn is_positive(&self) -> bool {
        self.code.class() == 2
    }

    /// Returns the first line, which carries the payload of a 334 reply.
    #[must_use]
    pub fn first_line(&self) -> &str {
        self.lines.first().map_or("", String::as_str)
    }

    /// Returns all lines joined with newlines.
    #[must_use]
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Converts a refusal into [`Error::SmtpError`].
    #[must_use]
    pub fn into_error(self) -> Error {
        Error::smtp_error(self.code.as_u16(), self.text())
    }
}

/// Three-digit SMTP reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReplyCode(u16);

impl ReplyCode {
    /// 220 Service ready (greeting, or go-ahead for STARTTLS)
    pub const SERVICE_READY: Self = Self(220);
    /// 221 Closing transmission channel
    pub const CLOSING: Self = Self(221);
    /// 235 Authentication succeeded
    pub const AUTH_SUCCESS: Self = Self(235);
    /// 250 Requested action completed
    pub const OK: Self = Self(250);
    /// 334 Server challenge, continue authentication
    pub const AUTH_CONTINUE: Self = Self(334);

    /// Creates a reply code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Returns the numeric code.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns the leading digit: 2 done, 3 continue, 4 try later, 5 refused.
    #[must_use]
    pub const fn class(self) -> u16 {
        self.0 / 100
    }
}

impl std::fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
