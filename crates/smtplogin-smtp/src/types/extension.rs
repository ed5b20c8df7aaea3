//! SMTP extension types.

use std::collections::HashMap;

/// Extensions announced by the server in its EHLO response.
///
/// Keywords are stored upper-cased; parameters are kept verbatim so that
/// callers can inspect them exactly as the server sent them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    entries: HashMap<String, String>,
}

impl Capabilities {
    /// Builds the table from EHLO reply lines (greeting line excluded).
    pub fn parse<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let mut entries = HashMap::new();
        for line in lines {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (keyword, params) = line
                .split_once(' ')
                .map_or((line, ""), |(k, p)| (k, p.trim()));
            entries.insert(keyword.to_ascii_uppercase(), params.to_string());
        }
        Self { entries }
    }

    /// Looks up an extension by name (case-insensitive) and returns its parameters.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_uppercase())
            .map(String::as_str)
    }

    /// Returns true if the extension was announced.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns the AUTH mechanism names exactly as advertised.
    #[must_use]
    pub fn auth_mechanisms(&self) -> Vec<String> {
        self.get("AUTH")
            .map(|params| params.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Number of announced extensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the server announced nothing (e.g. after a HELO fallback).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// SASL authentication mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMechanism {
    /// PLAIN - plaintext authentication
    Plain,
    /// LOGIN - legacy plaintext
    Login,
    /// CRAM-MD5 - challenge-response
    CramMd5,
}

impl AuthMechanism {
    /// Parses an authentication mechanism name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PLAIN" => Some(Self::Plain),
            "LOGIN" => Some(Self::Login),
            "CRAM-MD5" => Some(Self::CramMd5),
            _ => None,
        }
    }

    /// Returns the mechanism name as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::Login => "LOGIN",
            Self::CramMd5 => "CRAM-MD5",
        }
    }
}

impl std::fmt::Display for AuthMechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    mod capabilities_tests {
        use super::*;

        fn ehlo(lines: &[&str]) -> Capabilities {
            Capabilities::parse(lines.iter().copied())
        }

        #[test]
        fn parse_starttls() {
            assert!(ehlo(&["STARTTLS"]).contains("starttls"));
        }

        #[test]
        fn lookup_is_case_insensitive() {
            let caps = ehlo(&["starttls", "Auth LOGIN PLAIN"]);
            assert!(caps.contains("STARTTLS"));
            assert_eq!(caps.get("auth"), Some("LOGIN PLAIN"));
        }

        #[test]
        fn parameters_are_verbatim() {
            let caps = ehlo(&["SIZE 52428800", "AUTH  CRAM-MD5 login"]);
            assert_eq!(caps.get("SIZE"), Some("52428800"));
            assert_eq!(caps.auth_mechanisms(), vec!["CRAM-MD5", "login"]);
        }

        #[test]
        fn keyword_without_params() {
            let caps = ehlo(&["PIPELINING"]);
            assert_eq!(caps.get("PIPELINING"), Some(""));
        }

        #[test]
        fn missing_auth() {
            let caps = ehlo(&["8BITMIME"]);
            assert!(caps.get("AUTH").is_none());
            assert!(caps.auth_mechanisms().is_empty());
        }

        #[test]
        fn blank_lines_are_skipped() {
            let caps = ehlo(&["", "  "]);
            assert!(caps.is_empty());
            assert_eq!(caps.len(), 0);
        }
    }

    mod auth_mechanism_tests {
        use super::*;

        #[test]
        fn parse_plain() {
            assert_eq!(AuthMechanism::parse("PLAIN"), Some(AuthMechanism::Plain));
            assert_eq!(AuthMechanism::parse("plain"), Some(AuthMechanism::Plain));
        }

        #[test]
        fn parse_login() {
            assert_eq!(AuthMechanism::parse("LOGIN"), Some(AuthMechanism::Login));
        }

        #[test]
        fn parse_cram_md5() {
            assert_eq!(
                AuthMechanism::parse("CRAM-MD5"),
                Some(AuthMechanism::CramMd5)
            );
        }

        #[test]
        fn parse_unknown() {
            assert_eq!(AuthMechanism::parse("XOAUTH2"), None);
        }

        #[test]
        fn as_str() {
            assert_eq!(AuthMechanism::Plain.as_str(), "PLAIN");
            assert_eq!(AuthMechanism::Login.as_str(), "LOGIN");
            assert_eq!(AuthMechanism::CramMd5.to_string(), "CRAM-MD5");
        }
    }
}
