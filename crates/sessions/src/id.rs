use std::fmt;

use serde::Serialize;

/// Validated session identifier: one or more of `[A-Za-z0-9_-]`.
///
/// Session ids are externally supplied opaque names; this newtype is the
/// single place the character rule lives. Everything downstream (guards,
/// webhook envelopes, engine lookups) carries the raw string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

/// Rejection for identifiers outside the allowed alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Session should be alphanumerical or -")]
pub struct SessionIdError;

impl SessionId {
    /// Parse an externally-supplied identifier.
    pub fn parse(raw: &str) -> Result<Self, SessionIdError> {
        let valid = !raw.is_empty()
            && raw
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
        if !valid {
            return Err(SessionIdError);
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_word_chars_and_hyphens() {
        for raw in ["1", "abc", "f8377d8d-a589-4242-9ba6-9486a04ef80c", "a_b-C9"] {
            assert_eq!(SessionId::parse(raw).unwrap().as_str(), raw);
        }
    }

    #[test]
    fn rejects_everything_else() {
        for raw in ["", "ABCD1@", "a b", "sess/1", "naïve", "x.y"] {
            assert_eq!(SessionId::parse(raw), Err(SessionIdError));
        }
    }
}
