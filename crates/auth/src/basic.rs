//! `Authorization: Basic ...` decoding for machine clients.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BasicAuthError {
    #[error("authorization header is not basic auth")]
    NotBasic,

    #[error("credentials are not valid base64")]
    Encoding,

    #[error("credentials are missing the ':' separator")]
    Format,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl BasicCredentials {
    /// Parse the raw header value, e.g. `Basic dXNlcjpwYXNz`.
    pub fn from_header(value: &str) -> Result<Self, BasicAuthError> {
        let (scheme, encoded) = value.trim().split_once(' ').ok_or(BasicAuthError::NotBasic)?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return Err(BasicAuthError::NotBasic);
        }

        let decoded = STANDARD
            .decode(encoded.trim())
            .map_err(|_| BasicAuthError::Encoding)?;
        let decoded = String::from_utf8(decoded).map_err(|_| BasicAuthError::Encoding)?;

        // Passwords may contain ':'; only the first one separates.
        let (username, password) = decoded.split_once(':').ok_or(BasicAuthError::Format)?;
        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    /// Render as a header value (used by clients and tests).
    pub fn to_header(&self) -> String {
        format!("Basic {}", STANDARD.encode(format!("{}:{}", self.username, self.password)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_standard_header() {
        let creds = BasicCredentials::from_header("Basic dXNlcjpwYXNz").unwrap();
        assert_eq!(creds.username, "user");
        assert_eq!(creds.password, "pass");
    }

    #[test]
    fn rejects_other_schemes_and_garbage() {
        assert_eq!(BasicCredentials::from_header("Bearer abc"), Err(BasicAuthError::NotBasic));
        assert_eq!(BasicCredentials::from_header("Basic !!!"), Err(BasicAuthError::Encoding));
        // "nocolon"
        assert_eq!(BasicCredentials::from_header("Basic bm9jb2xvbg=="), Err(BasicAuthError::Format));
    }

    proptest! {
        #[test]
        fn header_round_trips(user in "[a-zA-Z0-9_-]{1,24}", pass in "[ -~]{0,32}") {
            let creds = BasicCredentials { username: user, password: pass };
            let parsed = BasicCredentials::from_header(&creds.to_header()).unwrap();
            prop_assert_eq!(parsed, creds);
        }
    }
}
