//! Administrator authentication over HTTP Basic credentials.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::config::AdminCredentials;

const BASIC_SCHEME: &str = "Basic";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing credentials")]
    Missing,
    #[error("malformed authorization header")]
    Malformed,
    #[error("invalid credentials")]
    Invalid,
}

/// Lowercase hex SHA-256 of `password` followed by `salt`.
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Clone)]
pub struct AdminAuthenticator {
    credentials: AdminCredentials,
}

impl AdminAuthenticator {
    pub fn new(credentials: AdminCredentials) -> Self {
        Self { credentials }
    }

    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    /// Check an `Authorization` header value, returning the authenticated username.
    pub fn authenticate(&self, header: Option<&str>) -> Result<String, AuthError> {
        let header = header.ok_or(AuthError::Missing)?;
        let (username, password) = parse_basic(header)?;
        self.verify(&username, &password)?;
        Ok(username)
    }

    pub fn verify(&self, username: &str, password: &str) -> Result<(), AuthError> {
        let expected = &self.credentials;
        let digest = hash_password(password, &expected.salt);

        // Evaluate both comparisons so timing does not reveal which one failed.
        let user_ok = username
            .as_bytes()
            .ct_eq(expected.username.as_bytes())
            .unwrap_u8();
        let pass_ok = digest
            .as_bytes()
            .ct_eq(expected.password_digest.as_bytes())
            .unwrap_u8();

        if user_ok & pass_ok == 1 {
            Ok(())
        } else {
            Err(AuthError::Invalid)
        }
    }
}

fn parse_basic(header: &str) -> Result<(String, String), AuthError> {
    let (scheme, encoded) = header.trim().split_once(' ').ok_or(AuthError::Malformed)?;
    if !scheme.eq_ignore_ascii_case(BASIC_SCHEME) {
        return Err(AuthError::Malformed);
    }

    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| AuthError::Malformed)?;
    let decoded = String::from_utf8(decoded).map_err(|_| AuthError::Malformed)?;
    let (username, password) = decoded.split_once(':').ok_or(AuthError::Malformed)?;

    Ok((username.to_string(), password.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authenticator() -> AdminAuthenticator {
        AdminAuthenticator::new(AdminCredentials {
            username: "editor".to_string(),
            password_digest: hash_password("s3cret", "salt"),
            salt: "salt".to_string(),
        })
    }

    fn basic(user_pass: &str) -> String {
        format!("Basic {}", STANDARD.encode(user_pass))
    }

    #[test]
    fn hash_matches_known_digest() {
        // sha256("abc")
        assert_eq!(
            hash_password("ab", "c"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn valid_credentials_authenticate() {
        let auth = authenticator();
        let user = auth
            .authenticate(Some(&basic("editor:s3cret")))
            .expect("authenticated");
        assert_eq!(user, "editor");
    }

    #[test]
    fn password_may_contain_colons() {
        let auth = AdminAuthenticator::new(AdminCredentials {
            username: "editor".to_string(),
            password_digest: hash_password("a:b", ""),
            salt: String::new(),
        });
        assert!(auth.authenticate(Some(&basic("editor:a:b"))).is_ok());
    }

    #[test]
    fn wrong_credentials_are_rejected() {
        let auth = authenticator();
        assert_eq!(
            auth.authenticate(Some(&basic("editor:nope"))),
            Err(AuthError::Invalid)
        );
        assert_eq!(
            auth.authenticate(Some(&basic("someone:s3cret"))),
            Err(AuthError::Invalid)
        );
    }

    #[test]
    fn missing_or_malformed_headers() {
        let auth = authenticator();
        assert_eq!(auth.authenticate(None), Err(AuthError::Missing));
        assert_eq!(
            auth.authenticate(Some("Bearer token")),
            Err(AuthError::Malformed)
        );
        assert_eq!(
            auth.authenticate(Some("Basic !!!")),
            Err(AuthError::Malformed)
        );
        assert_eq!(
            auth.authenticate(Some(&format!("Basic {}", STANDARD.encode("nocolon")))),
            Err(AuthError::Malformed)
        );
    }
}
