// ABOUTME: Turns user-supplied credentials into an SSH authentication method.
// ABOUTME: Supports in-memory private keys, key files, and passwords.

use super::error::{Error, Result};
use russh::keys::{decode_secret_key, ssh_key};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Credential material supplied by the caller. Consumed once by [`authenticate`].
#[derive(Clone)]
pub enum Credential {
    /// OpenSSH/PEM private key text held in memory.
    PrivateKey(String),
    /// Path to a private key file.
    PrivateKeyFile(PathBuf),
    /// Plain password.
    Password(String),
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::PrivateKey(_) => f.write_str("PrivateKey(<redacted>)"),
            Credential::PrivateKeyFile(path) => {
                f.debug_tuple("PrivateKeyFile").field(path).finish()
            }
            Credential::Password(_) => f.write_str("Password(<redacted>)"),
        }
    }
}

/// Authentication method ready to be offered to the server.
#[derive(Clone)]
pub enum AuthMethod {
    PublicKey(Arc<ssh_key::PrivateKey>),
    Password(String),
}

impl AuthMethod {
    pub fn kind(&self) -> &'static str {
        match self {
            AuthMethod::PublicKey(_) => "publickey",
            AuthMethod::Password(_) => "password",
        }
    }
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthMethod({})", self.kind())
    }
}

/// Resolve a credential into an authentication method.
///
/// Key material is parsed here so a bad key is reported before any network
/// traffic. Passwords cannot fail at this stage; a wrong password surfaces
/// later as [`Error::AuthRejected`].
pub fn authenticate(credential: Credential) -> Result<AuthMethod> {
    match credential {
        Credential::PrivateKey(text) => parse_key(&text),
        Credential::PrivateKeyFile(path) => {
            let text = std::fs::read_to_string(&path).map_err(|source| Error::KeyRead {
                path: path.clone(),
                source,
            })?;
            tracing::debug!(path = %path.display(), "loaded private key file");
            parse_key(&text)
        }
        Credential::Password(password) => Ok(AuthMethod::Password(password)),
    }
}

fn parse_key(text: &str) -> Result<AuthMethod> {
    let key = decode_secret_key(text, None).map_err(Error::KeyParse)?;
    Ok(AuthMethod::PublicKey(Arc::new(key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_key_path() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/test_key")
    }

    #[test]
    fn password_is_accepted_without_validation() {
        let method = authenticate(Credential::Password("hunter2".to_string())).unwrap();
        assert!(matches!(method, AuthMethod::Password(ref p) if p == "hunter2"));
    }

    #[test]
    fn key_file_is_read_and_parsed() {
        let method = authenticate(Credential::PrivateKeyFile(fixture_key_path())).unwrap();
        assert_eq!(method.kind(), "publickey");
    }

    #[test]
    fn in_memory_key_is_parsed() {
        let text = std::fs::read_to_string(fixture_key_path()).unwrap();
        let method = authenticate(Credential::PrivateKey(text)).unwrap();
        assert_eq!(method.kind(), "publickey");
    }

    #[test]
    fn missing_key_file_is_a_read_error() {
        let err = authenticate(Credential::PrivateKeyFile("/nonexistent/id_rsa".into()))
            .unwrap_err();
        assert!(
            matches!(err, Error::KeyRead { .. }),
            "expected KeyRead, got: {err:?}"
        );
    }

    #[test]
    fn garbage_key_is_a_parse_error() {
        let err = authenticate(Credential::PrivateKey("not a key".to_string())).unwrap_err();
        assert!(
            matches!(err, Error::KeyParse(_)),
            "expected KeyParse, got: {err:?}"
        );
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let shown = format!("{:?}", Credential::Password("hunter2".to_string()));
        assert!(!shown.contains("hunter2"));
        let shown = format!("{:?}", Credential::PrivateKey("SECRET".to_string()));
        assert!(!shown.contains("SECRET"));
    }
}
