//! Password-based sealing of snapshot text.
//!
//! Layout of a sealed artifact, before base64:
//!
//! ```text
//! salt (16) | nonce (12) | AES-256-GCM ciphertext + tag
//! ```

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use sha2::Sha256;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;
const TAG_LEN: usize = 16;
pub const PBKDF2_ROUNDS: u32 = 100_000;

/// Opaque failure: the caller cannot tell a wrong password from a damaged
/// artifact, and neither can we.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenError;

fn derive_key(password: &str, salt: &[u8]) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ROUNDS, &mut key);
    key
}

/// Encrypt `plaintext` under `password` and return base64 text.
pub fn seal(plaintext: &str, password: &str) -> Result<String, OpenError> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    let mut rng = rand::thread_rng();
    rng.fill_bytes(&mut salt);
    rng.fill_bytes(&mut nonce);

    let key = derive_key(password, &salt);
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| OpenError)?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
        .map_err(|_| OpenError)?;

    let mut out = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&salt);
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(out))
}

/// Reverse of [`seal`]. Every failure mode collapses into [`OpenError`],
/// including an empty or non-UTF-8 plaintext.
pub fn open(artifact: &str, password: &str) -> Result<String, OpenError> {
    let raw = STANDARD.decode(artifact.trim()).map_err(|_| OpenError)?;
    if raw.len() < SALT_LEN + NONCE_LEN + TAG_LEN {
        return Err(OpenError);
    }
    let (salt, rest) = raw.split_at(SALT_LEN);
    let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

    let key = derive_key(password, salt);
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| OpenError)?;
    let plain = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| OpenError)?;

    let text = String::from_utf8(plain).map_err(|_| OpenError)?;
    if text.is_empty() {
        return Err(OpenError);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_then_open() {
        let sealed = seal("hello arbor", "secret1").unwrap();
        assert_eq!(open(&sealed, "secret1").unwrap(), "hello arbor");
    }

    #[test]
    fn salt_makes_output_differ() {
        let a = seal("same", "secret1").unwrap();
        let b = seal("same", "secret1").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_password_is_opaque() {
        let sealed = seal("payload", "secret1").unwrap();
        assert_eq!(open(&sealed, "secret2"), Err(OpenError));
    }

    #[test]
    fn garbage_is_opaque() {
        assert_eq!(open("not base64 at all!", "secret1"), Err(OpenError));
        assert_eq!(open(&STANDARD.encode([0u8; 8]), "secret1"), Err(OpenError));
        assert_eq!(open("", "secret1"), Err(OpenError));
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let sealed = seal("payload", "secret1").unwrap();
        let mut raw = STANDARD.decode(&sealed).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        assert_eq!(open(&STANDARD.encode(raw), "secret1"), Err(OpenError));
    }

    #[test]
    fn empty_plaintext_is_rejected_on_open() {
        let sealed = seal("", "secret1").unwrap();
        assert_eq!(open(&sealed, "secret1"), Err(OpenError));
    }
}
