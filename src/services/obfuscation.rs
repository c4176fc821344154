//! Password obfuscation for `sql_connect.json`
//!
//! A Fernet token keyed by the OS user name, wrapped in standard base64.
//! Anyone who knows the user name can reverse it; it only keeps passwords
//! from sitting in the file as plain text. Files written by earlier builds of
//! the tool use the same scheme and stay readable.

use crate::errors::{AppError, AppResult};
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use fernet::Fernet;
use std::env;

const KEY_LEN: usize = 32;

/// Login name from the environment, checked in `LOGNAME`, `USER`, `LNAME`, `USERNAME` order
pub fn os_user_name() -> String {
    ["LOGNAME", "USER", "LNAME", "USERNAME"]
        .iter()
        .find_map(|var| env::var(var).ok().filter(|v| !v.is_empty()))
        .unwrap_or_default()
}

/// Fernet key: the user name's UTF-8 bytes cut or zero-padded to 32, url-safe base64
pub fn key_for_user(user: &str) -> String {
    let mut raw = [0u8; KEY_LEN];
    let bytes = user.as_bytes();
    let len = bytes.len().min(KEY_LEN);
    raw[..len].copy_from_slice(&bytes[..len]);
    URL_SAFE.encode(raw)
}

pub struct Obfuscator {
    fernet: Fernet,
}

impl Obfuscator {
    pub fn for_user(user: &str) -> AppResult<Self> {
        let fernet = Fernet::new(&key_for_user(user))
            .ok_or_else(|| AppError::Obfuscation("invalid key material".to_string()))?;
        Ok(Self { fernet })
    }

    pub fn for_current_user() -> AppResult<Self> {
        Self::for_user(&os_user_name())
    }

    pub fn obfuscate(&self, password: &str) -> String {
        let token = self.fernet.encrypt(password.as_bytes());
        STANDARD.encode(token.as_bytes())
    }

    pub fn reveal(&self, stored: &str) -> AppResult<String> {
        let token_bytes = STANDARD
            .decode(stored.trim())
            .map_err(|e| AppError::Obfuscation(format!("not base64: {}", e)))?;
        let token = String::from_utf8(token_bytes)
            .map_err(|e| AppError::Obfuscation(format!("token is not UTF-8: {}", e)))?;
        let plain = self
            .fernet
            .decrypt(&token)
            .map_err(|_| AppError::Obfuscation("token does not match this user".to_string()))?;
        String::from_utf8(plain)
            .map_err(|e| AppError::Obfuscation(format!("password is not UTF-8: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let obfuscator = Obfuscator::for_user("etl_user").unwrap();
        let stored = obfuscator.obfuscate("s3cr3t пароль");
        assert_ne!(stored, "s3cr3t пароль");
        assert_eq!(obfuscator.reveal(&stored).unwrap(), "s3cr3t пароль");
    }

    #[test]
    fn test_other_user_cannot_reveal() {
        let stored = Obfuscator::for_user("alice").unwrap().obfuscate("pw");
        let err = Obfuscator::for_user("bob").unwrap().reveal(&stored).unwrap_err();
        assert!(matches!(err, AppError::Obfuscation(_)));
    }

    #[test]
    fn test_key_is_zero_padded_user_name() {
        let key = key_for_user("alice");
        let raw = URL_SAFE.decode(&key).unwrap();
        assert_eq!(raw.len(), 32);
        assert_eq!(&raw[..5], b"alice");
        assert!(raw[5..].iter().all(|b| *b == 0));

        let long = key_for_user(&"x".repeat(40));
        assert_eq!(URL_SAFE.decode(long).unwrap(), vec![b'x'; 32]);
    }

    #[test]
    fn test_garbage_is_rejected() {
        let obfuscator = Obfuscator::for_user("alice").unwrap();
        assert!(obfuscator.reveal("%%%").is_err());
        assert!(obfuscator.reveal("").is_err());
    }
}
