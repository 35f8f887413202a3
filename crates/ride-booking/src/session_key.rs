use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine};
use tower_sessions::cookie::Key;

/// Bytes `Key::from` needs for its signing and encryption halves.
pub const MIN_KEY_LENGTH: usize = 64;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Base64 decoding error: {0}")]
    Base64Decode(#[from] base64::DecodeError),
    #[error("Session secret too short: {0} bytes, need at least {MIN_KEY_LENGTH}")]
    TooShort(usize),
}

/// Cookie signing key from the base64 `session-secret`; padding is optional.
pub fn create(secret: &str) -> Result<Key, Error> {
    let key = STANDARD_NO_PAD.decode(secret.trim().trim_end_matches('=').as_bytes())?;
    if key.len() < MIN_KEY_LENGTH {
        return Err(Error::TooShort(key.len()));
    }
    Ok(Key::from(&key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_padded_and_unpadded_secrets() {
        let bytes = [7u8; MIN_KEY_LENGTH];
        let unpadded = STANDARD_NO_PAD.encode(bytes);
        let padded = base64::engine::general_purpose::STANDARD.encode(bytes);
        let first = create(&unpadded).expect("unpadded secret");
        let second = create(&padded).expect("padded secret");
        assert_eq!(first.master(), second.master());
    }

    #[test]
    fn rejects_short_or_garbled_secrets() {
        assert!(matches!(
            create(&STANDARD_NO_PAD.encode([1u8; 16])),
            Err(Error::TooShort(16))
        ));
        assert!(matches!(create("not base64!"), Err(Error::Base64Decode(_))));
    }
}
