use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};

pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("password must be at least {MIN_PASSWORD_LENGTH} characters in length")]
    WeakCredential,
    #[error("Password hash failed: {0}")]
    Hash(argon2::password_hash::Error),
}

pub fn check_strength(password: &str) -> Result<(), Error> {
    if password.trim().is_empty() || password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(Error::WeakCredential);
    }
    Ok(())
}

/// Salted argon2 hash in PHC string form.
pub fn hash(password: &str) -> Result<String, Error> {
    check_strength(password)?;
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(Error::Hash)
}

pub fn verify(password: &str, stored_hash: &str) -> bool {
    let parsed = match PasswordHash::new(stored_hash) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::warn!("stored password hash could not be parsed: {err}");
            return false;
        }
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn salted_hashes_differ_but_both_verify() {
        let first = hash("longenough1").expect("should hash");
        let second = hash("longenough1").expect("should hash");
        assert_ne!(first, second, "each hash should carry its own salt");
        assert_ne!(first, "longenough1");
        assert!(verify("longenough1", &first));
        assert!(verify("longenough1", &second));
    }

    #[test]
    fn wrong_password_does_not_verify() {
        let stored = hash("longenough1").expect("should hash");
        assert!(!verify("longenough2", &stored));
        assert!(!verify("", &stored));
    }

    #[test]
    fn short_or_blank_passwords_are_weak() {
        assert!(matches!(hash(""), Err(Error::WeakCredential)));
        assert!(matches!(hash("short"), Err(Error::WeakCredential)));
        assert!(matches!(hash("        "), Err(Error::WeakCredential)));
    }

    #[test]
    fn garbage_stored_hash_verifies_as_false() {
        assert!(!verify("longenough1", "not-a-phc-string"));
        assert!(!verify("longenough1", ""));
    }
}
