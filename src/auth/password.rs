use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::error;

const SPECIALS: &str = "@$!%*?.&";

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Password complexity rules; strict in production, relaxed elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordPolicy {
    Strict,
    Relaxed,
}

impl PasswordPolicy {
    pub fn for_mode(production: bool) -> Self {
        if production {
            PasswordPolicy::Strict
        } else {
            PasswordPolicy::Relaxed
        }
    }

    pub fn min_len(self) -> usize {
        match self {
            PasswordPolicy::Strict => 8,
            PasswordPolicy::Relaxed => 4,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            PasswordPolicy::Strict => {
                "Password: Min 8 characters, with an uppercase, a lowercase, a number, and a special character."
            }
            PasswordPolicy::Relaxed => "Password: Min 4 characters, with a lowercase and a number.",
        }
    }

    pub fn check(self, password: &str) -> Result<(), &'static str> {
        lazy_static! {
            static ref ALLOWED_RE: Regex = Regex::new(r"^[A-Za-z0-9@$!%*?.&]+$").unwrap();
        }
        let long_enough = password.chars().count() >= self.min_len();
        let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
        let has_digit = password.chars().any(|c| c.is_ascii_digit());
        let mut ok = long_enough && has_lower && has_digit && ALLOWED_RE.is_match(password);
        if self == PasswordPolicy::Strict {
            ok = ok
                && password.chars().any(|c| c.is_ascii_uppercase())
                && password.chars().any(|c| SPECIALS.contains(c));
        }
        if ok {
            Ok(())
        } else {
            Err(self.message())
        }
    }
}
