use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};

pub const VERIFY_TOKEN_LEN: usize = 50;
pub const RESET_TOKEN_LEN: usize = 80;

/// Opaque `[A-Za-z0-9]` token used for email verification and password reset.
pub fn generate_token(len: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
