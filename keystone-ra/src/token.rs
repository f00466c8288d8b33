/// Random tokens for challenges, recovery and URL suffixes
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use once_cell::sync::Lazy;
use ring::rand::{SecureRandom, SystemRandom};

/// Bytes of entropy in a challenge or recovery token
pub const TOKEN_BYTES: usize = 32;

static RNG: Lazy<SystemRandom> = Lazy::new(SystemRandom::new);

/// Fill a buffer of `len` bytes from the system CSPRNG
pub fn random_bytes(len: usize) -> Result<Vec<u8>, ring::error::Unspecified> {
    let mut buf = vec![0u8; len];
    RNG.fill(&mut buf)?;
    Ok(buf)
}

/// Random base64url string carrying `len` bytes of entropy
pub fn random_string(len: usize) -> Result<String, ring::error::Unspecified> {
    random_bytes(len).map(|bytes| URL_SAFE_NO_PAD.encode(bytes))
}

/// Fresh opaque token (challenge tokens, recovery tokens)
pub fn new_token() -> Result<String, ring::error::Unspecified> {
    random_string(TOKEN_BYTES)
}
