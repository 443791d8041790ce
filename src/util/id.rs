//! Engine identity tokens

use crate::error::{MkError, Result};

/// Number of random bytes in a token; the hex form is twice as long.
pub const ID_BYTES: usize = 32;

/// Generate a 64-character lowercase hex token from the OS random source.
///
/// A failing random source is not retryable; callers are expected to treat
/// the error as fatal.
pub fn generate_id() -> Result<String> {
    let mut bytes = [0u8; ID_BYTES];
    getrandom::getrandom(&mut bytes).map_err(|e| MkError::Entropy(e.to_string()))?;
    Ok(bytes.iter().map(|b| format!("{:02x}", b)).collect())
}
