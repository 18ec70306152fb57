//! hex / base64 wrappers for moving boc bytes through text channels.
//!
//! no structural validation happens here.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{Error, Result};

pub fn encode_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// decode hex, ignoring surrounding whitespace
pub fn decode_hex(s: &str) -> Result<Vec<u8>> {
    let trimmed = s.trim();
    hex::decode(trimmed).map_err(|e| Error::InvalidHex(format!("{}: {}", trimmed, e)))
}

pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// decode standard padded base64, ignoring surrounding whitespace
pub fn decode_base64(s: &str) -> Result<Vec<u8>> {
    Ok(STANDARD.decode(s.trim())?)
}
