//! Encoding utilities for the record worker.
//! Base58 for keys and signatures (wallet convention), base64 for binary payloads.

use base64ct::{Base64, Encoding};

use crate::config::ED25519_PUBLIC_KEY_SIZE;

// === BASE58 (WALLET KEYS AND SIGNATURES) ===

pub fn base58_encode(data: &[u8]) -> String {
    bs58::encode(data).into_string()
}

pub fn base58_decode(input: &str) -> Result<Vec<u8>, String> {
    bs58::decode(input)
        .into_vec()
        .map_err(|e| format!("Base58 decode error: {}", e))
}

/// Decode a base58 wallet public key into its fixed 32-byte form.
pub fn decode_public_key_b58(input: &str) -> Result<[u8; ED25519_PUBLIC_KEY_SIZE], String> {
    let bytes = base58_decode(input)?;
    bytes.as_slice().try_into().map_err(|_| {
        format!(
            "Public key must be {} bytes, got {}",
            ED25519_PUBLIC_KEY_SIZE,
            bytes.len()
        )
    })
}

// === BASE64 STANDARD (FOR JSON/HTTP OPERATIONS) ===

/// Encode bytes to a standard base64 string.
/// Sealed record blobs travel as standard base64 inside JSON bodies.
pub fn base64_standard_encode(data: &[u8]) -> String {
    Base64::encode_string(data)
}

pub fn base64_standard_decode(input: &str) -> Result<Vec<u8>, String> {
    Base64::decode_vec(input).map_err(|e| format!("Base64 decode error: {}", e))
}
