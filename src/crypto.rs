use crypto_box::aead::OsRng;
use crypto_box::{PublicKey, SecretKey};
use ed25519_dalek::{Signature, SigningKey, Verifier, VerifyingKey};
use getrandom::getrandom;
use log::debug;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::config::{
    DERIVED_SEED_SIZE, ED25519_PUBLIC_KEY_SIZE, ED25519_SIGNATURE_SIZE, SEALED_BOX_OVERHEAD,
    X25519_KEY_SIZE,
};
use crate::encoders::base58_encode;
use crate::error::RecordFlowError;

// === AUTHENTICATION PROOF ===

/// Verified wallet signature over the authentication challenge.
/// Held only in session memory and wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct AuthenticationProof {
    signature: [u8; ED25519_SIGNATURE_SIZE],
}

impl AuthenticationProof {
    pub fn as_bytes(&self) -> &[u8; ED25519_SIGNATURE_SIZE] {
        &self.signature
    }

    /// Base58 rendering for display/audit.
    pub fn signature_b58(&self) -> String {
        base58_encode(&self.signature)
    }
}

impl std::fmt::Debug for AuthenticationProof {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthenticationProof([REDACTED])")
    }
}

/// Verify a detached Ed25519 signature over the exact challenge bytes.
///
/// Any malformed input (wrong signature length, public key not on the curve)
/// is reported as `InvalidSignature`, same as a mismatch.
pub fn verify_wallet_signature(
    message: &[u8],
    signature: &[u8],
    public_key: &[u8; ED25519_PUBLIC_KEY_SIZE],
) -> Result<AuthenticationProof, RecordFlowError> {
    let signature_bytes: [u8; ED25519_SIGNATURE_SIZE] = signature
        .try_into()
        .map_err(|_| RecordFlowError::InvalidSignature)?;
    let verifying_key =
        VerifyingKey::from_bytes(public_key).map_err(|_| RecordFlowError::InvalidSignature)?;

    verifying_key
        .verify(message, &Signature::from_bytes(&signature_bytes))
        .map_err(|_| RecordFlowError::InvalidSignature)?;

    Ok(AuthenticationProof {
        signature: signature_bytes,
    })
}

// === KEY DERIVATION ===

/// SHA-256 of the raw signature bytes; seed material for the record key pair.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedSeed([u8; DERIVED_SEED_SIZE]);

impl DerivedSeed {
    pub fn from_proof(proof: &AuthenticationProof) -> Self {
        Self::from_signature_bytes(proof.as_bytes())
    }

    pub fn from_signature_bytes(signature: &[u8]) -> Self {
        let digest = Sha256::digest(signature);
        let mut seed = [0u8; DERIVED_SEED_SIZE];
        seed.copy_from_slice(&digest);
        Self(seed)
    }

    pub fn as_bytes(&self) -> &[u8; DERIVED_SEED_SIZE] {
        &self.0
    }
}

/// X25519 key pair used to seal record files.
///
/// Obtained from the Ed25519 key pair seeded by `DerivedSeed`: the public half
/// is the Montgomery form of the verifying key, the secret half is the
/// (X25519-clamped) Ed25519 signing scalar. The secret never leaves the worker.
pub struct EncryptionKeyPair {
    public: PublicKey,
    secret: SecretKey,
}

impl EncryptionKeyPair {
    pub fn derive(seed: &DerivedSeed) -> Self {
        let signing_key = SigningKey::from_bytes(seed.as_bytes());
        let public_bytes: [u8; X25519_KEY_SIZE] =
            signing_key.verifying_key().to_montgomery().to_bytes();
        let mut scalar_bytes: [u8; X25519_KEY_SIZE] = signing_key.to_scalar_bytes();
        let secret = SecretKey::from(scalar_bytes);
        scalar_bytes.zeroize();

        Self {
            public: PublicKey::from(public_bytes),
            secret,
        }
    }

    pub fn from_proof(proof: &AuthenticationProof) -> Self {
        Self::derive(&DerivedSeed::from_proof(proof))
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub fn public_key_bytes(&self) -> [u8; X25519_KEY_SIZE] {
        *self.public.as_bytes()
    }

    /// Base58 form sent to the record service as `encryption_key`.
    pub fn public_key_b58(&self) -> String {
        base58_encode(self.public.as_bytes())
    }

    pub(crate) fn secret_key_bytes(&self) -> [u8; X25519_KEY_SIZE] {
        self.secret.to_bytes()
    }
}

impl std::fmt::Debug for EncryptionKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKeyPair")
            .field("public", &self.public_key_b58())
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

// === SEALED BOX ENCRYPTION ===

/// Check that the environment can supply secure randomness.
/// Sealing needs a fresh ephemeral key per file.
pub fn ensure_crypto_ready() -> Result<(), RecordFlowError> {
    let mut probe = [0u8; 1];
    getrandom(&mut probe).map_err(|e| RecordFlowError::CryptoNotReady(e.to_string()))
}

/// Seal `plaintext` for `recipient` (anonymous sender, libsodium
/// `crypto_box_seal` layout: ephemeral public key || ciphertext || tag).
pub fn seal_record(
    plaintext: &[u8],
    recipient: &PublicKey,
    max_plaintext_bytes: usize,
) -> Result<Vec<u8>, RecordFlowError> {
    if plaintext.is_empty() {
        return Err(RecordFlowError::EncryptionFailed(
            "Selected file is empty or unreadable".to_string(),
        ));
    }
    if plaintext.len() > max_plaintext_bytes {
        return Err(RecordFlowError::EncryptionFailed(format!(
            "File is {} bytes, maximum is {} bytes",
            plaintext.len(),
            max_plaintext_bytes
        )));
    }
    ensure_crypto_ready()?;

    let sealed = recipient
        .seal(&mut OsRng, plaintext)
        .map_err(|e| RecordFlowError::EncryptionFailed(format!("Sealing failed: {}", e)))?;

    debug!(
        "Sealed {} plaintext bytes into {} bytes",
        plaintext.len(),
        sealed.len()
    );
    Ok(sealed)
}

/// Open a sealed blob with the record key pair.
pub fn open_sealed_record(
    sealed: &[u8],
    keypair: &EncryptionKeyPair,
) -> Result<Vec<u8>, RecordFlowError> {
    if sealed.len() < SEALED_BOX_OVERHEAD {
        return Err(RecordFlowError::EncryptionFailed(format!(
            "Sealed record must be at least {} bytes",
            SEALED_BOX_OVERHEAD
        )));
    }
    keypair.secret.unseal(sealed).map_err(|_| {
        RecordFlowError::EncryptionFailed("Sealed record could not be opened".to_string())
    })
}
