// ******************************************************************************
// *                                                                            *
// *                          WALLET AUTHENTICATION                             *
// *                                                                            *
// ******************************************************************************

use log::{debug, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

use crate::config::{ChallengeConfig, ED25519_PUBLIC_KEY_SIZE};
use crate::crypto::{verify_wallet_signature, AuthenticationProof, EncryptionKeyPair};
use crate::encoders::{base58_encode, decode_public_key_b58};
use crate::error::RecordFlowError;
use crate::types::ProgressStep;

/// On-chain identity of the connected wallet (Ed25519 public key).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WalletIdentity([u8; ED25519_PUBLIC_KEY_SIZE]);

impl WalletIdentity {
    pub fn from_bytes(bytes: [u8; ED25519_PUBLIC_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, RecordFlowError> {
        let arr: [u8; ED25519_PUBLIC_KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| RecordFlowError::WalletUnavailable)?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; ED25519_PUBLIC_KEY_SIZE] {
        &self.0
    }

    pub fn to_base58(&self) -> String {
        base58_encode(&self.0)
    }
}

/// Capabilities the flow needs from a wallet provider.
#[allow(async_fn_in_trait)]
pub trait WalletAdapter {
    fn is_connected(&self) -> bool;

    fn public_key(&self) -> Option<WalletIdentity>;

    fn supports_message_signing(&self) -> bool;

    /// Ask the wallet to sign `message`. May wait indefinitely on user approval.
    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, String>;
}

/// Output of a successful wallet authentication.
#[derive(Debug)]
pub struct WalletAuthentication {
    pub identity: WalletIdentity,
    pub proof: AuthenticationProof,
    pub keypair: EncryptionKeyPair,
}

/// Sign the challenge with the wallet, verify the signature locally, and
/// derive the record encryption key pair from it. No network access.
///
/// `expected` is the identity captured when the session connected; if the
/// wallet reports a different key the account was switched mid-flow.
pub async fn authenticate_wallet<W, F>(
    wallet: &W,
    expected: Option<WalletIdentity>,
    challenge: &ChallengeConfig,
    mut on_step: F,
) -> Result<WalletAuthentication, RecordFlowError>
where
    W: WalletAdapter,
    F: FnMut(ProgressStep),
{
    if !wallet.is_connected() {
        return Err(RecordFlowError::WalletUnavailable);
    }
    let identity = wallet.public_key().ok_or(RecordFlowError::WalletUnavailable)?;
    if expected.is_some_and(|e| e != identity) {
        warn!("Wallet public key changed since connect; refusing to authenticate");
        return Err(RecordFlowError::WalletUnavailable);
    }
    if !wallet.supports_message_signing() {
        return Err(RecordFlowError::UnsupportedWallet);
    }

    let message = challenge.challenge_bytes(&identity.to_base58());
    debug!("Requesting challenge signature from wallet {}", identity.to_base58());
    on_step(ProgressStep::RequestingSignature);

    let signature = wallet
        .sign_message(&message)
        .await
        .map_err(RecordFlowError::SigningFailed)?;

    on_step(ProgressStep::VerifyingSignature);
    let proof = verify_wallet_signature(&message, &signature, identity.as_bytes())?;
    on_step(ProgressStep::DerivingKey);
    let keypair = EncryptionKeyPair::from_proof(&proof);
    debug!("Wallet signature verified; record key derived");

    Ok(WalletAuthentication {
        identity,
        proof,
        keypair,
    })
}

// === JS WALLET ADAPTER ===

/// Wallet-adapter style JS object: `{ connected, publicKey, signMessage }`.
/// `publicKey` may be a `Uint8Array`, a base58 string, or an object exposing
/// `toBytes()`.
pub struct JsWalletAdapter {
    wallet: JsValue,
}

impl JsWalletAdapter {
    pub fn new(wallet: JsValue) -> Self {
        Self { wallet }
    }

    fn property(&self, name: &str) -> Option<JsValue> {
        js_sys::Reflect::get(&self.wallet, &JsValue::from_str(name))
            .ok()
            .filter(|v| !v.is_undefined() && !v.is_null())
    }

    fn public_key_bytes(&self) -> Option<Vec<u8>> {
        let key = self.property("publicKey")?;
        if let Some(b58) = key.as_string() {
            return decode_public_key_b58(&b58).ok().map(|bytes| bytes.to_vec());
        }
        if key.is_instance_of::<js_sys::Uint8Array>() {
            return Some(js_sys::Uint8Array::new(&key).to_vec());
        }
        let to_bytes = js_sys::Reflect::get(&key, &JsValue::from_str("toBytes"))
            .ok()?
            .dyn_into::<js_sys::Function>()
            .ok()?;
        let bytes = to_bytes.call0(&key).ok()?;
        Some(js_sys::Uint8Array::new(&bytes).to_vec())
    }
}

impl WalletAdapter for JsWalletAdapter {
    fn is_connected(&self) -> bool {
        self.property("connected")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    fn public_key(&self) -> Option<WalletIdentity> {
        self.public_key_bytes()
            .and_then(|bytes| WalletIdentity::from_slice(&bytes).ok())
    }

    fn supports_message_signing(&self) -> bool {
        self.property("signMessage")
            .map(|v| v.is_function())
            .unwrap_or(false)
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, String> {
        let sign_fn = self
            .property("signMessage")
            .ok_or_else(|| "signMessage not available".to_string())?
            .dyn_into::<js_sys::Function>()
            .map_err(|_| "signMessage is not a function".to_string())?;

        let message_js = js_sys::Uint8Array::from(message);
        let promise = sign_fn
            .call1(&self.wallet, &message_js)
            .map_err(|e| format!("signMessage threw: {:?}", e))?
            .dyn_into::<js_sys::Promise>()
            .map_err(|_| "signMessage did not return a Promise".to_string())?;

        let signed = JsFuture::from(promise)
            .await
            .map_err(|e| {
                e.as_string()
                    .unwrap_or_else(|| "User rejected the signature request".to_string())
            })?;

        // Some adapters resolve `{ signature }` instead of the raw bytes.
        let signature = if signed.is_instance_of::<js_sys::Uint8Array>() {
            signed
        } else {
            js_sys::Reflect::get(&signed, &JsValue::from_str("signature"))
                .map_err(|_| "signMessage returned no signature".to_string())?
        };
        if !signature.is_object() {
            return Err("signMessage returned no signature".to_string());
        }
        Ok(js_sys::Uint8Array::new(&signature).to_vec())
    }
}
