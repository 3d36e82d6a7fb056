use std::fmt;

use log::debug;
use wasm_bindgen::JsValue;

const REDACTED: &str = "[REDACTED]";

/// JSON string fields that may carry key material or raw signatures.
const SECRET_STRING_FIELDS: [&str; 10] = [
    "signature",
    "signatureB58",
    "signature_b58",
    "seed",
    "derivedSeed",
    "derived_seed",
    "secretKey",
    "secret_key",
    "encryptionSecretKey",
    "encryption_secret_key",
];

fn scrub_json_string_field(input: &str, key: &str, escaped: bool) -> String {
    let quote = if escaped { "\\\"" } else { "\"" };
    let key_pattern = format!("{quote}{key}{quote}");
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some((before_key, after_key)) = rest.split_once(key_pattern.as_str()) {
        out.push_str(before_key);
        out.push_str(&key_pattern);
        rest = after_key;

        let trimmed = rest.trim_start();
        let Some(after_colon) = trimmed.strip_prefix(':') else {
            continue;
        };
        let after_colon = after_colon.trim_start();
        let Some(after_open) = after_colon.strip_prefix(quote) else {
            continue;
        };

        out.push(':');
        out.push_str(quote);
        out.push_str(REDACTED);
        out.push_str(quote);

        rest = match skip_quoted_value(after_open, escaped) {
            Some(after_close) => after_close,
            None => return out,
        };
    }

    out.push_str(rest);
    out
}

fn skip_quoted_value(s: &str, escaped: bool) -> Option<&str> {
    if escaped {
        return s.find("\\\"").map(|idx| &s[idx + 2..]);
    }
    let mut in_escape = false;
    for (idx, ch) in s.char_indices() {
        if in_escape {
            in_escape = false;
            continue;
        }
        match ch {
            '\\' => in_escape = true,
            '"' => return Some(&s[idx + 1..]),
            _ => {}
        }
    }
    None
}

/// Replace the values of secret-bearing JSON fields with `[REDACTED]`.
/// Handles both plain and escaped (stringified-twice) JSON.
pub fn scrub_error_message(message: &str) -> String {
    let mut output = message.to_string();
    for key in SECRET_STRING_FIELDS {
        output = scrub_json_string_field(&output, key, false);
        output = scrub_json_string_field(&output, key, true);
    }
    output
}

pub fn scrub_js_error_value(err: JsValue) -> JsValue {
    if let Some(message) = err.as_string() {
        return JsValue::from_str(&scrub_error_message(&message));
    }
    JsValue::from_str(&scrub_error_message(&format!("{err:?}")))
}

/// Failures of the authenticate → derive → seal → submit → confirm flow.
///
/// Every variant is recoverable by retrying the user action that started it
/// (reconnect, re-sign, resubmit).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordFlowError {
    /// No wallet connected, or the wallet switched accounts mid-flow
    WalletUnavailable,
    /// Wallet cannot sign arbitrary messages
    UnsupportedWallet,
    /// User rejected the signature request or the wallet threw
    SigningFailed(String),
    /// Signature did not verify against the wallet's public key
    InvalidSignature,
    /// Secure randomness is not available in this environment
    CryptoNotReady(String),
    /// File too large, unreadable, or sealing/opening failed
    EncryptionFailed(String),
    /// Submission attempted without wallet connection, signature or key pair
    NotAuthenticated,
    /// Upload response lacked a record id or a transaction reference
    MissingTransactionData,
    /// Record service refused the upload
    UploadRejected(String),
    /// Transaction confirmation failed or was reported unsuccessful
    ConfirmationFailed(String),
    UnknownError(String),
    /// A required form field is blank or malformed
    InvalidForm(&'static str),
    /// Another submission from this session has not finished yet
    SubmissionInProgress,
    /// The attempt was reset or the session cleared while a step was in flight
    AttemptSuperseded,
}

impl RecordFlowError {
    /// Stable identifier for JS callers.
    pub fn code(&self) -> &'static str {
        match self {
            RecordFlowError::WalletUnavailable => "WalletUnavailable",
            RecordFlowError::UnsupportedWallet => "UnsupportedWallet",
            RecordFlowError::SigningFailed(_) => "SigningFailed",
            RecordFlowError::InvalidSignature => "InvalidSignature",
            RecordFlowError::CryptoNotReady(_) => "CryptoNotReady",
            RecordFlowError::EncryptionFailed(_) => "EncryptionFailed",
            RecordFlowError::NotAuthenticated => "NotAuthenticated",
            RecordFlowError::MissingTransactionData => "MissingTransactionData",
            RecordFlowError::UploadRejected(_) => "UploadRejected",
            RecordFlowError::ConfirmationFailed(_) => "ConfirmationFailed",
            RecordFlowError::UnknownError(_) => "UnknownError",
            RecordFlowError::InvalidForm(_) => "InvalidForm",
            RecordFlowError::SubmissionInProgress => "SubmissionInProgress",
            RecordFlowError::AttemptSuperseded => "AttemptSuperseded",
        }
    }

    /// Whether the UI should surface this failure. A superseded attempt ends
    /// quietly because the user already moved on.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, RecordFlowError::AttemptSuperseded)
    }
}

impl fmt::Display for RecordFlowError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RecordFlowError::WalletUnavailable => {
                write!(f, "Wallet not connected. Please connect your wallet")
            }
            RecordFlowError::UnsupportedWallet => {
                write!(f, "Wallet does not support message signing")
            }
            RecordFlowError::SigningFailed(e) => write!(f, "Failed to sign message: {}", e),
            RecordFlowError::InvalidSignature => write!(f, "Signature verification failed"),
            RecordFlowError::CryptoNotReady(e) => {
                write!(f, "Encryption library not ready: {}", e)
            }
            RecordFlowError::EncryptionFailed(e) => write!(f, "Encryption failed: {}", e),
            RecordFlowError::NotAuthenticated => {
                write!(f, "Please connect and authenticate your wallet first")
            }
            RecordFlowError::MissingTransactionData => {
                write!(f, "Upload incomplete: missing transaction data")
            }
            RecordFlowError::UploadRejected(e) => write!(f, "{}", e),
            RecordFlowError::ConfirmationFailed(e) => write!(f, "{}", e),
            RecordFlowError::UnknownError(e) => write!(f, "Unexpected error: {}", e),
            RecordFlowError::InvalidForm(field) => write!(f, "Invalid or missing field: {}", field),
            RecordFlowError::SubmissionInProgress => {
                write!(f, "A record upload is already in progress")
            }
            RecordFlowError::AttemptSuperseded => write!(f, "Upload attempt was cancelled"),
        }
    }
}

impl std::error::Error for RecordFlowError {}

impl From<RecordFlowError> for JsValue {
    fn from(err: RecordFlowError) -> Self {
        scrub_js_error_value(JsValue::from_str(&format!("{}: {}", err.code(), err)))
    }
}

/// Error returned by a record service collaborator, before it is classified
/// by the stage that called it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    pub status: Option<u16>,
    /// Human-readable message provided by the server, if any
    pub message: Option<String>,
}

impl ServiceError {
    pub fn new(status: Option<u16>, message: Option<String>) -> Self {
        Self { status, message }
    }

    /// Fetch, network or encoding failure with no server response. The detail
    /// goes to the debug log only; callers fall back to their generic text.
    pub fn transport(detail: impl Into<String>) -> Self {
        debug!("Record service transport failure: {}", detail.into());
        Self {
            status: None,
            message: None,
        }
    }

    /// Server message if present, otherwise `fallback`.
    pub fn message_or(&self, fallback: &str) -> String {
        match self.message.as_deref().map(str::trim) {
            Some(msg) if !msg.is_empty() => msg.to_string(),
            _ => fallback.to_string(),
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.status, &self.message) {
            (Some(status), Some(msg)) => write!(f, "HTTP {}: {}", status, msg),
            (Some(status), None) => write!(f, "HTTP {}", status),
            (None, Some(msg)) => write!(f, "{}", msg),
            (None, None) => write!(f, "record service error"),
        }
    }
}
