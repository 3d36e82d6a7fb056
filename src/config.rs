// === CONFIGURATION CONSTANTS ===
// Configuration values for the WASM record worker

use serde::{Deserialize, Serialize};

/// Change this constant and recompile to adjust the default logging verbosity.
/// `WorkerConfig::log_level` overrides it at runtime.
/// Available levels: Error, Warn, Info, Debug, Trace
pub const CURRENT_LOG_LEVEL: log::Level = log::Level::Info;

// === CRYPTOGRAPHIC CONSTANTS ===

/// Ed25519 public key size in bytes (wallet identity)
pub const ED25519_PUBLIC_KEY_SIZE: usize = 32;

/// Ed25519 detached signature size in bytes
pub const ED25519_SIGNATURE_SIZE: usize = 64;

/// Derived seed size in bytes (SHA-256 output)
pub const DERIVED_SEED_SIZE: usize = 32;

/// X25519 key size in bytes
pub const X25519_KEY_SIZE: usize = 32;

/// Sealed box overhead: 32-byte ephemeral public key + 16-byte Poly1305 tag
pub const SEALED_BOX_OVERHEAD: usize = 48;

/// Challenge the wallet signs to unlock the record key.
/// Changing this string changes every user's derived encryption key.
pub const DEFAULT_AUTH_CHALLENGE: &str =
    "Sign this message to verify wallet ownership and unlock your health records.";

// === RECORD SERVICE DEFAULTS ===

pub const DEFAULT_CURRENT_USER_ROUTE: &str = "/api/users/me";
pub const DEFAULT_UPLOAD_ROUTE: &str = "/api/health-records/upload";
pub const DEFAULT_CONFIRM_ROUTE: &str = "/api/health-records/confirm";

/// Largest file accepted for sealing (25 MiB)
pub const DEFAULT_MAX_FILE_BYTES: usize = 25 * 1024 * 1024;

// === ERROR MESSAGES ===

pub const GENERIC_UPLOAD_ERROR: &str = "Failed to upload health record";
pub const GENERIC_CONFIRM_ERROR: &str = "Failed to confirm record transaction";
pub const RECORD_UPLOADED_MESSAGE: &str = "Health record uploaded and confirmed";

// === RUNTIME CONFIGURATION ===

/// Record service endpoints, supplied by the page at startup.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordServiceConfig {
    pub base_url: String,
    pub current_user_route: String,
    pub upload_route: String,
    pub confirm_route: String,
    /// Bearer token for the application session, if the API expects one
    pub auth_token: Option<String>,
}

impl Default for RecordServiceConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            current_user_route: DEFAULT_CURRENT_USER_ROUTE.to_string(),
            upload_route: DEFAULT_UPLOAD_ROUTE.to_string(),
            confirm_route: DEFAULT_CONFIRM_ROUTE.to_string(),
            auth_token: None,
        }
    }
}

impl RecordServiceConfig {
    pub fn current_user_url(&self) -> String {
        join_url(&self.base_url, &self.current_user_route)
    }

    pub fn upload_url(&self) -> String {
        join_url(&self.base_url, &self.upload_route)
    }

    pub fn confirm_url(&self) -> String {
        join_url(&self.base_url, &self.confirm_route)
    }
}

/// Options for the authentication challenge.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ChallengeConfig {
    pub message: String,
    /// Append the signer's base58 public key to the challenge. Still
    /// deterministic per wallet, but a leaked signature no longer carries over
    /// to a different wallet's challenge.
    pub bind_to_wallet: bool,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            message: DEFAULT_AUTH_CHALLENGE.to_string(),
            bind_to_wallet: false,
        }
    }
}

impl ChallengeConfig {
    /// Exact bytes handed to the wallet for signing.
    pub fn challenge_bytes(&self, wallet_public_key_b58: &str) -> Vec<u8> {
        if self.bind_to_wallet {
            format!("{}\nWallet: {}", self.message, wallet_public_key_b58).into_bytes()
        } else {
            self.message.as_bytes().to_vec()
        }
    }
}

/// Top-level worker configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkerConfig {
    pub record_service: RecordServiceConfig,
    pub challenge: ChallengeConfig,
    pub max_file_bytes: usize,
    /// One of error/warn/info/debug/trace; falls back to CURRENT_LOG_LEVEL
    pub log_level: Option<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            record_service: RecordServiceConfig::default(),
            challenge: ChallengeConfig::default(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            log_level: None,
        }
    }
}

impl WorkerConfig {
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("Invalid worker config: {}", e))
    }

    pub fn log_level(&self) -> log::Level {
        self.log_level
            .as_deref()
            .and_then(|s| s.parse::<log::Level>().ok())
            .unwrap_or(CURRENT_LOG_LEVEL)
    }
}

// === UTILITY FUNCTIONS ===

fn join_url(base: &str, route: &str) -> String {
    if base.is_empty() {
        return route.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        route.trim_start_matches('/')
    )
}
