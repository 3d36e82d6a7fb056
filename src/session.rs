use crypto_box::PublicKey;
use log::debug;
use serde::Serialize;

use crate::config::{WorkerConfig, RECORD_UPLOADED_MESSAGE};
use crate::crypto::{AuthenticationProof, EncryptionKeyPair};
use crate::error::RecordFlowError;
use crate::submission::{SubmissionAttempt, SubmissionEvent, SubmissionState};
use crate::types::{HealthRecordForm, RecordFile};
use crate::wallet::{WalletAuthentication, WalletIdentity};

/// The one message the UI shows; setting either kind replaces the other.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", content = "text", rename_all = "camelCase")]
pub enum StatusMessage {
    Success(String),
    Error(String),
}

/// Form fields plus the selected file, kept across failed attempts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordDraft {
    pub form: HealthRecordForm,
    pub file: Option<RecordFile>,
}

struct SessionAuth {
    proof: AuthenticationProof,
    keypair: EncryptionKeyPair,
}

/// Read-only material a submission needs, copied out of the session so no
/// borrow is held across network calls.
pub struct SubmissionContext {
    pub owner: WalletIdentity,
    pub recipient: PublicKey,
    pub encryption_key_b58: String,
}

/// Per-page session: wallet connection, authentication and key material,
/// draft form, status message, and the current submission attempt.
///
/// Created when a wallet connects and emptied on disconnect. Only the
/// authentication path writes key material; submissions only read it.
pub struct RecordSession {
    config: WorkerConfig,
    wallet: Option<WalletIdentity>,
    auth: Option<SessionAuth>,
    /// Bumped whenever the connected wallet changes
    epoch: u64,
    draft: RecordDraft,
    status: Option<StatusMessage>,
    attempt: Option<SubmissionAttempt>,
    next_attempt_id: u64,
}

impl RecordSession {
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            config,
            wallet: None,
            auth: None,
            epoch: 0,
            draft: RecordDraft::default(),
            status: None,
            attempt: None,
            next_attempt_id: 1,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: WorkerConfig) {
        self.config = config;
    }

    // === WALLET LIFECYCLE ===

    /// Record a wallet connection. Reconnecting the same wallet keeps any
    /// existing authentication; a different wallet starts a fresh session.
    pub fn connect(&mut self, identity: WalletIdentity) -> u64 {
        if self.wallet != Some(identity) {
            self.auth = None;
            self.attempt = None;
            self.epoch += 1;
            self.wallet = Some(identity);
            debug!("Wallet {} connected (epoch {})", identity.to_base58(), self.epoch);
        }
        self.epoch
    }

    /// Drop the wallet and all key material; in-flight work becomes stale.
    pub fn disconnect(&mut self) {
        self.wallet = None;
        self.auth = None;
        self.attempt = None;
        self.status = None;
        self.epoch += 1;
        debug!("Wallet disconnected (epoch {})", self.epoch);
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn wallet(&self) -> Option<WalletIdentity> {
        self.wallet
    }

    pub fn is_connected(&self) -> bool {
        self.wallet.is_some()
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }

    // === AUTHENTICATION ===

    /// Store the result of a wallet authentication started at `epoch`.
    /// Returns the base58 signature for display.
    pub fn install_authentication(
        &mut self,
        epoch: u64,
        authentication: WalletAuthentication,
    ) -> Result<String, RecordFlowError> {
        if epoch != self.epoch || self.wallet != Some(authentication.identity) {
            return Err(RecordFlowError::AttemptSuperseded);
        }
        let signature_b58 = authentication.proof.signature_b58();
        self.auth = Some(SessionAuth {
            proof: authentication.proof,
            keypair: authentication.keypair,
        });
        self.set_status(StatusMessage::Success(
            "Wallet authenticated successfully".to_string(),
        ));
        Ok(signature_b58)
    }

    /// A failed authentication leaves the session unauthenticated with no key
    /// material, and shows the error.
    pub fn record_authentication_failure(&mut self, epoch: u64, error: &RecordFlowError) {
        if epoch != self.epoch || !error.is_user_visible() {
            return;
        }
        self.auth = None;
        self.set_status(StatusMessage::Error(error.to_string()));
    }

    pub fn signature_b58(&self) -> Option<String> {
        self.auth.as_ref().map(|a| a.proof.signature_b58())
    }

    pub fn keypair(&self) -> Option<&EncryptionKeyPair> {
        self.auth.as_ref().map(|a| &a.keypair)
    }

    /// Everything a submission needs, or `None` unless the wallet is
    /// connected and authenticated with a key pair in memory.
    pub fn submission_context(&self) -> Option<SubmissionContext> {
        let owner = self.wallet?;
        let auth = self.auth.as_ref()?;
        Some(SubmissionContext {
            owner,
            recipient: auth.keypair.public_key().clone(),
            encryption_key_b58: auth.keypair.public_key_b58(),
        })
    }

    // === DRAFT FORM ===

    pub fn draft(&self) -> &RecordDraft {
        &self.draft
    }

    pub fn set_form(&mut self, form: HealthRecordForm) {
        self.draft.form = form;
    }

    pub fn select_file(&mut self, file: Option<RecordFile>) {
        self.draft.file = file;
    }

    /// Clear the form and file, and abandon any in-flight attempt.
    pub fn reset_form(&mut self) {
        self.draft = RecordDraft::default();
        self.status = None;
        if self.attempt.take().is_some() {
            debug!("Form reset; active submission attempt abandoned");
        }
    }

    // === STATUS MESSAGE ===

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    pub fn set_status(&mut self, status: StatusMessage) {
        self.status = Some(status);
    }

    // === SUBMISSION ATTEMPTS ===

    pub fn active_attempt(&self) -> Option<&SubmissionAttempt> {
        self.attempt.as_ref()
    }

    pub fn submission_state(&self) -> SubmissionState {
        self.attempt
            .as_ref()
            .map(|a| a.state().clone())
            .unwrap_or(SubmissionState::Idle)
    }

    /// Start a new attempt at `Idle` and move it to `Validating`.
    /// Refused while another attempt is still running.
    pub fn begin_attempt(&mut self) -> Result<u64, RecordFlowError> {
        if let Some(active) = &self.attempt {
            if !active.state().is_terminal() {
                return Err(RecordFlowError::SubmissionInProgress);
            }
        }
        let id = self.next_attempt_id;
        self.next_attempt_id += 1;

        let mut attempt = SubmissionAttempt::new(id);
        attempt.apply(&SubmissionEvent::Start)?;
        self.attempt = Some(attempt);
        Ok(id)
    }

    pub fn ensure_active_attempt(&self, attempt_id: u64) -> Result<(), RecordFlowError> {
        match &self.attempt {
            Some(a) if a.id() == attempt_id => Ok(()),
            _ => Err(RecordFlowError::AttemptSuperseded),
        }
    }

    pub fn advance_attempt(
        &mut self,
        attempt_id: u64,
        event: &SubmissionEvent,
    ) -> Result<SubmissionState, RecordFlowError> {
        self.ensure_active_attempt(attempt_id)?;
        let attempt = self
            .attempt
            .as_mut()
            .ok_or(RecordFlowError::AttemptSuperseded)?;
        attempt.apply(event).cloned()
    }

    /// Confirmed: reset the form and file, show success.
    pub fn complete_attempt(&mut self, attempt_id: u64) -> Result<(), RecordFlowError> {
        self.advance_attempt(attempt_id, &SubmissionEvent::Confirmed)?;
        self.draft = RecordDraft::default();
        self.set_status(StatusMessage::Success(RECORD_UPLOADED_MESSAGE.to_string()));
        Ok(())
    }

    /// Failed: keep the draft for retry, show the error.
    pub fn fail_attempt(
        &mut self,
        attempt_id: u64,
        error: RecordFlowError,
    ) -> Result<(), RecordFlowError> {
        let message = error.to_string();
        self.advance_attempt(attempt_id, &SubmissionEvent::Fail(error))?;
        self.set_status(StatusMessage::Error(message));
        Ok(())
    }
}
