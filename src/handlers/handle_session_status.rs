use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use crate::session::{RecordSession, StatusMessage};
use crate::types::HealthRecordForm;

/// What the page needs to render the upload screen. Never includes the
/// signature or any key material beyond the public encryption key.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub connected: bool,
    pub wallet_public_key: Option<String>,
    pub authenticated: bool,
    pub encryption_public_key: Option<String>,
    /// `idle | validating | encrypting | resolving-user | uploading |
    /// confirming-transaction | succeeded | failed`
    pub submission_state: &'static str,
    pub status: Option<StatusMessage>,
    pub form: HealthRecordForm,
    pub file_name: Option<String>,
}

impl SessionSnapshot {
    pub fn capture(session: &RecordSession) -> Self {
        Self {
            connected: session.is_connected(),
            wallet_public_key: session.wallet().map(|w| w.to_base58()),
            authenticated: session.is_authenticated(),
            encryption_public_key: session.keypair().map(|k| k.public_key_b58()),
            submission_state: session.submission_state().name(),
            status: session.status().cloned(),
            form: session.draft().form.clone(),
            file_name: session.draft().file.as_ref().map(|f| f.name.clone()),
        }
    }
}

/// **Handles:** `WorkerRequestType::SessionStatus`
pub fn handle_session_status(session: Rc<RefCell<RecordSession>>) -> SessionSnapshot {
    SessionSnapshot::capture(&session.borrow())
}
