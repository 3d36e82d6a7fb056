//! Progress Message Types
//!
//! PROGRESS MESSAGES (during an operation):
//!   Rust WASM → send_progress_message() → JS sendProgressMessage() → postMessage() → page
//!   - one message per submission state or authentication step
//!   - never carries key material or plaintext
//!
//! FINAL RESULTS:
//!   Rust WASM → return value of handle_record_message() → JS worker → page

use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

use crate::error::{scrub_error_message, RecordFlowError};
use crate::submission::SubmissionState;

/// Values MUST align with the progress variants of `WorkerResponseType`
/// so JS can tell progress apart from success/failure by numeric code.
#[wasm_bindgen]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressMessageType {
    AuthenticationProgress = 14,
    AuthenticationComplete = 15,
    SubmissionProgress = 16,
    SubmissionComplete = 17,
}

impl TryFrom<u32> for ProgressMessageType {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, <Self as TryFrom<u32>>::Error> {
        match value {
            14 => Ok(ProgressMessageType::AuthenticationProgress),
            15 => Ok(ProgressMessageType::AuthenticationComplete),
            16 => Ok(ProgressMessageType::SubmissionProgress),
            17 => Ok(ProgressMessageType::SubmissionComplete),
            _ => Err(format!("Invalid ProgressMessageType value: {}", value)),
        }
    }
}

/// Progress step identifiers. Values start at 100 to avoid clashing with
/// `WorkerResponseType`.
#[wasm_bindgen]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressStep {
    RequestingSignature = 100,
    VerifyingSignature = 101,
    DerivingKey = 102,
    ValidatingForm = 103,
    EncryptingFile = 104,
    ResolvingUser = 105,
    UploadingRecord = 106,
    ConfirmingTransaction = 107,
    Succeeded = 108,
    Error = 109,
}

impl ProgressStep {
    pub fn name(&self) -> &'static str {
        match self {
            ProgressStep::RequestingSignature => "requesting-signature",
            ProgressStep::VerifyingSignature => "verifying-signature",
            ProgressStep::DerivingKey => "deriving-key",
            ProgressStep::ValidatingForm => "validating-form",
            ProgressStep::EncryptingFile => "encrypting-file",
            ProgressStep::ResolvingUser => "resolving-user",
            ProgressStep::UploadingRecord => "uploading-record",
            ProgressStep::ConfirmingTransaction => "confirming-transaction",
            ProgressStep::Succeeded => "succeeded",
            ProgressStep::Error => "error",
        }
    }

    /// Progress step announced when a submission enters `state`.
    /// `Idle` has no step; nothing is reported before validation starts.
    pub fn for_submission_state(state: &SubmissionState) -> Option<ProgressStep> {
        match state {
            SubmissionState::Idle => None,
            SubmissionState::Validating => Some(ProgressStep::ValidatingForm),
            SubmissionState::Encrypting => Some(ProgressStep::EncryptingFile),
            SubmissionState::ResolvingUser => Some(ProgressStep::ResolvingUser),
            SubmissionState::Uploading => Some(ProgressStep::UploadingRecord),
            SubmissionState::ConfirmingTransaction => Some(ProgressStep::ConfirmingTransaction),
            SubmissionState::Succeeded => Some(ProgressStep::Succeeded),
            SubmissionState::Failed(_) => Some(ProgressStep::Error),
        }
    }

    /// Terminal step and message for an authentication run. Superseded runs
    /// report nothing, like superseded submissions.
    pub fn for_authentication_result<T>(
        result: &Result<T, RecordFlowError>,
    ) -> Option<(ProgressStep, String)> {
        match result {
            Ok(_) => Some((ProgressStep::Succeeded, "Wallet authenticated".to_string())),
            Err(err) if !err.is_user_visible() => None,
            Err(err) => Some((ProgressStep::Error, scrub_error_message(&err.to_string()))),
        }
    }
}

impl TryFrom<u32> for ProgressStep {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, <Self as TryFrom<u32>>::Error> {
        match value {
            100 => Ok(ProgressStep::RequestingSignature),
            101 => Ok(ProgressStep::VerifyingSignature),
            102 => Ok(ProgressStep::DerivingKey),
            103 => Ok(ProgressStep::ValidatingForm),
            104 => Ok(ProgressStep::EncryptingFile),
            105 => Ok(ProgressStep::ResolvingUser),
            106 => Ok(ProgressStep::UploadingRecord),
            107 => Ok(ProgressStep::ConfirmingTransaction),
            108 => Ok(ProgressStep::Succeeded),
            109 => Ok(ProgressStep::Error),
            _ => Err(format!("Invalid ProgressStep value: {}", value)),
        }
    }
}

pub fn progress_message_type_name(message_type: ProgressMessageType) -> &'static str {
    match message_type {
        ProgressMessageType::AuthenticationProgress => "AUTHENTICATION_PROGRESS",
        ProgressMessageType::AuthenticationComplete => "AUTHENTICATION_COMPLETE",
        ProgressMessageType::SubmissionProgress => "SUBMISSION_PROGRESS",
        ProgressMessageType::SubmissionComplete => "SUBMISSION_COMPLETE",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_non_idle_state_has_a_step() {
        assert_eq!(ProgressStep::for_submission_state(&SubmissionState::Idle), None);
        assert_eq!(
            ProgressStep::for_submission_state(&SubmissionState::Failed(
                RecordFlowError::NotAuthenticated
            )),
            Some(ProgressStep::Error)
        );
        assert_eq!(
            ProgressStep::for_submission_state(&SubmissionState::ConfirmingTransaction),
            Some(ProgressStep::ConfirmingTransaction)
        );
    }

    #[test]
    fn authentication_always_ends_with_a_terminal_step() {
        let ok: Result<(), RecordFlowError> = Ok(());
        assert_eq!(
            ProgressStep::for_authentication_result(&ok).map(|(step, _)| step),
            Some(ProgressStep::Succeeded)
        );

        let failed: Result<(), RecordFlowError> = Err(RecordFlowError::WalletUnavailable);
        let (step, message) = ProgressStep::for_authentication_result(&failed).unwrap();
        assert_eq!(step, ProgressStep::Error);
        assert_eq!(message, RecordFlowError::WalletUnavailable.to_string());

        let superseded: Result<(), RecordFlowError> = Err(RecordFlowError::AttemptSuperseded);
        assert_eq!(ProgressStep::for_authentication_result(&superseded), None);
    }

    #[test]
    fn numeric_codes_round_trip() {
        for step in [ProgressStep::RequestingSignature, ProgressStep::Error] {
            assert_eq!(ProgressStep::try_from(step as u32), Ok(step));
        }
        assert!(ProgressMessageType::try_from(3).is_err());
    }
}
