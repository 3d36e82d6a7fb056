// ******************************************************************************
// *                                                                            *
// *                       HANDLER: SUBMIT HEALTH RECORD                        *
// *                                                                            *
// ******************************************************************************
use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::config::RECORD_UPLOADED_MESSAGE;
use crate::error::RecordFlowError;
use crate::record_service::RecordService;
use crate::session::{RecordSession, StatusMessage};
use crate::submission::{submit_health_record, SubmissionState};
use crate::types::{HealthRecordForm, RecordFile, RecordFileInput};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitHealthRecordRequest {
    pub form: HealthRecordForm,
    /// Omitted for a metadata-only record
    #[serde(default)]
    pub file: Option<RecordFileInput>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubmitHealthRecordResult {
    pub record_id: String,
    pub transaction: String,
    /// Confirmation signature reported by the record service, if any
    pub signature: Option<String>,
    /// Whether a sealed file was attached
    pub encrypted: bool,
    pub message: String,
}

/// **Handles:** `WorkerRequestType::SubmitHealthRecord`
///
/// Stores the submitted form and file as the session draft, then runs one
/// submission attempt: validate, seal, resolve user, upload, confirm.
/// `on_state` sees every state the attempt enters.
pub async fn handle_submit_health_record<S, F>(
    session: Rc<RefCell<RecordSession>>,
    service: &S,
    request: SubmitHealthRecordRequest,
    on_state: F,
) -> Result<SubmitHealthRecordResult, RecordFlowError>
where
    S: RecordService,
    F: FnMut(&SubmissionState),
{
    {
        let mut s = session.borrow_mut();
        // Leave the running attempt's draft alone.
        if s.active_attempt().is_some_and(|a| !a.state().is_terminal()) {
            return Err(RecordFlowError::SubmissionInProgress);
        }
        // Without keys the attempt stops at the authentication gate; the file
        // is only read once there is a recipient to seal it to.
        let file = if s.submission_context().is_some() {
            match request.file.map(RecordFile::try_from).transpose() {
                Ok(file) => file,
                Err(err) => {
                    s.set_status(StatusMessage::Error(err.to_string()));
                    return Err(err);
                }
            }
        } else {
            None
        };
        s.set_form(request.form);
        s.select_file(file);
    }

    let outcome = submit_health_record(&session, service, on_state).await?;

    Ok(SubmitHealthRecordResult {
        record_id: outcome.record_id,
        transaction: outcome.transaction,
        signature: outcome.confirmation.signature,
        encrypted: outcome.encrypted,
        message: outcome
            .confirmation
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| RECORD_UPLOADED_MESSAGE.to_string()),
    })
}
