// ******************************************************************************
// *                                                                            *
// *                  SUBMISSION & CONFIRMATION STATE MACHINE                   *
// *                                                                            *
// ******************************************************************************

use std::cell::RefCell;

use log::{debug, info, warn};

use crate::config::{GENERIC_CONFIRM_ERROR, GENERIC_UPLOAD_ERROR};
use crate::crypto::seal_record;
use crate::encoders::base64_standard_encode;
use crate::error::RecordFlowError;
use crate::record_service::RecordService;
use crate::session::RecordSession;
use crate::types::{ConfirmationResult, HealthRecordPayload, SealedAttachment};

/// State of one submission attempt.
///
/// `Idle → Validating → Encrypting (only with a file) → ResolvingUser →
/// Uploading → ConfirmingTransaction → Succeeded`; every non-terminal state
/// may move to `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Validating,
    Encrypting,
    ResolvingUser,
    Uploading,
    ConfirmingTransaction,
    Succeeded,
    Failed(RecordFlowError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionEvent {
    Start,
    Validated { has_file: bool },
    Sealed,
    UserResolved,
    Uploaded,
    Confirmed,
    Fail(RecordFlowError),
}

impl SubmissionState {
    pub fn name(&self) -> &'static str {
        match self {
            SubmissionState::Idle => "idle",
            SubmissionState::Validating => "validating",
            SubmissionState::Encrypting => "encrypting",
            SubmissionState::ResolvingUser => "resolving-user",
            SubmissionState::Uploading => "uploading",
            SubmissionState::ConfirmingTransaction => "confirming-transaction",
            SubmissionState::Succeeded => "succeeded",
            SubmissionState::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SubmissionState::Succeeded | SubmissionState::Failed(_))
    }

    /// The single transition function. Terminal states accept nothing; a new
    /// attempt starts over at `Idle`.
    pub fn transition(&self, event: &SubmissionEvent) -> Result<SubmissionState, RecordFlowError> {
        use SubmissionEvent as E;
        use SubmissionState as S;

        match (self, event) {
            (S::Succeeded | S::Failed(_), _) => Err(invalid_transition(self, event)),
            (_, E::Fail(reason)) => Ok(S::Failed(reason.clone())),
            (S::Idle, E::Start) => Ok(S::Validating),
            (S::Validating, E::Validated { has_file: true }) => Ok(S::Encrypting),
            (S::Validating, E::Validated { has_file: false }) => Ok(S::ResolvingUser),
            (S::Encrypting, E::Sealed) => Ok(S::ResolvingUser),
            (S::ResolvingUser, E::UserResolved) => Ok(S::Uploading),
            (S::Uploading, E::Uploaded) => Ok(S::ConfirmingTransaction),
            (S::ConfirmingTransaction, E::Confirmed) => Ok(S::Succeeded),
            _ => Err(invalid_transition(self, event)),
        }
    }
}

fn invalid_transition(state: &SubmissionState, event: &SubmissionEvent) -> RecordFlowError {
    RecordFlowError::UnknownError(format!(
        "invalid submission transition from {} on {:?}",
        state.name(),
        event
    ))
}

/// One attempt, identified so late responses from an abandoned attempt can be
/// recognised and dropped.
#[derive(Debug, Clone)]
pub struct SubmissionAttempt {
    id: u64,
    state: SubmissionState,
    history: Vec<&'static str>,
}

impl SubmissionAttempt {
    pub(crate) fn new(id: u64) -> Self {
        Self {
            id,
            state: SubmissionState::Idle,
            history: vec![SubmissionState::Idle.name()],
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    /// Names of every state this attempt has passed through, in order.
    pub fn history(&self) -> &[&'static str] {
        &self.history
    }

    pub(crate) fn apply(&mut self, event: &SubmissionEvent) -> Result<&SubmissionState, RecordFlowError> {
        let next = self.state.transition(event)?;
        self.history.push(next.name());
        self.state = next;
        Ok(&self.state)
    }
}

/// What a successful attempt produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionOutcome {
    pub record_id: String,
    pub transaction: String,
    pub confirmation: ConfirmationResult,
    pub encrypted: bool,
}

/// Drive one submission of the session's draft through the state machine.
///
/// `on_state` observes every state entered (for progress reporting). The
/// session is never borrowed across an `.await`; after each suspension the
/// attempt id is re-checked so a reset or disconnect in the meantime ends the
/// flow with `AttemptSuperseded` without touching session state.
pub async fn submit_health_record<S, F>(
    session: &RefCell<RecordSession>,
    service: &S,
    mut on_state: F,
) -> Result<SubmissionOutcome, RecordFlowError>
where
    S: RecordService,
    F: FnMut(&SubmissionState),
{
    let attempt_id = session.borrow_mut().begin_attempt()?;
    on_state(&SubmissionState::Validating);

    let result = run_attempt(session, service, attempt_id, &mut on_state).await;

    match result {
        Ok(outcome) => {
            session.borrow_mut().complete_attempt(attempt_id)?;
            info!("Health record {} uploaded and confirmed", outcome.record_id);
            on_state(&SubmissionState::Succeeded);
            Ok(outcome)
        }
        Err(RecordFlowError::AttemptSuperseded) => {
            debug!("Submission attempt {} superseded; dropping result", attempt_id);
            Err(RecordFlowError::AttemptSuperseded)
        }
        Err(err) => {
            session.borrow_mut().fail_attempt(attempt_id, err.clone())?;
            warn!("Submission attempt {} failed: {}", attempt_id, err.code());
            on_state(&SubmissionState::Failed(err.clone()));
            Err(err)
        }
    }
}

async fn run_attempt<S, F>(
    session: &RefCell<RecordSession>,
    service: &S,
    attempt_id: u64,
    on_state: &mut F,
) -> Result<SubmissionOutcome, RecordFlowError>
where
    S: RecordService,
    F: FnMut(&SubmissionState),
{
    // Validating: authentication gate first, before any network call.
    let (context, form, file, max_file_bytes) = {
        let s = session.borrow();
        let context = s.submission_context().ok_or(RecordFlowError::NotAuthenticated)?;
        let draft = s.draft();
        (
            context,
            draft.form.clone(),
            draft.file.clone(),
            s.config().max_file_bytes,
        )
    };
    form.validate()?;

    let has_file = file.is_some();
    advance(session, attempt_id, SubmissionEvent::Validated { has_file }, on_state)?;

    // Encrypting: skipped entirely for metadata-only records.
    let attachment = match file {
        Some(file) => {
            let sealed = seal_record(&file.bytes, &context.recipient, max_file_bytes)?;
            advance(session, attempt_id, SubmissionEvent::Sealed, on_state)?;
            Some(SealedAttachment {
                file_name: file.name,
                content_type: file.content_type,
                sealed_data_base64: base64_standard_encode(&sealed),
            })
        }
        None => None,
    };

    // ResolvingUser
    let user = service.get_current_user().await.map_err(|e| {
        RecordFlowError::UnknownError(format!("Could not resolve current user: {}", e))
    })?;
    advance(session, attempt_id, SubmissionEvent::UserResolved, on_state)?;

    // Uploading
    let payload = HealthRecordPayload {
        file: attachment,
        date: form.date.trim().to_string(),
        doctor: form.doctor.trim().to_string(),
        category: form.category.trim().to_string(),
        facility: form.facility.trim().to_string(),
        notes: form.notes,
        user_id: user.id,
        public_key: context.owner.to_base58(),
        encryption_key: context.encryption_key_b58,
    };
    let upload = service
        .upload_health_record(&payload)
        .await
        .map_err(|e| RecordFlowError::UploadRejected(e.message_or(GENERIC_UPLOAD_ERROR)))?;
    session.borrow().ensure_active_attempt(attempt_id)?;

    let (record_id, transaction) = upload
        .confirmable()
        .map(|(r, t)| (r.to_string(), t.to_string()))
        .ok_or(RecordFlowError::MissingTransactionData)?;
    advance(session, attempt_id, SubmissionEvent::Uploaded, on_state)?;

    // ConfirmingTransaction
    debug!("Confirming transaction for record {}", record_id);
    let confirmation = service
        .confirm_transaction(&record_id, &transaction)
        .await
        .map_err(|e| RecordFlowError::ConfirmationFailed(e.message_or(GENERIC_CONFIRM_ERROR)))?;
    session.borrow().ensure_active_attempt(attempt_id)?;

    if !confirmation.success {
        let message = confirmation
            .message
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| GENERIC_CONFIRM_ERROR.to_string());
        return Err(RecordFlowError::ConfirmationFailed(message));
    }

    Ok(SubmissionOutcome {
        record_id,
        transaction,
        confirmation,
        encrypted: payload.file.is_some(),
    })
}

fn advance<F>(
    session: &RefCell<RecordSession>,
    attempt_id: u64,
    event: SubmissionEvent,
    on_state: &mut F,
) -> Result<(), RecordFlowError>
where
    F: FnMut(&SubmissionState),
{
    let state = session.borrow_mut().advance_attempt(attempt_id, &event)?;
    on_state(&state);
    Ok(())
}
