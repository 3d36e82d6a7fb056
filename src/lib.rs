mod config;
mod crypto;
mod encoders;
mod error;
mod fetch;
mod handlers;
mod logger;
mod record_service;
mod session;
mod submission;
#[cfg(test)]
mod tests;
mod types;
mod wallet;

use std::cell::RefCell;
use std::rc::Rc;

use log::debug;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::error::scrub_error_message;
use crate::types::worker_messages::{RecordWorkerMessage, RecordWorkerResponse, WorkerRequestType};
use crate::types::*;

pub use config::{ChallengeConfig, RecordServiceConfig, WorkerConfig};
pub use crypto::{
    open_sealed_record, seal_record, verify_wallet_signature, AuthenticationProof, DerivedSeed,
    EncryptionKeyPair,
};
pub use error::{RecordFlowError, ServiceError};
pub use handlers::{
    AuthenticateWalletResult, ConnectWalletResult, OpenSealedRecordRequest,
    OpenSealedRecordResult, SessionSnapshot, SubmitHealthRecordRequest, SubmitHealthRecordResult,
};
pub use record_service::{HttpRecordService, RecordService};
pub use session::{RecordDraft, RecordSession, StatusMessage};
pub use submission::{
    submit_health_record, SubmissionAttempt, SubmissionEvent, SubmissionOutcome, SubmissionState,
};
// Re-export progress types for auto-generation
pub use types::progress::{ProgressMessageType, ProgressStep};
pub use types::record::{
    ConfirmationResult, CurrentUser, HealthRecordForm, HealthRecordPayload, RecordFile,
    RecordFileInput, SealedAttachment, UploadResult,
};
pub use types::worker_messages::WorkerResponseType;
pub use wallet::{authenticate_wallet, JsWalletAdapter, WalletAdapter, WalletAuthentication, WalletIdentity};

// === GLOBAL STATE ===

thread_local! {
    static RECORD_SESSION: Rc<RefCell<RecordSession>> =
        Rc::new(RefCell::new(RecordSession::new(WorkerConfig::default())));
    static WALLET: RefCell<Option<Rc<JsWalletAdapter>>> = const { RefCell::new(None) };
}

fn record_session() -> Rc<RefCell<RecordSession>> {
    RECORD_SESSION.with(Rc::clone)
}

fn attached_wallet() -> Result<Rc<JsWalletAdapter>, RecordFlowError> {
    WALLET
        .with(|w| w.borrow().clone())
        .ok_or(RecordFlowError::WalletUnavailable)
}

#[wasm_bindgen]
pub fn init_worker() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    let level = RECORD_SESSION.with(|s| s.borrow().config().log_level());
    logger::init(level);
}

/// Apply page-supplied configuration (record service endpoints, challenge,
/// size limit, log level). Accepts a plain object or a JSON string.
#[wasm_bindgen]
pub fn configure_worker(config_val: JsValue) -> Result<(), JsValue> {
    let config: WorkerConfig = match config_val.as_string() {
        Some(json) => WorkerConfig::from_json(&json).map_err(|e| JsValue::from_str(&e))?,
        None => serde_wasm_bindgen::from_value(config_val)
            .map_err(|e| JsValue::from_str(&format!("Invalid worker config: {}", e)))?,
    };
    logger::init(config.log_level());
    debug!(
        "Worker configured: record service at {:?}",
        config.record_service.base_url
    );
    RECORD_SESSION.with(|s| s.borrow_mut().set_config(config));
    Ok(())
}

/// Attach the wallet-adapter object (`{ connected, publicKey, signMessage }`)
/// used by `ConnectWallet` and `AuthenticateWallet`. Passing `null` detaches.
#[wasm_bindgen]
pub fn attach_wallet(wallet_val: JsValue) {
    let adapter = if wallet_val.is_null() || wallet_val.is_undefined() {
        None
    } else {
        Some(Rc::new(JsWalletAdapter::new(wallet_val)))
    };
    WALLET.with(|w| *w.borrow_mut() = adapter);
}

// === PROGRESS MESSAGING ===

/// Sends a progress message to the page through the JS `sendProgressMessage`
/// global. Carries numeric codes plus names for debugging; never secrets.
pub fn send_progress_message(
    message_type: ProgressMessageType,
    step: ProgressStep,
    message: &str,
    data: Option<serde_json::Value>,
) {
    #[cfg(target_arch = "wasm32")]
    {
        #[wasm_bindgen]
        extern "C" {
            #[wasm_bindgen(js_name = sendProgressMessage)]
            fn send_progress_message_js(
                message_type: u32,
                message_type_name: &str,
                step: u32,
                step_name: &str,
                message: &str,
                data: JsValue,
            );
        }

        let data_js = data
            .and_then(|d| {
                d.serialize(&serde_wasm_bindgen::Serializer::json_compatible())
                    .ok()
            })
            .unwrap_or(JsValue::UNDEFINED);
        send_progress_message_js(
            message_type as u32,
            progress_message_type_name(message_type),
            step as u32,
            step.name(),
            message,
            data_js,
        );
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = data;
        debug!(
            "Progress: {} ({}) - {} ({}) - {}",
            progress_message_type_name(message_type),
            message_type as u32,
            step.name(),
            step as u32,
            message
        );
    }
}

fn report_submission_state(state: &SubmissionState) {
    let Some(step) = ProgressStep::for_submission_state(state) else {
        return;
    };
    let message_type = if state.is_terminal() {
        ProgressMessageType::SubmissionComplete
    } else {
        ProgressMessageType::SubmissionProgress
    };
    let message = match state {
        SubmissionState::Failed(err) => scrub_error_message(&err.to_string()),
        _ => state.name().to_string(),
    };
    send_progress_message(message_type, step, &message, None);
}

fn report_authentication_step(step: ProgressStep) {
    send_progress_message(
        ProgressMessageType::AuthenticationProgress,
        step,
        step.name(),
        None,
    );
}

// === MESSAGE HANDLER FUNCTIONS ===

/// Unified message handler for all record worker operations.
///
/// Takes a `{ type, payload }` envelope (object or JSON string) and returns a
/// `{ type, payload }` response. Flow failures come back as a failure response
/// with `{ code, error }`; only a malformed envelope rejects the promise.
#[wasm_bindgen]
pub async fn handle_record_message(message_val: JsValue) -> Result<JsValue, JsValue> {
    init_worker();

    let message: RecordWorkerMessage = match message_val.as_string() {
        Some(json) => RecordWorkerMessage::from_json(&json).map_err(|e| JsValue::from_str(&e))?,
        None => serde_wasm_bindgen::from_value(message_val)
            .map_err(|e| JsValue::from_str(&format!("Invalid worker message: {}", e)))?,
    };
    let request_type = message
        .request_type()
        .map_err(|e| JsValue::from_str(&e))?;

    debug!(
        "WASM Worker: Received message type: {} ({})",
        request_type.name(),
        message.msg_type
    );

    let session = record_session();
    let response = match request_type {
        WorkerRequestType::ConnectWallet => {
            let result = attached_wallet()
                .and_then(|wallet| handlers::handle_connect_wallet(session, wallet.as_ref()));
            respond(request_type, result)?
        }
        WorkerRequestType::AuthenticateWallet => {
            let result = match attached_wallet() {
                Ok(wallet) => {
                    handlers::handle_authenticate_wallet(
                        session,
                        wallet.as_ref(),
                        report_authentication_step,
                    )
                    .await
                }
                Err(err) => Err(err),
            };
            if let Some((step, message)) = ProgressStep::for_authentication_result(&result) {
                send_progress_message(
                    ProgressMessageType::AuthenticationComplete,
                    step,
                    &message,
                    None,
                );
            }
            respond(request_type, result)?
        }
        WorkerRequestType::SubmitHealthRecord => {
            let request: SubmitHealthRecordRequest = message
                .parse_payload(request_type)
                .map_err(|e| JsValue::from_str(&e))?;
            let service = HttpRecordService::new(session.borrow().config().record_service.clone());
            let result = handlers::handle_submit_health_record(
                session,
                &service,
                request,
                report_submission_state,
            )
            .await;
            respond(request_type, result)?
        }
        WorkerRequestType::OpenSealedRecord => {
            let request: OpenSealedRecordRequest = message
                .parse_payload(request_type)
                .map_err(|e| JsValue::from_str(&e))?;
            respond(
                request_type,
                handlers::handle_open_sealed_record(session, request),
            )?
        }
        WorkerRequestType::ResetForm => {
            respond(request_type, Ok(handlers::handle_reset_form(session)))?
        }
        WorkerRequestType::DisconnectWallet => {
            respond(request_type, Ok(handlers::handle_disconnect_wallet(session)))?
        }
        WorkerRequestType::SessionStatus => {
            respond(request_type, Ok(handlers::handle_session_status(session)))?
        }
    };

    debug!(
        "WASM Worker: Responding with type {}",
        response.response_type
    );

    response
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&format!("Failed to serialize response: {:?}", e)))
}

fn respond<T: Serialize>(
    request_type: WorkerRequestType,
    result: Result<T, RecordFlowError>,
) -> Result<RecordWorkerResponse, JsValue> {
    match result {
        Ok(value) => {
            RecordWorkerResponse::success(request_type, &value).map_err(|e| JsValue::from_str(&e))
        }
        Err(err) => Ok(RecordWorkerResponse::failure(
            request_type,
            err.code(),
            &scrub_error_message(&err.to_string()),
        )),
    }
}
