// === WORKER MESSAGES: REQUEST & RESPONSE TYPES ===
// Envelope `{ type, payload }` exchanged with the JS worker shim

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerRequestType {
    ConnectWallet,
    AuthenticateWallet,
    SubmitHealthRecord,
    OpenSealedRecord,
    ResetForm,
    DisconnectWallet,
    SessionStatus,
}

impl TryFrom<u32> for WorkerRequestType {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(WorkerRequestType::ConnectWallet),
            1 => Ok(WorkerRequestType::AuthenticateWallet),
            2 => Ok(WorkerRequestType::SubmitHealthRecord),
            3 => Ok(WorkerRequestType::OpenSealedRecord),
            4 => Ok(WorkerRequestType::ResetForm),
            5 => Ok(WorkerRequestType::DisconnectWallet),
            6 => Ok(WorkerRequestType::SessionStatus),
            _ => Err(format!("Invalid WorkerRequestType value: {}", value)),
        }
    }
}

impl WorkerRequestType {
    pub fn name(&self) -> &'static str {
        match self {
            WorkerRequestType::ConnectWallet => "CONNECT_WALLET",
            WorkerRequestType::AuthenticateWallet => "AUTHENTICATE_WALLET",
            WorkerRequestType::SubmitHealthRecord => "SUBMIT_HEALTH_RECORD",
            WorkerRequestType::OpenSealedRecord => "OPEN_SEALED_RECORD",
            WorkerRequestType::ResetForm => "RESET_FORM",
            WorkerRequestType::DisconnectWallet => "DISCONNECT_WALLET",
            WorkerRequestType::SessionStatus => "SESSION_STATUS",
        }
    }

    pub fn success_response(&self) -> WorkerResponseType {
        match self {
            WorkerRequestType::ConnectWallet => WorkerResponseType::ConnectWalletSuccess,
            WorkerRequestType::AuthenticateWallet => WorkerResponseType::AuthenticateWalletSuccess,
            WorkerRequestType::SubmitHealthRecord => WorkerResponseType::SubmitHealthRecordSuccess,
            WorkerRequestType::OpenSealedRecord => WorkerResponseType::OpenSealedRecordSuccess,
            WorkerRequestType::ResetForm => WorkerResponseType::ResetFormSuccess,
            WorkerRequestType::DisconnectWallet => WorkerResponseType::DisconnectWalletSuccess,
            WorkerRequestType::SessionStatus => WorkerResponseType::SessionStatusSuccess,
        }
    }

    pub fn failure_response(&self) -> WorkerResponseType {
        match self {
            WorkerRequestType::ConnectWallet => WorkerResponseType::ConnectWalletFailure,
            WorkerRequestType::AuthenticateWallet => WorkerResponseType::AuthenticateWalletFailure,
            WorkerRequestType::SubmitHealthRecord => WorkerResponseType::SubmitHealthRecordFailure,
            WorkerRequestType::OpenSealedRecord => WorkerResponseType::OpenSealedRecordFailure,
            WorkerRequestType::ResetForm => WorkerResponseType::ResetFormFailure,
            WorkerRequestType::DisconnectWallet => WorkerResponseType::DisconnectWalletFailure,
            WorkerRequestType::SessionStatus => WorkerResponseType::SessionStatusFailure,
        }
    }
}

#[wasm_bindgen]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerResponseType {
    // Success responses - one for each request type
    ConnectWalletSuccess,
    AuthenticateWalletSuccess,
    SubmitHealthRecordSuccess,
    OpenSealedRecordSuccess,
    ResetFormSuccess,
    DisconnectWalletSuccess,
    SessionStatusSuccess,

    // Failure responses - one for each request type
    ConnectWalletFailure,
    AuthenticateWalletFailure,
    SubmitHealthRecordFailure,
    OpenSealedRecordFailure,
    ResetFormFailure,
    DisconnectWalletFailure,
    SessionStatusFailure,

    // Progress responses
    AuthenticationProgress,
    AuthenticationComplete,
    SubmissionProgress,
    SubmissionComplete,
}

impl From<WorkerResponseType> for u32 {
    fn from(value: WorkerResponseType) -> Self {
        match value {
            WorkerResponseType::ConnectWalletSuccess => 0,
            WorkerResponseType::AuthenticateWalletSuccess => 1,
            WorkerResponseType::SubmitHealthRecordSuccess => 2,
            WorkerResponseType::OpenSealedRecordSuccess => 3,
            WorkerResponseType::ResetFormSuccess => 4,
            WorkerResponseType::DisconnectWalletSuccess => 5,
            WorkerResponseType::SessionStatusSuccess => 6,

            WorkerResponseType::ConnectWalletFailure => 7,
            WorkerResponseType::AuthenticateWalletFailure => 8,
            WorkerResponseType::SubmitHealthRecordFailure => 9,
            WorkerResponseType::OpenSealedRecordFailure => 10,
            WorkerResponseType::ResetFormFailure => 11,
            WorkerResponseType::DisconnectWalletFailure => 12,
            WorkerResponseType::SessionStatusFailure => 13,

            WorkerResponseType::AuthenticationProgress => 14,
            WorkerResponseType::AuthenticationComplete => 15,
            WorkerResponseType::SubmissionProgress => 16,
            WorkerResponseType::SubmissionComplete => 17,
        }
    }
}

/// Incoming `{ type, payload }` envelope.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RecordWorkerMessage {
    #[serde(rename = "type")]
    pub msg_type: u32,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl RecordWorkerMessage {
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("Invalid worker message: {}", e))
    }

    pub fn request_type(&self) -> Result<WorkerRequestType, String> {
        WorkerRequestType::try_from(self.msg_type)
    }

    /// Deserialize the payload; the error names the request but never echoes
    /// payload contents.
    pub fn parse_payload<T: DeserializeOwned>(
        &self,
        request_type: WorkerRequestType,
    ) -> Result<T, String> {
        serde_json::from_value(self.payload.clone()).map_err(|e| {
            format!(
                "Invalid payload for {}: {}",
                request_type.name(),
                describe_serde_error(&e)
            )
        })
    }
}

/// Outgoing `{ type, payload }` envelope.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RecordWorkerResponse {
    #[serde(rename = "type")]
    pub response_type: u32,
    pub payload: serde_json::Value,
}

impl RecordWorkerResponse {
    pub fn success<T: Serialize>(request_type: WorkerRequestType, result: &T) -> Result<Self, String> {
        Ok(Self {
            response_type: u32::from(request_type.success_response()),
            payload: serde_json::to_value(result)
                .map_err(|e| format!("Failed to serialize result: {}", e))?,
        })
    }

    pub fn failure(request_type: WorkerRequestType, code: &str, message: &str) -> Self {
        Self {
            response_type: u32::from(request_type.failure_response()),
            payload: serde_json::json!({ "code": code, "error": message }),
        }
    }
}

fn describe_serde_error(e: &serde_json::Error) -> String {
    // Keep category and position only; serde messages can quote values.
    format!("{:?} error at line {} column {}", e.classify(), e.line(), e.column())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "camelCase")]
    struct Probe {
        #[allow(dead_code)]
        sealed_data_base64: String,
    }

    #[test]
    fn parses_envelope_and_request_type() {
        let msg = RecordWorkerMessage::from_json(r#"{"type":2,"payload":{"a":1}}"#).unwrap();
        assert_eq!(msg.request_type(), Ok(WorkerRequestType::SubmitHealthRecord));
    }

    #[test]
    fn unknown_request_type_is_an_error_not_a_panic() {
        let msg = RecordWorkerMessage::from_json(r#"{"type":99}"#).unwrap();
        assert!(msg.request_type().is_err());
    }

    #[test]
    fn payload_errors_do_not_echo_values() {
        let msg = RecordWorkerMessage::from_json(
            r#"{"type":3,"payload":{"sealedDataBase64":12345678}}"#,
        )
        .unwrap();
        let err = msg
            .parse_payload::<Probe>(WorkerRequestType::OpenSealedRecord)
            .unwrap_err();
        assert!(err.contains("OPEN_SEALED_RECORD"));
        assert!(!err.contains("12345678"));
    }

    #[test]
    fn response_codes_line_up() {
        let ok = RecordWorkerResponse::success(WorkerRequestType::ResetForm, &true).unwrap();
        assert_eq!(ok.response_type, 4);
        let err = RecordWorkerResponse::failure(
            WorkerRequestType::SubmitHealthRecord,
            "NotAuthenticated",
            "Please connect",
        );
        assert_eq!(err.response_type, 9);
        assert_eq!(err.payload["code"], "NotAuthenticated");
    }
}
