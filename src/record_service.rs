// ******************************************************************************
// *                                                                            *
// *                       RECORD SERVICE (USER / UPLOAD / CONFIRM)             *
// *                                                                            *
// ******************************************************************************

use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::RecordServiceConfig;
use crate::error::ServiceError;
use crate::fetch::{
    build_json_init, fetch_with_init, response_ok, response_status, response_status_text,
    response_text,
};
use crate::types::{ConfirmationResult, CurrentUser, HealthRecordPayload, UploadResult};

/// Backend collaborator for the submission flow. Errors are returned raw;
/// the calling stage decides which `RecordFlowError` they become.
#[allow(async_fn_in_trait)]
pub trait RecordService {
    async fn get_current_user(&self) -> Result<CurrentUser, ServiceError>;

    async fn upload_health_record(
        &self,
        payload: &HealthRecordPayload,
    ) -> Result<UploadResult, ServiceError>;

    async fn confirm_transaction(
        &self,
        record_id: &str,
        transaction: &str,
    ) -> Result<ConfirmationResult, ServiceError>;
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ConfirmTransactionBody<'a> {
    record_id: &'a str,
    transaction: &'a str,
}

/// `RecordService` over the page's `fetch`, JSON in and out.
pub struct HttpRecordService {
    config: RecordServiceConfig,
}

impl HttpRecordService {
    pub fn new(config: RecordServiceConfig) -> Self {
        Self { config }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: &str,
        url: &str,
        body: Option<String>,
    ) -> Result<T, ServiceError> {
        let init = build_json_init(method, body.as_deref(), self.config.auth_token.as_deref())
            .map_err(ServiceError::transport)?;
        debug!("{} {}", method, url);

        let resp = fetch_with_init(url, &init)
            .await
            .map_err(ServiceError::transport)?;
        let ok = response_ok(&resp).map_err(ServiceError::transport)?;
        let status = response_status(&resp).map_err(ServiceError::transport)?;
        let text = response_text(&resp).await.unwrap_or_default();

        if !ok {
            debug!(
                "{} {} failed: HTTP {} {}",
                method,
                url,
                status,
                response_status_text(&resp).unwrap_or_default()
            );
            // Only a message from the response body reaches the user.
            return Err(ServiceError::new(Some(status), server_message(&text)));
        }
        decode_success_body(status, &text)
    }
}

impl RecordService for HttpRecordService {
    async fn get_current_user(&self) -> Result<CurrentUser, ServiceError> {
        self.send("GET", &self.config.current_user_url(), None).await
    }

    async fn upload_health_record(
        &self,
        payload: &HealthRecordPayload,
    ) -> Result<UploadResult, ServiceError> {
        let body = serde_json::to_string(payload)
            .map_err(|e| ServiceError::transport(format!("Failed to encode upload: {}", e)))?;
        self.send("POST", &self.config.upload_url(), Some(body)).await
    }

    async fn confirm_transaction(
        &self,
        record_id: &str,
        transaction: &str,
    ) -> Result<ConfirmationResult, ServiceError> {
        let body = serde_json::to_string(&ConfirmTransactionBody {
            record_id,
            transaction,
        })
        .map_err(|e| ServiceError::transport(format!("Failed to encode confirmation: {}", e)))?;
        self.send("POST", &self.config.confirm_url(), Some(body)).await
    }
}

/// Human-readable message from an error body: `message`, `error`, or
/// `error.message`, in that order.
pub fn server_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let pick = |v: Option<&serde_json::Value>| {
        v.and_then(|m| m.as_str())
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
    };
    pick(value.get("message"))
        .or_else(|| pick(value.get("error")))
        .or_else(|| pick(value.get("error").and_then(|e| e.get("message"))))
}

fn decode_success_body<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, ServiceError> {
    // An empty 2xx body reads as `{}` so optional fields can default.
    let body = if body.trim().is_empty() { "{}" } else { body };
    serde_json::from_str(body).map_err(|e| {
        ServiceError::new(
            Some(status),
            Some(format!("Malformed record service response: {}", category_name(&e))),
        )
    })
}

fn category_name(e: &serde_json::Error) -> &'static str {
    match e.classify() {
        serde_json::error::Category::Io => "io",
        serde_json::error::Category::Syntax => "syntax",
        serde_json::error::Category::Data => "unexpected shape",
        serde_json::error::Category::Eof => "truncated",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_message_prefers_message_then_error() {
        assert_eq!(
            server_message(r#"{"message":"Invalid date","error":"Bad Request"}"#),
            Some("Invalid date".to_string())
        );
        assert_eq!(
            server_message(r#"{"error":"Quota exceeded"}"#),
            Some("Quota exceeded".to_string())
        );
        assert_eq!(
            server_message(r#"{"error":{"message":"Token expired"}}"#),
            Some("Token expired".to_string())
        );
    }

    #[test]
    fn server_message_ignores_blank_and_non_json() {
        assert_eq!(server_message(r#"{"message":"  "}"#), None);
        assert_eq!(server_message("<html>502</html>"), None);
    }

    #[test]
    fn upload_body_missing_transaction_still_decodes() {
        let result: UploadResult = decode_success_body(200, r#"{"recordId":"r1"}"#).unwrap();
        assert_eq!(result.record_id.as_deref(), Some("r1"));
        assert!(result.confirmable().is_none());
    }

    #[test]
    fn empty_confirmation_body_counts_as_success() {
        let result: ConfirmationResult = decode_success_body(204, "").unwrap();
        assert!(result.success);
    }

    #[test]
    fn malformed_body_does_not_echo_content() {
        let err = decode_success_body::<CurrentUser>(200, r#"{"id":["secret-ish"]}"#).unwrap_err();
        assert_eq!(err.status, Some(200));
        assert!(!err.to_string().contains("secret-ish"));
    }

    #[test]
    fn confirm_body_is_camel_case() {
        let body = serde_json::to_value(ConfirmTransactionBody {
            record_id: "r1",
            transaction: "tx1",
        })
        .unwrap();
        assert_eq!(body["recordId"], "r1");
        assert_eq!(body["transaction"], "tx1");
    }
}
