// === HEALTH RECORD TYPES ===
// Form metadata, file attachments, and record service request/response bodies

use serde::{Deserialize, Deserializer, Serialize};

use crate::encoders::base64_standard_decode;
use crate::error::RecordFlowError;

/// Metadata entered in the manual-entry upload form.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HealthRecordForm {
    /// `YYYY-MM-DD`
    pub date: String,
    pub doctor: String,
    pub facility: String,
    pub category: String,
    #[serde(default)]
    pub notes: String,
}

impl HealthRecordForm {
    pub fn validate(&self) -> Result<(), RecordFlowError> {
        if !is_iso_date(self.date.trim()) {
            return Err(RecordFlowError::InvalidForm("date"));
        }
        if self.doctor.trim().is_empty() {
            return Err(RecordFlowError::InvalidForm("doctor"));
        }
        if self.facility.trim().is_empty() {
            return Err(RecordFlowError::InvalidForm("facility"));
        }
        if self.category.trim().is_empty() {
            return Err(RecordFlowError::InvalidForm("category"));
        }
        Ok(())
    }
}

fn is_iso_date(s: &str) -> bool {
    let parts: Vec<&str> = s.split('-').collect();
    let [year, month, day] = parts.as_slice() else {
        return false;
    };
    if year.len() != 4 || month.len() != 2 || day.len() != 2 {
        return false;
    }
    let (Ok(_), Ok(m), Ok(d)) = (year.parse::<u16>(), month.parse::<u8>(), day.parse::<u8>())
    else {
        return false;
    };
    (1..=12).contains(&m) && (1..=31).contains(&d)
}

/// File selected by the user, still in plaintext.
#[derive(Clone, PartialEq, Eq)]
pub struct RecordFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for RecordFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordFile")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// File as it arrives from JS: base64 contents plus browser metadata.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RecordFileInput {
    pub name: String,
    #[serde(default)]
    pub content_type: String,
    pub data_base64: String,
}

impl TryFrom<RecordFileInput> for RecordFile {
    type Error = RecordFlowError;

    fn try_from(input: RecordFileInput) -> Result<Self, Self::Error> {
        let bytes = base64_standard_decode(&input.data_base64).map_err(|e| {
            RecordFlowError::EncryptionFailed(format!("Could not read {}: {}", input.name, e))
        })?;
        Ok(RecordFile {
            name: input.name,
            content_type: if input.content_type.is_empty() {
                "application/octet-stream".to_string()
            } else {
                input.content_type
            },
            bytes,
        })
    }
}

/// Sealed file attached to an upload.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SealedAttachment {
    pub file_name: String,
    pub content_type: String,
    /// Standard base64 of the sealed box bytes
    pub sealed_data_base64: String,
}

/// Body of the record upload request.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HealthRecordPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<SealedAttachment>,
    pub date: String,
    pub doctor: String,
    pub category: String,
    pub facility: String,
    pub notes: String,
    pub user_id: String,
    /// Owning wallet public key, base58
    pub public_key: String,
    /// X25519 record encryption public key, base58
    #[serde(rename = "encryption_key")]
    pub encryption_key: String,
}

/// Current application user as reported by the record service.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
}

/// Upload response. Either field may be missing from a misbehaving server.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    #[serde(default, alias = "record_id")]
    pub record_id: Option<String>,
    #[serde(default)]
    pub transaction: Option<String>,
}

impl UploadResult {
    /// Both identifiers, only when present and non-blank.
    pub fn confirmable(&self) -> Option<(&str, &str)> {
        let record_id = self.record_id.as_deref().filter(|s| !s.trim().is_empty())?;
        let transaction = self.transaction.as_deref().filter(|s| !s.trim().is_empty())?;
        Some((record_id, transaction))
    }
}

/// Result of the confirmation call.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationResult {
    /// Absent means the server returned 2xx without an explicit verdict
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

fn default_true() -> bool {
    true
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}
