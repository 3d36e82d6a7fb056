// ******************************************************************************
// *                                                                            *
// *                        HANDLER: OPEN SEALED RECORD                         *
// *                                                                            *
// ******************************************************************************
use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::crypto::open_sealed_record;
use crate::encoders::{base64_standard_decode, base64_standard_encode};
use crate::error::RecordFlowError;
use crate::session::RecordSession;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenSealedRecordRequest {
    /// Standard base64 of the sealed box, as stored by the record service
    pub sealed_data_base64: String,
}

#[derive(Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OpenSealedRecordResult {
    pub data_base64: String,
    pub byte_length: usize,
}

impl std::fmt::Debug for OpenSealedRecordResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenSealedRecordResult")
            .field("byte_length", &self.byte_length)
            .finish()
    }
}

/// **Handles:** `WorkerRequestType::OpenSealedRecord`
///
/// Opens a record sealed to this session's encryption key, for the record
/// viewer. Requires an authenticated session.
pub fn handle_open_sealed_record(
    session: Rc<RefCell<RecordSession>>,
    request: OpenSealedRecordRequest,
) -> Result<OpenSealedRecordResult, RecordFlowError> {
    let sealed = base64_standard_decode(request.sealed_data_base64.trim())
        .map_err(|e| RecordFlowError::EncryptionFailed(format!("Invalid sealed record: {}", e)))?;

    let s = session.borrow();
    let keypair = s.keypair().ok_or(RecordFlowError::NotAuthenticated)?;
    let plaintext = open_sealed_record(&sealed, keypair)?;

    Ok(OpenSealedRecordResult {
        byte_length: plaintext.len(),
        data_base64: base64_standard_encode(&plaintext),
    })
}
