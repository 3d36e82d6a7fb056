use std::cell::RefCell;
use std::rc::Rc;

use futures::executor::block_on;
use futures::future::join;

use crate::config::{
    GENERIC_CONFIRM_ERROR, GENERIC_UPLOAD_ERROR, RECORD_UPLOADED_MESSAGE, SEALED_BOX_OVERHEAD,
};
use crate::crypto::open_sealed_record;
use crate::encoders::{base64_standard_decode, base64_standard_encode};
use crate::error::{RecordFlowError, ServiceError};
use crate::handlers::{handle_submit_health_record, SubmitHealthRecordRequest};
use crate::session::{RecordSession, StatusMessage};
use crate::submission::SubmissionState;
use crate::tests::fakes::{
    authenticated_session, clinic_form, new_session, FakeRecordService, FakeWallet,
};
use crate::types::{ConfirmationResult, HealthRecordForm, RecordFileInput, UploadResult};

fn request_with_file(bytes: &[u8]) -> SubmitHealthRecordRequest {
    SubmitHealthRecordRequest {
        form: clinic_form(),
        file: Some(RecordFileInput {
            name: "labs.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            data_base64: base64_standard_encode(bytes),
        }),
    }
}

fn metadata_only() -> SubmitHealthRecordRequest {
    SubmitHealthRecordRequest {
        form: clinic_form(),
        file: None,
    }
}

fn submit(
    session: &Rc<RefCell<RecordSession>>,
    service: &FakeRecordService,
    request: SubmitHealthRecordRequest,
) -> (Result<crate::handlers::SubmitHealthRecordResult, RecordFlowError>, Vec<&'static str>) {
    let mut states = Vec::new();
    let result = block_on(handle_submit_health_record(
        session.clone(),
        service,
        request,
        |state: &SubmissionState| states.push(state.name()),
    ));
    (result, states)
}

#[test]
fn uploads_sealed_file_and_confirms_transaction() {
    let wallet = FakeWallet::new(11);
    let session = authenticated_session(&wallet);
    let service = FakeRecordService::accepting();
    let file = vec![0x5Au8; 2 * 1024 * 1024];

    let (result, states) = submit(&session, &service, request_with_file(&file));
    let result = result.unwrap();

    assert_eq!(result.record_id, "r1");
    assert_eq!(result.transaction, "tx1");
    assert!(result.encrypted);
    assert_eq!(
        states,
        vec![
            "validating",
            "encrypting",
            "resolving-user",
            "uploading",
            "confirming-transaction",
            "succeeded"
        ]
    );

    // Upload carries metadata, owner, encryption key and only ciphertext.
    let uploads = service.uploads.borrow();
    let payload = &uploads[0];
    assert_eq!(payload.date, "2024-01-01");
    assert_eq!(payload.doctor, "Dr. A");
    assert_eq!(payload.facility, "City Clinic");
    assert_eq!(payload.category, "Lab Result");
    assert_eq!(payload.user_id, "user-42");
    assert_eq!(payload.public_key, wallet.identity().to_base58());

    let s = session.borrow();
    let keypair = s.keypair().unwrap();
    assert_eq!(payload.encryption_key, keypair.public_key_b58());

    let attachment = payload.file.as_ref().unwrap();
    assert_eq!(attachment.file_name, "labs.pdf");
    let sealed = base64_standard_decode(&attachment.sealed_data_base64).unwrap();
    assert_eq!(sealed.len(), file.len() + SEALED_BOX_OVERHEAD);
    assert_eq!(open_sealed_record(&sealed, keypair).unwrap(), file);

    assert_eq!(
        service.confirmed.borrow().as_slice(),
        &[("r1".to_string(), "tx1".to_string())]
    );
    assert_eq!(
        s.status(),
        Some(&StatusMessage::Success(RECORD_UPLOADED_MESSAGE.to_string()))
    );
    assert_eq!(s.draft().form, HealthRecordForm::default());
    assert!(s.draft().file.is_none());
}

#[test]
fn metadata_only_record_skips_encryption() {
    let wallet = FakeWallet::new(11);
    let session = authenticated_session(&wallet);
    let service = FakeRecordService::accepting();

    let (result, states) = submit(&session, &service, metadata_only());
    assert!(!result.unwrap().encrypted);
    assert!(!states.contains(&"encrypting"));
    assert!(service.uploads.borrow()[0].file.is_none());
    assert_eq!(service.confirm_calls.get(), 1);
}

#[test]
fn unauthenticated_submission_makes_no_network_calls() {
    let session = new_session();
    session.borrow_mut().connect(FakeWallet::new(11).identity());
    let service = FakeRecordService::accepting();

    let (result, states) = submit(&session, &service, request_with_file(b"scan"));
    assert_eq!(result.unwrap_err(), RecordFlowError::NotAuthenticated);
    assert_eq!(service.network_calls(), 0);
    assert_eq!(states, vec!["validating", "failed"]);
    assert!(matches!(
        session.borrow().status(),
        Some(StatusMessage::Error(_))
    ));
}

#[test]
fn missing_transaction_skips_confirmation() {
    let session = authenticated_session(&FakeWallet::new(11));
    let service = FakeRecordService {
        upload: Ok(UploadResult {
            record_id: Some("r1".to_string()),
            transaction: None,
        }),
        ..FakeRecordService::accepting()
    };

    let (result, _) = submit(&session, &service, request_with_file(b"scan"));
    assert_eq!(result.unwrap_err(), RecordFlowError::MissingTransactionData);
    assert_eq!(service.upload_calls.get(), 1);
    assert_eq!(service.confirm_calls.get(), 0);

    let s = session.borrow();
    assert!(matches!(s.status(), Some(StatusMessage::Error(_))));
    // Draft kept for retry.
    assert_eq!(s.draft().form, clinic_form());
    assert!(s.draft().file.is_some());
}

#[test]
fn upload_rejection_keeps_server_message() {
    let session = authenticated_session(&FakeWallet::new(11));
    let service = FakeRecordService {
        upload: Err(ServiceError::new(
            Some(422),
            Some("Category is not allowed".to_string()),
        )),
        ..FakeRecordService::accepting()
    };

    let (result, _) = submit(&session, &service, metadata_only());
    assert_eq!(
        result.unwrap_err(),
        RecordFlowError::UploadRejected("Category is not allowed".to_string())
    );
    assert_eq!(service.confirm_calls.get(), 0);
    assert_eq!(
        session.borrow().status(),
        Some(&StatusMessage::Error("Category is not allowed".to_string()))
    );
}

#[test]
fn upload_failure_without_message_uses_generic_text() {
    let session = authenticated_session(&FakeWallet::new(11));
    let service = FakeRecordService {
        upload: Err(ServiceError::new(Some(500), None)),
        ..FakeRecordService::accepting()
    };

    let (result, _) = submit(&session, &service, metadata_only());
    assert_eq!(
        result.unwrap_err(),
        RecordFlowError::UploadRejected(GENERIC_UPLOAD_ERROR.to_string())
    );
}

#[test]
fn network_failure_on_upload_shows_generic_text() {
    let session = authenticated_session(&FakeWallet::new(11));
    let service = FakeRecordService {
        upload: Err(ServiceError::transport(
            "Network request failed: JsValue(TypeError: Failed to fetch)",
        )),
        ..FakeRecordService::accepting()
    };

    let (result, _) = submit(&session, &service, metadata_only());
    assert_eq!(
        result.unwrap_err(),
        RecordFlowError::UploadRejected(GENERIC_UPLOAD_ERROR.to_string())
    );
    assert_eq!(
        session.borrow().status(),
        Some(&StatusMessage::Error(GENERIC_UPLOAD_ERROR.to_string()))
    );
}

#[test]
fn confirmation_error_uses_generic_text_and_keeps_draft() {
    let session = authenticated_session(&FakeWallet::new(11));
    let service = FakeRecordService {
        confirmation: Err(ServiceError::new(Some(500), None)),
        ..FakeRecordService::accepting()
    };

    let (result, states) = submit(&session, &service, request_with_file(b"scan"));
    assert_eq!(
        result.unwrap_err(),
        RecordFlowError::ConfirmationFailed(GENERIC_CONFIRM_ERROR.to_string())
    );
    assert_eq!(service.confirm_calls.get(), 1);
    assert_eq!(states.last(), Some(&"failed"));

    let s = session.borrow();
    assert_eq!(
        s.status(),
        Some(&StatusMessage::Error(GENERIC_CONFIRM_ERROR.to_string()))
    );
    assert_eq!(s.draft().form, clinic_form());
    assert!(s.draft().file.is_some());
}

#[test]
fn network_failure_on_confirmation_shows_generic_text() {
    let session = authenticated_session(&FakeWallet::new(11));
    let service = FakeRecordService {
        confirmation: Err(ServiceError::transport("fetch call failed: JsValue(Error)")),
        ..FakeRecordService::accepting()
    };

    let (result, _) = submit(&session, &service, metadata_only());
    assert_eq!(
        result.unwrap_err(),
        RecordFlowError::ConfirmationFailed(GENERIC_CONFIRM_ERROR.to_string())
    );
}

#[test]
fn unsuccessful_confirmation_is_a_failure() {
    let session = authenticated_session(&FakeWallet::new(11));
    let service = FakeRecordService {
        confirmation: Ok(ConfirmationResult {
            success: false,
            signature: None,
            message: Some("Transaction not found".to_string()),
        }),
        ..FakeRecordService::accepting()
    };

    let (result, states) = submit(&session, &service, metadata_only());
    assert_eq!(
        result.unwrap_err(),
        RecordFlowError::ConfirmationFailed("Transaction not found".to_string())
    );
    assert_eq!(states.last(), Some(&"failed"));
    let s = session.borrow();
    assert!(!matches!(s.status(), Some(StatusMessage::Success(_))));
    assert_eq!(s.draft().form, clinic_form());
}

#[test]
fn user_lookup_failure_is_unknown_error() {
    let session = authenticated_session(&FakeWallet::new(11));
    let service = FakeRecordService {
        user: Err(ServiceError::transport("offline")),
        ..FakeRecordService::accepting()
    };

    let (result, _) = submit(&session, &service, metadata_only());
    assert!(matches!(result, Err(RecordFlowError::UnknownError(_))));
    assert_eq!(service.upload_calls.get(), 0);
}

#[test]
fn invalid_form_fails_before_any_network_call() {
    let session = authenticated_session(&FakeWallet::new(11));
    let service = FakeRecordService::accepting();
    let mut request = metadata_only();
    request.form.date = "01/01/2024".to_string();

    let (result, _) = submit(&session, &service, request);
    assert_eq!(result.unwrap_err(), RecordFlowError::InvalidForm("date"));
    assert_eq!(service.network_calls(), 0);
}

#[test]
fn retry_after_failure_succeeds_with_retained_draft() {
    let session = authenticated_session(&FakeWallet::new(11));
    let failing = FakeRecordService {
        upload: Err(ServiceError::new(Some(503), None)),
        ..FakeRecordService::accepting()
    };
    let (first, _) = submit(&session, &failing, request_with_file(b"scan"));
    assert!(first.is_err());

    let service = FakeRecordService::accepting();
    let (second, _) = submit(&session, &service, request_with_file(b"scan"));
    assert_eq!(second.unwrap().record_id, "r1");
}

#[test]
fn second_submit_while_first_in_flight_is_rejected() {
    let session = authenticated_session(&FakeWallet::new(11));
    let service = FakeRecordService {
        yield_on_upload: true,
        ..FakeRecordService::accepting()
    };

    let first = handle_submit_health_record(session.clone(), &service, metadata_only(), |_| {});
    let second = handle_submit_health_record(session.clone(), &service, metadata_only(), |_| {});
    let (first, second) = block_on(join(first, second));

    assert_eq!(first.unwrap().record_id, "r1");
    assert_eq!(second.unwrap_err(), RecordFlowError::SubmissionInProgress);
    assert_eq!(service.upload_calls.get(), 1);
    assert_eq!(service.confirm_calls.get(), 1);
}

#[test]
fn reset_during_upload_drops_late_response() {
    let session = authenticated_session(&FakeWallet::new(11));
    let service = FakeRecordService::accepting();
    let handle = session.clone();
    *service.on_upload.borrow_mut() = Some(Box::new(move || handle.borrow_mut().reset_form()));

    let (result, states) = submit(&session, &service, request_with_file(b"scan"));
    assert_eq!(result.unwrap_err(), RecordFlowError::AttemptSuperseded);
    assert_eq!(service.confirm_calls.get(), 0);
    assert!(!states.contains(&"failed"));

    let s = session.borrow();
    assert!(s.status().is_none());
    assert_eq!(s.submission_state(), SubmissionState::Idle);
    assert!(s.draft().file.is_none());
}

#[test]
fn disconnect_during_upload_drops_late_response() {
    let session = authenticated_session(&FakeWallet::new(11));
    let service = FakeRecordService::accepting();
    let handle = session.clone();
    *service.on_upload.borrow_mut() = Some(Box::new(move || handle.borrow_mut().disconnect()));

    let (result, _) = submit(&session, &service, metadata_only());
    assert_eq!(result.unwrap_err(), RecordFlowError::AttemptSuperseded);
    assert_eq!(service.confirm_calls.get(), 0);
    assert!(!session.borrow().is_authenticated());
}

#[test]
fn unauthenticated_submission_with_unreadable_file_is_not_authenticated() {
    let session = new_session();
    session.borrow_mut().connect(FakeWallet::new(11).identity());
    let service = FakeRecordService::accepting();
    let mut request = request_with_file(b"scan");
    if let Some(file) = request.file.as_mut() {
        file.data_base64 = "!!not base64!!".to_string();
    }

    let (result, states) = submit(&session, &service, request);
    assert_eq!(result.unwrap_err(), RecordFlowError::NotAuthenticated);
    assert_eq!(states, vec!["validating", "failed"]);
    assert_eq!(service.network_calls(), 0);
    assert_eq!(session.borrow().draft().form, clinic_form());
}

#[test]
fn unreadable_file_input_is_an_encryption_failure() {
    let session = authenticated_session(&FakeWallet::new(11));
    let service = FakeRecordService::accepting();
    let mut request = request_with_file(b"scan");
    if let Some(file) = request.file.as_mut() {
        file.data_base64 = "!!not base64!!".to_string();
    }

    let (result, states) = submit(&session, &service, request);
    assert!(matches!(result, Err(RecordFlowError::EncryptionFailed(_))));
    assert!(states.is_empty());
    assert_eq!(service.network_calls(), 0);
}
