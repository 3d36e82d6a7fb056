//! In-memory wallet and record service used by the flow tests.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use ed25519_dalek::{Signer, SigningKey};

use crate::config::WorkerConfig;
use crate::error::ServiceError;
use crate::handlers::handle_authenticate_wallet;
use crate::record_service::RecordService;
use crate::session::RecordSession;
use crate::types::{
    ConfirmationResult, CurrentUser, HealthRecordForm, HealthRecordPayload, UploadResult,
};
use crate::wallet::{WalletAdapter, WalletIdentity};

pub struct FakeWallet {
    signing_key: SigningKey,
    pub connected: bool,
    pub can_sign: bool,
    pub reject: bool,
    /// Flip a bit of every signature before returning it
    pub tamper: bool,
    pub sign_calls: Cell<u32>,
}

impl FakeWallet {
    pub fn new(seed: u8) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&[seed; 32]),
            connected: true,
            can_sign: true,
            reject: false,
            tamper: false,
            sign_calls: Cell::new(0),
        }
    }

    pub fn identity(&self) -> WalletIdentity {
        WalletIdentity::from_bytes(self.signing_key.verifying_key().to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl WalletAdapter for FakeWallet {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn public_key(&self) -> Option<WalletIdentity> {
        self.connected.then(|| self.identity())
    }

    fn supports_message_signing(&self) -> bool {
        self.can_sign
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, String> {
        self.sign_calls.set(self.sign_calls.get() + 1);
        if self.reject {
            return Err("User rejected the request".to_string());
        }
        let mut signature = self.sign(message);
        if self.tamper {
            signature[0] ^= 0x01;
        }
        Ok(signature.to_vec())
    }
}

/// Resolves after returning `Pending` once, so a concurrent future gets polled.
pub struct YieldNow(bool);

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.0 {
            return Poll::Ready(());
        }
        self.0 = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

pub struct FakeRecordService {
    pub user: Result<CurrentUser, ServiceError>,
    pub upload: Result<UploadResult, ServiceError>,
    pub confirmation: Result<ConfirmationResult, ServiceError>,
    pub yield_on_upload: bool,
    /// Runs inside the upload call, while the request is "on the wire"
    pub on_upload: RefCell<Option<Box<dyn FnMut()>>>,
    pub user_calls: Cell<u32>,
    pub upload_calls: Cell<u32>,
    pub confirm_calls: Cell<u32>,
    pub uploads: RefCell<Vec<HealthRecordPayload>>,
    pub confirmed: RefCell<Vec<(String, String)>>,
}

impl FakeRecordService {
    /// Service that accepts everything and confirms `r1` / `tx1`.
    pub fn accepting() -> Self {
        Self {
            user: Ok(CurrentUser {
                id: "user-42".to_string(),
            }),
            upload: Ok(UploadResult {
                record_id: Some("r1".to_string()),
                transaction: Some("tx1".to_string()),
            }),
            confirmation: Ok(ConfirmationResult {
                success: true,
                signature: Some("5sigTx1".to_string()),
                message: None,
            }),
            yield_on_upload: false,
            on_upload: RefCell::new(None),
            user_calls: Cell::new(0),
            upload_calls: Cell::new(0),
            confirm_calls: Cell::new(0),
            uploads: RefCell::new(Vec::new()),
            confirmed: RefCell::new(Vec::new()),
        }
    }

    pub fn network_calls(&self) -> u32 {
        self.user_calls.get() + self.upload_calls.get() + self.confirm_calls.get()
    }
}

impl RecordService for FakeRecordService {
    async fn get_current_user(&self) -> Result<CurrentUser, ServiceError> {
        self.user_calls.set(self.user_calls.get() + 1);
        self.user.clone()
    }

    async fn upload_health_record(
        &self,
        payload: &HealthRecordPayload,
    ) -> Result<UploadResult, ServiceError> {
        self.upload_calls.set(self.upload_calls.get() + 1);
        self.uploads.borrow_mut().push(payload.clone());
        if self.yield_on_upload {
            YieldNow(false).await;
        }
        if let Some(hook) = self.on_upload.borrow_mut().as_mut() {
            hook();
        }
        self.upload.clone()
    }

    async fn confirm_transaction(
        &self,
        record_id: &str,
        transaction: &str,
    ) -> Result<ConfirmationResult, ServiceError> {
        self.confirm_calls.set(self.confirm_calls.get() + 1);
        self.confirmed
            .borrow_mut()
            .push((record_id.to_string(), transaction.to_string()));
        self.confirmation.clone()
    }
}

pub fn new_session() -> Rc<RefCell<RecordSession>> {
    Rc::new(RefCell::new(RecordSession::new(WorkerConfig::default())))
}

/// Session connected to `wallet` and holding its derived key pair.
pub fn authenticated_session(wallet: &FakeWallet) -> Rc<RefCell<RecordSession>> {
    let session = new_session();
    futures::executor::block_on(handle_authenticate_wallet(session.clone(), wallet, |_| {}))
        .expect("fake wallet authenticates");
    session
}

pub fn clinic_form() -> HealthRecordForm {
    HealthRecordForm {
        date: "2024-01-01".to_string(),
        doctor: "Dr. A".to_string(),
        facility: "City Clinic".to_string(),
        category: "Lab Result".to_string(),
        notes: String::new(),
    }
}
