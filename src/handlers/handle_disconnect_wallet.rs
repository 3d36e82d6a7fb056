use std::cell::RefCell;
use std::rc::Rc;

use log::info;

use crate::handlers::SessionSnapshot;
use crate::session::RecordSession;

/// **Handles:** `WorkerRequestType::DisconnectWallet`
///
/// Drops the wallet identity, signature and key pair. Any submission still in
/// flight finishes as superseded. The draft form stays so the user can
/// reconnect and retry.
pub fn handle_disconnect_wallet(session: Rc<RefCell<RecordSession>>) -> SessionSnapshot {
    let mut s = session.borrow_mut();
    s.disconnect();
    info!("Wallet disconnected; session key material cleared");
    SessionSnapshot::capture(&s)
}
