// ******************************************************************************
// *                                                                            *
// *                          HANDLER: CONNECT WALLET                           *
// *                                                                            *
// ******************************************************************************
use std::cell::RefCell;
use std::rc::Rc;

use log::info;
use serde::Serialize;

use crate::error::RecordFlowError;
use crate::session::RecordSession;
use crate::wallet::WalletAdapter;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectWalletResult {
    /// Base58 Ed25519 public key of the connected wallet
    pub public_key: String,
    /// True when reconnecting the same wallet kept an earlier authentication
    pub authenticated: bool,
}

/// **Handles:** `WorkerRequestType::ConnectWallet`
///
/// Reads the public key from the attached wallet and binds the session to it.
/// Connecting a different wallet drops any earlier authentication.
pub fn handle_connect_wallet<W: WalletAdapter>(
    session: Rc<RefCell<RecordSession>>,
    wallet: &W,
) -> Result<ConnectWalletResult, RecordFlowError> {
    if !wallet.is_connected() {
        return Err(RecordFlowError::WalletUnavailable);
    }
    let identity = wallet
        .public_key()
        .ok_or(RecordFlowError::WalletUnavailable)?;

    let mut s = session.borrow_mut();
    s.connect(identity);
    let public_key = identity.to_base58();
    info!("Wallet connected: {}", public_key);

    Ok(ConnectWalletResult {
        public_key,
        authenticated: s.is_authenticated(),
    })
}
