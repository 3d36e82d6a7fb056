// ******************************************************************************
// *                                                                            *
// *                        HANDLER: AUTHENTICATE WALLET                        *
// *                                                                            *
// ******************************************************************************
use std::cell::RefCell;
use std::rc::Rc;

use log::{info, warn};
use serde::Serialize;

use crate::error::RecordFlowError;
use crate::session::RecordSession;
use crate::types::ProgressStep;
use crate::wallet::{authenticate_wallet, WalletAdapter};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticateWalletResult {
    pub public_key: String,
    /// Base58 challenge signature, shown to the user as proof of ownership
    pub signature_b58: String,
    /// Base58 X25519 key records are sealed to
    pub encryption_public_key: String,
}

/// **Handles:** `WorkerRequestType::AuthenticateWallet`
///
/// Signs the challenge with the attached wallet, verifies it, and derives the
/// record encryption key pair into the session. If the wallet is switched or
/// disconnected while the signature prompt is open, the result is dropped.
///
/// # Arguments
/// * `on_step` - Called as the flow moves through signing, verification and
///   key derivation
pub async fn handle_authenticate_wallet<W, F>(
    session: Rc<RefCell<RecordSession>>,
    wallet: &W,
    on_step: F,
) -> Result<AuthenticateWalletResult, RecordFlowError>
where
    W: WalletAdapter,
    F: FnMut(ProgressStep),
{
    let (epoch, expected, challenge) = {
        let mut s = session.borrow_mut();
        // Authenticating straight after the wallet's own connect prompt.
        if !s.is_connected() && wallet.is_connected() {
            if let Some(identity) = wallet.public_key() {
                s.connect(identity);
            }
        }
        (s.epoch(), s.wallet(), s.config().challenge.clone())
    };
    if expected.is_none() {
        session
            .borrow_mut()
            .record_authentication_failure(epoch, &RecordFlowError::WalletUnavailable);
        return Err(RecordFlowError::WalletUnavailable);
    }

    let authentication = match authenticate_wallet(wallet, expected, &challenge, on_step).await {
        Ok(authentication) => authentication,
        Err(err) => {
            warn!("Wallet authentication failed: {}", err.code());
            session
                .borrow_mut()
                .record_authentication_failure(epoch, &err);
            return Err(err);
        }
    };

    let public_key = authentication.identity.to_base58();
    let encryption_public_key = authentication.keypair.public_key_b58();
    let signature_b58 = session
        .borrow_mut()
        .install_authentication(epoch, authentication)?;
    info!("Wallet {} authenticated; record key ready", public_key);

    Ok(AuthenticateWalletResult {
        public_key,
        signature_b58,
        encryption_public_key,
    })
}
