pub mod handle_authenticate_wallet;
pub mod handle_connect_wallet;
pub mod handle_disconnect_wallet;
pub mod handle_open_sealed_record;
pub mod handle_reset_form;
pub mod handle_session_status;
pub mod handle_submit_health_record;

pub use handle_authenticate_wallet::*;
pub use handle_connect_wallet::*;
pub use handle_disconnect_wallet::*;
pub use handle_open_sealed_record::*;
pub use handle_reset_form::*;
pub use handle_session_status::*;
pub use handle_submit_health_record::*;
