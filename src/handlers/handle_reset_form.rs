use std::cell::RefCell;
use std::rc::Rc;

use crate::handlers::SessionSnapshot;
use crate::session::RecordSession;

/// **Handles:** `WorkerRequestType::ResetForm`
///
/// Clears the form, the selected file and the status message. An upload still
/// in flight is abandoned: its late responses are dropped.
pub fn handle_reset_form(session: Rc<RefCell<RecordSession>>) -> SessionSnapshot {
    let mut s = session.borrow_mut();
    s.reset_form();
    SessionSnapshot::capture(&s)
}
