pub mod progress;
pub mod record;
pub mod worker_messages;

pub use progress::*;
pub use record::*;
