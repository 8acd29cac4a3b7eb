//! Process lifecycle: shutdown signals, the service indicator and the
//! wake lock

mod indicator;
mod shutdown;
mod wakelock;

pub use indicator::ServiceIndicator;
pub use shutdown::ShutdownSignal;
pub use wakelock::WakeLock;
