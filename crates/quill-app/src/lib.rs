// Library root: the session actor, resolver and calibration logic, plus
// configuration, re-exported for the binary and integration tests.

pub mod app;
pub mod calibration;
pub mod config;
pub mod handle;
pub mod protocol;
pub mod resolver;

pub use handle::{AssistantHandle, SessionError};
pub use protocol::{AssistantEvent, Snapshot};
