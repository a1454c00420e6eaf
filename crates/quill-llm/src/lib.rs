// The oracle boundary: every call to the external language model goes
// through the `Oracle` trait so a deterministic stub can replace it.

pub mod client;
pub mod oracle;
pub mod parse;
pub mod prompt;
pub mod stub;

pub use client::{ClaudeClient, LlmClient, LlmSettings};
pub use oracle::{CitationDraft, Oracle, OracleError};
pub use stub::{OracleCall, StubOracle};
