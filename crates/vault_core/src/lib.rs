//! Vault Core - completion rules and poll driver
//!
//! This crate decides when a Code Registry vault analysis is finished.
//! It knows nothing about the wire protocol: tool invocations go through
//! the [`ToolCaller`] trait, which the MCP client crate implements.

pub mod backoff;
pub mod config;
pub mod error;
pub mod poll;
pub mod status;
pub mod tool;

pub use backoff::Backoff;
pub use config::{AuthMode, ClientConfig, PollConfig, VaultConfig};
pub use error::{CoreError, Result};
pub use poll::{PollObserver, PollOutcome, VaultPoller};
pub use status::{StatusRecord, extract_report_status};
pub use tool::{REPORTS_TOOL, SUMMARY_TOOL, ToolCaller};
