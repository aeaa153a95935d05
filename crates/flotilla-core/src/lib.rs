//! Core types and host utilities for flotilla.
//!
//! This crate provides the foundational pieces shared by the flotilla crates:
//!
//! - **Process identities**: the `kind(sequence)@host:port` identities that
//!   name message endpoints on the wire
//! - **Host utilities**: local address discovery and user/hostname resolution
//!
//! # Example
//!
//! ```
//! use flotilla_core::ProcessId;
//!
//! let pid = ProcessId::create("scheduler", "10.1.2.3:4040");
//!
//! // The textual form carries the routing prefix and the endpoint address.
//! assert!(pid.to_string().ends_with("@10.1.2.3:4040"));
//! assert!(pid.prefix().starts_with("scheduler("));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod host;
pub mod pid;

pub use pid::{PidError, ProcessId, SequenceSource};
