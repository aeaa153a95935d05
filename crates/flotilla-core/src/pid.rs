//! Process identities for flotilla endpoints.
//!
//! Every message endpoint is named by a [`ProcessId`] with the textual form
//! `kind(sequence)@host:port`. The prefix part (`kind(sequence)`) routes
//! inbound HTTP paths to a process instance; the full form is the value sent
//! in the `Libprocess-From` header on outbound calls.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of identity sequence numbers.
///
/// Sequence numbers are strictly increasing per source and never reused,
/// even under concurrent callers. [`SequenceSource::global`] is the
/// process-wide source used by [`ProcessId::create`]; tests and embedders
/// can construct their own source and use [`ProcessId::with_source`].
#[derive(Debug)]
pub struct SequenceSource(AtomicU64);

impl SequenceSource {
    /// Create a fresh source whose first sequence number is 1.
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU64::new(1))
    }

    /// Draw the next sequence number.
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }

    /// The process-wide source shared by every driver instance.
    #[must_use]
    pub fn global() -> &'static SequenceSource {
        static GLOBAL: SequenceSource = SequenceSource::new();
        &GLOBAL
    }
}

impl Default for SequenceSource {
    fn default() -> Self {
        Self::new()
    }
}

/// An immutable process identity: `kind(sequence)@host:port`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProcessId {
    kind: String,
    sequence: u64,
    address: String,
}

impl ProcessId {
    /// Create an identity with a sequence number drawn from the global
    /// source.
    #[must_use]
    pub fn create(kind: impl Into<String>, address: impl Into<String>) -> Self {
        Self::with_source(SequenceSource::global(), kind, address)
    }

    /// Create an identity with a sequence number drawn from `source`.
    #[must_use]
    pub fn with_source(
        source: &SequenceSource,
        kind: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            sequence: source.next(),
            address: address.into(),
        }
    }

    /// The process kind, e.g. `scheduler`.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The sequence number distinguishing instances of the same kind.
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    /// The `host:port` the process is reachable at.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The routing prefix, `kind(sequence)`, used as the leading path
    /// segment of inbound event URLs.
    #[must_use]
    pub fn prefix(&self) -> String {
        format!("{}({})", self.kind, self.sequence)
    }
}

impl fmt::Debug for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProcessId({self})")
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})@{}", self.kind, self.sequence, self.address)
    }
}

impl FromStr for ProcessId {
    type Err = PidError;

    /// Parse an identity from its textual form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, address) = s.split_once('@').ok_or(PidError::MissingAddress)?;
        if address.is_empty() {
            return Err(PidError::MissingAddress);
        }
        let (kind, rest) = prefix.split_once('(').ok_or(PidError::MalformedPrefix)?;
        let sequence = rest
            .strip_suffix(')')
            .ok_or(PidError::MalformedPrefix)?
            .parse::<u64>()
            .map_err(|_| PidError::InvalidSequence)?;
        if kind.is_empty() {
            return Err(PidError::MalformedPrefix);
        }
        Ok(Self {
            kind: kind.to_string(),
            sequence,
            address: address.to_string(),
        })
    }
}

impl TryFrom<String> for ProcessId {
    type Error = PidError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProcessId> for String {
    fn from(pid: ProcessId) -> Self {
        pid.to_string()
    }
}

/// Errors that can occur when parsing a process identity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PidError {
    /// The input has no `@host:port` component.
    #[error("missing `@host:port` component")]
    MissingAddress,

    /// The part before `@` is not of the form `kind(sequence)`.
    #[error("malformed `kind(sequence)` prefix")]
    MalformedPrefix,

    /// The sequence number is not a valid unsigned integer.
    #[error("invalid sequence number")]
    InvalidSequence,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_form() {
        let source = SequenceSource::new();
        let pid = ProcessId::with_source(&source, "scheduler", "machine1:4040");
        assert_eq!(pid.to_string(), "scheduler(1)@machine1:4040");
        assert_eq!(pid.prefix(), "scheduler(1)");
        assert_eq!(pid.kind(), "scheduler");
        assert_eq!(pid.address(), "machine1:4040");
    }

    #[test]
    fn sequences_increase_per_source() {
        let source = SequenceSource::new();
        let first = ProcessId::with_source(&source, "scheduler", "machine1:4040");
        let second = ProcessId::with_source(&source, "scheduler", "machine1:4040");
        let third = ProcessId::with_source(&source, "scheduler", "machine1:4040");
        assert!(first.sequence() < second.sequence());
        assert!(second.sequence() < third.sequence());
    }

    #[test]
    fn global_source_is_shared() {
        let first = ProcessId::create("scheduler", "machine1:4040");
        let second = ProcessId::create("scheduler", "machine1:4040");
        assert!(second.sequence() > first.sequence());
    }

    #[test]
    fn concurrent_creation_never_reuses_sequences() {
        let source = SequenceSource::new();
        let seqs = std::sync::Mutex::new(Vec::new());
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..50 {
                        let pid = ProcessId::with_source(&source, "scheduler", "127.0.0.1:4040");
                        seqs.lock().unwrap().push(pid.sequence());
                    }
                });
            }
        });
        let mut seqs = seqs.into_inner().unwrap();
        let total = seqs.len();
        assert_eq!(total, 400);
        seqs.sort_unstable();
        seqs.dedup();
        assert_eq!(seqs.len(), total);
    }

    #[test]
    fn parse_roundtrip() {
        let source = SequenceSource::new();
        let pid = ProcessId::with_source(&source, "scheduler", "10.0.0.5:5050");
        let parsed = ProcessId::from_str(&pid.to_string()).unwrap();
        assert_eq!(pid, parsed);
    }

    #[test]
    fn parse_missing_address() {
        let result = ProcessId::from_str("scheduler(1)");
        assert!(matches!(result, Err(PidError::MissingAddress)));

        let result = ProcessId::from_str("scheduler(1)@");
        assert!(matches!(result, Err(PidError::MissingAddress)));
    }

    #[test]
    fn parse_malformed_prefix() {
        let result = ProcessId::from_str("scheduler@host:4040");
        assert!(matches!(result, Err(PidError::MalformedPrefix)));

        let result = ProcessId::from_str("(1)@host:4040");
        assert!(matches!(result, Err(PidError::MalformedPrefix)));
    }

    #[test]
    fn parse_invalid_sequence() {
        let result = ProcessId::from_str("scheduler(one)@host:4040");
        assert!(matches!(result, Err(PidError::InvalidSequence)));
    }

    #[test]
    fn serde_json_roundtrip() {
        let source = SequenceSource::new();
        let pid = ProcessId::with_source(&source, "scheduler", "machine1:4040");
        let json = serde_json::to_string(&pid).unwrap();
        assert_eq!(json, "\"scheduler(1)@machine1:4040\"");
        let parsed: ProcessId = serde_json::from_str(&json).unwrap();
        assert_eq!(pid, parsed);
    }
}
