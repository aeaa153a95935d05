//! Error types for the scheduler driver.

use thiserror::Error;

/// Result alias used throughout the driver crate.
pub type Result<T> = std::result::Result<T, DriverError>;

/// Errors produced by the scheduler driver and its components.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The driver was constructed without a master address.
    #[error("no master address configured")]
    MissingMaster,

    /// The event listener could not be brought up.
    #[error("event listener failed to start: {reason}")]
    ListenerStart {
        /// Human-readable description of the startup failure.
        reason: String,
    },

    /// The event listener failed while serving.
    #[error("event listener failed: {0}")]
    ListenerServe(#[source] std::io::Error),

    /// An operation was attempted on a listener that is not serving.
    #[error("event listener is not running")]
    ListenerNotRunning,

    /// An outbound call never reached the master.
    #[error("transport failure sending {call}: {source}")]
    Transport {
        /// Wire name of the call that failed.
        call: &'static str,
        /// Underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },

    /// The master answered an outbound call with a non-202 status.
    #[error("master rejected {url} with status {status}")]
    Rejected {
        /// Full URL of the rejected call.
        url: String,
        /// Status the master answered with.
        status: reqwest::StatusCode,
    },

    /// A call requiring a confirmed registration was made without one.
    #[error("driver is not connected to a master")]
    NotConnected,

    /// An inbound request path did not follow the event naming scheme.
    #[error("malformed event path: {path}")]
    MalformedEventPath {
        /// The offending request path.
        path: String,
    },

    /// An inbound event body could not be decoded.
    #[error("failed to decode {event} body: {source}")]
    EventDecode {
        /// Wire name of the event whose body was rejected.
        event: String,
        /// Underlying protobuf decode error.
        #[source]
        source: prost::DecodeError,
    },

    /// An event reached the dispatcher that no handler recognizes.
    #[error("unexpected event on the wire: {kind}")]
    UnexpectedEvent {
        /// Wire name of the unexpected event.
        kind: String,
    },

    /// A scheduler callback panicked while handling an event.
    #[error("callback for {event} panicked: {message}")]
    CallbackPanic {
        /// Short label of the event whose callback panicked.
        event: &'static str,
        /// The panic payload, when it was a string.
        message: String,
    },
}

impl DriverError {
    /// HTTP status the event listener answers with for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::MalformedEventPath { .. }
            | Self::EventDecode { .. }
            | Self::UnexpectedEvent { .. } => 400,
            Self::NotConnected => 409,
            Self::Rejected { .. } => 502,
            _ => 500,
        }
    }

    /// Whether the failure came from the network rather than a decision.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::ListenerServe(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages() {
        let error = DriverError::MissingMaster;
        assert_eq!(error.to_string(), "no master address configured");

        let error = DriverError::NotConnected;
        assert_eq!(error.to_string(), "driver is not connected to a master");

        let error = DriverError::UnexpectedEvent {
            kind: "MysteryMessage".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "unexpected event on the wire: MysteryMessage"
        );
    }

    #[test]
    fn error_status_codes() {
        let error = DriverError::MalformedEventPath {
            path: "/scheduler(1)/garbage".to_string(),
        };
        assert_eq!(error.http_status_code(), 400);

        assert_eq!(DriverError::NotConnected.http_status_code(), 409);
        assert_eq!(DriverError::MissingMaster.http_status_code(), 500);
    }

    #[test]
    fn transport_classification() {
        assert!(!DriverError::MissingMaster.is_transport());
        assert!(
            DriverError::ListenerServe(std::io::Error::other("socket closed")).is_transport()
        );
    }
}
