//! Wire-level naming shared by both directions of the protocol.
//!
//! Messages travel as HTTP POSTs whose final path segment is the dotted
//! message name, `flotilla.internal.<MessageName>`. Calls go to the master
//! under its fixed routing prefix; events come back under the prefix of the
//! process identity the framework registered with.

/// Dotted namespace every internal message name lives under.
pub const INTERNAL_PREFIX: &str = "flotilla.internal";

/// Routing prefix of the master process.
pub const MASTER_PREFIX: &str = "master";

/// Process kind of framework-side scheduler endpoints.
pub const SCHEDULER_KIND: &str = "scheduler";

/// Content type of every protocol body.
pub const CONTENT_TYPE_PROTOBUF: &str = "application/x-protobuf";

/// Header carrying the sender's process identity.
pub const LIBPROCESS_FROM: &str = "Libprocess-From";

/// Liveness-check path served by every event listener.
pub const LIVENESS_PATH: &str = "/isalive";

/// Call name: register a framework.
pub const REGISTER_FRAMEWORK: &str = "RegisterFrameworkMessage";
/// Call name: unregister a framework.
pub const UNREGISTER_FRAMEWORK: &str = "UnregisterFrameworkMessage";
/// Call name: deactivate a framework.
pub const DEACTIVATE_FRAMEWORK: &str = "DeactivateFrameworkMessage";
/// Call name: kill a task.
pub const KILL_TASK: &str = "KillTaskMessage";
/// Call name: launch tasks against offers.
pub const LAUNCH_TASKS: &str = "LaunchTasksMessage";

/// Event name: registration confirmed.
pub const FRAMEWORK_REGISTERED: &str = "FrameworkRegisteredMessage";
/// Event name: re-registration confirmed after failover.
pub const FRAMEWORK_REREGISTERED: &str = "FrameworkReregisteredMessage";
/// Event name: resource offers.
pub const RESOURCE_OFFERS: &str = "ResourceOffersMessage";
/// Event name: an offer was withdrawn.
pub const RESCIND_RESOURCE_OFFER: &str = "RescindResourceOfferMessage";
/// Event name: a task changed state.
pub const STATUS_UPDATE: &str = "StatusUpdateMessage";
/// Event name: executor payload relayed to the framework.
pub const EXECUTOR_TO_FRAMEWORK: &str = "ExecutorToFrameworkMessage";
/// Event name: a slave was lost.
pub const LOST_SLAVE: &str = "LostSlaveMessage";

/// URL path a call `name` is POSTed to on the master.
#[must_use]
pub fn master_call_path(name: &str) -> String {
    format!("/{MASTER_PREFIX}/{INTERNAL_PREFIX}.{name}")
}

/// URL path the master POSTs event `name` to for the process `pid_prefix`.
#[must_use]
pub fn event_path(pid_prefix: &str, name: &str) -> String {
    format!("/{pid_prefix}/{INTERNAL_PREFIX}.{name}")
}

/// Extract the message name from the final path segment of an event URL.
///
/// The segment must split on `.` into exactly three parts; the last part is
/// the message name. Anything else is malformed.
#[must_use]
pub fn parse_event_name(segment: &str) -> Option<&str> {
    let parts: Vec<&str> = segment.split('.').collect();
    match parts[..] {
        [_, _, name] => Some(name),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn master_call_path_layout() {
        assert_eq!(
            master_call_path(REGISTER_FRAMEWORK),
            "/master/flotilla.internal.RegisterFrameworkMessage"
        );
    }

    #[test]
    fn event_path_layout() {
        assert_eq!(
            event_path("scheduler(1)", RESOURCE_OFFERS),
            "/scheduler(1)/flotilla.internal.ResourceOffersMessage"
        );
    }

    #[test]
    fn event_name_requires_three_segments() {
        assert_eq!(
            parse_event_name("flotilla.internal.StatusUpdateMessage"),
            Some("StatusUpdateMessage")
        );
        assert_eq!(parse_event_name("internal.StatusUpdateMessage"), None);
        assert_eq!(parse_event_name("StatusUpdateMessage"), None);
        assert_eq!(parse_event_name("a.b.c.d"), None);
        assert_eq!(parse_event_name(""), None);
    }
}
