//! Protocol record and message definitions.
//!
//! Written out by hand with proto2 field semantics (`required` fields are
//! always encoded; `optional` fields are `Option`). Identifier records
//! carry `new` constructors so call sites read like the protocol they
//! speak.

use prost::{Enumeration, Message};

// ============================================================================
// Identifier records
// ============================================================================

/// Unique framework identifier, assigned by the master at registration.
#[derive(Clone, PartialEq, Eq, Hash, Message)]
pub struct FrameworkId {
    /// Opaque identifier value.
    #[prost(string, required, tag = "1")]
    pub value: String,
}

impl FrameworkId {
    /// Wrap a raw identifier value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

/// Unique identifier of a resource offer.
#[derive(Clone, PartialEq, Eq, Hash, Message)]
pub struct OfferId {
    /// Opaque identifier value.
    #[prost(string, required, tag = "1")]
    pub value: String,
}

impl OfferId {
    /// Wrap a raw identifier value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

/// Unique identifier of a slave node.
#[derive(Clone, PartialEq, Eq, Hash, Message)]
pub struct SlaveId {
    /// Opaque identifier value.
    #[prost(string, required, tag = "1")]
    pub value: String,
}

impl SlaveId {
    /// Wrap a raw identifier value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

/// Framework-chosen identifier of a task.
#[derive(Clone, PartialEq, Eq, Hash, Message)]
pub struct TaskId {
    /// Opaque identifier value.
    #[prost(string, required, tag = "1")]
    pub value: String,
}

impl TaskId {
    /// Wrap a raw identifier value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

/// Unique identifier of an executor on a slave.
#[derive(Clone, PartialEq, Eq, Hash, Message)]
pub struct ExecutorId {
    /// Opaque identifier value.
    #[prost(string, required, tag = "1")]
    pub value: String,
}

impl ExecutorId {
    /// Wrap a raw identifier value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

// ============================================================================
// Descriptor records
// ============================================================================

/// Framework descriptor sent to the master at registration.
#[derive(Clone, PartialEq, Message)]
pub struct FrameworkInfo {
    /// OS user tasks of this framework run as.
    #[prost(string, required, tag = "1")]
    pub user: String,
    /// Human-readable framework name.
    #[prost(string, required, tag = "2")]
    pub name: String,
    /// Identifier from a previous registration, for failover.
    #[prost(message, optional, tag = "3")]
    pub id: Option<FrameworkId>,
    /// Seconds the master keeps the framework alive after a disconnect.
    #[prost(double, optional, tag = "4")]
    pub failover_timeout: Option<f64>,
    /// Whether slaves should checkpoint framework state.
    #[prost(bool, optional, tag = "5")]
    pub checkpoint: Option<bool>,
    /// Resource role the framework registers in.
    #[prost(string, optional, tag = "6")]
    pub role: Option<String>,
    /// Host the framework driver runs on.
    #[prost(string, optional, tag = "7")]
    pub hostname: Option<String>,
}

impl FrameworkInfo {
    /// Build a descriptor with the fields every registration needs.
    #[must_use]
    pub fn new(user: impl Into<String>, name: impl Into<String>, id: Option<FrameworkId>) -> Self {
        Self {
            user: user.into(),
            name: name.into(),
            id,
            ..Self::default()
        }
    }
}

/// Identity and endpoint of a master.
#[derive(Clone, PartialEq, Message)]
pub struct MasterInfo {
    /// Master identifier.
    #[prost(string, required, tag = "1")]
    pub id: String,
    /// IPv4 address, packed into host byte order.
    #[prost(uint32, required, tag = "2")]
    pub ip: u32,
    /// Port the master listens on.
    #[prost(uint32, required, tag = "3")]
    pub port: u32,
    /// Full process identity of the master, when known.
    #[prost(string, optional, tag = "4")]
    pub pid: Option<String>,
}

impl MasterInfo {
    /// Build a master descriptor from its identity and packed endpoint.
    #[must_use]
    pub fn new(id: impl Into<String>, ip: u32, port: u32) -> Self {
        Self {
            id: id.into(),
            ip,
            port,
            pid: None,
        }
    }
}

/// A named quantity of a schedulable resource.
///
/// Same wire shape as the other records (`name` string required tag 1,
/// `scalar` double optional tag 2), but `Message` is implemented by hand
/// below — the derive would generate a `scalar()` getter that collides
/// with the [`Resource::scalar`] constructor.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Resource {
    /// Resource name, e.g. `cpus` or `mem`.
    pub name: String,
    /// Scalar amount of the resource.
    pub scalar: Option<f64>,
}

impl Resource {
    /// Build a scalar resource.
    #[must_use]
    pub fn scalar(name: impl Into<String>, amount: f64) -> Self {
        Self {
            name: name.into(),
            scalar: Some(amount),
        }
    }
}

// Transcribed from the expansion of `#[derive(Message)]` on this struct,
// minus the colliding `scalar()` getter.
impl ::prost::Message for Resource {
    #[allow(unused_variables)]
    fn encode_raw(&self, buf: &mut impl ::prost::bytes::BufMut) {
        ::prost::encoding::string::encode(1u32, &self.name, buf);
        if let ::core::option::Option::Some(ref value) = self.scalar {
            ::prost::encoding::double::encode(2u32, value, buf);
        }
    }

    #[allow(unused_variables)]
    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: ::prost::encoding::wire_type::WireType,
        buf: &mut impl ::prost::bytes::Buf,
        ctx: ::prost::encoding::DecodeContext,
    ) -> ::core::result::Result<(), ::prost::DecodeError> {
        const STRUCT_NAME: &str = "Resource";
        match tag {
            1u32 => {
                let value = &mut self.name;
                ::prost::encoding::string::merge(wire_type, value, buf, ctx).map_err(
                    |mut error| {
                        error.push(STRUCT_NAME, "name");
                        error
                    },
                )
            }
            2u32 => {
                let value = &mut self.scalar;
                ::prost::encoding::double::merge(
                    wire_type,
                    value.get_or_insert_with(::core::default::Default::default),
                    buf,
                    ctx,
                )
                .map_err(|mut error| {
                    error.push(STRUCT_NAME, "scalar");
                    error
                })
            }
            _ => ::prost::encoding::skip_field(wire_type, tag, buf, ctx),
        }
    }

    #[inline]
    fn encoded_len(&self) -> usize {
        ::prost::encoding::string::encoded_len(1u32, &self.name)
            + self
                .scalar
                .as_ref()
                .map_or(0, |value| ::prost::encoding::double::encoded_len(2u32, value))
    }

    fn clear(&mut self) {
        self.name.clear();
        self.scalar = ::core::option::Option::None;
    }
}

/// Resources on one slave offered to the framework.
#[derive(Clone, PartialEq, Message)]
pub struct Offer {
    /// Identifier of this offer.
    #[prost(message, required, tag = "1")]
    pub id: OfferId,
    /// Framework the offer is addressed to.
    #[prost(message, required, tag = "2")]
    pub framework_id: FrameworkId,
    /// Slave the resources live on.
    #[prost(message, required, tag = "3")]
    pub slave_id: SlaveId,
    /// Hostname of that slave.
    #[prost(string, required, tag = "4")]
    pub hostname: String,
    /// Offered resources.
    #[prost(message, repeated, tag = "5")]
    pub resources: Vec<Resource>,
}

impl Offer {
    /// Build an offer with no resources attached.
    #[must_use]
    pub fn new(
        id: OfferId,
        framework_id: FrameworkId,
        slave_id: SlaveId,
        hostname: impl Into<String>,
    ) -> Self {
        Self {
            id,
            framework_id,
            slave_id,
            hostname: hostname.into(),
            resources: Vec::new(),
        }
    }
}

/// Description of a task to launch on a slave.
#[derive(Clone, PartialEq, Message)]
pub struct TaskInfo {
    /// Human-readable task name.
    #[prost(string, required, tag = "1")]
    pub name: String,
    /// Framework-chosen task identifier.
    #[prost(message, required, tag = "2")]
    pub task_id: TaskId,
    /// Slave the task should run on.
    #[prost(message, required, tag = "3")]
    pub slave_id: SlaveId,
    /// Resources the task claims from the offer.
    #[prost(message, repeated, tag = "4")]
    pub resources: Vec<Resource>,
    /// Opaque payload handed to the executor.
    #[prost(bytes = "vec", optional, tag = "5")]
    pub data: Option<Vec<u8>>,
}

impl TaskInfo {
    /// Build a task description with no resources or payload.
    #[must_use]
    pub fn new(name: impl Into<String>, task_id: TaskId, slave_id: SlaveId) -> Self {
        Self {
            name: name.into(),
            task_id,
            slave_id,
            resources: Vec::new(),
            data: None,
        }
    }
}

/// Lifecycle states a task moves through.
///
/// `Default` (the first variant, [`TaskState::Staging`]) comes from the
/// `Enumeration` derive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Enumeration)]
#[repr(i32)]
pub enum TaskState {
    /// Accepted by the master, not yet started.
    Staging = 0,
    /// Being started by the executor.
    Starting = 1,
    /// Running.
    Running = 2,
    /// Finished successfully; terminal.
    Finished = 3,
    /// Failed; terminal.
    Failed = 4,
    /// Killed on framework request; terminal.
    Killed = 5,
    /// Lost with its slave or executor; terminal.
    Lost = 6,
}

/// Point-in-time state of a task.
#[derive(Clone, PartialEq, Message)]
pub struct TaskStatus {
    /// Task this status describes.
    #[prost(message, required, tag = "1")]
    pub task_id: TaskId,
    /// Lifecycle state, as a raw enum value.
    #[prost(enumeration = "TaskState", required, tag = "2")]
    pub state: i32,
    /// Human-readable detail.
    #[prost(string, optional, tag = "3")]
    pub message: Option<String>,
    /// Opaque payload from the executor.
    #[prost(bytes = "vec", optional, tag = "4")]
    pub data: Option<Vec<u8>>,
    /// Slave the task ran on.
    #[prost(message, optional, tag = "5")]
    pub slave_id: Option<SlaveId>,
    /// Seconds since the epoch when the status was produced.
    #[prost(double, optional, tag = "6")]
    pub timestamp: Option<f64>,
}

impl TaskStatus {
    /// Build a status for `task_id` in `state`.
    #[must_use]
    pub fn new(task_id: TaskId, state: TaskState) -> Self {
        Self {
            task_id,
            state: state as i32,
            ..Self::default()
        }
    }
}

/// A status change, wrapped with bookkeeping for reliable delivery.
#[derive(Clone, PartialEq, Message)]
pub struct StatusUpdate {
    /// Framework the update belongs to.
    #[prost(message, required, tag = "1")]
    pub framework_id: FrameworkId,
    /// Executor that produced the update, when known.
    #[prost(message, optional, tag = "2")]
    pub executor_id: Option<ExecutorId>,
    /// Slave that produced the update, when known.
    #[prost(message, optional, tag = "3")]
    pub slave_id: Option<SlaveId>,
    /// The task status itself.
    #[prost(message, required, tag = "4")]
    pub status: TaskStatus,
    /// Seconds since the epoch when the update was created.
    #[prost(double, required, tag = "5")]
    pub timestamp: f64,
    /// Unique bytes deduplicating redelivered updates.
    #[prost(bytes = "vec", required, tag = "6")]
    pub uuid: Vec<u8>,
}

impl StatusUpdate {
    /// Build an update around `status`.
    #[must_use]
    pub fn new(framework_id: FrameworkId, status: TaskStatus, timestamp: f64, uuid: Vec<u8>) -> Self {
        Self {
            framework_id,
            executor_id: None,
            slave_id: None,
            status,
            timestamp,
            uuid,
        }
    }
}

/// Constraints on future offers after a task launch declines resources.
#[derive(Clone, PartialEq, Message)]
pub struct Filters {
    /// Seconds the master withholds declined resources from this framework.
    #[prost(double, optional, tag = "1")]
    pub refuse_seconds: Option<f64>,
}

// ============================================================================
// Calls (framework to master)
// ============================================================================

/// Registers a framework with the master.
#[derive(Clone, PartialEq, Message)]
pub struct RegisterFrameworkMessage {
    /// Descriptor of the registering framework.
    #[prost(message, required, tag = "1")]
    pub framework: FrameworkInfo,
}

/// Unregisters a framework for good; the master kills its tasks.
#[derive(Clone, PartialEq, Message)]
pub struct UnregisterFrameworkMessage {
    /// Framework to remove.
    #[prost(message, required, tag = "1")]
    pub framework_id: FrameworkId,
}

/// Deactivates a framework without killing its tasks.
#[derive(Clone, PartialEq, Message)]
pub struct DeactivateFrameworkMessage {
    /// Framework to deactivate.
    #[prost(message, required, tag = "1")]
    pub framework_id: FrameworkId,
}

/// Asks the master to kill one task.
#[derive(Clone, PartialEq, Message)]
pub struct KillTaskMessage {
    /// Task to kill.
    #[prost(message, required, tag = "1")]
    pub task_id: TaskId,
}

/// Launches tasks against previously received offers.
#[derive(Clone, PartialEq, Message)]
pub struct LaunchTasksMessage {
    /// Framework launching the tasks.
    #[prost(message, required, tag = "1")]
    pub framework_id: FrameworkId,
    /// Offers the launch consumes.
    #[prost(message, repeated, tag = "2")]
    pub offer_ids: Vec<OfferId>,
    /// Tasks to start.
    #[prost(message, repeated, tag = "3")]
    pub tasks: Vec<TaskInfo>,
    /// Constraints on re-offering declined resources.
    #[prost(message, optional, tag = "4")]
    pub filters: Option<Filters>,
}

// ============================================================================
// Events (master to framework)
// ============================================================================

/// Confirms a successful registration.
#[derive(Clone, PartialEq, Message)]
pub struct FrameworkRegisteredMessage {
    /// Identifier the master assigned.
    #[prost(message, required, tag = "1")]
    pub framework_id: FrameworkId,
    /// The master that accepted the registration.
    #[prost(message, required, tag = "2")]
    pub master_info: MasterInfo,
}

/// Confirms a re-registration after a master failover.
#[derive(Clone, PartialEq, Message)]
pub struct FrameworkReregisteredMessage {
    /// Identifier the framework re-registered under.
    #[prost(message, required, tag = "1")]
    pub framework_id: FrameworkId,
    /// The newly elected master.
    #[prost(message, required, tag = "2")]
    pub master_info: MasterInfo,
}

/// Offers resources on one or more slaves.
#[derive(Clone, PartialEq, Message)]
pub struct ResourceOffersMessage {
    /// The offers.
    #[prost(message, repeated, tag = "1")]
    pub offers: Vec<Offer>,
    /// Slave process identities, parallel to `offers`.
    #[prost(string, repeated, tag = "2")]
    pub pids: Vec<String>,
}

/// Withdraws a previously made offer.
#[derive(Clone, PartialEq, Message)]
pub struct RescindResourceOfferMessage {
    /// Offer no longer valid.
    #[prost(message, required, tag = "1")]
    pub offer_id: OfferId,
}

/// Carries a task status change.
#[derive(Clone, PartialEq, Message)]
pub struct StatusUpdateMessage {
    /// The wrapped status change.
    #[prost(message, required, tag = "1")]
    pub update: StatusUpdate,
    /// Process identity to acknowledge to, when reliable delivery is on.
    #[prost(string, optional, tag = "2")]
    pub pid: Option<String>,
}

/// Relays an executor-originated payload to the framework.
#[derive(Clone, PartialEq, Message)]
pub struct ExecutorToFrameworkMessage {
    /// Slave the executor runs on.
    #[prost(message, required, tag = "1")]
    pub slave_id: SlaveId,
    /// Framework the payload is addressed to.
    #[prost(message, required, tag = "2")]
    pub framework_id: FrameworkId,
    /// Executor that sent the payload.
    #[prost(message, required, tag = "3")]
    pub executor_id: ExecutorId,
    /// The payload itself.
    #[prost(bytes = "vec", required, tag = "4")]
    pub data: Vec<u8>,
}

/// Reports a slave as lost; its tasks are gone with it.
#[derive(Clone, PartialEq, Message)]
pub struct LostSlaveMessage {
    /// The lost slave.
    #[prost(message, required, tag = "1")]
    pub slave_id: SlaveId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offers_message_roundtrip() {
        let mut offer = Offer::new(
            OfferId::new("offer-1"),
            FrameworkId::new("framework-1"),
            SlaveId::new("slave-1"),
            "node1.cluster",
        );
        offer.resources.push(Resource::scalar("cpus", 4.0));
        let message = ResourceOffersMessage {
            offers: vec![offer],
            pids: vec!["slave(1)@node1.cluster:5051".to_string()],
        };

        let bytes = message.encode_to_vec();
        let decoded = ResourceOffersMessage::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded, message);
        assert_eq!(decoded.offers[0].id.value, "offer-1");
        assert_eq!(decoded.offers[0].resources[0].scalar, Some(4.0));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let garbage: &[u8] = &[0xff, 0xff, 0xff];
        assert!(ResourceOffersMessage::decode(garbage).is_err());
        assert!(FrameworkRegisteredMessage::decode(garbage).is_err());
    }

    #[test]
    fn task_state_from_raw_value() {
        assert_eq!(TaskState::try_from(2).ok(), Some(TaskState::Running));
        assert!(TaskState::try_from(99).is_err());

        let status = TaskStatus::new(TaskId::new("task-1"), TaskState::Finished);
        assert_eq!(status.state(), TaskState::Finished);

        let unknown = TaskStatus {
            state: 99,
            ..TaskStatus::new(TaskId::new("task-1"), TaskState::Staging)
        };
        assert_eq!(unknown.state(), TaskState::Staging);
    }

    #[test]
    fn framework_info_optional_fields_start_absent() {
        let info = FrameworkInfo::new("deploy", "analytics", None);
        assert_eq!(info.user, "deploy");
        assert_eq!(info.name, "analytics");
        assert!(info.id.is_none());
        assert!(info.hostname.is_none());
        assert!(info.role.is_none());
    }
}
