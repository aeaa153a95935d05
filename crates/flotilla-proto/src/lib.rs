//! Protocol records and wire naming for flotilla.
//!
//! The master and the framework-side driver exchange protobuf-encoded
//! messages over plain HTTP POSTs. This crate defines both halves of that
//! contract:
//!
//! - **Records and messages**: the prost message types for framework calls
//!   (registration, task launch, task kill) and master events (offers,
//!   status updates, slave loss)
//! - **Wire naming**: the dotted message names, URL paths, and headers that
//!   route those bodies between processes
//!
//! The messages are written out by hand with proto2 field semantics so the
//! crate builds without a protobuf compiler.
//!
//! # Example
//!
//! ```
//! use prost::Message;
//! use flotilla_proto::{wire, KillTaskMessage, TaskId};
//!
//! let call = KillTaskMessage {
//!     task_id: TaskId::new("task-7"),
//! };
//! let body = call.encode_to_vec();
//!
//! let decoded = KillTaskMessage::decode(body.as_slice()).unwrap();
//! assert_eq!(decoded.task_id.value, "task-7");
//! assert_eq!(
//!     wire::master_call_path(wire::KILL_TASK),
//!     "/master/flotilla.internal.KillTaskMessage"
//! );
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod messages;
pub mod wire;

pub use messages::{
    DeactivateFrameworkMessage, ExecutorId, ExecutorToFrameworkMessage, Filters, FrameworkId,
    FrameworkInfo, FrameworkRegisteredMessage, FrameworkReregisteredMessage, KillTaskMessage,
    LaunchTasksMessage, LostSlaveMessage, MasterInfo, Offer, OfferId, RegisterFrameworkMessage,
    RescindResourceOfferMessage, Resource, ResourceOffersMessage, SlaveId, StatusUpdate,
    StatusUpdateMessage, TaskId, TaskInfo, TaskState, TaskStatus, UnregisterFrameworkMessage,
};
