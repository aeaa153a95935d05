//! Callback table wired into the driver by the embedding application.

use flotilla_proto::{ExecutorId, FrameworkId, MasterInfo, Offer, OfferId, SlaveId, TaskStatus};

use crate::driver::SchedulerDriver;
use crate::error::DriverError;

/// Invoked when the master confirms registration.
pub type RegisteredFn = Box<dyn Fn(&SchedulerDriver, FrameworkId, MasterInfo) + Send + Sync>;

/// Invoked when the master confirms re-registration after failover.
pub type ReregisteredFn = Box<dyn Fn(&SchedulerDriver, MasterInfo) + Send + Sync>;

/// Invoked with a batch of resource offers.
pub type ResourceOffersFn = Box<dyn Fn(&SchedulerDriver, Vec<Offer>) + Send + Sync>;

/// Invoked when the master withdraws an offer.
pub type OfferRescindedFn = Box<dyn Fn(&SchedulerDriver, OfferId) + Send + Sync>;

/// Invoked when a task changes state.
pub type StatusUpdateFn = Box<dyn Fn(&SchedulerDriver, TaskStatus) + Send + Sync>;

/// Invoked with data an executor sent to this framework.
pub type FrameworkMessageFn =
    Box<dyn Fn(&SchedulerDriver, ExecutorId, SlaveId, Vec<u8>) + Send + Sync>;

/// Invoked when a slave drops out of the cluster.
pub type SlaveLostFn = Box<dyn Fn(&SchedulerDriver, SlaveId) + Send + Sync>;

/// Invoked once when the driver aborts on an unrecoverable error.
pub type ErrorFn = Box<dyn Fn(&SchedulerDriver, DriverError) + Send + Sync>;

/// Per-event callbacks; unset slots are skipped at dispatch time.
///
/// Every slot is optional, so an application only fills in the events
/// it cares about:
///
/// ```
/// use flotilla_driver::SchedulerCallbacks;
///
/// let callbacks = SchedulerCallbacks {
///     resource_offers: Some(Box::new(|_driver, offers| {
///         println!("got {} offers", offers.len());
///     })),
///     ..SchedulerCallbacks::default()
/// };
/// assert!(!callbacks.is_empty());
/// ```
#[derive(Default)]
pub struct SchedulerCallbacks {
    /// Registration confirmed.
    pub registered: Option<RegisteredFn>,
    /// Re-registration confirmed.
    pub reregistered: Option<ReregisteredFn>,
    /// Resource offers arrived.
    pub resource_offers: Option<ResourceOffersFn>,
    /// An offer was withdrawn.
    pub offer_rescinded: Option<OfferRescindedFn>,
    /// A task status update arrived.
    pub status_update: Option<StatusUpdateFn>,
    /// An executor-to-framework message arrived.
    pub framework_message: Option<FrameworkMessageFn>,
    /// A slave was lost.
    pub slave_lost: Option<SlaveLostFn>,
    /// The driver aborted.
    pub error: Option<ErrorFn>,
}

impl SchedulerCallbacks {
    /// An empty callback table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no callback is set at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registered.is_none()
            && self.reregistered.is_none()
            && self.resource_offers.is_none()
            && self.offer_rescinded.is_none()
            && self.status_update.is_none()
            && self.framework_message.is_none()
            && self.slave_lost.is_none()
            && self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_table_is_empty() {
        assert!(SchedulerCallbacks::new().is_empty());
    }

    #[test]
    fn one_slot_makes_the_table_non_empty() {
        let callbacks = SchedulerCallbacks {
            slave_lost: Some(Box::new(|_, _| {})),
            ..SchedulerCallbacks::default()
        };
        assert!(!callbacks.is_empty());
    }
}
