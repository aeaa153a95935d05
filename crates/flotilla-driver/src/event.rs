//! Events flowing from the listener to the dispatcher.

use flotilla_proto::{
    ExecutorToFrameworkMessage, FrameworkRegisteredMessage, FrameworkReregisteredMessage,
    LostSlaveMessage, RescindResourceOfferMessage, ResourceOffersMessage, StatusUpdateMessage,
};

use crate::error::DriverError;

/// One unit of dispatcher work, queued in arrival order.
#[derive(Debug)]
pub enum Event {
    /// The master confirmed our registration.
    Registered(FrameworkRegisteredMessage),
    /// The master confirmed a re-registration after failover.
    Reregistered(FrameworkReregisteredMessage),
    /// The master offered resources to this framework.
    ResourceOffers(ResourceOffersMessage),
    /// The master withdrew a previously sent offer.
    OfferRescinded(RescindResourceOfferMessage),
    /// A task changed state.
    StatusUpdate(StatusUpdateMessage),
    /// An executor sent data to this framework.
    FrameworkMessage(ExecutorToFrameworkMessage),
    /// A slave dropped out of the cluster.
    SlaveLost(LostSlaveMessage),
    /// An internal failure to route through the abort path.
    Failure(DriverError),
    /// A wire message whose name no dispatcher arm knows.
    Unrecognized {
        /// The message name as it appeared on the wire.
        name: String,
    },
}

impl Event {
    /// Short label used in log lines.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Registered(_) => "registered",
            Self::Reregistered(_) => "reregistered",
            Self::ResourceOffers(_) => "resource_offers",
            Self::OfferRescinded(_) => "offer_rescinded",
            Self::StatusUpdate(_) => "status_update",
            Self::FrameworkMessage(_) => "framework_message",
            Self::SlaveLost(_) => "slave_lost",
            Self::Failure(_) => "failure",
            Self::Unrecognized { .. } => "unrecognized",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flotilla_proto::SlaveId;

    #[test]
    fn event_kinds() {
        let event = Event::SlaveLost(LostSlaveMessage {
            slave_id: SlaveId::new("slave-7"),
        });
        assert_eq!(event.kind(), "slave_lost");

        let event = Event::Unrecognized {
            name: "MysteryMessage".to_string(),
        };
        assert_eq!(event.kind(), "unrecognized");
    }
}
