//! The event dispatcher: ordered bookkeeping plus callback fan-out.
//!
//! Events are drained one at a time, so connection bookkeeping is
//! applied in arrival order. Callbacks run on their own tasks and
//! never block the loop; a panicking callback is converted into an
//! error event and fed back through the queue.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Weak;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use flotilla_proto::{FrameworkRegisteredMessage, FrameworkReregisteredMessage};

use crate::driver::{DriverInner, SchedulerDriver};
use crate::error::DriverError;
use crate::event::Event;
use crate::lifecycle::DriverState;

/// Spawn the dispatcher loop for a driver.
pub(crate) fn spawn(inner: Weak<DriverInner>, events: mpsc::Receiver<Event>) -> JoinHandle<()> {
    tokio::spawn(run(inner, events))
}

async fn run(inner: Weak<DriverInner>, mut events: mpsc::Receiver<Event>) {
    while let Some(event) = events.recv().await {
        let Some(inner) = inner.upgrade() else { break };
        process(&SchedulerDriver::from_inner(inner), event);
    }
    tracing::debug!("event dispatcher exited");
}

fn process(driver: &SchedulerDriver, event: Event) {
    if driver.callbacks().is_empty() {
        tracing::warn!(event = event.kind(), "no scheduler callbacks attached");
    }

    match event {
        Event::Registered(message) => handle_registered(driver, message),
        Event::Reregistered(message) => handle_reregistered(driver, message),
        Event::ResourceOffers(message) => {
            if driver.state() == DriverState::Aborted {
                tracing::info!("ignoring resource offers; driver is aborted");
                return;
            }
            if !driver.is_connected() {
                tracing::info!("ignoring resource offers; driver is not connected");
                return;
            }
            tracing::debug!(count = message.offers.len(), "resource offers received");
            spawn_callback(driver.clone(), "resource_offers", move |driver| {
                if let Some(callback) = &driver.callbacks().resource_offers {
                    callback(driver, message.offers);
                }
            });
        }
        Event::OfferRescinded(message) => {
            spawn_callback(driver.clone(), "offer_rescinded", move |driver| {
                if let Some(callback) = &driver.callbacks().offer_rescinded {
                    callback(driver, message.offer_id);
                }
            });
        }
        Event::StatusUpdate(message) => {
            spawn_callback(driver.clone(), "status_update", move |driver| {
                if let Some(callback) = &driver.callbacks().status_update {
                    callback(driver, message.update.status);
                }
            });
        }
        Event::FrameworkMessage(message) => {
            spawn_callback(driver.clone(), "framework_message", move |driver| {
                if let Some(callback) = &driver.callbacks().framework_message {
                    callback(driver, message.executor_id, message.slave_id, message.data);
                }
            });
        }
        Event::SlaveLost(message) => {
            spawn_callback(driver.clone(), "slave_lost", move |driver| {
                if let Some(callback) = &driver.callbacks().slave_lost {
                    callback(driver, message.slave_id);
                }
            });
        }
        Event::Failure(error) => {
            let driver = driver.clone();
            tokio::spawn(async move { driver.handle_error(error).await });
        }
        Event::Unrecognized { name } => {
            tracing::error!(event = %name, "driver received an unexpected event");
            let driver = driver.clone();
            tokio::spawn(async move {
                driver
                    .handle_error(DriverError::UnexpectedEvent { kind: name })
                    .await;
            });
        }
    }
}

fn handle_registered(driver: &SchedulerDriver, message: FrameworkRegisteredMessage) {
    if driver.state() == DriverState::Aborted {
        tracing::info!("ignoring registration confirmation; driver is aborted");
        return;
    }
    if driver.is_connected() {
        tracing::info!("ignoring duplicate registration confirmation; already connected");
        return;
    }

    tracing::info!(
        framework_id = %message.framework_id.value,
        master = %message.master_info.id,
        "framework registered with master"
    );
    driver.mark_connected();
    spawn_callback(driver.clone(), "registered", move |driver| {
        if let Some(callback) = &driver.callbacks().registered {
            callback(driver, message.framework_id, message.master_info);
        }
    });
}

fn handle_reregistered(driver: &SchedulerDriver, message: FrameworkReregisteredMessage) {
    if driver.state() == DriverState::Aborted {
        tracing::info!("ignoring re-registration confirmation; driver is aborted");
        return;
    }
    if driver.is_connected() {
        tracing::info!("ignoring duplicate re-registration confirmation; already connected");
        return;
    }

    tracing::info!(
        framework_id = %message.framework_id.value,
        master = %message.master_info.id,
        "framework re-registered with master"
    );
    driver.mark_connected();
    spawn_callback(driver.clone(), "reregistered", move |driver| {
        if let Some(callback) = &driver.callbacks().reregistered {
            callback(driver, message.master_info);
        }
    });
}

/// Run a callback on its own task behind a panic boundary.
fn spawn_callback(
    driver: SchedulerDriver,
    event: &'static str,
    callback: impl FnOnce(&SchedulerDriver) + Send + 'static,
) {
    tokio::spawn(async move {
        let outcome = catch_unwind(AssertUnwindSafe(|| callback(&driver)));
        if let Err(panic) = outcome {
            let message = panic_message(panic.as_ref());
            tracing::error!(event, %message, "scheduler callback panicked");
            driver
                .enqueue(Event::Failure(DriverError::CallbackPanic { event, message }))
                .await;
        }
    });
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = panic.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = panic.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
