//! Framework-side scheduler driver for a flotilla master.
//!
//! The driver owns the whole conversation with the master:
//!
//! ```text
//!                    +----------------------------------------+
//!                    |            SchedulerDriver             |
//!                    |                                        |
//!   master --POST--> |  EventListener -> queue -> dispatcher  | --> callbacks
//!                    |                                        |
//!   master <--POST-- |  MasterClient                          | <-- framework calls
//!                    +----------------------------------------+
//! ```
//!
//! Inbound events are HTTP POSTs of protobuf messages, addressed to
//! the driver's process identity. They are queued and dispatched in
//! arrival order to the [`SchedulerCallbacks`] table; each callback
//! runs on its own task behind a panic boundary. Outbound framework
//! calls go through the [`MasterClient`], which treats `202 Accepted`
//! as the only success status.
//!
//! ```no_run
//! use flotilla_driver::{SchedulerCallbacks, SchedulerDriver};
//! use flotilla_proto::FrameworkInfo;
//!
//! # async fn demo() -> flotilla_driver::Result<()> {
//! let callbacks = SchedulerCallbacks {
//!     resource_offers: Some(Box::new(|_driver, offers| {
//!         println!("received {} offers", offers.len());
//!     })),
//!     ..SchedulerCallbacks::default()
//! };
//! let framework = FrameworkInfo::new("deploy", "example-framework", None);
//! let driver = SchedulerDriver::new(callbacks, framework, "127.0.0.1:5050")?;
//! let final_state = driver.run().await;
//! println!("driver finished as {final_state}");
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod callbacks;
pub mod config;
mod dispatch;
pub mod driver;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod listener;
pub mod master_client;

pub use callbacks::SchedulerCallbacks;
pub use config::DriverConfig;
pub use driver::SchedulerDriver;
pub use error::{DriverError, Result};
pub use event::Event;
pub use lifecycle::DriverState;
pub use listener::EventListener;
pub use master_client::MasterClient;
