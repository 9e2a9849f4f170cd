//! client for the lifepath receipt printer's http control panel.
//!
//! [`DeviceStatusClient`] keeps the latest logs, wifi status and print
//! schedule for one device and reports changes to a [`StatusObserver`].
//! [`LogPoller`] drives the recurring log poll; [`mirror`] optionally
//! re-serves the cached values locally.

pub mod client;
pub mod config;
pub mod device;
pub mod domain;
pub mod error;
pub mod mirror;
pub mod observer;
pub mod poller;

pub use client::DeviceStatusClient;
pub use device::{DeviceApi, HttpDevice};
pub use domain::{LastPrint, LogSnapshot, Message, ScheduleConfig, StatusSnapshot, WifiStatus};
pub use error::{ClientError, SaveError, ServerError, SubmitError, TransportError};
pub use observer::{NoopObserver, Resource, StatusObserver, TracingObserver};
pub use poller::{LogPoller, PollHandle};
