//! display-layer callbacks.
//!
//! the client calls these after each fetch settles. they run inline on the
//! polling task, so implementations should hand work off rather than block.

use crate::domain::{LogSnapshot, ScheduleConfig, WifiStatus};
use crate::error::ClientError;

use std::fmt;
use std::sync::Mutex;

/// which device call an error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Logs,
    Wifi,
    Schedule,
    LastPrint,
    SaveSchedule,
    Submit,
    PrintJoke,
    ForgetWifi,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Logs => "logs",
            Self::Wifi => "wifi",
            Self::Schedule => "schedule",
            Self::LastPrint => "last-print",
            Self::SaveSchedule => "save-schedule",
            Self::Submit => "submit",
            Self::PrintJoke => "print-joke",
            Self::ForgetWifi => "forget-wifi",
        };
        f.write_str(name)
    }
}

pub trait StatusObserver: Send + Sync {
    fn on_logs(&self, _logs: &LogSnapshot) {}
    fn on_wifi(&self, _wifi: &WifiStatus) {}
    fn on_schedule(&self, _schedule: &ScheduleConfig) {}
    fn on_error(&self, _resource: Resource, _error: &ClientError) {}
}

/// observer that ignores everything
#[derive(Debug, Default)]
pub struct NoopObserver;

impl StatusObserver for NoopObserver {}

// ==============================================================================
// tracing observer - what the cli uses as its "display"
// ==============================================================================

/// writes updates as tracing events. with `show_logs`, device log lines are
/// echoed as they appear.
#[derive(Debug, Default)]
pub struct TracingObserver {
    show_logs: bool,
    last_logs: Mutex<String>,
}

impl TracingObserver {
    pub fn new(show_logs: bool) -> Self {
        Self { show_logs, last_logs: Mutex::new(String::new()) }
    }
}

/// part of `current` not already shown. the device buffer is a ring, so
/// once old lines fall off the whole snapshot counts as new.
pub fn unseen_suffix<'a>(previous: &str, current: &'a str) -> &'a str {
    current.strip_prefix(previous).unwrap_or(current)
}

impl StatusObserver for TracingObserver {
    fn on_logs(&self, logs: &LogSnapshot) {
        if !self.show_logs {
            return;
        }
        let Ok(mut last) = self.last_logs.lock() else {
            return;
        };
        for line in unseen_suffix(&last, logs.as_str()).lines() {
            tracing::info!(target: "device", "{}", line);
        }
        *last = logs.as_str().to_string();
    }

    fn on_wifi(&self, wifi: &WifiStatus) {
        tracing::info!(ssid = wifi.ssid_label(), ip = wifi.ip_label(), "[WIFI] status");
    }

    fn on_schedule(&self, schedule: &ScheduleConfig) {
        tracing::info!(
            daily_print_time = %schedule.daily_print_time,
            "[SCHEDULE] Last printed: {}",
            schedule.last_print().label_local()
        );
    }

    fn on_error(&self, resource: Resource, error: &ClientError) {
        tracing::warn!(%resource, "⚠ {}", error);
    }
}
