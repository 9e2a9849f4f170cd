//! ==============================================================================
//! domain.rs - values the device reports and the client caches
//! ==============================================================================
//!
//! purpose:
//!     plain data types for the three cached resources (logs, wifi, schedule)
//!     plus the wire shapes the firmware speaks.
//!
//! relationships:
//!     - used by: client.rs (caches these), device.rs (decodes wire shapes)
//!     - used by: mirror.rs (serializes a StatusSnapshot)
//!
//! wire notes:
//!     the firmware writes json by string concatenation, so "never printed"
//!     arrives as "lastJokePrintDate": "" and an unassociated radio reports
//!     an empty ssid. both are normalized to None here.
//!
//! ==============================================================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// message length the kiosk form allows
pub const MESSAGE_MAX_CHARS: usize = 200;

/// remaining-character count at or below which the counter turns to a warning
pub const MESSAGE_LOW_CHARS: i64 = 20;

/// value stored in both wifi fields when /wifiInfo could not be read
pub const WIFI_ERROR: &str = "Error";

// ==============================================================================
// logs
// ==============================================================================

/// raw device log text, replaced wholesale on every successful poll
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LogSnapshot(String);

impl LogSnapshot {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// text for the debug console
    pub fn display_text(&self) -> &str {
        if self.0.is_empty() {
            "No logs yet..."
        } else {
            &self.0
        }
    }
}

// ==============================================================================
// wifi
// ==============================================================================

/// network identity of the device.
/// None means unknown; the "Error" sentinel means the last fetch failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WifiStatus {
    pub ssid: Option<String>,
    pub ip: Option<String>,
}

impl WifiStatus {
    /// not fetched yet
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn error() -> Self {
        Self {
            ssid: Some(WIFI_ERROR.to_string()),
            ip: Some(WIFI_ERROR.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.ssid.as_deref() == Some(WIFI_ERROR) && self.ip.as_deref() == Some(WIFI_ERROR)
    }

    pub fn ssid_label(&self) -> &str {
        self.ssid.as_deref().unwrap_or("Unknown")
    }

    pub fn ip_label(&self) -> &str {
        self.ip.as_deref().unwrap_or("Unknown")
    }
}

/// body of GET /wifiInfo
#[derive(Debug, Deserialize)]
pub struct WifiInfoWire {
    #[serde(default)]
    pub ssid: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
}

impl From<WifiInfoWire> for WifiStatus {
    fn from(wire: WifiInfoWire) -> Self {
        Self {
            ssid: non_empty(wire.ssid),
            ip: non_empty(wire.ip),
        }
    }
}

// ==============================================================================
// schedule
// ==============================================================================

/// daily auto-print settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleConfig {
    /// HH:MM, 24h. opaque to the client; the device validates it.
    pub daily_print_time: String,
    /// YYYY-MM-DD, None if the device never printed a scheduled joke
    pub last_print_date: Option<String>,
}

impl ScheduleConfig {
    pub fn last_print(&self) -> LastPrint<'_> {
        LastPrint(self.last_print_date.as_deref())
    }
}

/// body of GET /api/schedule
#[derive(Debug, Deserialize)]
pub struct ScheduleWire {
    #[serde(rename = "dailyPrintTime")]
    pub daily_print_time: String,
    #[serde(rename = "lastJokePrintDate", default)]
    pub last_joke_print_date: Option<String>,
}

impl From<ScheduleWire> for ScheduleConfig {
    fn from(wire: ScheduleWire) -> Self {
        Self {
            daily_print_time: wire.daily_print_time,
            last_print_date: non_empty(wire.last_joke_print_date),
        }
    }
}

/// body of GET /api/lastPrint
#[derive(Debug, Deserialize)]
pub struct LastPrintWire {
    #[serde(rename = "lastJokePrintDate", default)]
    pub last_joke_print_date: Option<String>,
}

impl LastPrintWire {
    pub fn into_date(self) -> Option<String> {
        non_empty(self.last_joke_print_date)
    }
}

/// renders the last scheduled print relative to a given day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastPrint<'a>(pub Option<&'a str>);

impl LastPrint<'_> {
    /// "Today", the literal date, or "Never"
    pub fn label(&self, today: NaiveDate) -> String {
        match self.0 {
            None => "Never".to_string(),
            Some(date) if date == today.format("%Y-%m-%d").to_string() => "Today".to_string(),
            Some(date) => date.to_string(),
        }
    }

    /// label against the client-local calendar date
    pub fn label_local(&self) -> String {
        self.label(chrono::Local::now().date_naive())
    }

    pub fn line(&self, today: NaiveDate) -> String {
        format!("Last printed: {}", self.label(today))
    }
}

// ==============================================================================
// messages
// ==============================================================================

/// a receipt to print. `date` replaces the device's own timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    pub date: Option<String>,
}

impl Message {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), date: None }
    }

    pub fn dated(text: impl Into<String>, date: impl Into<String>) -> Self {
        Self { text: text.into(), date: Some(date.into()) }
    }
}

/// characters left in the form, counted in chars. negative once over.
pub fn remaining_chars(text: &str) -> i64 {
    MESSAGE_MAX_CHARS as i64 - text.chars().count() as i64
}

pub fn is_low_on_chars(text: &str) -> bool {
    remaining_chars(text) <= MESSAGE_LOW_CHARS
}

// ==============================================================================
// status snapshot
// ==============================================================================

/// everything the client currently knows, as served by the mirror
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub logs: LogSnapshot,
    pub wifi: WifiStatus,
    pub schedule: Option<ScheduleConfig>,
    pub last_print_label: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
