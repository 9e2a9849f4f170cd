//! ==============================================================================
//! device.rs - transport to the printer's http api
//! ==============================================================================
//!
//! purpose:
//!     one trait (DeviceApi) for every endpoint the panel uses, so the
//!     client never touches http directly. HttpDevice is the real
//!     implementation; tests swap in an in-memory device.
//!
//! relationships:
//!     - used by: client.rs (DeviceStatusClient<D: DeviceApi>)
//!     - uses: domain.rs (wire shapes), error.rs
//!
//! endpoints:
//!     GET  /logs           text/plain log buffer
//!     GET  /wifiInfo       {"ssid", "ip"}
//!     GET  /api/schedule   {"dailyPrintTime", "lastJokePrintDate"}
//!     POST /api/schedule   form: dailyPrintTime
//!     GET  /api/lastPrint  {"lastJokePrintDate"}
//!     POST /submit         multipart: message [, date]
//!     POST /printJoke      text/plain
//!     POST /forgetWifi     ignored, device restarts
//!
//! ==============================================================================

use crate::domain::{
    LastPrintWire, Message, ScheduleConfig, ScheduleWire, WifiInfoWire, WifiStatus,
};
use crate::error::{body_text, ClientError, SaveError, ServerError, SubmitError, TransportError};

use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;

pub const LOGS_PATH: &str = "/logs";
pub const WIFI_INFO_PATH: &str = "/wifiInfo";
pub const SCHEDULE_PATH: &str = "/api/schedule";
pub const LAST_PRINT_PATH: &str = "/api/lastPrint";
pub const SUBMIT_PATH: &str = "/submit";
pub const PRINT_JOKE_PATH: &str = "/printJoke";
pub const FORGET_WIFI_PATH: &str = "/forgetWifi";

pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// every call the panel makes against the device
pub trait DeviceApi: Send + Sync + 'static {
    fn fetch_logs(&self) -> impl Future<Output = Result<String, ClientError>> + Send;
    fn fetch_wifi(&self) -> impl Future<Output = Result<WifiStatus, ClientError>> + Send;
    fn fetch_schedule(&self) -> impl Future<Output = Result<ScheduleConfig, ClientError>> + Send;
    fn fetch_last_print(&self) -> impl Future<Output = Result<Option<String>, ClientError>> + Send;
    /// 2xx is success; anything else is SaveError::Rejected
    fn save_print_time(&self, time: &str) -> impl Future<Output = Result<(), SaveError>> + Send;
    /// any http response counts as accepted
    fn submit(&self, message: &Message) -> impl Future<Output = Result<(), SubmitError>> + Send;
    fn print_joke(&self) -> impl Future<Output = Result<String, ClientError>> + Send;
    fn forget_wifi(&self) -> impl Future<Output = Result<(), ClientError>> + Send;
}

// ==============================================================================
// http implementation
// ==============================================================================

#[derive(Debug, Clone)]
pub struct HttpDevice {
    base_url: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl HttpDevice {
    pub fn new(base_url: &str, timeout_ms: u64) -> Result<Self, TransportError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(TransportError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            base_url: trimmed.to_string(),
            timeout: Duration::from_millis(timeout_ms.max(100)),
            http: reqwest::Client::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(
        &self,
        path: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, TransportError> {
        tracing::trace!(path, "device request");
        request
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| TransportError::Request { path, message: e.to_string() })
    }

    async fn get(&self, path: &'static str) -> Result<reqwest::Response, TransportError> {
        self.send(path, self.http.get(self.endpoint(path))).await
    }

    async fn post(&self, path: &'static str) -> Result<reqwest::Response, TransportError> {
        self.send(path, self.http.post(self.endpoint(path))).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &'static str) -> Result<T, ClientError> {
        let response = self.get(path).await?;
        let bytes = read_success(path, response).await?;
        serde_json::from_slice::<T>(&bytes).map_err(|e| {
            ServerError::Decode { path, message: e.to_string() }.into()
        })
    }
}

/// body of a 2xx response, or the matching error
async fn read_success(
    path: &'static str,
    response: reqwest::Response,
) -> Result<Vec<u8>, ClientError> {
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|e| TransportError::Read { path, message: e.to_string() })?;
    if !status.is_success() {
        return Err(ServerError::Status { path, status, body: body_text(&bytes) }.into());
    }
    Ok(bytes.to_vec())
}

impl DeviceApi for HttpDevice {
    async fn fetch_logs(&self) -> Result<String, ClientError> {
        let response = self.get(LOGS_PATH).await?;
        let bytes = read_success(LOGS_PATH, response).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn fetch_wifi(&self) -> Result<WifiStatus, ClientError> {
        let wire: WifiInfoWire = self.get_json(WIFI_INFO_PATH).await?;
        Ok(wire.into())
    }

    async fn fetch_schedule(&self) -> Result<ScheduleConfig, ClientError> {
        let wire: ScheduleWire = self.get_json(SCHEDULE_PATH).await?;
        Ok(wire.into())
    }

    async fn fetch_last_print(&self) -> Result<Option<String>, ClientError> {
        let wire: LastPrintWire = self.get_json(LAST_PRINT_PATH).await?;
        Ok(wire.into_date())
    }

    async fn save_print_time(&self, time: &str) -> Result<(), SaveError> {
        let request = self
            .http
            .post(self.endpoint(SCHEDULE_PATH))
            .form(&[("dailyPrintTime", time)]);
        let response = self.send(SCHEDULE_PATH, request).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response
            .bytes()
            .await
            .map(|b| body_text(&b))
            .unwrap_or_else(|_| "<unreadable>".to_string());
        Err(SaveError::Rejected { status, body })
    }

    async fn submit(&self, message: &Message) -> Result<(), SubmitError> {
        let mut form = reqwest::multipart::Form::new().text("message", message.text.clone());
        if let Some(date) = &message.date {
            form = form.text("date", date.clone());
        }
        let request = self.http.post(self.endpoint(SUBMIT_PATH)).multipart(form);
        let response = self.send(SUBMIT_PATH, request).await?;
        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "device answered /submit with non-2xx");
        }
        Ok(())
    }

    async fn print_joke(&self) -> Result<String, ClientError> {
        let response = self.post(PRINT_JOKE_PATH).await?;
        let bytes = read_success(PRINT_JOKE_PATH, response).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn forget_wifi(&self) -> Result<(), ClientError> {
        self.post(FORGET_WIFI_PATH).await?;
        Ok(())
    }
}

// ==============================================================================
// in-memory device for tests
// ==============================================================================
