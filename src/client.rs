//! ==============================================================================
//! client.rs - cached view of one device
//! ==============================================================================
//!
//! purpose:
//!     DeviceStatusClient owns the latest known logs, wifi status and print
//!     schedule, refreshes them through a DeviceApi, and tells a
//!     StatusObserver whenever something settles.
//!
//! failure policy:
//!     no device call propagates a panic or an unhandled error into the
//!     polling task. every failed device call is reported to the observer.
//!     reads then keep (logs, schedule) or replace with the error sentinel
//!     (wifi). writes also return the error and never touch the cache
//!     unless the device accepted them.
//!
//! relationships:
//!     - used by: poller.rs (recurring poll_logs), mirror.rs (snapshot),
//!       main.rs (cli commands)
//!     - uses: device.rs (DeviceApi), observer.rs (StatusObserver)
//!
//! ==============================================================================

use crate::device::DeviceApi;
use crate::domain::{LogSnapshot, Message, ScheduleConfig, StatusSnapshot, WifiStatus};
use crate::error::{ClientError, SaveError, SubmitError};
use crate::observer::{NoopObserver, Resource, StatusObserver};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Cache {
    logs: LogSnapshot,
    wifi: WifiStatus,
    schedule: Option<ScheduleConfig>,
}

pub struct DeviceStatusClient<D> {
    device: D,
    cache: RwLock<Cache>,
    observer: Arc<dyn StatusObserver>,
    log_poll_in_flight: AtomicBool,
}

/// clears the in-flight flag even if the poll future is dropped mid-request
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<D: DeviceApi> DeviceStatusClient<D> {
    pub fn new(device: D) -> Self {
        Self::with_observer(device, Arc::new(NoopObserver))
    }

    pub fn with_observer(device: D, observer: Arc<dyn StatusObserver>) -> Self {
        Self {
            device,
            cache: RwLock::new(Cache::default()),
            observer,
            log_poll_in_flight: AtomicBool::new(false),
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    // ==========================================================================
    // reads
    // ==========================================================================

    /// refresh the log snapshot. returns the current snapshot, which is the
    /// previous one if the fetch failed or another poll is still running.
    pub async fn poll_logs(&self) -> LogSnapshot {
        if self.log_poll_in_flight.swap(true, Ordering::AcqRel) {
            tracing::debug!("log poll still in flight, skipping");
            return self.logs().await;
        }
        let _in_flight = InFlight(&self.log_poll_in_flight);

        match self.device.fetch_logs().await {
            Ok(text) => {
                let snapshot = LogSnapshot::new(text);
                self.cache.write().await.logs = snapshot.clone();
                self.observer.on_logs(&snapshot);
                snapshot
            }
            Err(e) => {
                tracing::debug!("[LOGS] fetch failed: {}", e);
                self.observer.on_error(Resource::Logs, &e);
                self.logs().await
            }
        }
    }

    /// one-shot wifi read. a failure stores the "Error" sentinel so the
    /// display can tell it apart from never-fetched.
    pub async fn poll_wifi_status(&self) -> WifiStatus {
        let status = match self.device.fetch_wifi().await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!("[WIFI] Failed to fetch WiFi info: {}", e);
                self.observer.on_error(Resource::Wifi, &e);
                WifiStatus::error()
            }
        };
        self.cache.write().await.wifi = status.clone();
        self.observer.on_wifi(&status);
        status
    }

    /// one-shot schedule read. on failure the cached schedule is kept.
    pub async fn load_schedule(&self) -> Option<ScheduleConfig> {
        match self.device.fetch_schedule().await {
            Ok(schedule) => {
                self.cache.write().await.schedule = Some(schedule.clone());
                self.observer.on_schedule(&schedule);
                Some(schedule)
            }
            Err(e) => {
                tracing::warn!("[SCHEDULE] Failed to load schedule: {}", e);
                self.observer.on_error(Resource::Schedule, &e);
                self.schedule().await
            }
        }
    }

    /// re-read only the last print date. needs a loaded schedule to attach to.
    pub async fn refresh_last_print(&self) -> Option<String> {
        match self.device.fetch_last_print().await {
            Ok(date) => {
                let updated = {
                    let mut cache = self.cache.write().await;
                    cache.schedule.as_mut().map(|schedule| {
                        schedule.last_print_date = date.clone();
                        schedule.clone()
                    })
                };
                match updated {
                    Some(schedule) => self.observer.on_schedule(&schedule),
                    None => tracing::debug!("[SCHEDULE] last print refreshed before schedule load"),
                }
                date
            }
            Err(e) => {
                tracing::warn!("[SCHEDULE] Failed to fetch last print: {}", e);
                self.observer.on_error(Resource::LastPrint, &e);
                self.schedule().await.and_then(|s| s.last_print_date)
            }
        }
    }

    /// initial fetch burst: waits `delay`, then reads logs, wifi and
    /// schedule concurrently
    pub async fn startup(&self, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        tokio::join!(self.poll_logs(), self.poll_wifi_status(), self.load_schedule());
    }

    // ==========================================================================
    // writes
    // ==========================================================================

    /// push a new daily print time. the format is the device's business;
    /// only an empty value is refused here.
    pub async fn save_schedule(&self, time: &str) -> Result<(), SaveError> {
        if time.is_empty() {
            return Err(SaveError::EmptyTime);
        }
        if let Err(e) = self.device.save_print_time(time).await {
            tracing::warn!("[SCHEDULE] Error saving time: {}", e);
            if let Some(device_error) = e.device_error() {
                self.observer.on_error(Resource::SaveSchedule, &device_error);
            }
            return Err(e);
        }

        let schedule = {
            let mut cache = self.cache.write().await;
            let schedule = cache.schedule.get_or_insert_with(|| ScheduleConfig {
                daily_print_time: String::new(),
                last_print_date: None,
            });
            schedule.daily_print_time = time.to_string();
            schedule.clone()
        };
        tracing::info!("[SCHEDULE] Print time saved: {}", time);
        self.observer.on_schedule(&schedule);
        Ok(())
    }

    /// queue a receipt. accepted means the device answered, not printed.
    pub async fn submit_message(&self, text: &str) -> Result<(), SubmitError> {
        self.submit(Message::new(text)).await
    }

    /// queue a receipt stamped with `date` instead of the device clock
    pub async fn submit_message_with_date(&self, text: &str, date: &str) -> Result<(), SubmitError> {
        self.submit(Message::dated(text, date)).await
    }

    async fn submit(&self, message: Message) -> Result<(), SubmitError> {
        match self.device.submit(&message).await {
            Ok(()) => {
                tracing::info!(chars = message.text.chars().count(), "[SUBMIT] message sent");
                Ok(())
            }
            Err(e) => {
                tracing::warn!("[SUBMIT] {}", e);
                self.observer.on_error(Resource::Submit, &e.0.clone().into());
                Err(e)
            }
        }
    }

    /// manual joke print. the device's reply text is logged and returned.
    pub async fn print_joke(&self) -> Result<String, ClientError> {
        match self.device.print_joke().await {
            Ok(result) => {
                tracing::info!("[JOKE] print result: {}", result.trim());
                Ok(result)
            }
            Err(e) => {
                tracing::error!("[JOKE] Error printing joke: {}", e);
                self.observer.on_error(Resource::PrintJoke, &e);
                Err(e)
            }
        }
    }

    /// clear the device's wifi credentials. the device restarts afterwards,
    /// so every cached value goes stale.
    pub async fn forget_wifi(&self) -> Result<(), ClientError> {
        match self.device.forget_wifi().await {
            Ok(()) => {
                tracing::info!("[WIFI] credentials forgotten, device will restart");
                Ok(())
            }
            Err(e) => {
                tracing::error!("[WIFI] Could not forget WiFi credentials: {}", e);
                self.observer.on_error(Resource::ForgetWifi, &e);
                Err(e)
            }
        }
    }

    // ==========================================================================
    // accessors
    // ==========================================================================

    pub async fn logs(&self) -> LogSnapshot {
        self.cache.read().await.logs.clone()
    }

    pub async fn wifi(&self) -> WifiStatus {
        self.cache.read().await.wifi.clone()
    }

    pub async fn schedule(&self) -> Option<ScheduleConfig> {
        self.cache.read().await.schedule.clone()
    }

    pub async fn snapshot(&self) -> StatusSnapshot {
        let cache = self.cache.read().await;
        StatusSnapshot {
            logs: cache.logs.clone(),
            wifi: cache.wifi.clone(),
            last_print_label: cache.schedule.as_ref().map(|s| s.last_print().label_local()),
            schedule: cache.schedule.clone(),
        }
    }
}

// ==============================================================================
// tests
// ==============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mock::MockDevice;
    use crate::error::TransportError;
    use reqwest::StatusCode;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        logs: Mutex<Vec<String>>,
        wifi: Mutex<Vec<WifiStatus>>,
        schedules: Mutex<Vec<ScheduleConfig>>,
        errors: Mutex<Vec<Resource>>,
    }

    impl StatusObserver for Recorder {
        fn on_logs(&self, logs: &LogSnapshot) {
            self.logs.lock().unwrap().push(logs.as_str().to_string());
        }
        fn on_wifi(&self, wifi: &WifiStatus) {
            self.wifi.lock().unwrap().push(wifi.clone());
        }
        fn on_schedule(&self, schedule: &ScheduleConfig) {
            self.schedules.lock().unwrap().push(schedule.clone());
        }
        fn on_error(&self, resource: Resource, _error: &ClientError) {
            self.errors.lock().unwrap().push(resource);
        }
    }

    fn make_client(device: MockDevice) -> (DeviceStatusClient<MockDevice>, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        (DeviceStatusClient::with_observer(device, recorder.clone()), recorder)
    }

    fn schedule(time: &str, last: Option<&str>) -> ScheduleConfig {
        ScheduleConfig {
            daily_print_time: time.to_string(),
            last_print_date: last.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn logs_track_latest_successful_poll() {
        let device = MockDevice::default();
        device.push_logs(Ok("boot\n"));
        device.push_logs(Err(()));
        device.push_logs(Err(()));
        device.push_logs(Ok("boot\nwifi up\n"));
        device.push_logs(Err(()));
        let (client, recorder) = make_client(device);

        assert_eq!(client.poll_logs().await.as_str(), "boot\n");
        assert_eq!(client.poll_logs().await.as_str(), "boot\n");
        assert_eq!(client.poll_logs().await.as_str(), "boot\n");
        assert_eq!(client.poll_logs().await.as_str(), "boot\nwifi up\n");
        assert_eq!(client.poll_logs().await.as_str(), "boot\nwifi up\n");

        assert_eq!(client.logs().await.as_str(), "boot\nwifi up\n");
        assert_eq!(recorder.logs.lock().unwrap().len(), 2);
        assert_eq!(*recorder.errors.lock().unwrap(), vec![Resource::Logs; 3]);
    }

    #[tokio::test]
    async fn empty_log_body_replaces_snapshot() {
        let device = MockDevice::default();
        device.push_logs(Ok("old\n"));
        device.push_logs(Ok(""));
        let (client, _) = make_client(device);

        client.poll_logs().await;
        let snapshot = client.poll_logs().await;
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.display_text(), "No logs yet...");
    }

    #[tokio::test]
    async fn overlapping_log_polls_share_one_request() {
        let device = MockDevice::gated();
        device.push_logs(Ok("first\n"));
        let client = Arc::new(DeviceStatusClient::new(device));

        let first = tokio::spawn({
            let client = client.clone();
            async move { client.poll_logs().await }
        });
        while client.device().log_calls() == 0 {
            tokio::task::yield_now().await;
        }

        // second tick while the first is still waiting on the device
        let skipped = client.poll_logs().await;
        assert!(skipped.is_empty());
        assert_eq!(client.device().log_calls(), 1);

        client.device().release_log();
        assert_eq!(first.await.unwrap().as_str(), "first\n");
        assert_eq!(
            client.device().max_logs_in_flight.load(Ordering::SeqCst),
            1
        );
    }

    #[tokio::test]
    async fn log_poll_can_run_again_after_completion() {
        let device = MockDevice::default();
        device.push_logs(Ok("a\n"));
        device.push_logs(Ok("a\nb\n"));
        let (client, _) = make_client(device);

        client.poll_logs().await;
        client.poll_logs().await;
        assert_eq!(client.device().log_calls(), 2);
        assert_eq!(client.logs().await.as_str(), "a\nb\n");
    }

    #[tokio::test]
    async fn wifi_failure_yields_error_sentinel() {
        let (client, recorder) = make_client(MockDevice::default());
        assert_eq!(client.wifi().await, WifiStatus::unknown());

        let status = client.poll_wifi_status().await;
        assert_eq!(status.ssid.as_deref(), Some("Error"));
        assert_eq!(status.ip.as_deref(), Some("Error"));
        assert!(client.wifi().await.is_error());
        assert_eq!(*recorder.errors.lock().unwrap(), vec![Resource::Wifi]);
        assert_eq!(recorder.wifi.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn wifi_success_replaces_wholesale() {
        let device = MockDevice::default();
        device.wifi.lock().unwrap().push_back(Ok(WifiStatus {
            ssid: Some("kiosk-net".to_string()),
            ip: None,
        }));
        let (client, _) = make_client(device);

        let status = client.poll_wifi_status().await;
        assert_eq!(status.ssid_label(), "kiosk-net");
        assert_eq!(status.ip_label(), "Unknown");
    }

    #[tokio::test]
    async fn schedule_load_failure_keeps_previous() {
        let device = MockDevice::default();
        device.schedule.lock().unwrap().push_back(Ok(schedule("09:00", None)));
        device.schedule.lock().unwrap().push_back(Err(()));
        let (client, recorder) = make_client(device);

        assert_eq!(client.load_schedule().await, Some(schedule("09:00", None)));
        assert_eq!(client.load_schedule().await, Some(schedule("09:00", None)));
        assert_eq!(*recorder.errors.lock().unwrap(), vec![Resource::Schedule]);
    }

    #[tokio::test]
    async fn save_schedule_success_updates_cache() {
        let device = MockDevice::default();
        device.schedule.lock().unwrap().push_back(Ok(schedule("09:00", Some("2025-12-16"))));
        *device.save_status.lock().unwrap() = Some(StatusCode::OK);
        let (client, _) = make_client(device);

        client.load_schedule().await;
        client.save_schedule("14:30").await.unwrap();
        assert_eq!(
            client.schedule().await,
            Some(schedule("14:30", Some("2025-12-16")))
        );
        assert_eq!(*client.device().saved.lock().unwrap(), vec!["14:30".to_string()]);
    }

    #[tokio::test]
    async fn save_schedule_rejection_leaves_cache() {
        let device = MockDevice::default();
        device.schedule.lock().unwrap().push_back(Ok(schedule("09:00", None)));
        *device.save_status.lock().unwrap() = Some(StatusCode::INTERNAL_SERVER_ERROR);
        let (client, _) = make_client(device);

        client.load_schedule().await;
        let err = client.save_schedule("14:30").await.unwrap_err();
        assert!(matches!(err, SaveError::Rejected { status, .. } if status == StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(client.schedule().await.unwrap().daily_print_time, "09:00");
    }

    #[tokio::test]
    async fn save_schedule_transport_failure_is_distinct() {
        let (client, _) = make_client(MockDevice::default());
        let err = client.save_schedule("14:30").await.unwrap_err();
        assert!(matches!(err, SaveError::Transport(TransportError::Request { .. })));
        assert_eq!(client.schedule().await, None);
    }

    #[tokio::test]
    async fn save_schedule_refuses_empty_time_without_request() {
        let (client, _) = make_client(MockDevice::default());
        assert!(matches!(client.save_schedule("").await, Err(SaveError::EmptyTime)));
        assert!(client.device().saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_schedule_passes_time_through_untouched() {
        let device = MockDevice::default();
        *device.save_status.lock().unwrap() = Some(StatusCode::OK);
        let (client, _) = make_client(device);

        // format is the device's call, whitespace included
        client.save_schedule(" 7:5 ").await.unwrap();
        assert_eq!(*client.device().saved.lock().unwrap(), vec![" 7:5 ".to_string()]);
        assert_eq!(client.schedule().await.unwrap().daily_print_time, " 7:5 ");
    }

    #[tokio::test]
    async fn write_failures_reach_the_observer() {
        let device = MockDevice::default();
        *device.save_status.lock().unwrap() = Some(StatusCode::BAD_REQUEST);
        device.fail_submit.store(true, Ordering::SeqCst);
        let (client, recorder) = make_client(device);

        assert!(client.save_schedule("").await.is_err());
        assert!(recorder.errors.lock().unwrap().is_empty());

        assert!(client.save_schedule("25:99").await.is_err());
        assert!(client.submit_message("hello").await.is_err());
        assert_eq!(
            *recorder.errors.lock().unwrap(),
            vec![Resource::SaveSchedule, Resource::Submit]
        );
    }

    #[tokio::test]
    async fn save_before_load_creates_schedule() {
        let device = MockDevice::default();
        *device.save_status.lock().unwrap() = Some(StatusCode::OK);
        let (client, _) = make_client(device);

        client.save_schedule("07:15").await.unwrap();
        assert_eq!(client.schedule().await, Some(schedule("07:15", None)));
    }

    #[tokio::test]
    async fn empty_message_is_still_submitted_once() {
        let (client, _) = make_client(MockDevice::default());
        client.submit_message("").await.unwrap();

        let submitted = client.device().submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0], Message::new(""));
    }

    #[tokio::test]
    async fn dated_message_carries_date() {
        let (client, _) = make_client(MockDevice::default());
        client.submit_message_with_date("hello", "2025-01-02").await.unwrap();
        assert_eq!(
            client.device().submitted.lock().unwrap()[0],
            Message::dated("hello", "2025-01-02")
        );
    }

    #[tokio::test]
    async fn last_print_refresh_updates_only_date() {
        let device = MockDevice::default();
        device.schedule.lock().unwrap().push_back(Ok(schedule("09:00", None)));
        device.last_print.lock().unwrap().push_back(Some("2025-12-16".to_string()));
        let (client, recorder) = make_client(device);

        client.load_schedule().await;
        assert_eq!(client.refresh_last_print().await.as_deref(), Some("2025-12-16"));
        assert_eq!(
            client.schedule().await,
            Some(schedule("09:00", Some("2025-12-16")))
        );
        assert_eq!(recorder.schedules.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn startup_fetches_all_three() {
        let device = MockDevice::default();
        device.push_logs(Ok("ready\n"));
        device.wifi.lock().unwrap().push_back(Ok(WifiStatus {
            ssid: Some("home".to_string()),
            ip: Some("192.168.1.40".to_string()),
        }));
        device.schedule.lock().unwrap().push_back(Ok(schedule("09:00", None)));
        let (client, _) = make_client(device);

        client.startup(Duration::ZERO).await;
        let snapshot = client.snapshot().await;
        assert_eq!(snapshot.logs.as_str(), "ready\n");
        assert_eq!(snapshot.wifi.ip.as_deref(), Some("192.168.1.40"));
        assert_eq!(snapshot.last_print_label.as_deref(), Some("Never"));
    }

    #[tokio::test(start_paused = true)]
    async fn startup_waits_for_the_delay() {
        let device = MockDevice::default();
        device.push_logs(Ok("ready\n"));
        let client = Arc::new(DeviceStatusClient::new(device));

        let task = tokio::spawn({
            let client = client.clone();
            async move { client.startup(Duration::from_millis(100)).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(client.device().log_calls(), 0);

        task.await.unwrap();
        assert_eq!(client.device().log_calls(), 1);
        assert_eq!(client.logs().await.as_str(), "ready\n");
    }

    #[tokio::test]
    async fn print_joke_returns_device_text() {
        let (client, _) = make_client(MockDevice::default());
        assert_eq!(client.print_joke().await.unwrap(), "Joke will be printed!");
        client.forget_wifi().await.unwrap();
    }
}
