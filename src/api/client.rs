//! Throttled, retrying MLB Stats API client

use crate::sync::unit::UnitKind;
use crate::{Error, Result};
use chrono::NaiveDate;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tracing::debug;

use super::endpoints;

/// Time source for throttling and backoff.
///
/// Production code uses [`SystemClock`]; tests use [`ManualClock`] so no
/// real sleeping happens.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Wall-clock time and real sleeps
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Retry schedule for transient fetch failures.
///
/// `max_attempts` counts HTTP calls, not retries: with the default of 3, a
/// request is sent at most 3 times before the transient error surfaces.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no backoff
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before the retry that follows failed attempt `attempt`
    /// (1-based). Doubles per attempt, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.max(1) - 1;
        let factor = 2u32.saturating_pow(exponent.min(16));
        let delay = self.initial_delay.saturating_mul(factor);
        delay.min(self.max_delay)
    }
}

/// Client settings: API root, pacing, timeout, retry schedule.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_interval: Duration,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: endpoints::BASE_URL.to_string(),
            request_interval: Duration::from_millis(500),
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_request_interval(mut self, interval: Duration) -> Self {
        self.request_interval = interval;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Raw HTTP response as seen by the client
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub status: u16,
    pub body: String,
}

/// Transport seam: issues one GET and reports status + body.
///
/// Connection-level failures (no response at all) are returned as
/// [`Error::Transient`]; status classification is the client's job.
pub trait HttpGateway: Send + Sync {
    fn get(&self, url: &str) -> Result<GatewayResponse>;
}

/// reqwest-backed gateway used in production
pub struct ReqwestGateway {
    inner: reqwest::blocking::Client,
}

impl ReqwestGateway {
    pub fn new(timeout: Duration) -> Result<Self> {
        let inner = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(concat!("scorebook/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { inner })
    }
}

impl HttpGateway for ReqwestGateway {
    fn get(&self, url: &str) -> Result<GatewayResponse> {
        let response = self.inner.get(url).send().map_err(|e| Error::Transient {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        let status = response.status().as_u16();
        let body = response.text().map_err(|e| Error::Transient {
            url: url.to_string(),
            message: format!("failed reading body: {}", e),
        })?;
        Ok(GatewayResponse { status, body })
    }
}

// Shared handles work wherever the bare implementation does. Tests lean on
// this to keep a handle on a gateway or clock after handing it to a client.

impl<G: HttpGateway> HttpGateway for std::sync::Arc<G> {
    fn get(&self, url: &str) -> Result<GatewayResponse> {
        self.as_ref().get(url)
    }
}

impl<C: Clock> Clock for std::sync::Arc<C> {
    fn now(&self) -> Instant {
        self.as_ref().now()
    }

    fn sleep(&self, duration: Duration) {
        self.as_ref().sleep(duration);
    }
}

/// Rate-limited API client.
///
/// A single throttle serializes gateway calls, spacing each one at least
/// the configured interval after the previous call's completion. Retries
/// and failed attempts hold the throttle like any other call, so the API
/// never sees bursts regardless of how the orchestrator schedules work.
pub struct StatsClient<G: HttpGateway> {
    gateway: G,
    config: ClientConfig,
    clock: Box<dyn Clock>,
    last_request: Mutex<Option<Instant>>,
}

impl StatsClient<ReqwestGateway> {
    /// Production client over reqwest with the system clock
    pub fn new(config: ClientConfig) -> Result<Self> {
        let gateway = ReqwestGateway::new(config.timeout)?;
        Ok(Self::with_clock(gateway, config, Box::new(SystemClock)))
    }
}

impl<G: HttpGateway> StatsClient<G> {
    pub fn with_gateway(gateway: G, config: ClientConfig) -> Self {
        Self::with_clock(gateway, config, Box::new(SystemClock))
    }

    pub fn with_clock(gateway: G, config: ClientConfig, clock: Box<dyn Clock>) -> Self {
        Self {
            gateway,
            config,
            clock,
            last_request: Mutex::new(None),
        }
    }

    /// Fetch the document backing one unit
    pub fn fetch(&self, kind: UnitKind, id: i64) -> Result<Value> {
        let url = endpoints::unit_url(&self.config.base_url, kind, id);
        self.get_json(&url)
    }

    /// Fetch the schedule listing for an inclusive date range
    pub fn fetch_schedule(&self, start: NaiveDate, end: NaiveDate) -> Result<Value> {
        let url = endpoints::schedule_url(&self.config.base_url, start, end);
        self.get_json(&url)
    }

    fn get_json(&self, url: &str) -> Result<Value> {
        let mut attempt: u32 = 1;
        loop {
            match self.throttled_get(url) {
                Ok(doc) => return Ok(doc),
                Err(e) if e.is_transient() && attempt < self.config.retry.max_attempts => {
                    let delay = self.config.retry.delay_for_attempt(attempt);
                    debug!(
                        url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "transient failure, backing off: {}",
                        e
                    );
                    self.clock.sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One gateway call under the throttle. The pause runs from the
    /// previous call's completion, and the stamp moves when this attempt
    /// returns, successful or not, so a failed call still consumed a slot.
    fn throttled_get(&self, url: &str) -> Result<Value> {
        let mut last = self.last_request.lock();
        if let Some(previous) = *last {
            let elapsed = self.clock.now().saturating_duration_since(previous);
            if elapsed < self.config.request_interval {
                let remaining = self.config.request_interval - elapsed;
                debug!(wait_ms = remaining.as_millis() as u64, "throttling request");
                self.clock.sleep(remaining);
            }
        }
        let outcome = self.try_get(url);
        *last = Some(self.clock.now());
        outcome
    }

    fn try_get(&self, url: &str) -> Result<Value> {
        let response = self.gateway.get(url)?;
        match response.status {
            200..=299 => {
                serde_json::from_str(&response.body).map_err(|e| Error::Permanent {
                    url: url.to_string(),
                    status: Some(response.status),
                    message: format!("response body is not valid JSON: {}", e),
                })
            }
            429 | 500..=599 => Err(Error::Transient {
                url: url.to_string(),
                message: format!("HTTP {}", response.status),
            }),
            status => Err(Error::Permanent {
                url: url.to_string(),
                status: Some(status),
                message: format!("HTTP {}", status),
            }),
        }
    }
}

// ========== Test doubles ==========
//
// Shipped outside #[cfg(test)] so integration tests can drive full sync
// runs without a network.

/// One scripted reply for a URL
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// 200 with this JSON document
    Json(Value),
    /// This status with a throwaway body
    Status(u16),
    /// Status and raw body, for malformed-payload cases
    Raw(u16, String),
    /// Connection-level failure before any response
    ConnectFailure,
}

/// In-memory gateway returning scripted replies and recording every call.
///
/// Replies for a URL are consumed front to back; the last one sticks, so a
/// single stub serves any number of calls.
pub struct ScriptedGateway {
    scripts: Mutex<HashMap<String, VecDeque<ScriptedReply>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn stub(&self, url: &str, reply: ScriptedReply) {
        self.scripts
            .lock()
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn stub_json(&self, url: &str, doc: Value) {
        self.stub(url, ScriptedReply::Json(doc));
    }

    /// All requested URLs, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// How many times a URL was requested
    pub fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.as_str() == url).count()
    }
}

impl Default for ScriptedGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpGateway for ScriptedGateway {
    fn get(&self, url: &str) -> Result<GatewayResponse> {
        self.calls.lock().push(url.to_string());
        let mut scripts = self.scripts.lock();
        let reply = match scripts.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        match reply {
            Some(ScriptedReply::Json(doc)) => Ok(GatewayResponse {
                status: 200,
                body: doc.to_string(),
            }),
            Some(ScriptedReply::Status(status)) => Ok(GatewayResponse {
                status,
                body: format!("scripted status {}", status),
            }),
            Some(ScriptedReply::Raw(status, body)) => Ok(GatewayResponse { status, body }),
            Some(ScriptedReply::ConnectFailure) => Err(Error::Transient {
                url: url.to_string(),
                message: "scripted connection failure".to_string(),
            }),
            None => Err(Error::Permanent {
                url: url.to_string(),
                status: None,
                message: "no scripted response for this URL".to_string(),
            }),
        }
    }
}

/// Virtual clock: `sleep` records the duration and advances `now`.
pub struct ManualClock {
    now: Mutex<Instant>,
    slept: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
            slept: Mutex::new(Vec::new()),
        }
    }

    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().clone()
    }

    pub fn total_slept(&self) -> Duration {
        self.slept.lock().iter().sum()
    }

    /// Move `now` forward without recording a sleep, e.g. to model time
    /// spent inside a request
    pub fn advance(&self, duration: Duration) {
        *self.now.lock() += duration;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }

    fn sleep(&self, duration: Duration) {
        self.slept.lock().push(duration);
        *self.now.lock() += duration;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn test_config(interval_ms: u64) -> ClientConfig {
        ClientConfig::default()
            .with_base_url("http://test")
            .with_request_interval(Duration::from_millis(interval_ms))
    }

    fn client_with(
        gateway: Arc<ScriptedGateway>,
        config: ClientConfig,
    ) -> (StatsClient<Arc<ScriptedGateway>>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let client = StatsClient::with_clock(gateway, config, Box::new(clock.clone()));
        (client, clock)
    }

    #[test]
    fn retries_transients_then_succeeds() {
        let gateway = Arc::new(ScriptedGateway::new());
        let url = endpoints::unit_url("http://test", UnitKind::Team, 119);
        gateway.stub(&url, ScriptedReply::ConnectFailure);
        gateway.stub(&url, ScriptedReply::Status(500));
        gateway.stub_json(&url, json!({"teams": []}));

        let (client, clock) = client_with(gateway.clone(), test_config(0));
        let doc = client.fetch(UnitKind::Team, 119).unwrap();
        assert_eq!(doc, json!({"teams": []}));
        assert_eq!(gateway.calls_for(&url), 3);
        // backoff after attempt 1 and attempt 2
        assert_eq!(
            clock.slept(),
            vec![Duration::from_millis(500), Duration::from_millis(1000)]
        );
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let gateway = Arc::new(ScriptedGateway::new());
        let url = endpoints::unit_url("http://test", UnitKind::Game, 745927);
        gateway.stub(&url, ScriptedReply::Status(503));

        let (client, _clock) = client_with(gateway.clone(), test_config(0));
        let err = client.fetch(UnitKind::Game, 745927).unwrap_err();
        assert!(err.is_transient());
        assert_eq!(gateway.calls_for(&url), 3);
    }

    #[test]
    fn permanent_failure_is_not_retried() {
        let gateway = Arc::new(ScriptedGateway::new());
        let url = endpoints::unit_url("http://test", UnitKind::Game, 1);
        gateway.stub(&url, ScriptedReply::Status(404));

        let (client, clock) = client_with(gateway.clone(), test_config(0));
        let err = client.fetch(UnitKind::Game, 1).unwrap_err();
        match err {
            Error::Permanent { status, .. } => assert_eq!(status, Some(404)),
            other => panic!("expected permanent error, got {:?}", other),
        }
        assert_eq!(gateway.calls_for(&url), 1);
        assert!(clock.slept().is_empty());
    }

    #[test]
    fn status_429_is_retried() {
        let gateway = Arc::new(ScriptedGateway::new());
        let url = endpoints::unit_url("http://test", UnitKind::Player, 660271);
        gateway.stub(&url, ScriptedReply::Status(429));
        gateway.stub_json(&url, json!({"people": []}));

        let (client, _clock) = client_with(gateway.clone(), test_config(0));
        assert!(client.fetch(UnitKind::Player, 660271).is_ok());
        assert_eq!(gateway.calls_for(&url), 2);
    }

    #[test]
    fn invalid_json_body_is_permanent() {
        let gateway = Arc::new(ScriptedGateway::new());
        let url = endpoints::unit_url("http://test", UnitKind::Team, 1);
        gateway.stub(&url, ScriptedReply::Raw(200, "<html>downtime</html>".to_string()));

        let (client, _clock) = client_with(gateway.clone(), test_config(0));
        let err = client.fetch(UnitKind::Team, 1).unwrap_err();
        assert_eq!(err.category(), "permanent");
        assert_eq!(gateway.calls_for(&url), 1);
    }

    #[test]
    fn throttle_spaces_consecutive_fetches() {
        let gateway = Arc::new(ScriptedGateway::new());
        let url = endpoints::unit_url("http://test", UnitKind::Team, 119);
        gateway.stub_json(&url, json!({"teams": []}));

        let (client, clock) = client_with(gateway.clone(), test_config(100));
        for _ in 0..5 {
            client.fetch(UnitKind::Team, 119).unwrap();
        }
        // first request free, four waits of the full interval
        assert_eq!(clock.total_slept(), Duration::from_millis(400));
        assert_eq!(gateway.calls_for(&url), 5);
    }

    /// Gateway wrapper whose calls take visible time on the virtual clock
    struct SlowGateway {
        inner: Arc<ScriptedGateway>,
        clock: Arc<ManualClock>,
        latency: Duration,
    }

    impl HttpGateway for SlowGateway {
        fn get(&self, url: &str) -> Result<GatewayResponse> {
            self.clock.advance(self.latency);
            self.inner.get(url)
        }
    }

    #[test]
    fn interval_runs_from_request_completion() {
        let scripted = Arc::new(ScriptedGateway::new());
        let url = endpoints::unit_url("http://test", UnitKind::Team, 119);
        scripted.stub_json(&url, json!({"teams": []}));

        let clock = Arc::new(ManualClock::new());
        let gateway = SlowGateway {
            inner: scripted.clone(),
            clock: clock.clone(),
            latency: Duration::from_millis(250),
        };
        let client = StatsClient::with_clock(gateway, test_config(100), Box::new(clock.clone()));
        client.fetch(UnitKind::Team, 119).unwrap();
        client.fetch(UnitKind::Team, 119).unwrap();

        // a first call slower than the interval does not discount the
        // second call's wait
        assert_eq!(clock.slept(), vec![Duration::from_millis(100)]);
        assert_eq!(scripted.calls_for(&url), 2);
    }

    #[test]
    fn failed_attempts_advance_the_throttle() {
        let gateway = Arc::new(ScriptedGateway::new());
        let bad = endpoints::unit_url("http://test", UnitKind::Game, 7);
        let good = endpoints::unit_url("http://test", UnitKind::Team, 119);
        gateway.stub(&bad, ScriptedReply::Status(404));
        gateway.stub_json(&good, json!({"teams": []}));

        let config = test_config(100).with_retry(RetryPolicy::no_retry());
        let (client, clock) = client_with(gateway.clone(), config);
        assert!(client.fetch(UnitKind::Game, 7).is_err());
        client.fetch(UnitKind::Team, 119).unwrap();
        // second request had to wait out the interval stamped by the failure
        assert_eq!(clock.slept(), vec![Duration::from_millis(100)]);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(800),
        };
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(800));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(800));
        // attempt 0 treated as the first attempt
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(500));
    }
}
