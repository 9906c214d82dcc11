//! The usage recorder: wraps calls, counts them, samples and ships usage records.

use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::counter::MethodCounter;
use super::environment::{hash_hostname, BackendVersion, EnvironmentAttributes};
use super::method::{CallArguments, MethodRef};
use super::record::{UsagePayload, UsageRecord};
use super::version_source::VersionSource;
use crate::config::{usage_allowed, UsageConfig, USAGE_ENABLED_ENV_VAR};
use crate::utils::log_throttle::LogThrottle;

const FAILURE_LOG_WINDOW: Duration = Duration::from_secs(60);

/// Mutable recorder state, replaced wholesale by `init`/`reset`.
#[derive(Debug)]
struct UsageState {
    env: EnvironmentAttributes,
    counter: MethodCounter,
}

/// What went wrong in a failed call, as it will appear in the record.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Failure {
    message: String,
    stack_trace: String,
}

impl Failure {
    /// The error's `Debug` form stands in for a stack trace; a backtrace taken
    /// here would only show the recorder's own frames.
    fn from_error<E: fmt::Display + fmt::Debug>(error: &E) -> Self {
        Self {
            message: error.to_string(),
            stack_trace: format!("{:?}", error),
        }
    }
}

/// Records SDK method usage and posts sampled records to the collection endpoint.
pub struct UsageRecorder {
    config: UsageConfig,
    enabled: bool,
    http: reqwest::Client,
    sources: Vec<Box<dyn VersionSource>>,
    state: Mutex<UsageState>,
    backend_version: BackendVersion,
    throttle: LogThrottle,
}

impl fmt::Debug for UsageRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UsageRecorder")
            .field("config", &self.config)
            .field("enabled", &self.enabled)
            .field("sources", &self.sources.len())
            .finish()
    }
}

impl UsageRecorder {
    /// `ENABLE_HOPSWORKS_USAGE` is read here, once; any value but "true" turns
    /// the recorder off whatever the config says.
    pub fn new(config: UsageConfig) -> Self {
        let enabled = usage_allowed(
            config.enabled,
            std::env::var(USAGE_ENABLED_ENV_VAR).ok().as_deref(),
        );
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.post_timeout_in_ms))
            .build()
            .unwrap_or_default();
        let state = UsageState {
            env: EnvironmentAttributes::new(config.dir.clone(), None),
            counter: MethodCounter::new(),
        };
        Self {
            config,
            enabled,
            http,
            sources: Vec::new(),
            state: Mutex::new(state),
            backend_version: BackendVersion::new(),
            throttle: LogThrottle::new(FAILURE_LOG_WINDOW),
        }
    }

    /// Sources asked, in order, for the backend version.
    pub fn with_version_sources(mut self, sources: Vec<Box<dyn VersionSource>>) -> Self {
        self.sources = sources;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn config(&self) -> &UsageConfig {
        &self.config
    }

    /// Starts a fresh session against `hostname`: counters, sampling draws and
    /// cached environment facts all start over.
    pub fn init(&self, hostname: Option<&str>) {
        self.replace_state(hostname.map(str::to_string));
    }

    /// Like `init`, keeping the current backend hostname.
    pub fn reset(&self) {
        let hostname = self.lock_state().env.backend_hostname().map(str::to_string);
        self.replace_state(hostname);
    }

    fn replace_state(&self, hostname: Option<String>) {
        *self.lock_state() = UsageState {
            env: EnvironmentAttributes::new(self.config.dir.clone(), hostname),
            counter: MethodCounter::new(),
        };
        self.backend_version.clear();
        self.throttle.clear();
    }

    /// Number of recorded calls of `method` since the last `init`/`reset`.
    pub fn call_count(&self, method: &MethodRef) -> u64 {
        self.lock_state().counter.get_count(method)
    }

    /// Runs `call` and records it. The call's result is handed back untouched;
    /// failures of the recorder itself are only logged.
    ///
    /// With usage disabled this is just `call().await`.
    pub async fn instrument<T, E, F, Fut>(
        &self,
        method: MethodRef,
        arguments: CallArguments,
        call: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display + fmt::Debug,
    {
        if !self.enabled {
            return call().await;
        }

        let started = Instant::now();
        let result = call().await;
        let execution_time = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let failure = result.as_ref().err().map(Failure::from_error);
        self.observe(&method, &arguments, execution_time, failure)
            .await;
        result
    }

    async fn observe(
        &self,
        method: &MethodRef,
        arguments: &CallArguments,
        execution_time: u64,
        failure: Option<Failure>,
    ) {
        let record = {
            let mut state = self.lock_state();
            let num_call = state.counter.add(method);
            // failures are always emitted and do not consume a draw
            let emit = failure.is_some() || state.counter.should_sample(method);
            if !emit {
                return;
            }
            let user_id = match state.env.user_id() {
                Ok(id) => id,
                Err(e) => {
                    self.log_failure("usage.user_id.failed", &e);
                    return;
                }
            };
            UsageRecord {
                user_id,
                datetime: state.env.datetime(),
                backend_hostname: hash_hostname(state.env.backend_hostname()),
                backend_version: None,
                platform: state.env.platform(),
                sdk_version: state.env.sdk_version().to_string(),
                method_name: method.name.to_string(),
                module_name: method.module.to_string(),
                arguments: arguments.to_string(),
                execution_time,
                num_call,
                last_error: failure.as_ref().map(|f| f.message.clone()),
                stack_trace: failure.map(|f| f.stack_trace),
            }
        };

        let record = UsageRecord {
            backend_version: self.backend_version.get(&self.sources).await,
            ..record
        };
        self.send(&record).await;
    }

    /// Fire-and-forget POST; the response status is not checked.
    async fn send(&self, record: &UsageRecord) {
        let payload = UsagePayload::from(record);
        debug!(
            event_name = "usage.record.send",
            event_domain = "usage",
            method_name = record.method_name.as_str(),
            num_call = record.num_call,
            "data: {}",
            serde_json::to_string(&payload).unwrap_or_default()
        );

        match self.http.post(&self.config.endpoint).json(&payload).send().await {
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                debug!(status = status.as_u16(), "usage endpoint answered: {}", body);
            }
            Err(e) => self.log_failure("usage.send.failed", &e),
        }
    }

    fn log_failure(&self, event_name: &str, error: &dyn fmt::Display) {
        if let Some(suppressed_count) = self.throttle.should_emit(event_name) {
            warn!(
                event_name,
                event_domain = "usage",
                suppressed_count,
                "usage recording failed: {}",
                error
            );
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, UsageState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
