//! Scheduling for the data-fetch task.
//!
//! The scheduler never performs I/O itself: the task asks it what to do next
//! with [`FetchScheduler::begin_cycle`], runs the request when told to, and
//! hands the outcome back through [`FetchScheduler::complete_fetch`].

use log::{info, warn};

use crate::{
    http::{HttpResponse, RequestError},
    status::{SlotId, StatusSink, set_status_fmt},
    weather::{FlapMessage, FlapMessages, WeatherSummary, summarize_response},
};

const STALE_TEXT: &str = "stale";
const STALE_STATUS: &str = "Data: stale";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FetchError {
    Transport(RequestError),
    Status(u16),
    Malformed,
    NoData,
}

impl FetchError {
    pub fn label(self) -> &'static str {
        match self {
            Self::Transport(_) => "request failed",
            Self::Status(_) => "bad status",
            Self::Malformed => "malformed response",
            Self::NoData => "no data",
        }
    }
}

impl From<RequestError> for FetchError {
    fn from(value: RequestError) -> Self {
        Self::Transport(value)
    }
}

/// Turns a completed HTTP exchange into a summary or a fetch failure.
pub fn summarize_http(response: HttpResponse<'_>) -> Result<WeatherSummary, FetchError> {
    if !response.is_success() {
        return Err(FetchError::Status(response.status));
    }
    summarize_response(response.body)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FetchConfig {
    pub request_interval_ms: u64,
    pub stale_after_ms: u64,
    pub tick_ms: u64,
    pub not_ready_backoff_ms: u64,
    pub wait_notice_interval_ms: u64,
    pub message_cycle_ms: u64,
}

impl FetchConfig {
    pub const fn new() -> Self {
        Self {
            request_interval_ms: 600_000,
            stale_after_ms: 3 * 600_000,
            tick_ms: 1_000,
            not_ready_backoff_ms: 5_000,
            wait_notice_interval_ms: 30_000,
            message_cycle_ms: 4_000,
        }
    }

    /// Also moves the stale threshold to three intervals.
    pub const fn with_request_interval_ms(mut self, request_interval_ms: u64) -> Self {
        self.request_interval_ms = request_interval_ms;
        self.stale_after_ms = 3 * request_interval_ms;
        self
    }

    pub const fn with_stale_after_ms(mut self, stale_after_ms: u64) -> Self {
        self.stale_after_ms = stale_after_ms;
        self
    }

    pub const fn with_message_cycle_ms(mut self, message_cycle_ms: u64) -> Self {
        self.message_cycle_ms = message_cycle_ms;
        self
    }

    pub const fn with_not_ready_backoff_ms(mut self, not_ready_backoff_ms: u64) -> Self {
        self.not_ready_backoff_ms = not_ready_backoff_ms;
        self
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CycleAction {
    /// Not ready; sleep and ask again.
    WaitForNetwork { delay_ms: u64 },
    Fetch,
    Idle { delay_ms: u64 },
}

pub struct FetchScheduler {
    config: FetchConfig,
    last_request: Option<u64>,
    last_success: Option<u64>,
    last_wait_notice: Option<u64>,
    stale: bool,
    failures: u32,
    rotation: FlapMessages,
    rotation_index: usize,
    last_rotation: Option<u64>,
}

impl FetchScheduler {
    pub fn new(config: FetchConfig) -> Self {
        Self {
            config,
            last_request: None,
            last_success: None,
            last_wait_notice: None,
            stale: false,
            failures: 0,
            rotation: FlapMessages::new(),
            rotation_index: 0,
            last_rotation: None,
        }
    }

    pub fn config(&self) -> FetchConfig {
        self.config
    }

    pub fn last_request(&self) -> Option<u64> {
        self.last_request
    }

    pub fn last_success(&self) -> Option<u64> {
        self.last_success
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn flap_messages(&self) -> &[FlapMessage] {
        &self.rotation
    }

    pub fn fetch_due(&self, now_ms: u64) -> bool {
        match self.last_request {
            None => true,
            Some(at) => now_ms.saturating_sub(at) >= self.config.request_interval_ms,
        }
    }

    pub fn begin_cycle<S: StatusSink + ?Sized>(
        &mut self,
        now_ms: u64,
        ready: bool,
        sink: &S,
    ) -> CycleAction {
        if !ready {
            let notice_due = self.last_wait_notice.is_none_or(|at| {
                now_ms.saturating_sub(at) >= self.config.wait_notice_interval_ms
            });
            if notice_due {
                info!("fetch: waiting for WiFi");
                sink.set_status(SlotId::DataSummary, "Waiting for WiFi");
                self.last_wait_notice = Some(now_ms);
            }
            return CycleAction::WaitForNetwork {
                delay_ms: self.config.not_ready_backoff_ms,
            };
        }

        self.last_wait_notice = None;
        if self.fetch_due(now_ms) {
            CycleAction::Fetch
        } else {
            CycleAction::Idle {
                delay_ms: self.config.tick_ms,
            }
        }
    }

    /// Records the outcome of the request started by the last
    /// [`CycleAction::Fetch`].
    pub fn complete_fetch<S: StatusSink + ?Sized>(
        &mut self,
        now_ms: u64,
        outcome: Result<WeatherSummary, FetchError>,
        sink: &S,
    ) {
        self.last_request = Some(now_ms);
        match outcome {
            Ok(summary) => {
                self.last_success = Some(now_ms);
                if self.stale {
                    info!("fetch: data fresh again");
                }
                self.stale = false;
                self.start_rotation(summary.flap_messages());
                sink.set_status(SlotId::DataSummary, summary.summary_line().as_str());
            }
            Err(err) => {
                self.failures = self.failures.saturating_add(1);
                warn!("fetch: failed ({}): {:?}", self.failures, err);
                if self.stale {
                    sink.set_status(SlotId::DataSummary, STALE_STATUS);
                } else {
                    set_status_fmt(
                        sink,
                        SlotId::DataSummary,
                        format_args!("Data: {}", err.label()),
                    );
                }
            }
        }
    }

    /// Staleness check and flap rotation; cheap enough for every tick.
    pub fn refresh_presentation<S: StatusSink + ?Sized>(&mut self, now_ms: u64, sink: &S) {
        if let Some(at) = self.last_success
            && !self.stale
            && now_ms.saturating_sub(at) > self.config.stale_after_ms
        {
            warn!("fetch: data is stale, last success at {} ms", at);
            self.stale = true;
            let mut stale = FlapMessages::new();
            let _ = stale.push(FlapMessage::try_from(STALE_TEXT).unwrap_or_default());
            self.start_rotation(stale);
            sink.set_status(SlotId::DataSummary, STALE_STATUS);
        }

        if self.rotation.is_empty() {
            return;
        }
        let rotate_due = self
            .last_rotation
            .is_none_or(|at| now_ms.saturating_sub(at) >= self.config.message_cycle_ms);
        if rotate_due {
            let index = self.rotation_index % self.rotation.len();
            sink.set_status(SlotId::Flaps, self.rotation[index].as_str());
            self.rotation_index = (index + 1) % self.rotation.len();
            self.last_rotation = Some(now_ms);
        }
    }

    fn start_rotation(&mut self, messages: FlapMessages) {
        self.rotation = messages;
        self.rotation_index = 0;
        self.last_rotation = None;
    }
}

#[cfg(test)]
mod tests;
