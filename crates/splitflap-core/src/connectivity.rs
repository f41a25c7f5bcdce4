//! Wi-Fi connectivity state machine and the lock-free readiness handle that
//! consumer tasks poll.
//!
//! The machine is owned by the connectivity task and is the only writer of
//! its [`ConnectivityHandle`]. Every other task only reads the handle, so the
//! state lives in a single atomic byte and no lock is ever taken.

use core::{
    net::Ipv4Addr,
    sync::atomic::{AtomicU8, AtomicU32, Ordering},
};

use log::{info, warn};

use crate::{
    link::{LinkDriver, LinkStatus, WifiCredentials},
    status::{SlotId, StatusMessage, StatusSink, format_message, set_status_fmt},
};

/// Link lifecycle as seen by consumers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum ConnectivityState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    Ready = 3,
    Error = 4,
}

impl ConnectivityState {
    pub const ALL: [Self; 5] = [
        Self::Disconnected,
        Self::Connecting,
        Self::Connected,
        Self::Ready,
        Self::Error,
    ];

    fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::Ready,
            4 => Self::Error,
            _ => Self::Disconnected,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Ready => "ready",
            Self::Error => "error",
        }
    }

    /// The complete edge set of the machine.
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Disconnected, Self::Connecting)
                | (Self::Connecting, Self::Connected)
                | (Self::Connecting, Self::Disconnected)
                | (Self::Connecting, Self::Error)
                | (Self::Connected, Self::Disconnected)
                | (Self::Connected, Self::Ready)
                | (Self::Ready, Self::Disconnected)
                | (Self::Error, Self::Disconnected)
        )
    }
}

/// What "ready" means for consumers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReadinessPolicy {
    /// No secondary step: Connected already counts as ready and the machine
    /// moves on to Ready at the next poll.
    ConnectedIsReady,
    /// Ready additionally requires an auxiliary condition (e.g. time sync)
    /// reported to [`ConnectivityMachine::poll`].
    AwaitAuxiliary,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ConnectivityConfig {
    pub retry_interval_ms: u64,
    pub poll_interval_ms: u64,
    pub status_push_interval_ms: u64,
}

impl ConnectivityConfig {
    pub const fn new() -> Self {
        Self {
            retry_interval_ms: 10_000,
            poll_interval_ms: 1_000,
            status_push_interval_ms: 5_000,
        }
    }

    pub const fn with_retry_interval_ms(mut self, retry_interval_ms: u64) -> Self {
        self.retry_interval_ms = retry_interval_ms;
        self
    }

    pub const fn with_poll_interval_ms(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    pub const fn with_status_push_interval_ms(mut self, status_push_interval_ms: u64) -> Self {
        self.status_push_interval_ms = status_push_interval_ms;
        self
    }

    /// Dwell time in Error before another attempt is allowed.
    pub const fn error_cooldown_ms(&self) -> u64 {
        self.retry_interval_ms.saturating_mul(2)
    }
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable connectivity snapshot for status rendering and logs.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ConnectivitySnapshot {
    pub state: ConnectivityState,
    pub ready: bool,
    pub revision: u32,
}

/// Lock-free shared connectivity state. Single writer, any number of readers.
#[derive(Debug)]
pub struct ConnectivityHandle {
    state: AtomicU8,
    revision: AtomicU32,
    policy: ReadinessPolicy,
}

impl ConnectivityHandle {
    pub const fn new(policy: ReadinessPolicy) -> Self {
        Self {
            state: AtomicU8::new(ConnectivityState::Disconnected as u8),
            revision: AtomicU32::new(0),
            policy,
        }
    }

    pub fn state(&self) -> ConnectivityState {
        ConnectivityState::from_raw(self.state.load(Ordering::Acquire))
    }

    pub fn is_ready(&self) -> bool {
        Self::ready_in(self.policy, self.state())
    }

    pub fn is_connected(&self) -> bool {
        matches!(
            self.state(),
            ConnectivityState::Connected | ConnectivityState::Ready
        )
    }

    pub fn policy(&self) -> ReadinessPolicy {
        self.policy
    }

    /// Bumped on every state change.
    pub fn revision(&self) -> u32 {
        self.revision.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> ConnectivitySnapshot {
        let state = self.state();
        ConnectivitySnapshot {
            state,
            ready: Self::ready_in(self.policy, state),
            revision: self.revision(),
        }
    }

    const fn ready_in(policy: ReadinessPolicy, state: ConnectivityState) -> bool {
        match policy {
            ReadinessPolicy::ConnectedIsReady => matches!(
                state,
                ConnectivityState::Connected | ConnectivityState::Ready
            ),
            ReadinessPolicy::AwaitAuxiliary => matches!(state, ConnectivityState::Ready),
        }
    }

    fn publish(&self, next: ConnectivityState) {
        if self.state.swap(next as u8, Ordering::AcqRel) != next as u8 {
            self.revision.fetch_add(1, Ordering::AcqRel);
        }
    }
}

/// Human-readable line for the connectivity status slot.
pub fn link_status_message(
    status: LinkStatus,
    ssid: &str,
    address: Option<Ipv4Addr>,
) -> StatusMessage {
    match status {
        LinkStatus::Idle => format_message(format_args!("WiFi: Idle")),
        LinkStatus::NoTarget => format_message(format_args!("WiFi: No SSID")),
        LinkStatus::Connected => match address {
            Some(address) => format_message(format_args!("WiFi: {} {}", ssid, address)),
            None => format_message(format_args!("WiFi: {}", ssid)),
        },
        LinkStatus::ConnectFailed => format_message(format_args!("WiFi: Connection failed")),
        LinkStatus::ConnectionLost => format_message(format_args!("WiFi: Connection lost")),
        LinkStatus::Disconnected => format_message(format_args!("WiFi: Disconnected")),
    }
}

pub struct ConnectivityMachine<'a> {
    handle: &'a ConnectivityHandle,
    config: ConnectivityConfig,
    credentials: WifiCredentials,
    state: ConnectivityState,
    last_attempt_ms: Option<u64>,
    error_since_ms: u64,
    last_status_push_ms: Option<u64>,
    last_link_status: LinkStatus,
}

impl<'a> ConnectivityMachine<'a> {
    pub fn new(
        handle: &'a ConnectivityHandle,
        config: ConnectivityConfig,
        credentials: WifiCredentials,
    ) -> Self {
        handle.publish(ConnectivityState::Disconnected);
        Self {
            handle,
            config,
            credentials,
            state: ConnectivityState::Disconnected,
            last_attempt_ms: None,
            error_since_ms: 0,
            last_status_push_ms: None,
            last_link_status: LinkStatus::Idle,
        }
    }

    pub fn state(&self) -> ConnectivityState {
        self.state
    }

    pub fn config(&self) -> &ConnectivityConfig {
        &self.config
    }

    pub fn last_link_status(&self) -> LinkStatus {
        self.last_link_status
    }

    /// One iteration of the connectivity task: observe the link, push the
    /// status line if its own timer is due, then apply at most one edge of
    /// the transition table (a failed connection request additionally drops
    /// the fresh Connecting state into Error).
    pub fn poll<L, S>(
        &mut self,
        now_ms: u64,
        link: &mut L,
        auxiliary_ready: bool,
        sink: &S,
    ) -> ConnectivityState
    where
        L: LinkDriver,
        S: StatusSink + ?Sized,
    {
        let status = link.status();
        self.last_link_status = status;

        self.push_status_if_due(now_ms, status, link.local_address(), sink);

        match self.next_state(now_ms, status, auxiliary_ready) {
            Some(ConnectivityState::Connecting) => self.start_attempt(now_ms, link, sink),
            Some(ConnectivityState::Error) => self.enter_error(now_ms),
            Some(next) => {
                if next == ConnectivityState::Disconnected && self.state != ConnectivityState::Error
                {
                    self.log_disconnect(status);
                }
                self.transition(next);
            }
            None => {}
        }

        self.state
    }

    fn next_state(
        &self,
        now_ms: u64,
        status: LinkStatus,
        auxiliary_ready: bool,
    ) -> Option<ConnectivityState> {
        let retry_ms = self.config.retry_interval_ms;
        match self.state {
            ConnectivityState::Disconnected => {
                let due = self
                    .last_attempt_ms
                    .is_none_or(|last| now_ms.saturating_sub(last) > retry_ms);
                due.then_some(ConnectivityState::Connecting)
            }
            ConnectivityState::Connecting => {
                if status.is_connected() {
                    Some(ConnectivityState::Connected)
                } else if status == LinkStatus::ConnectFailed {
                    Some(ConnectivityState::Error)
                } else if self
                    .last_attempt_ms
                    .is_some_and(|last| now_ms.saturating_sub(last) > retry_ms)
                {
                    Some(ConnectivityState::Disconnected)
                } else {
                    None
                }
            }
            ConnectivityState::Connected => {
                if !status.is_connected() {
                    Some(ConnectivityState::Disconnected)
                } else if self.readiness_met(auxiliary_ready) {
                    Some(ConnectivityState::Ready)
                } else {
                    None
                }
            }
            ConnectivityState::Ready => {
                (!status.is_connected()).then_some(ConnectivityState::Disconnected)
            }
            ConnectivityState::Error => (now_ms.saturating_sub(self.error_since_ms)
                > self.config.error_cooldown_ms())
            .then_some(ConnectivityState::Disconnected),
        }
    }

    fn readiness_met(&self, auxiliary_ready: bool) -> bool {
        match self.handle.policy() {
            ReadinessPolicy::ConnectedIsReady => true,
            ReadinessPolicy::AwaitAuxiliary => auxiliary_ready,
        }
    }

    fn start_attempt<L, S>(&mut self, now_ms: u64, link: &mut L, sink: &S)
    where
        L: LinkDriver,
        S: StatusSink + ?Sized,
    {
        self.last_attempt_ms = Some(now_ms);
        self.transition(ConnectivityState::Connecting);

        info!("wifi: establishing connection to {}", self.credentials.ssid);
        set_status_fmt(
            sink,
            SlotId::Connectivity,
            format_args!("WiFi connecting to {}", self.credentials.ssid),
        );

        if let Err(err) = link.begin(&self.credentials) {
            warn!("wifi: connection request failed: {:?}", err);
            self.enter_error(now_ms);
        }
    }

    fn enter_error(&mut self, now_ms: u64) {
        self.error_since_ms = now_ms;
        self.transition(ConnectivityState::Error);
        info!(
            "wifi: retrying after {}ms cooldown",
            self.config.error_cooldown_ms()
        );
    }

    fn log_disconnect(&self, status: LinkStatus) {
        match self.state {
            ConnectivityState::Connecting => info!("wifi: connection timeout, retrying..."),
            _ => info!("wifi: connection lost (link={:?})", status),
        }
    }

    fn transition(&mut self, next: ConnectivityState) {
        debug_assert!(self.state.can_transition_to(next));
        info!("wifi: {} -> {}", self.state.label(), next.label());
        self.state = next;
        self.handle.publish(next);
    }

    fn push_status_if_due<S: StatusSink + ?Sized>(
        &mut self,
        now_ms: u64,
        status: LinkStatus,
        address: Option<Ipv4Addr>,
        sink: &S,
    ) {
        let interval = self.config.status_push_interval_ms;
        if self
            .last_status_push_ms
            .is_some_and(|last| now_ms.saturating_sub(last) <= interval)
        {
            return;
        }

        let message = link_status_message(status, self.credentials.ssid, address);
        sink.set_status(SlotId::Connectivity, message.as_str());
        self.last_status_push_ms = Some(now_ms);
    }
}
