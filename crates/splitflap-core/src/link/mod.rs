//! Wireless link driver abstraction.

use core::net::Ipv4Addr;

pub mod mock;

/// Raw status reported by the radio driver.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LinkStatus {
    Idle,
    NoTarget,
    Connected,
    ConnectFailed,
    ConnectionLost,
    Disconnected,
}

impl LinkStatus {
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Maps a station disconnect reason code to the status it implies for
    /// an attempt that never came up. `0` means no reason was recorded.
    pub const fn from_disconnect_reason(reason: u8) -> Self {
        match reason {
            0 => Self::Disconnected,
            REASON_NO_AP_FOUND
            | REASON_NO_AP_FOUND_COMPAT_SECURITY
            | REASON_NO_AP_FOUND_AUTHMODE_THRESHOLD
            | REASON_NO_AP_FOUND_RSSI_THRESHOLD => Self::NoTarget,
            REASON_4WAY_HANDSHAKE_TIMEOUT
            | REASON_AUTH_FAIL
            | REASON_ASSOC_FAIL
            | REASON_HANDSHAKE_TIMEOUT
            | REASON_CONNECTION_FAIL => Self::ConnectFailed,
            _ => Self::Disconnected,
        }
    }
}

// 802.11 and esp-wifi station disconnect reasons.
pub const REASON_4WAY_HANDSHAKE_TIMEOUT: u8 = 15;
pub const REASON_NO_AP_FOUND: u8 = 201;
pub const REASON_AUTH_FAIL: u8 = 202;
pub const REASON_ASSOC_FAIL: u8 = 203;
pub const REASON_HANDSHAKE_TIMEOUT: u8 = 204;
pub const REASON_CONNECTION_FAIL: u8 = 205;
pub const REASON_NO_AP_FOUND_COMPAT_SECURITY: u8 = 210;
pub const REASON_NO_AP_FOUND_AUTHMODE_THRESHOLD: u8 = 211;
pub const REASON_NO_AP_FOUND_RSSI_THRESHOLD: u8 = 212;

/// Station credentials baked in at build time.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WifiCredentials {
    pub ssid: &'static str,
    pub password: &'static str,
}

impl WifiCredentials {
    pub const fn new(ssid: &'static str, password: &'static str) -> Self {
        Self { ssid, password }
    }
}

/// Polled link driver. None of the calls may block on the network.
pub trait LinkDriver {
    type Error: core::fmt::Debug;

    /// Starts an association attempt; completion is observed through `status`.
    fn begin(&mut self, credentials: &WifiCredentials) -> Result<(), Self::Error>;
    fn status(&mut self) -> LinkStatus;
    fn local_address(&self) -> Option<Ipv4Addr>;
}
