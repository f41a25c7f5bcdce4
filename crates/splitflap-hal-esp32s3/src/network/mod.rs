//! Wi-Fi station link and outbound HTTP over esp-radio + embassy-net.

use core::{
    net::Ipv4Addr,
    sync::atomic::{AtomicU8, Ordering},
};

use embassy_net::Stack;
use esp_radio::wifi::{
    ClientConfig, ModeConfig, PowerSaveMode, WifiController, WifiError,
    event::{self, EventExt},
};
use log::{debug, info, warn};
use splitflap_core::link::{LinkDriver, LinkStatus, WifiCredentials};

pub mod client;

/// Last station disconnect reason from the driver event; 0 when none.
static LAST_DISCONNECT_REASON: AtomicU8 = AtomicU8::new(0);

/// [`LinkDriver`] over the station interface.
///
/// "Connected" means associated, link up and holding a DHCP lease; the
/// consumers need an address, not just an association.
pub struct EspWifiLink<'d> {
    controller: WifiController<'d>,
    stack: Stack<'d>,
    configured: bool,
    attempted: bool,
    was_connected: bool,
}

impl<'d> EspWifiLink<'d> {
    pub fn new(controller: WifiController<'d>, stack: Stack<'d>) -> Self {
        event::StaDisconnected::update_handler(|event| {
            LAST_DISCONNECT_REASON.store(event.reason(), Ordering::Relaxed);
        });
        Self {
            controller,
            stack,
            configured: false,
            attempted: false,
            was_connected: false,
        }
    }

    pub fn stack(&self) -> Stack<'d> {
        self.stack
    }

    fn configure(&mut self, credentials: &WifiCredentials) -> Result<(), WifiError> {
        if self.configured {
            return Ok(());
        }
        let client_config = ClientConfig::default()
            .with_ssid(credentials.ssid.into())
            .with_password(credentials.password.into());
        self.controller
            .set_config(&ModeConfig::Client(client_config))?;
        self.configured = true;
        Ok(())
    }

    fn ensure_started(&mut self) -> Result<(), WifiError> {
        if self.controller.is_started().unwrap_or(false) {
            return Ok(());
        }
        self.controller.start()?;
        if let Err(err) = self.controller.set_power_saving(PowerSaveMode::None) {
            warn!("wifi: power save disable failed: {:?}", err);
        }
        info!("wifi: station started");
        Ok(())
    }
}

impl LinkDriver for EspWifiLink<'_> {
    type Error = WifiError;

    fn begin(&mut self, credentials: &WifiCredentials) -> Result<(), Self::Error> {
        self.configure(credentials)?;
        self.ensure_started()?;

        if matches!(self.controller.is_connected(), Ok(true)) {
            let _ = self.controller.disconnect();
        }
        LAST_DISCONNECT_REASON.store(0, Ordering::Relaxed);
        self.controller.connect()?;
        self.attempted = true;
        self.was_connected = false;
        Ok(())
    }

    fn status(&mut self) -> LinkStatus {
        if !self.attempted || !self.controller.is_started().unwrap_or(false) {
            return LinkStatus::Idle;
        }

        let associated = matches!(self.controller.is_connected(), Ok(true));
        if associated && self.stack.is_link_up() && self.stack.config_v4().is_some() {
            self.was_connected = true;
            return LinkStatus::Connected;
        }

        if self.was_connected {
            self.was_connected = false;
            return LinkStatus::ConnectionLost;
        }

        let reason = LAST_DISCONNECT_REASON.load(Ordering::Relaxed);
        let status = LinkStatus::from_disconnect_reason(reason);
        if status != LinkStatus::Disconnected {
            debug!("wifi: station disconnected, reason={}", reason);
        }
        status
    }

    fn local_address(&self) -> Option<Ipv4Addr> {
        self.stack
            .config_v4()
            .map(|config| config.address.address())
    }
}
