use core::net::Ipv4Addr;

use super::{LinkDriver, LinkStatus, WifiCredentials};

/// Host-side link whose status is set by the caller, used for bring-up and tests.
#[derive(Debug, Clone)]
pub struct ScriptedLink {
    status: LinkStatus,
    address: Option<Ipv4Addr>,
    fail_begin: bool,
    begin_calls: u32,
}

impl ScriptedLink {
    pub const fn new() -> Self {
        Self {
            status: LinkStatus::Idle,
            address: None,
            fail_begin: false,
            begin_calls: 0,
        }
    }

    pub fn set_status(&mut self, status: LinkStatus) {
        self.status = status;
    }

    pub fn set_address(&mut self, address: Option<Ipv4Addr>) {
        self.address = address;
    }

    /// Makes every following `begin` call report a driver error.
    pub fn fail_begin(&mut self, fail: bool) {
        self.fail_begin = fail;
    }

    pub fn begin_calls(&self) -> u32 {
        self.begin_calls
    }
}

impl Default for ScriptedLink {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ScriptedLinkError;

impl LinkDriver for ScriptedLink {
    type Error = ScriptedLinkError;

    fn begin(&mut self, _credentials: &WifiCredentials) -> Result<(), Self::Error> {
        self.begin_calls = self.begin_calls.saturating_add(1);
        if self.fail_begin {
            return Err(ScriptedLinkError);
        }
        Ok(())
    }

    fn status(&mut self) -> LinkStatus {
        self.status
    }

    fn local_address(&self) -> Option<Ipv4Addr> {
        self.address
    }
}
