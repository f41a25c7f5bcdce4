//! Platform-independent core of the split-flap firmware: task registration,
//! the Wi-Fi connectivity state machine, readiness-gated consumers and the
//! status slots they report through.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod config;
pub mod connectivity;
pub mod fetch;
pub mod http;
pub mod link;
pub mod runtime;
pub mod status;
pub mod weather;
pub mod web;
