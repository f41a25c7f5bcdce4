//! Device web interface: lifecycle flag, request routing and page rendering.
//!
//! The socket loop lives in the firmware task. This module decides whether
//! the server may run and what each route answers.

use alloc::{format, string::String};
use core::{
    fmt::Write,
    net::Ipv4Addr,
    sync::atomic::{AtomicBool, Ordering},
};

use heapless::String as HeaplessString;
use log::info;
use serde::Serialize;

use crate::connectivity::ConnectivityHandle;

pub const SERVER_PORT: u16 = 80;
pub const DEVICE_NAME: &str = "Splitflap Display";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WebError {
    NotConnected,
}

/// Running flag shared between whoever starts the server and the task
/// serving it.
pub struct WebServerControl {
    running: AtomicBool,
}

impl WebServerControl {
    pub const fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
        }
    }

    /// Refuses to start without a ready link. Starting twice is a no-op.
    pub fn begin(&self, connectivity: &ConnectivityHandle) -> Result<(), WebError> {
        if self.is_running() {
            info!("web: already running");
            return Ok(());
        }
        if !connectivity.is_ready() {
            info!("web: WiFi not connected");
            return Err(WebError::NotConnected);
        }
        self.running.store(true, Ordering::Release);
        info!("web: started on port {}", SERVER_PORT);
        Ok(())
    }

    /// Returns whether the server was running. The serving task finishes its
    /// current connection before releasing its socket.
    pub fn stop(&self) -> bool {
        let was_running = self.running.swap(false, Ordering::AcqRel);
        if was_running {
            info!("web: stopped");
        }
        was_running
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub const fn port(&self) -> u16 {
        SERVER_PORT
    }
}

impl Default for WebServerControl {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Request<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub query: Option<&'a str>,
}

impl<'a> Request<'a> {
    /// `name=value` pairs of the query string; a bare name has an empty value.
    pub fn args(&self) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.query
            .into_iter()
            .flat_map(|query| query.split('&'))
            .filter(|pair| !pair.is_empty())
            .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
    }
}

/// Parses the first line of a request head.
pub fn parse_request_line(head: &str) -> Option<Request<'_>> {
    let line = head.lines().next()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?;
    let target = parts.next()?;
    if !target.starts_with('/') {
        return None;
    }
    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target, None),
    };
    Some(Request {
        method,
        path,
        query,
    })
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Route {
    Root,
    Status,
    Api,
    NotFound,
}

impl Route {
    /// Routes match on path alone, for any method.
    pub fn resolve(path: &str) -> Self {
        match path {
            "/" => Self::Root,
            "/status" => Self::Status,
            "/api" => Self::Api,
            _ => Self::NotFound,
        }
    }
}

/// Snapshot of device facts taken when a request is served.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DeviceInfo {
    pub ip: Option<Ipv4Addr>,
    pub mac: Option<[u8; 6]>,
    pub rssi_dbm: Option<i8>,
    pub free_heap_bytes: usize,
    pub uptime_ms: u64,
}

impl DeviceInfo {
    fn ip_text(&self) -> HeaplessString<15> {
        let mut text = HeaplessString::new();
        match self.ip {
            Some(ip) => {
                let _ = write!(text, "{}", ip);
            }
            None => {
                let _ = text.push_str("0.0.0.0");
            }
        }
        text
    }

    fn mac_text(&self) -> HeaplessString<17> {
        let mut text = HeaplessString::new();
        match self.mac {
            Some(mac) => {
                for (i, byte) in mac.iter().enumerate() {
                    if i > 0 {
                        let _ = text.push(':');
                    }
                    let _ = write!(text, "{:02X}", byte);
                }
            }
            None => {
                let _ = text.push_str("n/a");
            }
        }
        text
    }

    fn uptime_secs(&self) -> u64 {
        self.uptime_ms / 1_000
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusDocument<'a> {
    device: &'a str,
    ip: &'a str,
    mac: &'a str,
    rssi: Option<i8>,
    free_heap: usize,
    uptime: u64,
    running: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Response {
    pub status: u16,
    pub reason: &'static str,
    pub content_type: &'static str,
    pub body: String,
}

impl Response {
    fn ok(content_type: &'static str, body: String) -> Self {
        Self {
            status: 200,
            reason: "OK",
            content_type,
            body,
        }
    }
}

pub fn handle(request: &Request<'_>, device: &DeviceInfo, running: bool) -> Response {
    match Route::resolve(request.path) {
        Route::Root => Response::ok("text/html", root_page(device)),
        Route::Status => Response::ok("application/json", status_json(device, running)),
        Route::Api => Response::ok("text/html", String::from(API_PAGE)),
        Route::NotFound => Response {
            status: 404,
            reason: "Not Found",
            content_type: "text/plain",
            body: not_found_body(request),
        },
    }
}

pub fn status_json(device: &DeviceInfo, running: bool) -> String {
    let ip = device.ip_text();
    let mac = device.mac_text();
    let document = StatusDocument {
        device: DEVICE_NAME,
        ip: &ip,
        mac: &mac,
        rssi: device.rssi_dbm,
        free_heap: device.free_heap_bytes,
        uptime: device.uptime_secs(),
        running,
    };
    serde_json::to_string(&document).unwrap_or_default()
}

pub fn not_found_body(request: &Request<'_>) -> String {
    let mut body = format!(
        "File Not Found\n\nURI: {}\nArguments: {}\n",
        request.path,
        request.args().count()
    );
    for (name, value) in request.args() {
        let _ = writeln!(body, " {}: {}", name, value);
    }
    body
}

fn root_page(device: &DeviceInfo) -> String {
    let rssi = match device.rssi_dbm {
        Some(rssi) => format!("{} dBm", rssi),
        None => String::from("n/a"),
    };
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n\
         <title>{name}</title>\n\
         <meta charset=\"UTF-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
         <style>{style}</style>\n\
         </head>\n<body>\n<div class=\"container\">\n\
         <h1>Splitflap Display Control</h1>\n\
         <div class=\"status\">\n<h3>Device Status</h3>\n\
         <p><strong>IP Address:</strong> {ip}</p>\n\
         <p><strong>MAC Address:</strong> {mac}</p>\n\
         <p><strong>RSSI:</strong> {rssi}</p>\n\
         <p><strong>Free Heap:</strong> {heap} bytes</p>\n\
         <p><strong>Uptime:</strong> {uptime} seconds</p>\n\
         </div>\n\
         <div class=\"nav\"><a href=\"/status\">Status JSON</a> <a href=\"/api\">API Info</a></div>\n\
         </div>\n</body>\n</html>\n",
        name = DEVICE_NAME,
        style = PAGE_STYLE,
        ip = device.ip_text(),
        mac = device.mac_text(),
        rssi = rssi,
        heap = device.free_heap_bytes,
        uptime = device.uptime_secs(),
    )
}

const PAGE_STYLE: &str = "body{font-family:Arial,sans-serif;margin:20px;background:#f0f0f0}\
.container{max-width:800px;margin:0 auto;background:#fff;padding:20px;border-radius:8px}\
.status{background:#e8f5e8;padding:10px;border-radius:4px;margin:20px 0}\
.nav{text-align:center}.nav a{margin:0 10px;padding:10px 20px;background:#007bff;color:#fff;text-decoration:none;border-radius:4px}";

const API_PAGE: &str = "<!DOCTYPE html>\n<html>\n<head>\n\
<title>API Documentation</title>\n<meta charset=\"UTF-8\">\n</head>\n<body>\n\
<h1>API Documentation</h1>\n\
<p>Available endpoints for the Splitflap Display API:</p>\n\
<h3>GET /</h3><p>Main web interface with device status</p>\n\
<h3>GET /status</h3><p>Returns device status in JSON format</p>\n\
<h3>GET /api</h3><p>This API documentation page</p>\n\
<p><a href=\"/\">Back to main page</a></p>\n\
</body>\n</html>\n";
