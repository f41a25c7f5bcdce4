//! One-shot HTTP/1.0 GET over an embassy-net TCP socket.

use embassy_net::{
    Stack,
    dns::DnsQueryType,
    tcp::{ConnectError, TcpSocket},
};
use embassy_time::{Duration, WithTimeout};
use log::{debug, warn};
use splitflap_core::http::{HttpResponse, RequestError, get_request, parse_response};

pub const SOCKET_TIMEOUT_SECS: u64 = 10;

/// Plain-HTTP endpoint the data task polls.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Endpoint {
    pub host: &'static str,
    pub port: u16,
}

impl Endpoint {
    pub const fn new(host: &'static str, port: u16) -> Self {
        Self { host, port }
    }
}

pub struct HttpClient<'a> {
    stack: Stack<'a>,
    rx_buffer: &'a mut [u8],
    tx_buffer: &'a mut [u8],
}

impl<'a> HttpClient<'a> {
    pub fn new(stack: Stack<'a>, rx_buffer: &'a mut [u8], tx_buffer: &'a mut [u8]) -> Self {
        Self {
            stack,
            rx_buffer,
            tx_buffer,
        }
    }

    /// Issues one GET and reads until the peer closes. The whole reply must
    /// fit in `response`.
    pub async fn get<'r>(
        &mut self,
        endpoint: Endpoint,
        path: &str,
        response: &'r mut [u8],
    ) -> Result<HttpResponse<'r>, RequestError> {
        let timeout = Duration::from_secs(SOCKET_TIMEOUT_SECS);

        let addresses = self
            .stack
            .dns_query(endpoint.host, DnsQueryType::A)
            .with_timeout(timeout)
            .await
            .map_err(|_| RequestError::Timeout)?
            .map_err(|err| {
                warn!("http: dns lookup of {} failed: {:?}", endpoint.host, err);
                RequestError::Dns
            })?;
        let address = addresses.first().copied().ok_or(RequestError::Dns)?;
        debug!("http: {} resolved to {}", endpoint.host, address);

        let mut socket = TcpSocket::new(self.stack, &mut *self.rx_buffer, &mut *self.tx_buffer);
        socket.set_timeout(Some(timeout));

        socket
            .connect((address, endpoint.port))
            .await
            .map_err(|err| match err {
                ConnectError::TimedOut => RequestError::Timeout,
                _ => RequestError::Connect,
            })?;

        let request = get_request(endpoint.host, path)?;
        let mut written = 0;
        while written < request.len() {
            match socket.write(&request.as_bytes()[written..]).await {
                Ok(0) | Err(_) => {
                    socket.abort();
                    return Err(RequestError::Write);
                }
                Ok(n) => written += n,
            }
        }

        let mut total = 0;
        loop {
            if total == response.len() {
                socket.abort();
                return Err(RequestError::ResponseTooLarge);
            }
            match socket
                .read(&mut response[total..])
                .with_timeout(timeout)
                .await
            {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => total += n,
                Ok(Err(_)) => {
                    socket.abort();
                    return Err(RequestError::Read);
                }
                Err(_) => {
                    socket.abort();
                    return Err(RequestError::Timeout);
                }
            }
        }
        socket.close();
        debug!("http: received {} bytes from {}", total, endpoint.host);

        Ok(parse_response(&response[..total])?)
    }
}
