use alloc::vec;

use embassy_net::{
    Stack,
    tcp::{Error as TcpError, TcpSocket},
};
use embassy_time::{Duration, Instant, Timer, WithTimeout};
use log::{info, warn};
use splitflap_core::{
    connectivity::ConnectivityHandle,
    http::{head_len, response_head},
    web::{DeviceInfo, SERVER_PORT, WebServerControl, handle, parse_request_line},
};

const SOCKET_TIMEOUT_SECS: u64 = 10;
/// Bounds how long a stop or readiness loss goes unnoticed while idle.
const ACCEPT_POLL_MS: u64 = 1_000;
const RX_BUFFER_BYTES: usize = 1024;
const TX_BUFFER_BYTES: usize = 2048;
const REQUEST_BUFFER_BYTES: usize = 1024;

#[embassy_executor::task]
pub async fn web_server_task(
    stack: Stack<'static>,
    mac: [u8; 6],
    connectivity: &'static ConnectivityHandle,
    control: &'static WebServerControl,
    not_ready_backoff_ms: u64,
) -> ! {
    loop {
        if control.begin(connectivity).is_err() {
            Timer::after_millis(not_ready_backoff_ms).await;
            continue;
        }

        serve(stack, mac, connectivity, control).await;
        Timer::after_millis(not_ready_backoff_ms).await;
    }
}

/// Runs until the server is stopped or the link stops being ready. Socket
/// buffers are owned by this call and freed when it returns.
async fn serve(
    stack: Stack<'static>,
    mac: [u8; 6],
    connectivity: &ConnectivityHandle,
    control: &WebServerControl,
) {
    let mut rx_buffer = vec![0u8; RX_BUFFER_BYTES];
    let mut tx_buffer = vec![0u8; TX_BUFFER_BYTES];
    let mut request = vec![0u8; REQUEST_BUFFER_BYTES];

    if let Some(config) = stack.config_v4() {
        info!("web: access at http://{}/", config.address.address());
    }

    while control.is_running() {
        if !connectivity.is_ready() {
            info!("web: WiFi not ready, stopping");
            control.stop();
            break;
        }

        let mut socket = TcpSocket::new(stack, &mut rx_buffer, &mut tx_buffer);
        socket.set_timeout(Some(Duration::from_secs(SOCKET_TIMEOUT_SECS)));

        match socket
            .accept(SERVER_PORT)
            .with_timeout(Duration::from_millis(ACCEPT_POLL_MS))
            .await
        {
            Err(_) => {}
            Ok(Err(err)) => {
                warn!("web: accept error: {:?}", err);
                Timer::after_millis(200).await;
            }
            Ok(Ok(())) => {
                if let Err(err) =
                    handle_connection(&mut socket, &mut request, stack, mac, control).await
                {
                    warn!("web: connection handling error: {:?}", err);
                }
                socket.close();
                let _ = socket.flush().await;
            }
        }
        socket.abort();
    }

    info!("web: server resources released");
}

async fn handle_connection(
    socket: &mut TcpSocket<'_>,
    buf: &mut [u8],
    stack: Stack<'static>,
    mac: [u8; 6],
    control: &WebServerControl,
) -> Result<(), TcpError> {
    let mut total = 0usize;
    let head_end = loop {
        let n = socket.read(&mut buf[total..]).await?;
        if n == 0 {
            if total == 0 {
                return Ok(());
            }
            break total;
        }
        total += n;
        if let Some(end) = head_len(&buf[..total]) {
            break end;
        }
        if total == buf.len() {
            break total;
        }
    };

    let head = core::str::from_utf8(&buf[..head_end]).unwrap_or("");
    let Some(request) = parse_request_line(head) else {
        let body = "Bad Request\n";
        let error_head = response_head(400, "Bad Request", "text/plain", body.len());
        write_all(socket, error_head.as_bytes()).await?;
        return write_all(socket, body.as_bytes()).await;
    };

    let device = DeviceInfo {
        ip: stack.config_v4().map(|config| config.address.address()),
        mac: Some(mac),
        rssi_dbm: None,
        free_heap_bytes: esp_alloc::HEAP.free(),
        uptime_ms: Instant::now().as_millis(),
    };
    let response = handle(&request, &device, control.is_running());
    info!("web: {} {} -> {}", request.method, request.path, response.status);

    let head = response_head(
        response.status,
        response.reason,
        response.content_type,
        response.body.len(),
    );
    write_all(socket, head.as_bytes()).await?;
    write_all(socket, response.body.as_bytes()).await
}

async fn write_all(socket: &mut TcpSocket<'_>, mut bytes: &[u8]) -> Result<(), TcpError> {
    while !bytes.is_empty() {
        let n = socket.write(bytes).await?;
        if n == 0 {
            return Err(TcpError::ConnectionReset);
        }
        bytes = &bytes[n..];
    }
    Ok(())
}
