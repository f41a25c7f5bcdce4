use alloc::vec;

use embassy_net::Stack;
use embassy_time::{Instant, Timer};
use log::{info, warn};
use splitflap_core::{
    connectivity::ConnectivityHandle,
    fetch::{CycleAction, FetchConfig, FetchError, FetchScheduler, summarize_http},
    status::StatusBoard,
    weather::WeatherQuery,
};
use splitflap_hal_esp32s3::network::client::{Endpoint, HttpClient};

const WEATHER_HOST: &str = match option_env!("SPLITFLAP_WEATHER_HOST") {
    Some(host) => host,
    None => "api.synopticdata.com",
};
// Public token for the synoptic data API.
const WEATHER_TOKEN: &str = match option_env!("SPLITFLAP_WEATHER_TOKEN") {
    Some(token) => token,
    None => "e763d68537d9498a90fa808eb9d415d9",
};
const DEFAULT_LATITUDE: f32 = 37.765_157;
const DEFAULT_LONGITUDE: f32 = -122.419_702;

const SOCKET_BUFFER_BYTES: usize = 1536;
const RESPONSE_BUFFER_BYTES: usize = 12 * 1024;

fn weather_query() -> WeatherQuery {
    let coordinate = |value: Option<&str>, fallback: f32| {
        value
            .and_then(|raw| raw.trim().parse::<f32>().ok())
            .unwrap_or(fallback)
    };
    WeatherQuery::new(
        WEATHER_TOKEN,
        coordinate(option_env!("SPLITFLAP_LATITUDE"), DEFAULT_LATITUDE),
        coordinate(option_env!("SPLITFLAP_LONGITUDE"), DEFAULT_LONGITUDE),
    )
}

#[embassy_executor::task]
pub async fn fetch_task(
    stack: Stack<'static>,
    config: FetchConfig,
    connectivity: &'static ConnectivityHandle,
    status: &'static StatusBoard,
) -> ! {
    let endpoint = Endpoint::new(WEATHER_HOST, 80);
    let path = weather_query().path();
    let mut scheduler = FetchScheduler::new(config);

    let mut rx_buffer = vec![0u8; SOCKET_BUFFER_BYTES];
    let mut tx_buffer = vec![0u8; SOCKET_BUFFER_BYTES];
    let mut response = vec![0u8; RESPONSE_BUFFER_BYTES];

    info!(
        "fetch task started: host={} interval={}ms",
        endpoint.host, config.request_interval_ms
    );

    loop {
        let now_ms = Instant::now().as_millis();
        let delay_ms = match scheduler.begin_cycle(now_ms, connectivity.is_ready(), status) {
            CycleAction::WaitForNetwork { delay_ms } => delay_ms,
            CycleAction::Idle { delay_ms } => delay_ms,
            CycleAction::Fetch => {
                info!("fetch: sending request");
                let started = Instant::now();
                let mut client = HttpClient::new(stack, &mut rx_buffer, &mut tx_buffer);
                let outcome = match client.get(endpoint, &path, &mut response).await {
                    Ok(reply) => {
                        info!(
                            "fetch: response code={} length={} in {}ms",
                            reply.status,
                            reply.body.len(),
                            started.elapsed().as_millis()
                        );
                        summarize_http(reply)
                    }
                    Err(err) => {
                        warn!("fetch: request error: {:?}", err);
                        Err(FetchError::from(err))
                    }
                };
                scheduler.complete_fetch(Instant::now().as_millis(), outcome, status);
                config.tick_ms
            }
        };

        scheduler.refresh_presentation(Instant::now().as_millis(), status);
        Timer::after_millis(delay_ms).await;
    }
}
