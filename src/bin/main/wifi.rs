use embassy_time::{Instant, Timer};
use log::info;
use splitflap_core::{
    connectivity::{ConnectivityConfig, ConnectivityHandle, ConnectivityMachine},
    link::WifiCredentials,
    status::StatusBoard,
};
use splitflap_hal_esp32s3::network::EspWifiLink;

/// Sole writer of the connectivity handle.
#[embassy_executor::task]
pub async fn wifi_task(
    mut link: EspWifiLink<'static>,
    credentials: WifiCredentials,
    config: ConnectivityConfig,
    connectivity: &'static ConnectivityHandle,
    status: &'static StatusBoard,
) -> ! {
    let mut machine = ConnectivityMachine::new(connectivity, config, credentials);
    info!(
        "wifi task started: retry={}ms poll={}ms policy={:?}",
        config.retry_interval_ms,
        config.poll_interval_ms,
        connectivity.policy()
    );

    loop {
        let now_ms = Instant::now().as_millis();
        // No secondary sync step is wired up; the default policy ignores it.
        machine.poll(now_ms, &mut link, false, status);
        Timer::after_millis(config.poll_interval_ms).await;
    }
}
