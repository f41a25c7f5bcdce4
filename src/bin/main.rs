#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

extern crate alloc;

use embassy_executor::Spawner;
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, signal::Signal};
use embassy_time::Timer;
use esp_hal::{
    clock::CpuClock,
    interrupt::software::SoftwareInterruptControl,
    system::Stack as CoreStack,
    timer::timg::TimerGroup,
};
use esp_radio::{Controller as RadioController, wifi::WifiDevice};
use log::{LevelFilter, error, info};
use splitflap_core::{
    config::{FirmwareConfig, TaskSet},
    connectivity::{ConnectivityHandle, ReadinessPolicy},
    link::WifiCredentials,
    runtime::{MAX_TASKS, TaskRuntime},
    status::StatusBoard,
    web::WebServerControl,
};
use splitflap_hal_esp32s3::network::EspWifiLink;
use static_cell::StaticCell;

use launcher::{BootResources, FirmwareLauncher};

#[path = "main/display.rs"]
mod display;
#[path = "main/fetch.rs"]
mod fetch;
#[path = "main/launcher.rs"]
mod launcher;
#[path = "main/web.rs"]
mod web;
#[path = "main/wifi.rs"]
mod wifi;

const APP_CORE_STACK_BYTES: usize = 8 * 1024;

const WIFI_SSID: &str = env!(
    "SPLITFLAP_WIFI_SSID",
    "Set SPLITFLAP_WIFI_SSID in your environment before building/flashing."
);
const WIFI_PASSWORD: &str = env!(
    "SPLITFLAP_WIFI_PASSWORD",
    "Set SPLITFLAP_WIFI_PASSWORD in your environment before building/flashing."
);
const WIFI_CREDENTIALS: WifiCredentials = WifiCredentials::new(WIFI_SSID, WIFI_PASSWORD);

const TASKS: TaskSet = TaskSet {
    data_fetch: cfg!(feature = "http"),
    web_server: cfg!(feature = "webserver"),
    display: cfg!(feature = "display"),
};
const FIRMWARE: FirmwareConfig = FirmwareConfig::new(TASKS);

static CONNECTIVITY: ConnectivityHandle = ConnectivityHandle::new(ReadinessPolicy::ConnectedIsReady);
static STATUS: StatusBoard = StatusBoard::new();
static WEB_CONTROL: WebServerControl = WebServerControl::new();

static RADIO_CONTROLLER: StaticCell<RadioController<'static>> = StaticCell::new();
static NET_RESOURCES: StaticCell<embassy_net::StackResources<6>> = StaticCell::new();
static APP_CORE_STACK: StaticCell<CoreStack<APP_CORE_STACK_BYTES>> = StaticCell::new();
static APP_EXECUTOR: StaticCell<esp_rtos::embassy::Executor> = StaticCell::new();
static APP_SPAWNER: Signal<CriticalSectionRawMutex, embassy_executor::SendSpawner> = Signal::new();

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    esp_println::println!("panic: {}", info);
    loop {}
}

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

async fn park(reason: &str) -> ! {
    error!("boot halted: {}", reason);
    loop {
        Timer::after_secs(1).await;
    }
}

#[embassy_executor::task]
async fn net_task(mut runner: embassy_net::Runner<'static, WifiDevice<'static>>) {
    runner.run().await;
}

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    esp_println::logger::init_logger(LevelFilter::Info);
    esp_println::println!("boot: splitflap starting");

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    // esp-radio requires an allocator.
    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 65536);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    let mut runtime = TaskRuntime::<MAX_TASKS>::new(FIRMWARE.memory_budget_bytes);
    if let Err(err) = FIRMWARE.register_all(&mut runtime) {
        error!("task registration failed: {:?}", err);
        park("task registration").await;
    }
    if runtime.is_empty() {
        info!("no tasks enabled; idling");
        park("empty task set").await;
    }

    let sw_int = SoftwareInterruptControl::new(peripherals.SW_INTERRUPT);
    esp_rtos::start_second_core(
        peripherals.CPU_CTRL,
        sw_int.software_interrupt0,
        sw_int.software_interrupt1,
        APP_CORE_STACK.init(CoreStack::new()),
        move || {
            let executor = APP_EXECUTOR.init(esp_rtos::embassy::Executor::new());
            executor.run(|spawner| APP_SPAWNER.signal(spawner.make_send()));
        },
    );
    let app_spawner = APP_SPAWNER.wait().await;

    let radio = match esp_radio::init() {
        Ok(radio) => radio,
        Err(err) => {
            error!("esp-radio init failed: {:?}", err);
            park("radio init").await;
        }
    };
    let radio = RADIO_CONTROLLER.init(radio);

    let (wifi_controller, interfaces) =
        match esp_radio::wifi::new(radio, peripherals.WIFI, esp_radio::wifi::Config::default()) {
            Ok(parts) => parts,
            Err(err) => {
                error!("wifi peripheral init failed: {:?}", err);
                park("wifi init").await;
            }
        };

    let mac = interfaces.sta.mac_address();
    let stack_config = embassy_net::Config::dhcpv4(Default::default());
    let (stack, net_runner) = embassy_net::new(
        interfaces.sta,
        stack_config,
        NET_RESOURCES.init(embassy_net::StackResources::<6>::new()),
        0x5A17_2B34_D099_EE11,
    );
    match net_task(net_runner) {
        Ok(token) => spawner.spawn(token),
        Err(err) => {
            error!("network runner spawn failed: {:?}", err);
            park("network runner").await;
        }
    }

    info!(
        "Wi-Fi bootstrap configured from env; ssid={} tasks={:?}",
        WIFI_CREDENTIALS.ssid, TASKS
    );

    let mut launcher = FirmwareLauncher::new(
        spawner,
        app_spawner,
        BootResources {
            link: Some(EspWifiLink::new(wifi_controller, stack)),
            stack,
            mac,
            credentials: WIFI_CREDENTIALS,
            firmware: FIRMWARE,
            connectivity: &CONNECTIVITY,
            status: &STATUS,
            web_control: &WEB_CONTROL,
        },
    );
    match runtime.start_all(&mut launcher) {
        Ok(count) => info!("boot complete: {} tasks running", count),
        Err(err) => {
            error!("task launch failed: {:?}", err);
            park("task launch").await;
        }
    }

    core::future::pending().await
}
