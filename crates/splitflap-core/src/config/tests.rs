use super::*;

fn names(config: &FirmwareConfig) -> std::vec::Vec<&'static str> {
    config.boot_plan().iter().map(|task| task.name).collect()
}

#[test]
fn full_image_boots_wifi_first() {
    let config = FirmwareConfig::new(TaskSet::all());
    assert_eq!(names(&config), ["WiFi", "Display", "HTTP", "WebServer"]);
}

#[test]
fn any_network_task_pulls_in_wifi() {
    let fetch_only = TaskSet {
        data_fetch: true,
        ..TaskSet::none()
    };
    assert_eq!(names(&FirmwareConfig::new(fetch_only)), ["WiFi", "HTTP"]);

    let web_only = TaskSet {
        web_server: true,
        ..TaskSet::none()
    };
    assert_eq!(names(&FirmwareConfig::new(web_only)), ["WiFi", "WebServer"]);
}

#[test]
fn empty_task_set_boots_nothing() {
    assert!(!TaskSet::none().needs_wifi());
    assert!(FirmwareConfig::new(TaskSet::none()).boot_plan().is_empty());
}

#[test]
fn display_task_is_pinned_to_second_core() {
    let config = FirmwareConfig::new(TaskSet::all());
    let plan = config.boot_plan();
    let on_app: std::vec::Vec<_> = plan
        .iter()
        .filter(|task| task.core == CoreId::App)
        .map(|task| task.name)
        .collect();
    assert_eq!(on_app, ["Display"]);
}

#[test]
fn default_budget_fits_every_task() {
    let config = FirmwareConfig::new(TaskSet::all());
    let mut runtime = TaskRuntime::<MAX_TASKS>::new(config.memory_budget_bytes);

    let handles = config.register_all(&mut runtime).unwrap();
    assert_eq!(handles.len(), 4);
    assert_eq!(runtime.reserved_bytes(), 20 * 1024);
}

#[test]
fn tight_budget_aborts_registration() {
    let config = FirmwareConfig::new(TaskSet::all()).with_memory_budget_bytes(10 * 1024);
    let mut runtime = TaskRuntime::<MAX_TASKS>::new(config.memory_budget_bytes);

    assert_eq!(
        config.register_all(&mut runtime),
        Err(RuntimeError::ResourceExhausted {
            requested: 8192,
            available: 2048,
        })
    );
}

#[test]
fn defaults_match_firmware_cadences() {
    let config = FirmwareConfig::new(TaskSet::all());
    assert_eq!(config.connectivity.retry_interval_ms, 10_000);
    assert_eq!(config.connectivity.status_push_interval_ms, 5_000);
    assert_eq!(config.fetch.request_interval_ms, 600_000);
    assert_eq!(config.fetch.stale_after_ms, 1_800_000);
}
