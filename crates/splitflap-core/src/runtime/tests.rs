use super::*;

const WIFI: TaskDescriptor = TaskDescriptor::new("WiFi", 4096, 1, CoreId::Pro);
const HTTP: TaskDescriptor = TaskDescriptor::new("HTTP", 8192, 1, CoreId::Pro);
const DISPLAY: TaskDescriptor = TaskDescriptor::new("Display", 4096, 1, CoreId::App);

#[derive(Default)]
struct RecordingLauncher {
    launched: std::vec::Vec<(TaskHandle, &'static str, CoreId)>,
    fail_on: Option<&'static str>,
}

impl TaskLauncher for RecordingLauncher {
    type Error = &'static str;

    fn launch(&mut self, handle: TaskHandle, task: &TaskDescriptor) -> Result<(), Self::Error> {
        if self.fail_on == Some(task.name) {
            return Err("spawn pool exhausted");
        }
        self.launched.push((handle, task.name, task.core));
        Ok(())
    }
}

#[test]
fn registration_reserves_stack_budget() {
    let mut runtime = TaskRuntime::<4>::new(16 * 1024);
    let wifi = runtime.register(WIFI).unwrap();
    let http = runtime.register(HTTP).unwrap();

    assert_eq!(wifi.index(), 0);
    assert_eq!(http.index(), 1);
    assert_eq!(runtime.reserved_bytes(), 12 * 1024);
    assert_eq!(runtime.remaining_bytes(), 4 * 1024);
    assert_eq!(runtime.descriptor(http), Some(&HTTP));
    assert_eq!(runtime.handle_of("WiFi"), Some(wifi));
}

#[test]
fn exceeding_budget_is_resource_exhaustion() {
    let mut runtime = TaskRuntime::<4>::new(10 * 1024);
    runtime.register(WIFI).unwrap();

    assert_eq!(
        runtime.register(HTTP),
        Err(RuntimeError::ResourceExhausted {
            requested: 8192,
            available: 6 * 1024,
        })
    );
    assert_eq!(runtime.len(), 1);
    assert_eq!(runtime.reserved_bytes(), 4096);
}

#[test]
fn duplicate_names_and_empty_stacks_are_rejected() {
    let mut runtime = TaskRuntime::<4>::new(64 * 1024);
    runtime.register(WIFI).unwrap();

    assert_eq!(
        runtime.register(TaskDescriptor::new("WiFi", 1024, 2, CoreId::App)),
        Err(RuntimeError::DuplicateName)
    );
    assert_eq!(
        runtime.register(TaskDescriptor::new("Empty", 0, 1, CoreId::Pro)),
        Err(RuntimeError::EmptyStack)
    );
}

#[test]
fn task_table_has_fixed_capacity() {
    let mut runtime = TaskRuntime::<2>::new(64 * 1024);
    runtime.register(WIFI).unwrap();
    runtime.register(HTTP).unwrap();

    assert_eq!(runtime.register(DISPLAY), Err(RuntimeError::TooManyTasks));
    assert_eq!(runtime.reserved_bytes(), 12 * 1024);
}

#[test]
fn start_all_launches_in_registration_order_once() {
    let mut runtime = TaskRuntime::<4>::new(64 * 1024);
    runtime.register(WIFI).unwrap();
    runtime.register(DISPLAY).unwrap();
    runtime.register(HTTP).unwrap();

    let mut launcher = RecordingLauncher::default();
    assert_eq!(runtime.start_all(&mut launcher), Ok(3));
    assert!(runtime.is_started());

    let names: std::vec::Vec<_> = launcher.launched.iter().map(|(_, name, _)| *name).collect();
    assert_eq!(names, ["WiFi", "Display", "HTTP"]);
    assert_eq!(launcher.launched[1].2, CoreId::App);

    assert_eq!(
        runtime.start_all(&mut launcher),
        Err(RuntimeError::AlreadyStarted)
    );
    assert_eq!(launcher.launched.len(), 3);
    assert_eq!(
        runtime.register(TaskDescriptor::new("Late", 512, 1, CoreId::Pro)),
        Err(RuntimeError::AlreadyStarted)
    );
}

#[test]
fn launch_failure_is_reported_with_task_handle() {
    let mut runtime = TaskRuntime::<4>::new(64 * 1024);
    runtime.register(WIFI).unwrap();
    let http = runtime.register(HTTP).unwrap();
    runtime.register(DISPLAY).unwrap();

    let mut launcher = RecordingLauncher {
        fail_on: Some("HTTP"),
        ..RecordingLauncher::default()
    };
    assert_eq!(
        runtime.start_all(&mut launcher),
        Err(RuntimeError::Launch { task: http })
    );
    assert_eq!(launcher.launched.len(), 1);
}

#[test]
fn tasks_can_be_listed_per_core() {
    let mut runtime = TaskRuntime::<4>::new(64 * 1024);
    runtime.register(WIFI).unwrap();
    runtime.register(DISPLAY).unwrap();
    runtime.register(HTTP).unwrap();

    assert_eq!(runtime.tasks_on(CoreId::Pro).count(), 2);
    let app: std::vec::Vec<_> = runtime.tasks_on(CoreId::App).map(|task| task.name).collect();
    assert_eq!(app, ["Display"]);
}

#[test]
fn handles_stay_distinct_past_255_tasks() {
    let mut runtime = TaskRuntime::<300>::new(300);
    let mut last = None;
    for index in 0..300 {
        let name: &'static str = std::boxed::Box::leak(format!("worker-{index}").into_boxed_str());
        last = Some(runtime.register(TaskDescriptor::new(name, 1, 1, CoreId::Pro)).unwrap());
    }

    let last = last.unwrap();
    assert_eq!(last.index(), 299);
    assert_eq!(runtime.descriptor(last).map(|task| task.name), Some("worker-299"));
    assert_eq!(runtime.handle_of("worker-256").map(TaskHandle::index), Some(256));
}
