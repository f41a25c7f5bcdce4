//! Build-time firmware composition: which tasks exist and with what budgets.

use heapless::Vec as HeaplessVec;

use crate::{
    connectivity::ConnectivityConfig,
    fetch::FetchConfig,
    runtime::{CoreId, MAX_TASKS, RuntimeError, TaskDescriptor, TaskHandle, TaskRuntime},
};

pub const WIFI_TASK: TaskDescriptor = TaskDescriptor::new("WiFi", 4096, 1, CoreId::Pro);
pub const HTTP_TASK: TaskDescriptor = TaskDescriptor::new("HTTP", 8192, 1, CoreId::Pro);
pub const WEB_SERVER_TASK: TaskDescriptor = TaskDescriptor::new("WebServer", 4096, 1, CoreId::Pro);
pub const DISPLAY_TASK: TaskDescriptor = TaskDescriptor::new("Display", 4096, 1, CoreId::App);

/// Optional tasks compiled into the image. The Wi-Fi task is implied by any
/// of them.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TaskSet {
    pub data_fetch: bool,
    pub web_server: bool,
    pub display: bool,
}

impl TaskSet {
    pub const fn all() -> Self {
        Self {
            data_fetch: true,
            web_server: true,
            display: true,
        }
    }

    pub const fn none() -> Self {
        Self {
            data_fetch: false,
            web_server: false,
            display: false,
        }
    }

    pub const fn needs_wifi(&self) -> bool {
        self.data_fetch || self.web_server || self.display
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FirmwareConfig {
    pub tasks: TaskSet,
    pub connectivity: ConnectivityConfig,
    pub fetch: FetchConfig,
    /// Stack bytes the runtime may hand out across all tasks.
    pub memory_budget_bytes: u32,
}

impl FirmwareConfig {
    pub const fn new(tasks: TaskSet) -> Self {
        Self {
            tasks,
            connectivity: ConnectivityConfig::new(),
            fetch: FetchConfig::new(),
            memory_budget_bytes: 48 * 1024,
        }
    }

    pub const fn with_memory_budget_bytes(mut self, memory_budget_bytes: u32) -> Self {
        self.memory_budget_bytes = memory_budget_bytes;
        self
    }

    pub const fn with_fetch(mut self, fetch: FetchConfig) -> Self {
        self.fetch = fetch;
        self
    }

    pub const fn with_connectivity(mut self, connectivity: ConnectivityConfig) -> Self {
        self.connectivity = connectivity;
        self
    }

    /// Descriptors in launch order: connectivity first so consumers find a
    /// published state when they start polling.
    pub fn boot_plan(&self) -> HeaplessVec<TaskDescriptor, MAX_TASKS> {
        let mut plan = HeaplessVec::new();
        let tasks = self.tasks;
        let candidates = [
            (tasks.needs_wifi(), WIFI_TASK),
            (tasks.display, DISPLAY_TASK),
            (tasks.data_fetch, HTTP_TASK),
            (tasks.web_server, WEB_SERVER_TASK),
        ];
        for (enabled, descriptor) in candidates {
            if enabled {
                let _ = plan.push(descriptor);
            }
        }
        plan
    }

    /// Registers the whole plan; the first refusal aborts boot.
    pub fn register_all<const N: usize>(
        &self,
        runtime: &mut TaskRuntime<N>,
    ) -> Result<HeaplessVec<TaskHandle, MAX_TASKS>, RuntimeError> {
        let mut handles = HeaplessVec::new();
        for descriptor in self.boot_plan() {
            let handle = runtime.register(descriptor)?;
            handles
                .push(handle)
                .map_err(|_| RuntimeError::TooManyTasks)?;
        }
        Ok(handles)
    }
}

#[cfg(test)]
mod tests;
