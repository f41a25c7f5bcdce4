//! Boot-time task table.
//!
//! Every long-running task is registered once with its stack budget and core
//! affinity, then handed to a platform launcher in one `start_all` call.

use heapless::Vec as HeaplessVec;
use log::info;

pub const MAX_TASKS: usize = 8;

/// Execution unit a task is pinned to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum CoreId {
    /// Core 0.
    Pro = 0,
    /// Core 1.
    App = 1,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TaskDescriptor {
    pub name: &'static str,
    pub stack_bytes: u32,
    pub priority: u8,
    pub core: CoreId,
}

impl TaskDescriptor {
    pub const fn new(name: &'static str, stack_bytes: u32, priority: u8, core: CoreId) -> Self {
        Self {
            name,
            stack_bytes,
            priority,
            core,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct TaskHandle(usize);

impl TaskHandle {
    pub const fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RuntimeError {
    EmptyStack,
    DuplicateName,
    TooManyTasks,
    ResourceExhausted { requested: u32, available: u32 },
    AlreadyStarted,
    Launch { task: TaskHandle },
}

/// Platform seam that actually spawns a registered task on its core.
pub trait TaskLauncher {
    type Error: core::fmt::Debug;

    fn launch(&mut self, handle: TaskHandle, task: &TaskDescriptor) -> Result<(), Self::Error>;
}

pub struct TaskRuntime<const N: usize = MAX_TASKS> {
    tasks: HeaplessVec<TaskDescriptor, N>,
    memory_budget: u32,
    reserved: u32,
    started: bool,
}

impl<const N: usize> TaskRuntime<N> {
    pub const fn new(memory_budget: u32) -> Self {
        Self {
            tasks: HeaplessVec::new(),
            memory_budget,
            reserved: 0,
            started: false,
        }
    }

    pub fn register(&mut self, task: TaskDescriptor) -> Result<TaskHandle, RuntimeError> {
        if self.started {
            return Err(RuntimeError::AlreadyStarted);
        }
        if task.stack_bytes == 0 {
            return Err(RuntimeError::EmptyStack);
        }
        if self.tasks.iter().any(|existing| existing.name == task.name) {
            return Err(RuntimeError::DuplicateName);
        }

        let available = self.remaining_bytes();
        if task.stack_bytes > available {
            return Err(RuntimeError::ResourceExhausted {
                requested: task.stack_bytes,
                available,
            });
        }

        let handle = TaskHandle(self.tasks.len());
        self.tasks
            .push(task)
            .map_err(|_| RuntimeError::TooManyTasks)?;
        self.reserved += task.stack_bytes;

        info!(
            "runtime: registered task={} stack={} priority={} core={:?}",
            task.name, task.stack_bytes, task.priority, task.core
        );
        Ok(handle)
    }

    /// Launches every registered task in registration order. Must be called
    /// exactly once; a launch failure aborts the remaining launches.
    pub fn start_all<L: TaskLauncher>(&mut self, launcher: &mut L) -> Result<usize, RuntimeError> {
        if self.started {
            return Err(RuntimeError::AlreadyStarted);
        }
        self.started = true;

        for (index, task) in self.tasks.iter().enumerate() {
            let handle = TaskHandle(index);
            if let Err(err) = launcher.launch(handle, task) {
                info!("runtime: launch of task={} failed: {:?}", task.name, err);
                return Err(RuntimeError::Launch { task: handle });
            }
        }

        info!(
            "runtime: started {} tasks reserved_bytes={} budget_bytes={}",
            self.tasks.len(),
            self.reserved,
            self.memory_budget
        );
        Ok(self.tasks.len())
    }

    pub fn descriptor(&self, handle: TaskHandle) -> Option<&TaskDescriptor> {
        self.tasks.get(handle.index())
    }

    pub fn handle_of(&self, name: &str) -> Option<TaskHandle> {
        self.tasks
            .iter()
            .position(|task| task.name == name)
            .map(TaskHandle)
    }

    pub fn tasks_on(&self, core: CoreId) -> impl Iterator<Item = &TaskDescriptor> {
        self.tasks.iter().filter(move |task| task.core == core)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn reserved_bytes(&self) -> u32 {
        self.reserved
    }

    pub fn remaining_bytes(&self) -> u32 {
        self.memory_budget.saturating_sub(self.reserved)
    }

    pub fn is_started(&self) -> bool {
        self.started
    }
}

#[cfg(test)]
mod tests;
