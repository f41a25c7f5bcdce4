use embassy_executor::{SendSpawner, SpawnError, SpawnToken, Spawner};
use embassy_net::Stack;
use log::info;
use splitflap_core::{
    config::{DISPLAY_TASK, FirmwareConfig, HTTP_TASK, WEB_SERVER_TASK, WIFI_TASK},
    connectivity::ConnectivityHandle,
    link::WifiCredentials,
    runtime::{CoreId, TaskDescriptor, TaskHandle, TaskLauncher},
    status::StatusBoard,
    web::WebServerControl,
};
use splitflap_hal_esp32s3::network::EspWifiLink;

use crate::{display, fetch, web, wifi};

/// Everything the registered tasks are built from. Owned values are moved
/// into their task on launch.
pub struct BootResources {
    pub link: Option<EspWifiLink<'static>>,
    pub stack: Stack<'static>,
    pub mac: [u8; 6],
    pub credentials: WifiCredentials,
    pub firmware: FirmwareConfig,
    pub connectivity: &'static ConnectivityHandle,
    pub status: &'static StatusBoard,
    pub web_control: &'static WebServerControl,
}

#[derive(Debug)]
pub enum LaunchError {
    Spawn(SpawnError),
    UnknownTask(&'static str),
    /// Network-bound tasks share the stack with the runner on core 0.
    UnsupportedCore(CoreId),
    LinkAlreadyTaken,
}

impl From<SpawnError> for LaunchError {
    fn from(value: SpawnError) -> Self {
        Self::Spawn(value)
    }
}

pub struct FirmwareLauncher {
    pro: Spawner,
    app: SendSpawner,
    resources: BootResources,
}

impl FirmwareLauncher {
    pub fn new(pro: Spawner, app: SendSpawner, resources: BootResources) -> Self {
        Self {
            pro,
            app,
            resources,
        }
    }

    fn spawn_pro<S>(&self, task: &TaskDescriptor, token: SpawnToken<S>) -> Result<(), LaunchError> {
        if task.core != CoreId::Pro {
            return Err(LaunchError::UnsupportedCore(task.core));
        }
        self.pro.spawn(token);
        Ok(())
    }

    fn spawn_on<S: Send>(&self, core: CoreId, token: SpawnToken<S>) {
        match core {
            CoreId::Pro => self.pro.spawn(token),
            CoreId::App => self.app.spawn(token),
        }
    }
}

impl TaskLauncher for FirmwareLauncher {
    type Error = LaunchError;

    fn launch(&mut self, handle: TaskHandle, task: &TaskDescriptor) -> Result<(), Self::Error> {
        let resources = &mut self.resources;
        info!(
            "launching task #{} {} on {:?} (stack={} priority={})",
            handle.index(),
            task.name,
            task.core,
            task.stack_bytes,
            task.priority
        );

        if task.name == WIFI_TASK.name {
            let link = resources.link.take().ok_or(LaunchError::LinkAlreadyTaken)?;
            let token = wifi::wifi_task(
                link,
                resources.credentials,
                resources.firmware.connectivity,
                resources.connectivity,
                resources.status,
            )?;
            self.spawn_pro(task, token)
        } else if task.name == HTTP_TASK.name {
            let token = fetch::fetch_task(
                resources.stack,
                resources.firmware.fetch,
                resources.connectivity,
                resources.status,
            )?;
            self.spawn_pro(task, token)
        } else if task.name == WEB_SERVER_TASK.name {
            let token = web::web_server_task(
                resources.stack,
                resources.mac,
                resources.connectivity,
                resources.web_control,
                resources.firmware.fetch.not_ready_backoff_ms,
            )?;
            self.spawn_pro(task, token)
        } else if task.name == DISPLAY_TASK.name {
            let token = display::display_task(resources.connectivity, resources.status)?;
            self.spawn_on(task.core, token);
            Ok(())
        } else {
            Err(LaunchError::UnknownTask(task.name))
        }
    }
}
