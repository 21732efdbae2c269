//! Control-plane operations exposed to the UI channel.

use std::sync::Arc;

use tracing::info;

use super::types::{ApiResponse, SaveLogRequest, SaveLogResponse};
use crate::config::{Config, Settings, SettingsPatch, SettingsProvider};
use crate::device::{Device, DeviceEnumerator, DeviceSource};
use crate::execution::{CommandExecutor, CommandRequest, CommandResult};
use crate::mirror::{MirrorOptions, MirrorStatus, MirrorSupervisor};
use crate::platform::{
    default_resources_dir, ExecutableResolver, OverrideSource, ToolLocator, BRIDGE_TOOL,
    MIRROR_TOOL,
};
use crate::session::{LogSink, StreamOptions, StreamStatus, StreamingSession};

/// Owns every long-lived component and maps results onto [`ApiResponse`].
pub struct ControlPlane {
    settings: Arc<dyn SettingsProvider>,
    executor: CommandExecutor,
    devices: Arc<DeviceEnumerator>,
    logs: StreamingSession,
    mirror: MirrorSupervisor,
}

impl std::fmt::Debug for ControlPlane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlPlane")
            .field("settings", &self.settings.get())
            .field("logs", &self.logs)
            .field("mirror", &self.mirror)
            .finish()
    }
}

impl ControlPlane {
    /// Build from configuration, with the settings store it describes.
    pub fn new(config: &Config) -> Self {
        Self::with_settings(config, Arc::new(config.settings_store()))
    }

    /// Build from configuration around an existing settings provider.
    pub fn with_settings(config: &Config, settings: Arc<dyn SettingsProvider>) -> Self {
        let resources_dir = config.paths.resources_dir.clone().or_else(default_resources_dir);
        let app_dir = config
            .paths
            .app_dir
            .clone()
            .or_else(|| std::env::current_dir().ok());

        let bridge = Arc::new(
            ToolLocator::new(ExecutableResolver::standard(
                BRIDGE_TOOL,
                resources_dir.as_deref(),
                app_dir.as_deref(),
            ))
            .with_override(OverrideSource::BridgeSettings(settings.clone())),
        );

        let mirror_override = config
            .paths
            .scrcpy_path
            .clone()
            .map(OverrideSource::Fixed)
            .unwrap_or_default();
        let mirror = Arc::new(
            ToolLocator::new(ExecutableResolver::standard(
                MIRROR_TOOL,
                resources_dir.as_deref(),
                app_dir.as_deref(),
            ))
            .with_override(mirror_override),
        );

        Self::from_parts(settings, bridge, mirror)
    }

    /// Assemble from explicit locators.
    pub fn from_parts(
        settings: Arc<dyn SettingsProvider>,
        bridge: Arc<ToolLocator>,
        mirror: Arc<ToolLocator>,
    ) -> Self {
        let devices = Arc::new(DeviceEnumerator::new(bridge.clone()));
        Self {
            executor: CommandExecutor::new(bridge.clone()),
            logs: StreamingSession::new(bridge.clone()).with_settings(settings.clone()),
            mirror: MirrorSupervisor::new(mirror, bridge, devices.clone()),
            devices,
            settings,
        }
    }

    pub async fn list_devices(&self) -> ApiResponse<Vec<Device>> {
        self.devices.list().await.into()
    }

    pub async fn execute(&self, request: &CommandRequest) -> ApiResponse<CommandResult> {
        self.executor.execute(request).await.into()
    }

    pub fn settings(&self) -> ApiResponse<Settings> {
        ApiResponse::success(self.settings.get())
    }

    pub fn update_settings(&self, patch: SettingsPatch) -> ApiResponse<Settings> {
        let result = self.settings.update(patch);
        if result.is_ok() {
            info!("Settings updated");
        }
        result.into()
    }

    pub async fn start_logs(&self, sink: LogSink, options: StreamOptions) -> ApiResponse<StreamStatus> {
        match self.logs.start(sink, options).await {
            Ok(()) => self.logs.status().into(),
            Err(e) => ApiResponse::failure(e),
        }
    }

    pub async fn stop_logs(&self) -> ApiResponse<StreamStatus> {
        match self.logs.stop().await {
            Ok(()) => self.logs.status().into(),
            Err(e) => ApiResponse::failure(e),
        }
    }

    pub fn log_status(&self) -> ApiResponse<StreamStatus> {
        self.logs.status().into()
    }

    pub async fn save_logs(&self, request: SaveLogRequest) -> ApiResponse<SaveLogResponse> {
        self.logs
            .save_current_buffer(request.content.as_deref(), request.file_name.as_deref())
            .await
            .map(|file_path| SaveLogResponse { file_path })
            .into()
    }

    pub fn clear_logs(&self) -> ApiResponse<StreamStatus> {
        match self.logs.clear_buffer() {
            Ok(()) => self.logs.status().into(),
            Err(e) => ApiResponse::failure(e),
        }
    }

    pub async fn start_mirror(&self, options: MirrorOptions) -> ApiResponse<MirrorStatus> {
        self.mirror.start(options).await.into()
    }

    pub async fn stop_mirror(&self) -> ApiResponse<MirrorStatus> {
        match self.mirror.stop().await {
            Ok(()) => self.mirror.status().into(),
            Err(e) => ApiResponse::failure(e),
        }
    }

    pub fn mirror_status(&self) -> ApiResponse<MirrorStatus> {
        self.mirror.status().into()
    }

    /// Stop both long-lived processes.
    pub async fn shutdown(&self) {
        let _ = self.logs.stop().await;
        let _ = self.mirror.stop().await;
    }
}
