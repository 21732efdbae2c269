//! Command requests and the logical command surface.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::security::ValidationError;

/// Default per-command timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Command-specific flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CommandOptions {
    /// Overwrite an installed package (`install -r`).
    pub reinstall: bool,
}

/// A request to run a bridge command.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRequest {
    /// Target device serial.
    #[serde(default)]
    pub device_id: Option<String>,
    /// Logical command name.
    pub command: String,
    /// Arguments, in order.
    #[serde(default)]
    pub args: Vec<String>,
    /// Timeout in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Command-specific flags.
    #[serde(default)]
    pub options: CommandOptions,
}

impl CommandRequest {
    /// Create a new request for `command`.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            device_id: None,
            command: command.into(),
            args: Vec::new(),
            timeout_ms: None,
            options: CommandOptions::default(),
        }
    }

    /// Set the target device.
    pub fn device(mut self, id: impl Into<String>) -> Self {
        self.device_id = Some(id.into());
        self
    }

    /// Add an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the timeout.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout_ms = Some(duration.as_millis() as u64);
        self
    }

    /// Request an overwrite install.
    pub fn reinstall(mut self, reinstall: bool) -> Self {
        self.options.reinstall = reinstall;
        self
    }

    /// Effective timeout; zero is rejected.
    pub fn effective_timeout(&self) -> Result<Duration, ValidationError> {
        match self.timeout_ms {
            None => Ok(DEFAULT_TIMEOUT),
            Some(0) => Err(ValidationError::InvalidTimeout),
            Some(ms) => Ok(Duration::from_millis(ms)),
        }
    }
}

/// A request mapped onto the logical command surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeCommand {
    /// Send a key code.
    KeyEvent { code: String },
    /// Capture the screen as PNG.
    ScreenCap,
    /// Reboot the device.
    Reboot,
    /// Set the device clock to `stamp` (`YYYYMMDD.HHMMSS`).
    SyncTime { stamp: String },
    /// Restart as root, then remount system partitions.
    Remount,
    /// Install a package file.
    Install { apk: PathBuf, reinstall: bool },
    /// Remove a package.
    Uninstall { package: String },
    /// List installed packages.
    ListPackages { filters: Vec<String> },
    /// Run a device shell command.
    Shell { args: Vec<String> },
    /// Anything else, forwarded as-is.
    Passthrough { command: String, args: Vec<String> },
}

impl BridgeCommand {
    /// Map a request onto the command surface, checking per-command arguments.
    pub async fn prepare(request: &CommandRequest) -> Result<Self, ValidationError> {
        let args = &request.args;
        let command = match request.command.as_str() {
            "keyevent" => {
                let value = args.first();
                let code = value
                    .and_then(|v| map_key_event(v))
                    .ok_or_else(|| ValidationError::InvalidKeyEvent {
                        value: value.cloned(),
                    })?;
                Self::KeyEvent { code }
            }
            "screencap" => Self::ScreenCap,
            "reboot" => Self::Reboot,
            "sync-time" => Self::SyncTime {
                stamp: chrono::Local::now().format("%Y%m%d.%H%M%S").to_string(),
            },
            "remount" => Self::Remount,
            "install" => {
                let raw = args
                    .first()
                    .filter(|p| !p.is_empty())
                    .ok_or(ValidationError::ApkPathRequired)?;
                Self::Install {
                    apk: readable_package(raw).await?,
                    reinstall: request.options.reinstall,
                }
            }
            "uninstall" => {
                let package = args
                    .first()
                    .filter(|p| !p.is_empty())
                    .ok_or(ValidationError::PackageNameRequired)?;
                Self::Uninstall {
                    package: package.clone(),
                }
            }
            "list-packages" => Self::ListPackages {
                filters: args.clone(),
            },
            "shell" => {
                if args.is_empty() {
                    return Err(ValidationError::ShellArgsRequired);
                }
                Self::Shell { args: args.clone() }
            }
            other => Self::Passthrough {
                command: other.to_string(),
                args: args.clone(),
            },
        };
        Ok(command)
    }

    /// Bridge arguments for this command, without the device prefix.
    ///
    /// `Remount` yields its second step; the executor runs `root` first.
    pub fn subcommand_args(&self) -> Vec<String> {
        let parts: Vec<String> = match self {
            Self::KeyEvent { code } => vec![
                "shell".into(),
                "input".into(),
                "keyevent".into(),
                code.clone(),
            ],
            Self::ScreenCap => vec!["exec-out".into(), "screencap".into(), "-p".into()],
            Self::Reboot => vec!["reboot".into()],
            Self::SyncTime { stamp } => vec![
                "shell".into(),
                "su".into(),
                "-c".into(),
                "date".into(),
                "-s".into(),
                stamp.clone(),
            ],
            Self::Remount => vec!["remount".into()],
            Self::Install { apk, reinstall } => {
                let mut parts = vec!["install".to_string()];
                if *reinstall {
                    parts.push("-r".into());
                }
                parts.push(apk.display().to_string());
                parts
            }
            Self::Uninstall { package } => vec!["uninstall".into(), package.clone()],
            Self::ListPackages { filters } => {
                let mut parts: Vec<String> =
                    vec!["shell".into(), "pm".into(), "list".into(), "packages".into()];
                parts.extend(filters.iter().cloned());
                parts
            }
            Self::Shell { args } => {
                let mut parts = vec!["shell".to_string()];
                parts.extend(args.iter().cloned());
                parts
            }
            Self::Passthrough { command, args } => {
                let mut parts = vec![command.clone()];
                parts.extend(args.iter().cloned());
                parts
            }
        };
        parts
    }
}

/// Map a symbolic key name or numeric code to a key code.
pub fn map_key_event(value: &str) -> Option<String> {
    let value = value.to_lowercase();
    match value.as_str() {
        "power" => Some("26".into()),
        "home" => Some("3".into()),
        "back" => Some("4".into()),
        v if !v.is_empty() && v.chars().all(|c| c.is_ascii_digit()) => Some(value),
        _ => None,
    }
}

/// Prefix `args` with `-s <device>` when a device is given.
pub fn device_args<I, S>(device_id: Option<&str>, args: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut argv = Vec::new();
    if let Some(id) = device_id.filter(|id| !id.is_empty()) {
        argv.push("-s".to_string());
        argv.push(id.to_string());
    }
    argv.extend(args.into_iter().map(Into::into));
    argv
}

async fn readable_package(raw: &str) -> Result<PathBuf, ValidationError> {
    let path = Path::new(raw);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let readable = match tokio::fs::metadata(&absolute).await {
        Ok(metadata) if metadata.is_file() => tokio::fs::File::open(&absolute).await.is_ok(),
        _ => false,
    };

    if readable {
        Ok(absolute)
    } else {
        Err(ValidationError::ApkNotFound { path: absolute })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder_chain() {
        let request = CommandRequest::new("install")
            .device("emulator-5554")
            .arg("app.apk")
            .timeout(Duration::from_secs(60))
            .reinstall(true);

        assert_eq!(request.command, "install");
        assert_eq!(request.device_id.as_deref(), Some("emulator-5554"));
        assert_eq!(request.args, vec!["app.apk"]);
        assert_eq!(request.timeout_ms, Some(60_000));
        assert!(request.options.reinstall);
    }

    #[test]
    fn test_request_from_json() {
        let json = r#"{"deviceId": "ABC", "command": "shell", "args": ["ls"], "timeoutMs": 500}"#;
        let request: CommandRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.device_id.as_deref(), Some("ABC"));
        assert_eq!(request.effective_timeout().unwrap(), Duration::from_millis(500));
        assert!(!request.options.reinstall);
    }

    #[test]
    fn test_effective_timeout() {
        assert_eq!(
            CommandRequest::new("devices").effective_timeout().unwrap(),
            DEFAULT_TIMEOUT
        );
        let mut request = CommandRequest::new("devices");
        request.timeout_ms = Some(0);
        assert_eq!(
            request.effective_timeout(),
            Err(ValidationError::InvalidTimeout)
        );
    }

    #[test]
    fn test_map_key_event() {
        assert_eq!(map_key_event("power").as_deref(), Some("26"));
        assert_eq!(map_key_event("HOME").as_deref(), Some("3"));
        assert_eq!(map_key_event("back").as_deref(), Some("4"));
        assert_eq!(map_key_event("187").as_deref(), Some("187"));
        assert_eq!(map_key_event("volume"), None);
        assert_eq!(map_key_event("-1"), None);
        assert_eq!(map_key_event(""), None);
    }

    #[test]
    fn test_device_args() {
        assert_eq!(
            device_args(Some("ABC"), ["reboot"]),
            vec!["-s", "ABC", "reboot"]
        );
        assert_eq!(device_args(None, ["reboot"]), vec!["reboot"]);
        assert_eq!(device_args(Some(""), ["reboot"]), vec!["reboot"]);
    }

    #[tokio::test]
    async fn test_prepare_keyevent() {
        let command = BridgeCommand::prepare(&CommandRequest::new("keyevent").arg("power"))
            .await
            .unwrap();
        assert_eq!(
            command.subcommand_args(),
            vec!["shell", "input", "keyevent", "26"]
        );

        let err = BridgeCommand::prepare(&CommandRequest::new("keyevent").arg("volume"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidKeyEvent {
                value: Some("volume".into())
            }
        );

        let err = BridgeCommand::prepare(&CommandRequest::new("keyevent"))
            .await
            .unwrap_err();
        assert_eq!(err, ValidationError::InvalidKeyEvent { value: None });
    }

    #[tokio::test]
    async fn test_prepare_argument_requirements() {
        assert_eq!(
            BridgeCommand::prepare(&CommandRequest::new("install")).await,
            Err(ValidationError::ApkPathRequired)
        );
        assert_eq!(
            BridgeCommand::prepare(&CommandRequest::new("uninstall")).await,
            Err(ValidationError::PackageNameRequired)
        );
        assert_eq!(
            BridgeCommand::prepare(&CommandRequest::new("shell")).await,
            Err(ValidationError::ShellArgsRequired)
        );
    }

    #[tokio::test]
    async fn test_prepare_install_missing_file() {
        let err = BridgeCommand::prepare(&CommandRequest::new("install").arg("/no/such/app.apk"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::ApkNotFound {
                path: PathBuf::from("/no/such/app.apk")
            }
        );
    }

    #[tokio::test]
    async fn test_prepare_install_reinstall() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let request = CommandRequest::new("install")
            .arg(file.path().display().to_string())
            .reinstall(true);

        let command = BridgeCommand::prepare(&request).await.unwrap();
        assert_eq!(
            command.subcommand_args(),
            vec![
                "install".to_string(),
                "-r".to_string(),
                file.path().display().to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_prepare_surface_argv() {
        let cases: Vec<(CommandRequest, Vec<&str>)> = vec![
            (CommandRequest::new("screencap"), vec!["exec-out", "screencap", "-p"]),
            (CommandRequest::new("reboot").arg("recovery"), vec!["reboot"]),
            (CommandRequest::new("remount"), vec!["remount"]),
            (
                CommandRequest::new("uninstall").arg("com.example"),
                vec!["uninstall", "com.example"],
            ),
            (
                CommandRequest::new("list-packages").arg("-3"),
                vec!["shell", "pm", "list", "packages", "-3"],
            ),
            (
                CommandRequest::new("shell").args(["getprop", "ro.build.version.sdk"]),
                vec!["shell", "getprop", "ro.build.version.sdk"],
            ),
            (
                CommandRequest::new("get-state"),
                vec!["get-state"],
            ),
        ];

        for (request, expected) in cases {
            let command = BridgeCommand::prepare(&request).await.unwrap();
            assert_eq!(command.subcommand_args(), expected, "{}", request.command);
        }
    }

    #[tokio::test]
    async fn test_prepare_sync_time_stamp() {
        let command = BridgeCommand::prepare(&CommandRequest::new("sync-time"))
            .await
            .unwrap();
        let argv = command.subcommand_args();
        assert_eq!(&argv[..5], &["shell", "su", "-c", "date", "-s"]);
        let stamp = &argv[5];
        assert_eq!(stamp.len(), 15);
        assert_eq!(stamp.as_bytes()[8], b'.');
    }
}
