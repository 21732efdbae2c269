//! Command-line interface for bridgectl.
//!
//! Uses lexopt for minimal binary size overhead (~34KB).

use std::ffi::OsString;
use std::path::PathBuf;

use crate::config::SettingsPatch;
use crate::execution::CommandRequest;
use crate::mirror::MirrorOptions;
use crate::session::StreamOptions;

/// Subcommand to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    /// List connected devices.
    Devices,
    /// Run one bridge command.
    Exec(CommandRequest),
    /// Stream device logs until interrupted.
    Logcat {
        options: StreamOptions,
        /// Save the collected history on exit.
        save: bool,
    },
    /// Mirror a device until interrupted or the tool exits.
    Mirror(MirrorOptions),
    /// Show settings, or update them when any field is given.
    Settings(SettingsUpdate),
}

/// Settings changes requested on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsUpdate {
    pub adb_path: Option<String>,
    pub log_directory: Option<String>,
    pub poll_interval_ms: Option<u64>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn into_patch(self) -> SettingsPatch {
        SettingsPatch {
            adb_path: self.adb_path,
            log_directory: self.log_directory,
            poll_interval_ms: self.poll_interval_ms,
        }
    }
}

/// Command-line arguments.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Bridge executable override.
    pub adb_path: Option<String>,
    /// Mirroring executable override.
    pub scrcpy_path: Option<String>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
    /// Subcommand, if given.
    pub command: Option<CliCommand>,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Long("adb") => {
                result.adb_path = Some(parser.value()?.parse()?);
            }
            Long("scrcpy") => {
                result.scrcpy_path = Some(parser.value()?.parse()?);
            }
            Value(val) => {
                let name = val.string()?;
                result.command = Some(parse_command(&name, &mut parser)?);
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

fn parse_command(name: &str, parser: &mut lexopt::Parser) -> Result<CliCommand, ArgsError> {
    match name {
        "devices" => {
            if let Some(arg) = parser.next()? {
                return Err(arg.unexpected().into());
            }
            Ok(CliCommand::Devices)
        }
        "exec" => parse_exec(parser),
        "logcat" => parse_logcat(parser),
        "mirror" => parse_mirror(parser),
        "settings" => parse_settings(parser),
        other => Err(ArgsError::UnknownCommand(other.to_string())),
    }
}

fn parse_exec(parser: &mut lexopt::Parser) -> Result<CliCommand, ArgsError> {
    use lexopt::prelude::*;

    let mut device: Option<String> = None;
    let mut timeout_ms: Option<u64> = None;
    let mut reinstall = false;
    let mut words = Vec::new();

    while let Some(arg) = parser.next()? {
        match arg {
            Short('s') | Long("serial") => device = Some(parser.value()?.parse()?),
            Short('t') | Long("timeout") => timeout_ms = Some(number(parser, "timeout")?),
            Short('r') | Long("reinstall") => reinstall = true,
            Value(val) => words.push(val.string()?),
            _ => return Err(arg.unexpected().into()),
        }
    }

    let mut words = words.into_iter();
    let command = words.next().ok_or(ArgsError::MissingArgument("command"))?;
    let mut request = CommandRequest::new(command).args(words).reinstall(reinstall);
    request.device_id = device;
    request.timeout_ms = timeout_ms;
    Ok(CliCommand::Exec(request))
}

fn parse_logcat(parser: &mut lexopt::Parser) -> Result<CliCommand, ArgsError> {
    use lexopt::prelude::*;

    let mut options = StreamOptions::default();
    let mut save = false;

    while let Some(arg) = parser.next()? {
        match arg {
            Short('s') | Long("serial") => options.device_id = Some(parser.value()?.parse()?),
            Short('f') | Long("format") => options.format = parser.value()?.parse()?,
            Long("save") => save = true,
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(CliCommand::Logcat { options, save })
}

fn parse_mirror(parser: &mut lexopt::Parser) -> Result<CliCommand, ArgsError> {
    use lexopt::prelude::*;

    let mut options = MirrorOptions::default();

    while let Some(arg) = parser.next()? {
        match arg {
            Short('s') | Long("serial") => options.device_id = parser.value()?.parse()?,
            Long("title") => options.window_title = Some(parser.value()?.parse()?),
            Long("width") => options.window_width = Some(number(parser, "width")?),
            Long("height") => options.window_height = Some(number(parser, "height")?),
            Long("always-on-top") => options.always_on_top = true,
            Long("borderless") => options.no_border = true,
            Long("stay-awake") => options.stay_awake = true,
            _ => return Err(arg.unexpected().into()),
        }
    }

    if options.device_id.is_empty() {
        return Err(ArgsError::MissingArgument("--serial"));
    }
    Ok(CliCommand::Mirror(options))
}

fn parse_settings(parser: &mut lexopt::Parser) -> Result<CliCommand, ArgsError> {
    use lexopt::prelude::*;

    let mut update = SettingsUpdate::default();

    while let Some(arg) = parser.next()? {
        match arg {
            Long("adb-path") => update.adb_path = Some(parser.value()?.parse()?),
            Long("log-dir") => update.log_directory = Some(parser.value()?.parse()?),
            Long("poll-interval") => {
                update.poll_interval_ms = Some(number(parser, "poll-interval")?)
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(CliCommand::Settings(update))
}

fn number<T: std::str::FromStr>(
    parser: &mut lexopt::Parser,
    name: &'static str,
) -> Result<T, ArgsError> {
    use lexopt::prelude::*;

    let value: String = parser.value()?.parse()?;
    value
        .parse()
        .map_err(|_| ArgsError::InvalidValue(name, value))
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"bridgectl {version}
Control plane for device-bridge and screen-mirroring tools

USAGE:
    bridgectl [OPTIONS] <COMMAND> [COMMAND OPTIONS]

COMMANDS:
    devices                     List connected devices
    exec <COMMAND> [ARGS...]    Run a bridge command
        -s, --serial <ID>       Target device
        -t, --timeout <MS>      Timeout in milliseconds [default: 30000]
        -r, --reinstall         Overwrite an installed package (install)
    logcat                      Stream device logs until Ctrl-C
        -s, --serial <ID>       Target device
        -f, --format <FMT>      Listing format [default: time]
            --save              Save the collected log on exit
    mirror                      Mirror a device until Ctrl-C
        -s, --serial <ID>       Target device (required)
            --title <TITLE>     Window title
            --width <PX>        Window width (needs --height)
            --height <PX>       Window height (needs --width)
            --always-on-top     Keep the window above others
            --borderless        Remove window decorations
            --stay-awake        Keep the device awake
    settings                    Show or update settings
            --adb-path <PATH>   Bridge executable override
            --log-dir <DIR>     Directory for saved logs
            --poll-interval <MS> Status polling interval

OPTIONS:
    -c, --config <FILE>     Path to configuration file (JSON)
    -l, --log-level <LVL>   Log level (error, warn, info, debug, trace)
        --adb <PATH>        Bridge executable to use
        --scrcpy <PATH>     Mirroring executable to use
    -h, --help              Print help
    -V, --version           Print version

ENVIRONMENT VARIABLES:
    BRIDGECTL_ADB_PATH      Bridge executable (overrides config)
    BRIDGECTL_SCRCPY_PATH   Mirroring executable (overrides config)
    BRIDGECTL_LOG_DIR       Directory for saved logs
    BRIDGECTL_LOG_LEVEL     Log level (overrides config)
    RUST_LOG                Alternative log level setting

EXAMPLES:
    # List devices
    bridgectl devices

    # Press the home key on one device
    bridgectl exec -s emulator-5554 keyevent home

    # Arguments starting with '-' go after '--'
    bridgectl exec shell -- ls -la /sdcard

    # Mirror with a fixed window size
    bridgectl mirror -s emulator-5554 --width 720 --height 1280
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("bridgectl {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
    /// Unknown subcommand.
    UnknownCommand(String),
    /// Required argument missing.
    MissingArgument(&'static str),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
            Self::UnknownCommand(name) => write!(f, "unknown command: '{}'", name),
            Self::MissingArgument(name) => write!(f, "missing required argument: {}", name),
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}
