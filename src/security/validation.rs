//! Pre-flight validation of bridge commands and their arguments.

use std::path::PathBuf;

use serde_json::{json, Value};

/// Default maximum length of a single token.
pub const DEFAULT_MAX_ARG_LENGTH: usize = 1024;

/// Tokens rejected outright (compared case-insensitively).
const DANGEROUS_TOKENS: [&str; 3] = ["rm", "mkfs", "format"];

/// Shell operators rejected anywhere inside a token.
const SHELL_OPERATORS: [&str; 8] = ["&&", "||", "|", ";", "&", ">", ">>", "<"];

/// Default substring blacklist.
pub fn default_blacklist() -> Vec<String> {
    [
        "reboot bootloader",
        ":(){:|:&};:", // Fork bomb
        "&&",
        "||",
        "|",
        ";",
        ">",
        ">>",
        "<",
        "$(",
        "${",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Guard configuration.
#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// Maximum length of a single token, in characters.
    pub max_arg_length: usize,
    /// Substrings rejected in any token (case-sensitive).
    pub blacklist: Vec<String>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            max_arg_length: DEFAULT_MAX_ARG_LENGTH,
            blacklist: default_blacklist(),
        }
    }
}

/// Synchronous validator for `[command, ...args]` token sequences.
///
/// Each token runs through the checks in a fixed order (length, dangerous
/// token, reboot combination, blacklist, shell operators, control
/// characters) and the sequence stops at the first failure.
#[derive(Debug, Clone, Default)]
pub struct CommandGuard {
    config: GuardConfig,
}

impl CommandGuard {
    /// Create a new guard with the given config.
    pub fn new(config: GuardConfig) -> Self {
        Self { config }
    }

    /// Validate a command and its arguments.
    pub fn validate<S: AsRef<str>>(&self, command: &str, args: &[S]) -> Result<(), ValidationError> {
        let tokens: Vec<&str> = std::iter::once(command)
            .chain(args.iter().map(|a| a.as_ref()))
            .collect();
        let has_reboot = tokens.iter().any(|t| t.eq_ignore_ascii_case("reboot"));

        for token in tokens.iter().copied().filter(|t| !t.is_empty()) {
            if token.chars().count() > self.config.max_arg_length {
                return Err(ValidationError::ArgTooLong {
                    token: token.to_string(),
                    max: self.config.max_arg_length,
                });
            }

            if DANGEROUS_TOKENS
                .iter()
                .any(|d| token.eq_ignore_ascii_case(d))
            {
                return Err(ValidationError::DangerousToken {
                    token: token.to_string(),
                });
            }

            if has_reboot && token.eq_ignore_ascii_case("bootloader") {
                return Err(ValidationError::DangerousRebootCombo);
            }

            if let Some(entry) = self
                .config
                .blacklist
                .iter()
                .find(|entry| !entry.is_empty() && token.contains(entry.as_str()))
            {
                return Err(ValidationError::BlacklistHit {
                    token: token.to_string(),
                    entry: entry.clone(),
                });
            }

            if let Some(operator) = SHELL_OPERATORS.iter().find(|op| token.contains(*op)) {
                return Err(ValidationError::ShellOperatorForbidden {
                    token: token.to_string(),
                    operator: operator.to_string(),
                });
            }

            if let Some(c) = token.chars().find(|c| (*c as u32) < 0x20) {
                return Err(ValidationError::InvalidControlChar {
                    token: token.to_string(),
                    code: c as u32,
                });
            }
        }

        Ok(())
    }

    /// Report whether validation would reject the command.
    pub fn is_dangerous<S: AsRef<str>>(&self, command: &str, args: &[S]) -> bool {
        self.validate(command, args).is_err()
    }

    /// Get the max token length.
    pub fn max_arg_length(&self) -> usize {
        self.config.max_arg_length
    }
}

/// Validation errors.
///
/// Covers the guard checks and the per-command argument requirements of
/// the logical command surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Token exceeds the maximum length.
    ArgTooLong { token: String, max: usize },
    /// Token is a known destructive command.
    DangerousToken { token: String },
    /// `reboot` combined with `bootloader`.
    DangerousRebootCombo,
    /// Token contains a blacklisted substring.
    BlacklistHit { token: String, entry: String },
    /// Token contains a shell operator.
    ShellOperatorForbidden { token: String, operator: String },
    /// Token contains a control character.
    InvalidControlChar { token: String, code: u32 },
    /// `keyevent` value is neither a known name nor a numeric code.
    InvalidKeyEvent { value: Option<String> },
    /// `install` without a package file path.
    ApkPathRequired,
    /// `install` package file missing or unreadable.
    ApkNotFound { path: PathBuf },
    /// `uninstall` without a package name.
    PackageNameRequired,
    /// `shell` without arguments.
    ShellArgsRequired,
    /// Timeout must be greater than zero.
    InvalidTimeout,
}

impl ValidationError {
    /// Stable tag for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ArgTooLong { .. } => "ARG_TOO_LONG",
            Self::DangerousToken { .. } => "DANGEROUS_TOKEN",
            Self::DangerousRebootCombo => "DANGEROUS_REBOOT",
            Self::BlacklistHit { .. } => "BLACKLIST_HIT",
            Self::ShellOperatorForbidden { .. } => "SHELL_OPERATOR_FORBIDDEN",
            Self::InvalidControlChar { .. } => "INVALID_CONTROL_CHAR",
            Self::InvalidKeyEvent { .. } => "INVALID_KEY_EVENT",
            Self::ApkPathRequired => "APK_PATH_REQUIRED",
            Self::ApkNotFound { .. } => "APK_NOT_FOUND",
            Self::PackageNameRequired => "PACKAGE_NAME_REQUIRED",
            Self::ShellArgsRequired => "SHELL_ARGS_REQUIRED",
            Self::InvalidTimeout => "INVALID_TIMEOUT",
        }
    }

    /// Structured payload, if any.
    pub fn details(&self) -> Option<Value> {
        match self {
            Self::ArgTooLong { token, max } => Some(json!({ "token": token, "max": max })),
            Self::DangerousToken { token } => Some(json!({ "token": token })),
            Self::BlacklistHit { token, entry } => {
                Some(json!({ "token": token, "blacklist": entry }))
            }
            Self::ShellOperatorForbidden { token, operator } => {
                Some(json!({ "token": token, "operator": operator }))
            }
            Self::InvalidControlChar { token, code } => {
                Some(json!({ "token": token, "code": code }))
            }
            Self::InvalidKeyEvent { value } => Some(json!({ "value": value })),
            Self::ApkNotFound { path } => Some(json!({ "path": path })),
            _ => None,
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ArgTooLong { token, max } => write!(
                f,
                "Argument too long: {} chars (max: {})",
                token.chars().count(),
                max
            ),
            Self::DangerousToken { token } => {
                write!(f, "Dangerous command token detected: \"{}\"", token)
            }
            Self::DangerousRebootCombo => {
                write!(f, "Rebooting into the bootloader is not allowed")
            }
            Self::BlacklistHit { entry, .. } => {
                write!(f, "Command contains blocked pattern: \"{}\"", entry)
            }
            Self::ShellOperatorForbidden { operator, .. } => {
                write!(f, "Command contains forbidden shell operator \"{}\"", operator)
            }
            Self::InvalidControlChar { code, .. } => {
                write!(f, "Command contains control character 0x{:02x}", code)
            }
            Self::InvalidKeyEvent { value } => write!(
                f,
                "Unsupported key event {:?}: use power, home, back or a numeric keycode",
                value.as_deref().unwrap_or("")
            ),
            Self::ApkPathRequired => write!(f, "install requires a package file path"),
            Self::ApkNotFound { path } => {
                write!(f, "Package file missing or unreadable: {}", path.display())
            }
            Self::PackageNameRequired => write!(f, "uninstall requires a package name"),
            Self::ShellArgsRequired => write!(f, "shell command cannot be empty"),
            Self::InvalidTimeout => write!(f, "Timeout must be greater than zero"),
        }
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_ARGS: [&str; 0] = [];

    #[test]
    fn test_guard_config_default() {
        let config = GuardConfig::default();
        assert_eq!(config.max_arg_length, 1024);
        assert!(config.blacklist.contains(&"$(".to_string()));
    }

    #[test]
    fn test_validate_ok() {
        let guard = CommandGuard::default();

        assert!(guard.validate("devices", &["-l"]).is_ok());
        assert!(guard.validate("shell", &["pm", "list", "packages"]).is_ok());
        assert!(guard.validate("reboot", &["recovery"]).is_ok());
        assert!(guard.validate("keyevent", &["power"]).is_ok());
    }

    #[test]
    fn test_empty_tokens_skipped() {
        let guard = CommandGuard::default();
        assert!(guard.validate("shell", &["", "ls"]).is_ok());
    }

    #[test]
    fn test_arg_too_long() {
        let guard = CommandGuard::new(GuardConfig {
            max_arg_length: 8,
            ..Default::default()
        });

        let result = guard.validate("shell", &["abcdefghij"]);
        assert_eq!(
            result,
            Err(ValidationError::ArgTooLong {
                token: "abcdefghij".into(),
                max: 8
            })
        );
        assert!(guard.validate("shell", &["abcdefgh"]).is_ok());
    }

    #[test]
    fn test_dangerous_tokens_case_insensitive() {
        let guard = CommandGuard::default();

        for token in ["rm", "RM", "mkfs", "Format"] {
            assert!(
                matches!(
                    guard.validate("shell", &[token]),
                    Err(ValidationError::DangerousToken { .. })
                ),
                "{token} should be rejected"
            );
        }
        // Only whole tokens count.
        assert!(guard.validate("shell", &["rmdir"]).is_ok());
    }

    #[test]
    fn test_reboot_bootloader_combo() {
        let guard = CommandGuard::default();

        assert_eq!(
            guard.validate("reboot", &["bootloader"]),
            Err(ValidationError::DangerousRebootCombo)
        );
        assert_eq!(
            guard.validate("shell", &["BOOTLOADER", "Reboot"]),
            Err(ValidationError::DangerousRebootCombo)
        );
        assert!(guard.validate("shell", &["bootloader"]).is_ok());
    }

    #[test]
    fn test_blacklist_reports_entry() {
        let guard = CommandGuard::default();

        match guard.validate("shell", &["echo", "$(id)"]) {
            Err(ValidationError::BlacklistHit { token, entry }) => {
                assert_eq!(token, "$(id)");
                assert_eq!(entry, "$(");
            }
            other => panic!("unexpected {other:?}"),
        }

        match guard.validate("shell", &[":(){:|:&};:"]) {
            Err(ValidationError::BlacklistHit { entry, .. }) => assert_eq!(entry, ":(){:|:&};:"),
            other => panic!("unexpected {other:?}"),
        }

        match guard.validate("reboot bootloader", &NO_ARGS) {
            Err(ValidationError::BlacklistHit { entry, .. }) => {
                assert_eq!(entry, "reboot bootloader")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_blacklist_is_case_sensitive() {
        let guard = CommandGuard::new(GuardConfig {
            blacklist: vec!["secret".into()],
            ..Default::default()
        });
        assert!(guard.validate("shell", &["SECRET"]).is_ok());
        assert!(guard.validate("shell", &["my-secret"]).is_err());
    }

    #[test]
    fn test_single_ampersand_is_operator() {
        let guard = CommandGuard::default();

        // '&' alone is not blacklisted, so the operator scan catches it.
        assert_eq!(
            guard.validate("shell", &["sleep", "1&"]),
            Err(ValidationError::ShellOperatorForbidden {
                token: "1&".into(),
                operator: "&".into()
            })
        );
    }

    #[test]
    fn test_operator_scan_with_empty_blacklist() {
        let guard = CommandGuard::new(GuardConfig {
            blacklist: Vec::new(),
            ..Default::default()
        });

        match guard.validate("shell", &["a|b"]) {
            Err(ValidationError::ShellOperatorForbidden { operator, .. }) => {
                assert_eq!(operator, "|")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_control_chars_any_position() {
        let guard = CommandGuard::default();

        for token in ["\nls", "l\ts", "ls\r", "x\0"] {
            assert!(
                matches!(
                    guard.validate("shell", &[token]),
                    Err(ValidationError::InvalidControlChar { .. })
                ),
                "{token:?} should be rejected"
            );
        }
        // DEL (0x7f) is above the threshold.
        assert!(guard.validate("shell", &["a\u{7f}"]).is_ok());
    }

    #[test]
    fn test_first_failure_wins() {
        let guard = CommandGuard::new(GuardConfig {
            max_arg_length: 4,
            ..Default::default()
        });

        // Long token with a blacklisted substring: length check fires first.
        assert!(matches!(
            guard.validate("ls", &["a;b;c;d"]),
            Err(ValidationError::ArgTooLong { .. })
        ));

        let guard = CommandGuard::default();
        // Blacklist runs before the control-character scan.
        assert!(matches!(
            guard.validate("shell", &["a;\n"]),
            Err(ValidationError::BlacklistHit { .. })
        ));
        // Earlier tokens are checked before later ones.
        assert!(matches!(
            guard.validate("rm", &["x|y"]),
            Err(ValidationError::DangerousToken { .. })
        ));
    }

    #[test]
    fn test_is_dangerous() {
        let guard = CommandGuard::default();
        assert!(guard.is_dangerous("shell", &["rm", "-rf", "/sdcard"]));
        assert!(!guard.is_dangerous("shell", &["ls", "/sdcard"]));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ValidationError::DangerousRebootCombo.code(), "DANGEROUS_REBOOT");
        assert_eq!(ValidationError::ApkPathRequired.code(), "APK_PATH_REQUIRED");
        let err = ValidationError::BlacklistHit {
            token: "a;b".into(),
            entry: ";".into(),
        };
        assert_eq!(err.details().unwrap()["blacklist"], ";");
        assert!(err.to_string().contains(";"));
    }
}
