//! Command execution engine.

use std::sync::Arc;

use tracing::{debug, info};

use super::command::{device_args, BridgeCommand, CommandRequest};
use super::result::CommandResult;
use super::runner::ProcessRunner;
use crate::platform::ToolLocator;
use crate::security::CommandGuard;
use crate::Result;

/// Runs validated requests against the bridge executable.
#[derive(Debug)]
pub struct CommandExecutor {
    guard: CommandGuard,
    bridge: Arc<ToolLocator>,
    runner: ProcessRunner,
}

impl CommandExecutor {
    /// Create an executor with the default guard and runner.
    pub fn new(bridge: Arc<ToolLocator>) -> Self {
        Self {
            guard: CommandGuard::default(),
            bridge,
            runner: ProcessRunner::new(),
        }
    }

    pub fn with_guard(mut self, guard: CommandGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn with_runner(mut self, runner: ProcessRunner) -> Self {
        self.runner = runner;
        self
    }

    pub fn guard(&self) -> &CommandGuard {
        &self.guard
    }

    /// Validate, resolve and run a request.
    ///
    /// Nothing is spawned unless the guard and the per-command argument
    /// checks both pass.
    pub async fn execute(&self, request: &CommandRequest) -> Result<CommandResult> {
        self.guard.validate(&request.command, &request.args)?;
        let timeout = request.effective_timeout()?;
        let command = BridgeCommand::prepare(request).await?;

        let program = self.bridge.locate();
        let device = request.device_id.as_deref();
        let argv = device_args(device, command.subcommand_args());

        match command {
            BridgeCommand::ScreenCap => {
                let path = self.runner.capture(&program, &argv, timeout).await?;
                info!("Screen captured to {}", path.display());
                Ok(CommandResult::captured(path))
            }
            BridgeCommand::Remount => {
                let root = self
                    .runner
                    .execute(&program, &device_args(device, ["root"]), timeout)
                    .await?;
                if !root.success() {
                    debug!("root exited with {:?}", root.exit_code);
                }
                self.runner.execute(&program, &argv, timeout).await
            }
            _ => self.runner.execute(&program, &argv, timeout).await,
        }
    }
}
