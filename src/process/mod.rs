//! Dev-server supervisor
//!
//! Owns the front-end development server child process started by
//! `/start-react`. At most one child is tracked; it can be polled for
//! health, stopped explicitly, and is killed when the supervisor is dropped.
//!
//! On unix the child leads its own process group, and stopping it signals
//! the whole group. `npm start` runs the real server as a grandchild.

use serde::Serialize;
use std::process::{ExitStatus, Stdio};
use thiserror::Error;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use crate::config::DevServerConfig;
use crate::logger;

#[derive(Debug, Error)]
pub enum DevServerError {
    /// Raw OS error text, surfaced verbatim to the client
    #[error("{0}")]
    Spawn(#[source] std::io::Error),
    #[error("failed to stop dev server: {0}")]
    Stop(#[source] std::io::Error),
}

/// Result of a successful `start` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Spawned { pid: Option<u32> },
    AlreadyRunning { pid: Option<u32> },
}

impl StartOutcome {
    pub const fn pid(self) -> Option<u32> {
        match self {
            Self::Spawned { pid } | Self::AlreadyRunning { pid } => pid,
        }
    }
}

/// Observed state of the supervised child
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DevServerStatus {
    Stopped,
    Running {
        #[serde(skip_serializing_if = "Option::is_none")]
        pid: Option<u32>,
    },
    Exited {
        #[serde(skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
    },
}

#[derive(Debug, Default)]
struct Slot {
    child: Option<Child>,
    last_exit: Option<ExitStatus>,
}

impl Drop for Slot {
    fn drop(&mut self) {
        if let Some(child) = self.child.as_ref() {
            kill_group(child);
        }
    }
}

impl Slot {
    /// Reap the child if it has exited on its own
    fn refresh(&mut self) {
        let Some(child) = self.child.as_mut() else {
            return;
        };
        match child.try_wait() {
            Ok(Some(status)) => {
                logger::log_dev_server_exited(&status);
                self.child = None;
                self.last_exit = Some(status);
            }
            Ok(None) => {}
            Err(e) => logger::log_warning(&format!("Failed to poll dev server: {e}")),
        }
    }
}

/// Supervisor for the configured development-server command
#[derive(Debug)]
pub struct DevServer {
    command: DevServerConfig,
    slot: Mutex<Slot>,
}

impl DevServer {
    pub fn new(command: DevServerConfig) -> Self {
        Self {
            command,
            slot: Mutex::new(Slot::default()),
        }
    }

    /// Spawn the dev server unless one is already running.
    ///
    /// Returns as soon as the OS accepted the spawn; readiness of the
    /// child is not awaited.
    pub async fn start(&self) -> Result<StartOutcome, DevServerError> {
        let mut slot = self.slot.lock().await;
        slot.refresh();

        if let Some(child) = slot.child.as_ref() {
            return Ok(StartOutcome::AlreadyRunning { pid: child.id() });
        }

        let child = self.build_command().spawn().map_err(|e| {
            logger::log_error(&format!(
                "Failed to start dev server '{}' in '{}': {e}",
                self.command.program, self.command.working_dir
            ));
            DevServerError::Spawn(e)
        })?;

        let pid = child.id();
        logger::log_dev_server_started(&self.command, pid);
        slot.child = Some(child);
        slot.last_exit = None;
        Ok(StartOutcome::Spawned { pid })
    }

    /// Non-blocking health check
    pub async fn status(&self) -> DevServerStatus {
        let mut slot = self.slot.lock().await;
        slot.refresh();

        match (&slot.child, slot.last_exit) {
            (Some(child), _) => DevServerStatus::Running { pid: child.id() },
            (None, Some(status)) => DevServerStatus::Exited {
                exit_code: status.code(),
            },
            (None, None) => DevServerStatus::Stopped,
        }
    }

    /// Kill and reap the child. Returns its exit status, or `None` when
    /// nothing was running.
    pub async fn stop(&self) -> Result<Option<ExitStatus>, DevServerError> {
        let mut slot = self.slot.lock().await;
        slot.refresh();
        slot.last_exit = None;

        let Some(mut child) = slot.child.take() else {
            return Ok(None);
        };

        if !kill_group(&child) {
            child.kill().await.map_err(DevServerError::Stop)?;
        }
        let status = child.wait().await.map_err(DevServerError::Stop)?;
        logger::log_dev_server_stopped(&status);
        Ok(Some(status))
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args)
            .current_dir(&self.command.working_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }
}

/// SIGKILL the child's process group. Returns false when the group could
/// not be signalled and only the direct child should be killed.
#[cfg(unix)]
fn kill_group(child: &Child) -> bool {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id().and_then(|id| i32::try_from(id).ok()) else {
        return false;
    };
    match killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        Ok(()) => true,
        Err(e) => {
            logger::log_warning(&format!("Failed to signal dev server group {pid}: {e}"));
            false
        }
    }
}

#[cfg(not(unix))]
const fn kill_group(_child: &Child) -> bool {
    false
}
