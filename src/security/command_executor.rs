//! CommandExecutor: child process execution for docker and the scanner CLI
//!
//! # Behaviour
//!
//! - **No shell**: arguments are passed as a vector to `tokio::process::Command`
//! - **Credentials**: `MEND_EMAIL`, `MEND_USER_KEY` and `MEND_URL` are injected on top of
//!   the inherited environment
//! - **Quiet**: the command line is never echoed into the build log, only the child's output
//! - **Closed stdin**: children cannot block waiting for input
//! - **Cancellation**: dropping the returned future kills the child
//!
//! # Example
//!
//! ```rust,no_run
//! use mend_image_scan::core::{ConsoleLog, ProcessInvocation, ProcessRunner};
//! use mend_image_scan::security::{AccessKey, CommandExecutor, ScannerEnvironment};
//!
//! # async fn example() -> Result<(), mend_image_scan::core::ScanError> {
//! let executor = CommandExecutor::new(".")?;
//! let env = ScannerEnvironment::new("dev@example.com", AccessKey::new("key"), "https://saas.mend.io");
//!
//! let outcome = executor
//!     .execute(ProcessInvocation::streaming("docker", ["version"], &env, &ConsoleLog))
//!     .await?;
//! println!("docker exited with {:?}", outcome.code);
//! # Ok(())
//! # }
//! ```

use crate::core::build_log::BuildLog;
use crate::core::error::ScanError;
use crate::core::traits::{OutputSink, ProcessInvocation, ProcessOutcome, ProcessRunner};
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::debug;

/// Process runner backed by `tokio::process`
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    /// Working directory where commands will be executed
    working_dir: PathBuf,
}

impl CommandExecutor {
    /// Create a new CommandExecutor with working directory validation.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::Io` if the directory does not exist.
    pub fn new<P: AsRef<Path>>(working_dir: P) -> Result<Self, ScanError> {
        let working_dir = working_dir.as_ref().to_path_buf();

        if !working_dir.is_dir() {
            return Err(ScanError::io_at(
                "Invalid working directory",
                working_dir,
                io::Error::from(io::ErrorKind::NotFound),
            ));
        }

        Ok(Self { working_dir })
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    fn spawn(command: &mut Command, program: &str) -> Result<tokio::process::Child, ScanError> {
        command.spawn().map_err(|e| ScanError::Execution {
            program: program.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl ProcessRunner for CommandExecutor {
    async fn execute(&self, invocation: ProcessInvocation<'_>) -> Result<ProcessOutcome, ScanError> {
        debug!(command = %invocation.command_line(), "starting process");

        let ProcessInvocation {
            program,
            args,
            env,
            output,
        } = invocation;

        let mut command = Command::new(&program);
        command
            .args(&args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        env.apply(&mut command);

        let wait_failed = |e: io::Error| ScanError::Execution {
            program: program.clone(),
            message: e.to_string(),
        };

        let status = match output {
            OutputSink::Capture(file) => {
                let stderr = file
                    .try_clone()
                    .map_err(|e| ScanError::io("Failed to duplicate capture file handle", e))?;
                command.stdout(Stdio::from(file)).stderr(Stdio::from(stderr));

                let mut child = Self::spawn(&mut command, &program)?;
                child.wait().await.map_err(wait_failed)?
            }
            OutputSink::Log(log) => {
                command.stdout(Stdio::piped()).stderr(Stdio::piped());

                let mut child = Self::spawn(&mut command, &program)?;
                let stdout = child.stdout.take();
                let stderr = child.stderr.take();
                let (out, err) = tokio::join!(forward_lines(stdout, log), forward_lines(stderr, log));
                out.map_err(wait_failed)?;
                err.map_err(wait_failed)?;

                child.wait().await.map_err(wait_failed)?
            }
        };

        debug!(program = %program, code = ?status.code(), "process exited");
        Ok(ProcessOutcome {
            code: status.code(),
        })
    }
}

/// Copy a child stream into the build log line by line
async fn forward_lines<R>(stream: Option<R>, log: &dyn BuildLog) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let Some(stream) = stream else {
        return Ok(());
    };

    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf);
        log.line(line.trim_end_matches(['\n', '\r']));
    }
}
