//! Asking the operator for a verification code.
//!
//! stdin and stdout carry the transport, so the terminal prompt talks to the
//! controlling terminal directly.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use cloudgate_providers::BoxFuture;
use tracing::{debug, warn};

/// Source of out-of-band verification codes.
pub trait ChallengePrompt: Send + Sync {
    /// Shows `message` and returns the entered code, or `None` when no code
    /// can be obtained. The caller bounds the wait.
    fn request_code<'a>(&'a self, backend: &'a str, message: &'a str)
    -> BoxFuture<'a, Option<String>>;
}

/// Prompts on the controlling terminal.
#[derive(Debug, Clone)]
pub struct TerminalPrompt {
    device: PathBuf,
}

impl Default for TerminalPrompt {
    fn default() -> Self {
        Self {
            device: PathBuf::from("/dev/tty"),
        }
    }
}

impl TerminalPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    fn ask(device: &Path, backend: &str, message: &str) -> std::io::Result<String> {
        let mut tty = OpenOptions::new().read(true).write(true).open(device)?;
        write!(tty, "[cloudgate] {backend}: {message}: ")?;
        tty.flush()?;
        let mut line = String::new();
        BufReader::new(tty).read_line(&mut line)?;
        Ok(line.trim().to_string())
    }
}

impl ChallengePrompt for TerminalPrompt {
    fn request_code<'a>(
        &'a self,
        backend: &'a str,
        message: &'a str,
    ) -> BoxFuture<'a, Option<String>> {
        let device = self.device.clone();
        let backend = backend.to_string();
        let message = message.to_string();
        Box::pin(async move {
            // An abandoned read keeps its blocking thread until the terminal
            // delivers a line.
            let answer =
                tokio::task::spawn_blocking(move || Self::ask(&device, &backend, &message)).await;
            match answer {
                Ok(Ok(code)) if !code.is_empty() => Some(code),
                Ok(Ok(_)) => {
                    debug!("Empty verification code entered");
                    None
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "No terminal available for the verification prompt");
                    None
                }
                Err(e) => {
                    warn!(error = %e, "Verification prompt task failed");
                    None
                }
            }
        })
    }
}

/// Never obtains a code; for unattended runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrompt;

impl ChallengePrompt for NoPrompt {
    fn request_code<'a>(&'a self, _: &'a str, _: &'a str) -> BoxFuture<'a, Option<String>> {
        Box::pin(async { None })
    }
}
