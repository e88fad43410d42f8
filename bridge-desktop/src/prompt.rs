//! Interactive prompt and browser launch for desktop hosts.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    host::{BrowserLauncher, InteractivePrompt},
};
use std::io::{BufRead, Write};
use tracing::debug;

/// Line-oriented prompt on the controlling terminal.
#[derive(Debug, Clone, Default)]
pub struct StdinPrompt;

impl StdinPrompt {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl InteractivePrompt for StdinPrompt {
    async fn request_input(&self, message: &str) -> Result<Option<String>> {
        let message = message.to_string();
        // Stdin reads block; keep them off the async runtime.
        tokio::task::spawn_blocking(move || {
            let mut stdout = std::io::stdout();
            write!(stdout, "{message}: ")?;
            stdout.flush()?;

            let mut line = String::new();
            let read = std::io::stdin().lock().read_line(&mut line)?;
            if read == 0 {
                // EOF counts as cancellation.
                return Ok(None);
            }
            let trimmed = line.trim();
            Ok(if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            })
        })
        .await
        .map_err(|e| BridgeError::OperationFailed(format!("Prompt task failed: {e}")))?
    }
}

/// Opens URLs with the platform's default browser.
#[derive(Debug, Clone, Default)]
pub struct SystemBrowser;

impl SystemBrowser {
    pub fn new() -> Self {
        Self
    }
}

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &str) -> Result<()> {
        debug!(url, "Opening browser");

        #[cfg(target_os = "macos")]
        let status = std::process::Command::new("open").arg(url).status();
        #[cfg(target_os = "windows")]
        let status = std::process::Command::new("cmd")
            .args(["/C", "start", "", url])
            .status();
        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        let status = std::process::Command::new("xdg-open").arg(url).status();

        let status =
            status.map_err(|e| BridgeError::OperationFailed(format!("Browser launch: {e}")))?;
        if !status.success() {
            return Err(BridgeError::OperationFailed(format!(
                "Browser launcher exited with {status}"
            )));
        }
        Ok(())
    }
}
