use anyhow::Context;

/// SIGINT/SIGTERM listeners, registered as soon as this is built.
///
/// A signal delivered before [`recv`](ShutdownSignals::recv) is awaited is
/// kept and reported by the next `recv`.
pub struct ShutdownSignals {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
    #[cfg(not(unix))]
    ctrl_c: tokio::signal::windows::CtrlC,
}

impl ShutdownSignals {
    pub fn install() -> anyhow::Result<Self> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            Ok(Self {
                interrupt: signal(SignalKind::interrupt())
                    .context("failed to install SIGINT handler")?,
                terminate: signal(SignalKind::terminate())
                    .context("failed to install SIGTERM handler")?,
            })
        }

        #[cfg(not(unix))]
        {
            Ok(Self {
                ctrl_c: tokio::signal::windows::ctrl_c()
                    .context("failed to install Ctrl+C handler")?,
            })
        }
    }

    /// Wait for SIGINT or SIGTERM.
    pub async fn recv(&mut self) {
        #[cfg(unix)]
        tokio::select! {
            _ = self.interrupt.recv() => {
                tracing::info!("Received SIGINT, cleaning up");
            }
            _ = self.terminate.recv() => {
                tracing::info!("Received SIGTERM, cleaning up");
            }
        }

        #[cfg(not(unix))]
        {
            self.ctrl_c.recv().await;
            tracing::info!("Received Ctrl+C, cleaning up");
        }
    }
}
