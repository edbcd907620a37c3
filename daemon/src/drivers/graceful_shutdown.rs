use log::{debug, error, info};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinSet;

use super::Driver;

/// Resolves on ctrl+c, or on SIGTERM where there is one (`docker stop`).
async fn shutdown_signal() -> std::io::Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            received = tokio::signal::ctrl_c() => received.map(|_| "ctrl+c"),
            _ = terminate.recv() => Ok("SIGTERM"),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.map(|_| "ctrl+c")
    }
}

pub struct GracefulShutdown {
    drivers: Vec<Arc<dyn Driver>>,
    stop_notify: Arc<Notify>,
}

impl GracefulShutdown {
    pub fn new(stop_notify: Arc<Notify>) -> Self {
        Self {
            drivers: vec![],
            stop_notify,
        }
    }

    pub fn add_driver(&mut self, driver: Arc<dyn Driver>) {
        debug!("driver {:?} registered", driver.get_driver_type());
        self.drivers.push(driver);
    }

    /// Runs every driver until all of them have returned.
    ///
    /// A stop signal wakes everything waiting on `stop_notify`; drivers that
    /// fail on their own (e.g. a port already in use) end early without
    /// stopping the others.
    pub async fn run(self) {
        let mut drivers = JoinSet::new();
        for driver in self.drivers {
            drivers.spawn(async move {
                driver.run().await;
                driver.get_driver_type()
            });
        }

        let signal = shutdown_signal();
        let mut signal = std::pin::pin!(signal);
        let mut signalled = false;
        loop {
            tokio::select! {
                received = &mut signal, if !signalled => {
                    signalled = true;
                    match received {
                        Ok(source) => {
                            info!("{} received, shutting down", source);
                            self.stop_notify.notify_waiters();
                        }
                        Err(e) => error!("can't install shutdown signal handler: {}", e),
                    }
                }
                finished = drivers.join_next() => match finished {
                    Some(Ok(driver_type)) => debug!("driver {:?} stopped", driver_type),
                    Some(Err(e)) => error!("driver task failed: {}", e),
                    None => break,
                },
            }
        }
    }
}
