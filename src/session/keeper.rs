//! Session keeper state machine
//!
//! Owns the background task's lifecycle: the Stopped/Running transitions,
//! the status indicator, the wake guard, and the restart policy recorded
//! with the host scheduler. All transition side effects happen
//! synchronously inside `start`/`stop`; a failed `start` unwinds whatever
//! it had already done and leaves the session Stopped.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{Config, IndicatorConfig};
use crate::host::{
    HostPlatform, IndicatorId, NotificationHost, RestartPolicy, SessionCommand, TaskScheduler,
};

use super::status_channel::{ChannelSpec, StatusChannel, build_indicator};
use super::wake_guard::WakeGuard;

/// Session state tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Stopped,
    Running,
}

/// Error types for session transitions
#[derive(Debug, thiserror::Error)]
pub enum KeeperError {
    #[error("Status channel registration failed: {0}")]
    ChannelRegistration(String),
    #[error("Status indicator could not be displayed: {0}")]
    IndicatorDisplay(String),
    #[error("Foreground promotion failed: {0}")]
    ForegroundPromotion(String),
    #[error("Wake guard acquisition failed: {0}")]
    WakeAcquisition(String),
    #[error("Restart policy could not be recorded: {0}")]
    RestartPolicy(String),
}

/// Session statistics for diagnostics
#[derive(Debug, Clone, Default)]
pub struct KeeperStats {
    pub started_at: Option<DateTime<Utc>>,
    pub starts: u64,
    pub stops: u64,
    pub duplicate_commands: u64,
    pub redeliveries: u64,
    pub guard_release_failures: u64,
    pub guard_expirations: u64,
}

/// Point-in-time snapshot of the session for status surfaces
#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub state: SessionState,
    pub channel_registered: bool,
    pub indicator_shown: bool,
    pub wake_guard_held: bool,
    pub stats: KeeperStats,
}

/// State machine keeping one screen-sharing session alive.
pub struct SessionKeeper {
    state: SessionState,
    host: Arc<dyn HostPlatform>,
    status_channel: StatusChannel,
    indicator_config: IndicatorConfig,
    max_hold: Duration,
    wake_guard: Option<WakeGuard>,
    indicator: Option<IndicatorId>,
    stats: KeeperStats,
}

impl SessionKeeper {
    /// Create a new keeper in the Stopped state.
    pub fn new(config: &Config, host: Arc<dyn HostPlatform>) -> Self {
        Self {
            state: SessionState::Stopped,
            status_channel: StatusChannel::new(ChannelSpec::from_config(&config.channel)),
            indicator_config: config.indicator.clone(),
            max_hold: Duration::from_secs(config.wake.max_hold_secs),
            host,
            wake_guard: None,
            indicator: None,
            stats: KeeperStats::default(),
        }
    }

    /// Transition Stopped -> Running.
    ///
    /// Side effect order: status channel, indicator, foreground
    /// classification, wake guard, restart policy. Any failure unwinds the
    /// steps already taken and leaves the session Stopped. A start while
    /// already Running is a success no-op that re-acquires nothing.
    pub fn start(&mut self) -> Result<(), KeeperError> {
        self.reconcile();

        if self.state == SessionState::Running {
            debug!("Start command while already running, nothing to do");
            self.stats.duplicate_commands += 1;
            return Ok(());
        }

        self.status_channel
            .ensure_registered(self.host.as_ref())
            .map_err(|err| KeeperError::ChannelRegistration(err.to_string()))?;

        let indicator = build_indicator(self.status_channel.spec(), &self.indicator_config);
        let indicator_id = self
            .host
            .show_indicator(&indicator)
            .map_err(|err| KeeperError::IndicatorDisplay(err.to_string()))?;

        if let Err(err) = self.host.promote_to_foreground(&indicator_id) {
            self.dismiss_best_effort(&indicator_id);
            return Err(KeeperError::ForegroundPromotion(err.to_string()));
        }

        let guard = match WakeGuard::acquire(self.host.clone(), self.max_hold) {
            Ok(guard) => guard,
            Err(err) => {
                self.demote_best_effort();
                self.dismiss_best_effort(&indicator_id);
                return Err(KeeperError::WakeAcquisition(err.to_string()));
            }
        };

        if let Err(err) = self
            .host
            .set_restart_policy(RestartPolicy::Redeliver(SessionCommand::Start))
        {
            let mut guard = guard;
            if let Err(release_err) = guard.release() {
                warn!("Wake guard release during unwind failed: {}", release_err);
            }
            self.demote_best_effort();
            self.dismiss_best_effort(&indicator_id);
            return Err(KeeperError::RestartPolicy(err.to_string()));
        }

        debug_assert!(self.wake_guard.is_none());
        self.indicator = Some(indicator_id);
        self.wake_guard = Some(guard);
        self.state = SessionState::Running;
        self.stats.starts += 1;
        self.stats.started_at = Some(Utc::now());

        info!("Screen sharing session running");
        Ok(())
    }

    /// Transition Running -> Stopped.
    ///
    /// Guard release failure is non-fatal but counted as a latent leak;
    /// the command still succeeds and the session resolves to Stopped. A
    /// stop while already Stopped is a success no-op.
    pub fn stop(&mut self) -> Result<(), KeeperError> {
        self.reconcile();

        if self.state == SessionState::Stopped {
            debug!("Stop command while already stopped, nothing to do");
            self.stats.duplicate_commands += 1;
            return Ok(());
        }

        if let Some(mut guard) = self.wake_guard.take() {
            if let Err(err) = guard.release() {
                warn!(
                    "Wake guard release failed, resource may leak until the safety bound: {}",
                    err
                );
                self.stats.guard_release_failures += 1;
            }
        }

        if let Err(err) = self.host.demote_from_foreground() {
            warn!("Foreground demotion failed during stop: {}", err);
        }

        if let Some(indicator_id) = self.indicator.take() {
            if let Err(err) = self.host.dismiss_indicator(&indicator_id) {
                warn!("Indicator dismissal failed during stop: {}", err);
            }
        }

        if let Err(err) = self.host.set_restart_policy(RestartPolicy::None) {
            warn!("Failed to clear restart policy during stop: {}", err);
        }

        self.state = SessionState::Stopped;
        self.stats.stops += 1;
        self.stats.started_at = None;

        info!("Screen sharing session stopped");
        Ok(())
    }

    /// Re-entry point for the host's command redelivery after it killed
    /// and relaunched the task process. A redelivered start behaves
    /// exactly like one arriving from the bridge; a relaunch with no
    /// pending command resolves to Stopped and takes no action.
    pub fn redeliver(&mut self, command: Option<SessionCommand>) -> Result<(), KeeperError> {
        self.stats.redeliveries += 1;

        match command {
            Some(SessionCommand::Start) => {
                info!("Host redelivered start command, re-entering running state");
                self.start()
            }
            Some(SessionCommand::Stop) => {
                info!("Host redelivered stop command");
                self.stop()
            }
            None => {
                debug!("Relaunched with no pending command, staying stopped");
                Ok(())
            }
        }
    }

    /// Reconcile bookkeeping with a host auto-release of an expired wake
    /// guard. The session stays Running; the expiry is a leak to diagnose,
    /// not an automatic stop.
    pub fn reconcile(&mut self) {
        let expired = self
            .wake_guard
            .as_ref()
            .map(WakeGuard::is_expired)
            .unwrap_or(false);

        if expired {
            warn!("Wake guard safety bound elapsed while running, dropping stale handle");
            self.stats.guard_expirations += 1;
            if let Some(mut guard) = self.wake_guard.take() {
                // Host already reclaimed the resource; release is a no-op there
                if let Err(err) = guard.release() {
                    debug!("Stale wake guard release failed: {}", err);
                }
            }
        }
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the wake guard is currently held.
    pub fn wake_guard_held(&self) -> bool {
        self.wake_guard.as_ref().map(WakeGuard::is_held).unwrap_or(false)
    }

    /// Host token of the held wake guard, for diagnostics.
    pub fn wake_token_id(&self) -> Option<u64> {
        self.wake_guard.as_ref().and_then(WakeGuard::token_id)
    }

    /// Reconciled snapshot for status surfaces.
    pub fn status(&mut self) -> SessionStatus {
        self.reconcile();

        SessionStatus {
            state: self.state,
            channel_registered: self.status_channel.is_registered(),
            indicator_shown: self.indicator.is_some(),
            wake_guard_held: self.wake_guard_held(),
            stats: self.stats.clone(),
        }
    }

    /// Get session statistics
    pub fn stats(&self) -> &KeeperStats {
        &self.stats
    }

    fn dismiss_best_effort(&self, indicator_id: &IndicatorId) {
        if let Err(err) = self.host.dismiss_indicator(indicator_id) {
            warn!("Indicator dismissal during unwind failed: {}", err);
        }
    }

    fn demote_best_effort(&self) {
        if let Err(err) = self.host.demote_from_foreground() {
            warn!("Foreground demotion during unwind failed: {}", err);
        }
    }
}

impl Drop for SessionKeeper {
    fn drop(&mut self) {
        if self.state == SessionState::Running {
            warn!("SessionKeeper dropped while running");
        }
    }
}

/// Shared handle to the process-wide session keeper.
pub type SharedKeeper = Arc<tokio::sync::Mutex<SessionKeeper>>;

/// Process-scoped registry owning the single session keeper.
///
/// The keeper is created lazily on first use and its lifetime is
/// independent of any UI-layer object.
pub struct SessionRegistry {
    config: Config,
    host: Arc<dyn HostPlatform>,
    keeper: std::sync::Mutex<Option<SharedKeeper>>,
}

impl SessionRegistry {
    pub fn new(config: Config, host: Arc<dyn HostPlatform>) -> Self {
        Self {
            config,
            host,
            keeper: std::sync::Mutex::new(None),
        }
    }

    /// Return the process-wide keeper handle, creating it on first use.
    pub fn obtain(&self) -> SharedKeeper {
        let mut slot = self.keeper.lock().expect("session registry lock poisoned");

        slot.get_or_insert_with(|| {
            debug!("Creating process-wide session keeper");
            Arc::new(tokio::sync::Mutex::new(SessionKeeper::new(
                &self.config,
                self.host.clone(),
            )))
        })
        .clone()
    }

    /// Return the keeper handle if one has been created.
    pub fn active(&self) -> Option<SharedKeeper> {
        self.keeper
            .lock()
            .expect("session registry lock poisoned")
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::mock::MockHost;

    #[test]
    fn test_registry_returns_single_keeper() {
        let host = Arc::new(MockHost::new());
        let registry = SessionRegistry::new(Config::default(), host);

        assert!(registry.active().is_none());

        let first = registry.obtain();
        let second = registry.obtain();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(registry.active().is_some());
    }

    #[test]
    fn test_new_keeper_starts_stopped() {
        let host = Arc::new(MockHost::new());
        let mut keeper = SessionKeeper::new(&Config::default(), host);

        assert_eq!(keeper.state(), SessionState::Stopped);
        assert!(!keeper.wake_guard_held());

        let status = keeper.status();
        assert!(!status.channel_registered);
        assert!(!status.indicator_shown);
    }

    #[test]
    fn test_redelivery_with_no_pending_command_is_noop() {
        let host = Arc::new(MockHost::new());
        let mut keeper = SessionKeeper::new(&Config::default(), host.clone());

        keeper.redeliver(None).unwrap();

        assert_eq!(keeper.state(), SessionState::Stopped);
        assert_eq!(host.shown_indicators().len(), 0);
        assert_eq!(keeper.stats().redeliveries, 1);
    }
}
