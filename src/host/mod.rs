//! Host platform interfaces consumed by the session keeper
//!
//! The keeper never talks to the operating system directly. Everything it
//! needs from the host — the notification surface, the wake resource, and
//! the task scheduler — is expressed here as traits, with a desktop
//! implementation for real use and an in-memory mock for tests.

pub mod desktop;
pub mod mock;

use anyhow::Result;
use std::time::Duration;

use crate::session::status_channel::{ChannelSpec, Indicator};

/// Identifier of a displayed persistent indicator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndicatorId(u64);

impl IndicatorId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Ownership token for a held wake resource.
///
/// Deliberately not `Clone`: exactly one token exists per acquisition and
/// it is consumed by release.
#[derive(Debug, PartialEq, Eq)]
pub struct WakeToken(u64);

impl WakeToken {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Command the host environment may redeliver after killing and
/// relaunching the task process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Start,
    Stop,
}

/// Relaunch behavior requested from the host scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestartPolicy {
    /// No relaunch; a restart with no pending command resolves to Stopped
    #[default]
    None,
    /// Relaunch the task and redeliver the given command, at least once
    Redeliver(SessionCommand),
}

/// Notification surface of the host: channel registration and the
/// persistent indicator itself.
pub trait NotificationHost: Send + Sync {
    /// Register the status channel. Must behave as an idempotent upsert.
    fn register_channel(&self, spec: &ChannelSpec) -> Result<()>;

    /// Display the persistent indicator and return its handle.
    fn show_indicator(&self, indicator: &Indicator) -> Result<IndicatorId>;

    /// Dismiss a previously shown indicator.
    fn dismiss_indicator(&self, id: &IndicatorId) -> Result<()>;
}

/// Device wake resource preventing CPU suspension while held.
pub trait WakeSource: Send + Sync {
    /// Acquire the wake resource with a hard upper bound on the hold.
    /// The host auto-releases once the bound elapses.
    fn acquire_wake(&self, max_hold: Duration) -> Result<WakeToken>;

    /// Release a held wake resource. Releasing an already-released token
    /// is a no-op for the host.
    fn release_wake(&self, token: &WakeToken) -> Result<()>;
}

/// Task scheduler surface: foreground classification and restart policy.
pub trait TaskScheduler: Send + Sync {
    /// Mark the task foreground-classified, backed by the shown indicator.
    fn promote_to_foreground(&self, indicator: &IndicatorId) -> Result<()>;

    /// Remove the foreground classification.
    fn demote_from_foreground(&self) -> Result<()>;

    /// Record what the host should do if it kills and relaunches the task.
    fn set_restart_policy(&self, policy: RestartPolicy) -> Result<()>;
}

/// Umbrella trait for a complete host platform.
pub trait HostPlatform: NotificationHost + WakeSource + TaskScheduler {}

impl<T: NotificationHost + WakeSource + TaskScheduler> HostPlatform for T {}
