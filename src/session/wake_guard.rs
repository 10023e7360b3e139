//! Scoped guard for the device wake resource
//!
//! Owns the host-issued token for the duration of a Running session. The
//! hold is bounded: the host auto-releases once `max_hold` elapses, which
//! is a safety fence against a stuck task, not a steady-state expectation.

use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::host::{HostPlatform, WakeSource};

/// Exclusive hold on the wake resource.
///
/// Exactly one guard exists per Running session. Release is idempotent;
/// dropping a still-held guard releases it and logs the leak.
pub struct WakeGuard {
    host: Arc<dyn HostPlatform>,
    token: Option<crate::host::WakeToken>,
    acquired_at: Instant,
    max_hold: Duration,
}

impl WakeGuard {
    /// Acquire the wake resource with the given hard upper bound.
    pub fn acquire(host: Arc<dyn HostPlatform>, max_hold: Duration) -> Result<Self> {
        let token = host.acquire_wake(max_hold)?;
        debug!(
            "Wake guard acquired (token {}, bound {}s)",
            token.raw(),
            max_hold.as_secs()
        );

        Ok(Self {
            host,
            token: Some(token),
            acquired_at: Instant::now(),
            max_hold,
        })
    }

    /// Whether the guard still holds its token.
    pub fn is_held(&self) -> bool {
        self.token.is_some()
    }

    /// Whether the safety bound has elapsed. The host has auto-released
    /// the underlying resource by then even though the token is still in
    /// our bookkeeping.
    pub fn is_expired(&self) -> bool {
        self.token.is_some() && self.acquired_at.elapsed() >= self.max_hold
    }

    /// Host token identifier, while held.
    pub fn token_id(&self) -> Option<u64> {
        self.token.as_ref().map(|token| token.raw())
    }

    /// Release the wake resource. Releasing an already-released guard is
    /// a no-op.
    pub fn release(&mut self) -> Result<()> {
        let Some(token) = self.token.take() else {
            debug!("Wake guard already released");
            return Ok(());
        };

        self.host.release_wake(&token)?;
        debug!("Wake guard released (token {})", token.raw());

        Ok(())
    }
}

impl Drop for WakeGuard {
    fn drop(&mut self) {
        if self.token.is_some() {
            warn!("Wake guard dropped while still held, releasing");
            if let Err(err) = self.release() {
                warn!("Failed to release wake guard on drop: {}", err);
            }
        }
    }
}

impl std::fmt::Debug for WakeGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WakeGuard")
            .field("token", &self.token)
            .field("max_hold", &self.max_hold)
            .finish()
    }
}
