//! Mock host platform implementation
//! Used for testing in environments with no real notification surface or
//! wake resource; records every host interaction for assertions.

use anyhow::{Result, anyhow};
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crate::session::status_channel::{ChannelSpec, Indicator};

use super::{IndicatorId, NotificationHost, RestartPolicy, TaskScheduler, WakeSource, WakeToken};

#[derive(Debug, Default)]
struct MockState {
    registered_channels: Vec<ChannelSpec>,
    register_calls: u64,
    shown: Vec<(u64, Indicator)>,
    active_indicators: HashSet<u64>,
    dismissed: Vec<u64>,
    foreground: Option<u64>,
    restart_policy: RestartPolicy,
    acquired_wakes: Vec<(u64, Duration)>,
    active_wakes: HashSet<u64>,
    released_wakes: Vec<u64>,
}

/// In-memory host for tests, with failure injection and simulated wake
/// expiry.
pub struct MockHost {
    state: Mutex<MockState>,
    next_id: AtomicU64,
    fail_register_channel: AtomicBool,
    fail_show_indicator: AtomicBool,
    fail_promote: AtomicBool,
    fail_acquire_wake: AtomicBool,
    fail_release_wake: AtomicBool,
    fail_set_restart_policy: AtomicBool,
}

impl MockHost {
    /// Create a new MockHost
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            next_id: AtomicU64::new(1),
            fail_register_channel: AtomicBool::new(false),
            fail_show_indicator: AtomicBool::new(false),
            fail_promote: AtomicBool::new(false),
            fail_acquire_wake: AtomicBool::new(false),
            fail_release_wake: AtomicBool::new(false),
            fail_set_restart_policy: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().expect("mock host state lock poisoned")
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    // Failure injection

    pub fn fail_register_channel(&self, fail: bool) {
        self.fail_register_channel.store(fail, Ordering::SeqCst);
    }

    pub fn fail_show_indicator(&self, fail: bool) {
        self.fail_show_indicator.store(fail, Ordering::SeqCst);
    }

    pub fn fail_promote(&self, fail: bool) {
        self.fail_promote.store(fail, Ordering::SeqCst);
    }

    pub fn fail_acquire_wake(&self, fail: bool) {
        self.fail_acquire_wake.store(fail, Ordering::SeqCst);
    }

    pub fn fail_release_wake(&self, fail: bool) {
        self.fail_release_wake.store(fail, Ordering::SeqCst);
    }

    pub fn fail_set_restart_policy(&self, fail: bool) {
        self.fail_set_restart_policy.store(fail, Ordering::SeqCst);
    }

    /// Simulate the platform auto-releasing a wake hold whose safety
    /// bound elapsed. Not recorded as an explicit release.
    pub fn expire_wake(&self, token_id: u64) {
        self.lock().active_wakes.remove(&token_id);
    }

    // Recorded state accessors

    pub fn register_channel_calls(&self) -> u64 {
        self.lock().register_calls
    }

    pub fn registered_channels(&self) -> Vec<ChannelSpec> {
        self.lock().registered_channels.clone()
    }

    pub fn shown_indicators(&self) -> Vec<(u64, Indicator)> {
        self.lock().shown.clone()
    }

    pub fn active_indicator_count(&self) -> usize {
        self.lock().active_indicators.len()
    }

    pub fn dismissed_indicators(&self) -> Vec<u64> {
        self.lock().dismissed.clone()
    }

    pub fn foreground_indicator(&self) -> Option<u64> {
        self.lock().foreground
    }

    pub fn restart_policy(&self) -> RestartPolicy {
        self.lock().restart_policy
    }

    pub fn acquired_wake_tokens(&self) -> Vec<u64> {
        self.lock().acquired_wakes.iter().map(|(id, _)| *id).collect()
    }

    pub fn acquired_wake_bounds(&self) -> Vec<Duration> {
        self.lock()
            .acquired_wakes
            .iter()
            .map(|(_, bound)| *bound)
            .collect()
    }

    pub fn active_wake_count(&self) -> usize {
        self.lock().active_wakes.len()
    }

    pub fn released_wake_tokens(&self) -> Vec<u64> {
        self.lock().released_wakes.clone()
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationHost for MockHost {
    fn register_channel(&self, spec: &ChannelSpec) -> Result<()> {
        if self.fail_register_channel.load(Ordering::SeqCst) {
            return Err(anyhow!("Simulated channel registration failure"));
        }

        let mut state = self.lock();
        state.register_calls += 1;

        // Upsert by channel id
        if let Some(existing) = state
            .registered_channels
            .iter_mut()
            .find(|channel| channel.id == spec.id)
        {
            *existing = spec.clone();
        } else {
            state.registered_channels.push(spec.clone());
        }

        Ok(())
    }

    fn show_indicator(&self, indicator: &Indicator) -> Result<IndicatorId> {
        if self.fail_show_indicator.load(Ordering::SeqCst) {
            return Err(anyhow!("Simulated indicator display failure"));
        }

        let id = self.next_id();
        let mut state = self.lock();
        state.shown.push((id, indicator.clone()));
        state.active_indicators.insert(id);

        Ok(IndicatorId::new(id))
    }

    fn dismiss_indicator(&self, id: &IndicatorId) -> Result<()> {
        let mut state = self.lock();
        if state.active_indicators.remove(&id.raw()) {
            state.dismissed.push(id.raw());
        }

        Ok(())
    }
}

impl WakeSource for MockHost {
    fn acquire_wake(&self, max_hold: Duration) -> Result<WakeToken> {
        if self.fail_acquire_wake.load(Ordering::SeqCst) {
            return Err(anyhow!("Simulated wake acquisition failure"));
        }

        let id = self.next_id();
        let mut state = self.lock();

        if !state.active_wakes.is_empty() {
            return Err(anyhow!("Wake resource already held"));
        }

        state.acquired_wakes.push((id, max_hold));
        state.active_wakes.insert(id);

        Ok(WakeToken::new(id))
    }

    fn release_wake(&self, token: &WakeToken) -> Result<()> {
        if self.fail_release_wake.load(Ordering::SeqCst) {
            return Err(anyhow!("Simulated wake release failure"));
        }

        let mut state = self.lock();
        if state.active_wakes.remove(&token.raw()) {
            state.released_wakes.push(token.raw());
        }

        Ok(())
    }
}

impl TaskScheduler for MockHost {
    fn promote_to_foreground(&self, indicator: &IndicatorId) -> Result<()> {
        if self.fail_promote.load(Ordering::SeqCst) {
            return Err(anyhow!("Simulated foreground promotion failure"));
        }

        let mut state = self.lock();
        if !state.active_indicators.contains(&indicator.raw()) {
            return Err(anyhow!(
                "Cannot promote to foreground without a shown indicator"
            ));
        }
        state.foreground = Some(indicator.raw());

        Ok(())
    }

    fn demote_from_foreground(&self) -> Result<()> {
        self.lock().foreground = None;
        Ok(())
    }

    fn set_restart_policy(&self, policy: RestartPolicy) -> Result<()> {
        if self.fail_set_restart_policy.load(Ordering::SeqCst) {
            return Err(anyhow!("Simulated restart policy failure"));
        }

        self.lock().restart_policy = policy;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelConfig;

    #[test]
    fn test_channel_registration_upserts_by_id() {
        let host = MockHost::new();
        let spec = ChannelSpec::from_config(&ChannelConfig::default());

        host.register_channel(&spec).unwrap();
        host.register_channel(&spec).unwrap();

        assert_eq!(host.register_channel_calls(), 2);
        assert_eq!(host.registered_channels().len(), 1);
    }

    #[test]
    fn test_second_concurrent_wake_hold_is_rejected() {
        let host = MockHost::new();

        let token = host.acquire_wake(Duration::from_secs(1)).unwrap();
        assert!(host.acquire_wake(Duration::from_secs(1)).is_err());

        host.release_wake(&token).unwrap();
        assert!(host.acquire_wake(Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn test_expired_wake_release_is_noop() {
        let host = MockHost::new();

        let token = host.acquire_wake(Duration::from_secs(1)).unwrap();
        host.expire_wake(token.raw());

        host.release_wake(&token).unwrap();
        assert!(host.released_wake_tokens().is_empty());
    }
}
