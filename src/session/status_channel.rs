//! Status channel registration and indicator construction
//!
//! The channel is a named, low-importance, persistent notification
//! grouping. Registering it is an idempotent upsert; the keeper calls it
//! on every start and only the first call reaches the host. Building the
//! indicator is a pure function — display is the keeper's job.

use anyhow::Result;
use tracing::debug;

use crate::config::{ChannelConfig, IndicatorConfig};
use crate::host::{HostPlatform, NotificationHost};

/// Importance levels understood by the host notification surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Importance {
    Min,
    Low,
    Default,
    High,
}

/// Specification of the status channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSpec {
    pub id: String,
    pub name: String,
    pub description: String,
    pub importance: Importance,
    pub persistent: bool,
}

impl ChannelSpec {
    /// Build the keeper's channel spec from configuration. The importance
    /// and persistence category are fixed by the session's semantics, not
    /// user-configurable.
    pub fn from_config(config: &ChannelConfig) -> Self {
        Self {
            id: config.id.clone(),
            name: config.name.clone(),
            description: config.description.clone(),
            importance: Importance::Low,
            persistent: true,
        }
    }
}

/// What happens when the user taps the indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapAction {
    /// Return the user to the controlling UI
    OpenControllingApp,
}

/// The persistent indicator shown while a session is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indicator {
    pub channel_id: String,
    pub title: String,
    pub body: String,
    pub icon: String,
    pub tap_action: TapAction,
    /// The host must not rewrite the tap intent after display
    pub mutable: bool,
}

/// Build the indicator for the given channel and configuration.
///
/// Pure: no hidden state, nothing is displayed here.
pub fn build_indicator(channel: &ChannelSpec, config: &IndicatorConfig) -> Indicator {
    Indicator {
        channel_id: channel.id.clone(),
        title: config.title.clone(),
        body: config.body.clone(),
        icon: config.icon.clone(),
        tap_action: TapAction::OpenControllingApp,
        mutable: false,
    }
}

/// Tracks the once-per-process registration of the status channel.
#[derive(Debug)]
pub struct StatusChannel {
    spec: ChannelSpec,
    registered: bool,
}

impl StatusChannel {
    pub fn new(spec: ChannelSpec) -> Self {
        Self {
            spec,
            registered: false,
        }
    }

    /// Register the channel with the host if it has not been registered
    /// yet. Repeat calls are no-ops; the flag is never unset.
    pub fn ensure_registered(&mut self, host: &dyn HostPlatform) -> Result<()> {
        if self.registered {
            debug!("Status channel {} already registered", self.spec.id);
            return Ok(());
        }

        host.register_channel(&self.spec)?;
        self.registered = true;

        Ok(())
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    pub fn spec(&self) -> &ChannelSpec {
        &self.spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::mock::MockHost;

    fn spec() -> ChannelSpec {
        ChannelSpec::from_config(&ChannelConfig::default())
    }

    #[test]
    fn test_channel_spec_is_low_importance_and_persistent() {
        let spec = spec();
        assert_eq!(spec.importance, Importance::Low);
        assert!(spec.persistent);
    }

    #[test]
    fn test_registration_is_idempotent() {
        let host = MockHost::new();
        let mut channel = StatusChannel::new(spec());

        assert!(!channel.is_registered());
        channel.ensure_registered(&host).unwrap();
        channel.ensure_registered(&host).unwrap();
        channel.ensure_registered(&host).unwrap();

        assert!(channel.is_registered());
        assert_eq!(host.register_channel_calls(), 1);
    }

    #[test]
    fn test_failed_registration_leaves_flag_unset() {
        let host = MockHost::new();
        host.fail_register_channel(true);
        let mut channel = StatusChannel::new(spec());

        assert!(channel.ensure_registered(&host).is_err());
        assert!(!channel.is_registered());

        // A later retry may still succeed
        host.fail_register_channel(false);
        channel.ensure_registered(&host).unwrap();
        assert!(channel.is_registered());
    }

    #[test]
    fn test_build_indicator_is_pure_and_immutable() {
        let spec = spec();
        let config = IndicatorConfig::default();

        let first = build_indicator(&spec, &config);
        let second = build_indicator(&spec, &config);

        assert_eq!(first, second);
        assert_eq!(first.channel_id, spec.id);
        assert_eq!(first.tap_action, TapAction::OpenControllingApp);
        assert!(!first.mutable);
    }
}
