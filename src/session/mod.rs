//! Background session lifecycle module
//!
//! This module provides the core components for keeping a screen-sharing
//! session alive in the background: the keeper state machine, the status
//! channel, and the scoped wake guard.

pub mod keeper;
pub mod status_channel;
pub mod wake_guard;

pub use keeper::{
    KeeperError, KeeperStats, SessionKeeper, SessionRegistry, SessionState, SessionStatus,
    SharedKeeper,
};
pub use status_channel::{ChannelSpec, Importance, Indicator, StatusChannel, TapAction};
pub use wake_guard::WakeGuard;
