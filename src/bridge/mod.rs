//! Command bridge for the controlling UI layer
//!
//! Exposes the named-method surface the UI drives the session keeper
//! with. Exactly two methods are meaningful; everything else resolves to
//! a not-implemented outcome rather than an error. Each dispatch holds
//! the keeper lock for the whole transition, so commands are serialized
//! and the caller only returns once the side effects are committed.

use serde_json::Value;
use tracing::debug;

use crate::host::SessionCommand;
use crate::session::keeper::{KeeperError, SharedKeeper};

/// Method name starting the screen-sharing session
pub const METHOD_START_SCREEN_SHARING: &str = "startScreenSharingService";

/// Method name stopping the screen-sharing session
pub const METHOD_STOP_SCREEN_SHARING: &str = "stopScreenSharingService";

/// A named method invocation from the controlling layer.
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub method: String,
    pub args: Option<Value>,
}

impl MethodCall {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            args: None,
        }
    }

    pub fn with_args(method: impl Into<String>, args: Value) -> Self {
        Self {
            method: method.into(),
            args: Some(args),
        }
    }
}

/// Outcome of a bridge dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodOutcome {
    /// The command was applied; the payload mirrors the channel's null
    /// success result
    Success(Option<Value>),
    /// The method name is not part of the bridge surface
    NotImplemented,
}

/// Request/response bridge between the controlling layer and the keeper.
pub struct CommandBridge {
    keeper: SharedKeeper,
}

impl CommandBridge {
    pub fn new(keeper: SharedKeeper) -> Self {
        Self { keeper }
    }

    /// Dispatch a method call. The caller is suspended until the
    /// transition's side effects are committed or a failure is raised;
    /// the known methods ignore any payload.
    pub async fn handle(&self, call: &MethodCall) -> Result<MethodOutcome, KeeperError> {
        match call.method.as_str() {
            METHOD_START_SCREEN_SHARING => {
                debug!("Bridge dispatching start command");
                self.keeper.lock().await.start()?;
                Ok(MethodOutcome::Success(None))
            }
            METHOD_STOP_SCREEN_SHARING => {
                debug!("Bridge dispatching stop command");
                self.keeper.lock().await.stop()?;
                Ok(MethodOutcome::Success(None))
            }
            other => {
                debug!("Method not implemented: {}", other);
                Ok(MethodOutcome::NotImplemented)
            }
        }
    }

    /// Host re-entry point: apply the command the host redelivered after
    /// killing and relaunching the task process.
    pub async fn redeliver(&self, command: Option<SessionCommand>) -> Result<(), KeeperError> {
        self.keeper.lock().await.redeliver(command)
    }

    /// Shared keeper handle, for status surfaces.
    pub fn keeper(&self) -> SharedKeeper {
        self.keeper.clone()
    }
}
