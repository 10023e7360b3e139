//! Desktop host adapter with platform-specific backends.
//!
//! Linux: persistent Freedesktop notification via `notify-rust`, wake
//! inhibition via a bounded `systemd-inhibit` helper process.
//! macOS: Notification Center via `mac-notification-sys`, wake inhibition
//! via a bounded `caffeinate` helper process.
//! Windows: WinRT Toast via `winrt-notification`; wake inhibition is a no-op.
//! Other platforms: no-op backends.
//!
//! The helper processes end on their own once the hold bound elapses,
//! which realizes the platform's auto-release of the wake resource. The
//! restart policy is a marker file read back at the next launch.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use crate::session::status_channel::{ChannelSpec, Indicator};

use super::{
    IndicatorId, NotificationHost, RestartPolicy, SessionCommand, TaskScheduler, WakeSource,
    WakeToken,
};

enum IndicatorSlot {
    /// Resident notification dismissed by signalling its owner thread
    #[cfg(target_os = "linux")]
    Resident { close_tx: std::sync::mpsc::Sender<()> },
    /// Backend cannot revoke the notification after display
    #[cfg(not(target_os = "linux"))]
    Transient,
}

enum WakeHold {
    /// Helper process whose bounded lifetime carries the inhibition
    #[cfg(any(target_os = "linux", target_os = "macos"))]
    Process(std::process::Child),
    /// Platform without a wake backend
    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    Noop,
}

/// Host platform adapter for desktop operating systems.
pub struct DesktopHost {
    app_name: String,
    restart_marker: PathBuf,
    indicators: Mutex<HashMap<u64, IndicatorSlot>>,
    wake_holds: Mutex<HashMap<u64, WakeHold>>,
    foreground: Mutex<Option<u64>>,
    next_id: AtomicU64,
}

impl DesktopHost {
    /// Create a new host adapter using the provided application name
    /// label and restart marker location.
    pub fn new(app_name: impl Into<String>, restart_marker: impl Into<PathBuf>) -> Self {
        Self {
            app_name: app_name.into(),
            restart_marker: restart_marker.into(),
            indicators: Mutex::new(HashMap::new()),
            wake_holds: Mutex::new(HashMap::new()),
            foreground: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Command recorded for redelivery by a previous run, if any.
    pub fn pending_command(&self) -> Option<SessionCommand> {
        let content = std::fs::read_to_string(&self.restart_marker).ok()?;
        match content.trim() {
            "start" => Some(SessionCommand::Start),
            "stop" => Some(SessionCommand::Stop),
            other => {
                warn!("Ignoring unrecognized restart marker content: {}", other);
                None
            }
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

impl NotificationHost for DesktopHost {
    fn register_channel(&self, spec: &ChannelSpec) -> Result<()> {
        // Desktop notification daemons have no channel concept; the spec
        // only informs how individual notifications are presented.
        debug!(
            "Registered status channel {} ({:?}, persistent: {})",
            spec.id, spec.importance, spec.persistent
        );
        Ok(())
    }

    fn show_indicator(&self, indicator: &Indicator) -> Result<IndicatorId> {
        let id = self.next_id();
        let slot = show_indicator_backend(&self.app_name, indicator)?;

        self.indicators
            .lock()
            .expect("indicator table lock poisoned")
            .insert(id, slot);

        Ok(IndicatorId::new(id))
    }

    fn dismiss_indicator(&self, id: &IndicatorId) -> Result<()> {
        let slot = self
            .indicators
            .lock()
            .expect("indicator table lock poisoned")
            .remove(&id.raw());

        match slot {
            #[cfg(target_os = "linux")]
            Some(IndicatorSlot::Resident { close_tx }) => {
                // Owner thread closes the notification and exits
                let _ = close_tx.send(());
            }
            #[cfg(not(target_os = "linux"))]
            Some(IndicatorSlot::Transient) => {
                debug!("Indicator backend cannot revoke notifications, leaving it to expire");
            }
            None => {
                debug!("Indicator {} already dismissed", id.raw());
            }
        }

        Ok(())
    }
}

impl WakeSource for DesktopHost {
    fn acquire_wake(&self, max_hold: Duration) -> Result<WakeToken> {
        let mut holds = self.wake_holds.lock().expect("wake hold table lock poisoned");
        if !holds.is_empty() {
            anyhow::bail!("Wake resource already held");
        }

        let id = self.next_id();
        let hold = spawn_wake_hold(&self.app_name, max_hold)?;
        holds.insert(id, hold);

        debug!(
            "Wake inhibition active for up to {}s (token {})",
            max_hold.as_secs(),
            id
        );
        Ok(WakeToken::new(id))
    }

    fn release_wake(&self, token: &WakeToken) -> Result<()> {
        let hold = self
            .wake_holds
            .lock()
            .expect("wake hold table lock poisoned")
            .remove(&token.raw());

        match hold {
            #[cfg(any(target_os = "linux", target_os = "macos"))]
            Some(WakeHold::Process(mut child)) => {
                // An already-exited helper means the bound elapsed; both
                // paths leave the resource released
                if let Err(err) = child.kill() {
                    debug!("Wake helper already gone: {}", err);
                }
                child
                    .wait()
                    .context("failed to reap wake inhibition helper")?;
            }
            #[cfg(not(any(target_os = "linux", target_os = "macos")))]
            Some(WakeHold::Noop) => {}
            None => {
                debug!("Wake token {} already released", token.raw());
            }
        }

        Ok(())
    }
}

impl TaskScheduler for DesktopHost {
    fn promote_to_foreground(&self, indicator: &IndicatorId) -> Result<()> {
        if !self
            .indicators
            .lock()
            .expect("indicator table lock poisoned")
            .contains_key(&indicator.raw())
        {
            anyhow::bail!("Cannot promote to foreground without a shown indicator");
        }

        *self.foreground.lock().expect("foreground lock poisoned") = Some(indicator.raw());
        debug!(
            "Task promoted to foreground classification (indicator {})",
            indicator.raw()
        );
        Ok(())
    }

    fn demote_from_foreground(&self) -> Result<()> {
        let mut foreground = self.foreground.lock().expect("foreground lock poisoned");
        if let Some(indicator) = foreground.take() {
            debug!(
                "Task demoted from foreground classification (indicator {})",
                indicator
            );
        }
        Ok(())
    }

    fn set_restart_policy(&self, policy: RestartPolicy) -> Result<()> {
        match policy {
            RestartPolicy::Redeliver(command) => {
                let content = match command {
                    SessionCommand::Start => "start",
                    SessionCommand::Stop => "stop",
                };
                std::fs::write(&self.restart_marker, content).with_context(|| {
                    format!(
                        "Failed to write restart marker: {}",
                        self.restart_marker.display()
                    )
                })?;
            }
            RestartPolicy::None => {
                if let Err(err) = std::fs::remove_file(&self.restart_marker) {
                    if err.kind() != std::io::ErrorKind::NotFound {
                        return Err(err).with_context(|| {
                            format!(
                                "Failed to clear restart marker: {}",
                                self.restart_marker.display()
                            )
                        });
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(target_os = "linux")]
fn show_indicator_backend(app_name: &str, indicator: &Indicator) -> Result<IndicatorSlot> {
    use notify_rust::{Hint, Notification, Timeout, Urgency};

    let (ready_tx, ready_rx) = std::sync::mpsc::channel();
    let (close_tx, close_rx) = std::sync::mpsc::channel::<()>();
    let app_name = app_name.to_string();
    let indicator = indicator.clone();

    // The notification handle is not sendable across threads; one thread
    // owns it from display to dismissal.
    std::thread::spawn(move || {
        let shown = Notification::new()
            .appname(&app_name)
            .summary(&indicator.title)
            .body(&indicator.body)
            .icon(&indicator.icon)
            .urgency(Urgency::Low)
            .hint(Hint::Resident(true))
            .timeout(Timeout::Never)
            .show();

        match shown {
            Ok(handle) => {
                if ready_tx.send(Ok(())).is_err() {
                    handle.close();
                    return;
                }
                let _ = close_rx.recv();
                handle.close();
            }
            Err(err) => {
                let _ = ready_tx.send(Err(err));
            }
        }
    });

    ready_rx
        .recv()
        .context("indicator thread ended before reporting display result")?
        .map_err(|err| anyhow::anyhow!("Failed to show desktop indicator: {}", err))?;

    Ok(IndicatorSlot::Resident { close_tx })
}

#[cfg(target_os = "macos")]
fn show_indicator_backend(app_name: &str, indicator: &Indicator) -> Result<IndicatorSlot> {
    use mac_notification_sys::{Notification, send_notification, set_application};

    if let Err(err) = set_application(app_name) {
        warn!("Failed to set macOS notification application: {:?}", err);
    }
    send_notification(
        &indicator.title,
        None,
        &indicator.body,
        None::<&Notification>,
    )
    .map_err(|err| anyhow::anyhow!("Failed to show macOS indicator: {:?}", err))?;

    Ok(IndicatorSlot::Transient)
}

#[cfg(target_os = "windows")]
fn show_indicator_backend(app_name: &str, indicator: &Indicator) -> Result<IndicatorSlot> {
    use winrt_notification::{Duration as ToastDuration, Toast};

    Toast::new(app_name)
        .title(&indicator.title)
        .text1(&indicator.body)
        .duration(ToastDuration::Long)
        .show()
        .map_err(|err| anyhow::anyhow!("Failed to show Windows toast indicator: {:?}", err))?;

    Ok(IndicatorSlot::Transient)
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn show_indicator_backend(_app_name: &str, indicator: &Indicator) -> Result<IndicatorSlot> {
    debug!(
        "Desktop indicators are not supported on this platform yet: {}",
        indicator.title
    );
    Ok(IndicatorSlot::Transient)
}

#[cfg(target_os = "linux")]
fn spawn_wake_hold(app_name: &str, max_hold: Duration) -> Result<WakeHold> {
    use std::process::{Command, Stdio};

    let child = Command::new("systemd-inhibit")
        .arg("--what=idle:sleep")
        .arg(format!("--who={}", app_name))
        .arg("--why=Screen sharing session active")
        .arg("--mode=block")
        .arg("sleep")
        .arg(max_hold.as_secs().to_string())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .context("failed to invoke systemd-inhibit for wake hold")?;

    Ok(WakeHold::Process(child))
}

#[cfg(target_os = "macos")]
fn spawn_wake_hold(_app_name: &str, max_hold: Duration) -> Result<WakeHold> {
    use std::process::{Command, Stdio};

    let child = Command::new("caffeinate")
        .arg("-i")
        .arg("-t")
        .arg(max_hold.as_secs().to_string())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .context("failed to invoke caffeinate for wake hold")?;

    Ok(WakeHold::Process(child))
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn spawn_wake_hold(_app_name: &str, _max_hold: Duration) -> Result<WakeHold> {
    debug!("Wake inhibition is not supported on this platform yet");
    Ok(WakeHold::Noop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn host_with_marker(dir: &TempDir) -> DesktopHost {
        DesktopHost::new("screenkeeper-test", dir.path().join("restart-marker"))
    }

    #[test]
    fn test_restart_marker_roundtrip() {
        let dir = TempDir::new().unwrap();
        let host = host_with_marker(&dir);

        assert_eq!(host.pending_command(), None);

        host.set_restart_policy(RestartPolicy::Redeliver(SessionCommand::Start))
            .unwrap();
        assert_eq!(host.pending_command(), Some(SessionCommand::Start));

        host.set_restart_policy(RestartPolicy::None).unwrap();
        assert_eq!(host.pending_command(), None);
    }

    #[test]
    fn test_clearing_absent_marker_is_noop() {
        let dir = TempDir::new().unwrap();
        let host = host_with_marker(&dir);

        host.set_restart_policy(RestartPolicy::None).unwrap();
        host.set_restart_policy(RestartPolicy::None).unwrap();
        assert_eq!(host.pending_command(), None);
    }

    #[test]
    fn test_unrecognized_marker_content_is_ignored() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("restart-marker");
        std::fs::write(&marker, "resume-everything").unwrap();

        let host = DesktopHost::new("screenkeeper-test", marker);
        assert_eq!(host.pending_command(), None);
    }

    #[test]
    fn test_promote_requires_shown_indicator() {
        let dir = TempDir::new().unwrap();
        let host = host_with_marker(&dir);

        assert!(host.promote_to_foreground(&IndicatorId::new(42)).is_err());
        assert!(host.demote_from_foreground().is_ok());
    }
}
