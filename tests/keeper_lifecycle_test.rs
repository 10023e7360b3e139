//! Integration tests for the session keeper lifecycle

use screenkeeper::config::Config;
use screenkeeper::host::mock::MockHost;
use screenkeeper::host::{RestartPolicy, SessionCommand};
use screenkeeper::session::keeper::{KeeperError, SessionKeeper, SessionState};
use std::sync::Arc;
use std::time::Duration;

fn keeper_with_mock() -> (SessionKeeper, Arc<MockHost>) {
    let host = Arc::new(MockHost::new());
    let keeper = SessionKeeper::new(&Config::default(), host.clone());
    (keeper, host)
}

#[test]
fn test_start_commits_all_side_effects() {
    let (mut keeper, host) = keeper_with_mock();

    keeper.start().unwrap();

    assert_eq!(keeper.state(), SessionState::Running);
    assert_eq!(host.register_channel_calls(), 1, "channel registered once");

    let shown = host.shown_indicators();
    assert_eq!(shown.len(), 1, "indicator displayed");
    assert_eq!(
        host.foreground_indicator(),
        Some(shown[0].0),
        "foreground classification backed by the shown indicator"
    );

    assert_eq!(host.active_wake_count(), 1, "wake guard held");
    assert_eq!(
        host.acquired_wake_bounds(),
        vec![Duration::from_secs(24 * 60 * 60)],
        "wake hold bounded by the configured safety fence"
    );

    assert_eq!(
        host.restart_policy(),
        RestartPolicy::Redeliver(SessionCommand::Start),
        "restart policy requests command redelivery"
    );
}

#[test]
fn test_start_twice_is_observably_identical_to_once() {
    let (mut keeper, host) = keeper_with_mock();

    keeper.start().unwrap();
    keeper.start().unwrap();

    assert_eq!(keeper.state(), SessionState::Running);
    assert_eq!(host.register_channel_calls(), 1);
    assert_eq!(host.shown_indicators().len(), 1);
    assert_eq!(host.acquired_wake_tokens().len(), 1);
    assert_eq!(keeper.stats().duplicate_commands, 1);
}

#[test]
fn test_stop_commits_teardown() {
    let (mut keeper, host) = keeper_with_mock();

    keeper.start().unwrap();
    let shown_id = host.shown_indicators()[0].0;

    keeper.stop().unwrap();

    assert_eq!(keeper.state(), SessionState::Stopped);
    assert_eq!(host.active_wake_count(), 0, "wake guard released");
    assert_eq!(host.released_wake_tokens().len(), 1);
    assert_eq!(host.foreground_indicator(), None, "foreground relinquished");
    assert_eq!(host.dismissed_indicators(), vec![shown_id]);
    assert_eq!(host.restart_policy(), RestartPolicy::None);
}

#[test]
fn test_stop_twice_is_observably_identical_to_once() {
    let (mut keeper, host) = keeper_with_mock();

    keeper.start().unwrap();
    keeper.stop().unwrap();
    keeper.stop().unwrap();

    assert_eq!(keeper.state(), SessionState::Stopped);
    assert_eq!(host.released_wake_tokens().len(), 1);
    assert_eq!(host.dismissed_indicators().len(), 1);
    assert_eq!(keeper.stats().duplicate_commands, 1);
}

#[test]
fn test_stop_before_any_start_touches_nothing() {
    let (mut keeper, host) = keeper_with_mock();

    keeper.stop().unwrap();

    assert_eq!(keeper.state(), SessionState::Stopped);
    assert_eq!(host.register_channel_calls(), 0);
    assert_eq!(host.shown_indicators().len(), 0);
    assert_eq!(host.released_wake_tokens().len(), 0);
}

#[test]
fn test_restart_cycle_reacquires_fresh_resources() {
    let (mut keeper, host) = keeper_with_mock();

    keeper.start().unwrap();
    let first_token = keeper.wake_token_id().unwrap();

    keeper.stop().unwrap();
    keeper.start().unwrap();
    let second_token = keeper.wake_token_id().unwrap();

    assert_ne!(first_token, second_token, "guard re-acquired, not reused");
    assert_eq!(host.shown_indicators().len(), 2, "indicator shown again");
    assert_eq!(host.dismissed_indicators().len(), 1);
    assert_eq!(host.active_wake_count(), 1);
    assert!(host.released_wake_tokens().contains(&first_token));
}

#[test]
fn test_wake_guard_held_iff_last_transition_was_start() {
    let (mut keeper, host) = keeper_with_mock();

    let commands: [&str; 7] = ["start", "start", "stop", "stop", "start", "stop", "start"];
    for command in commands {
        match command {
            "start" => keeper.start().unwrap(),
            _ => keeper.stop().unwrap(),
        }

        let running = keeper.state() == SessionState::Running;
        assert_eq!(keeper.wake_guard_held(), running);
        assert_eq!(host.active_wake_count(), usize::from(running));
    }
}

#[test]
fn test_channel_failure_aborts_start() {
    let (mut keeper, host) = keeper_with_mock();
    host.fail_register_channel(true);

    let err = keeper.start().unwrap_err();
    assert!(matches!(err, KeeperError::ChannelRegistration(_)));

    assert_eq!(keeper.state(), SessionState::Stopped);
    assert_eq!(host.shown_indicators().len(), 0);
    assert_eq!(host.acquired_wake_tokens().len(), 0);
}

#[test]
fn test_indicator_failure_aborts_start_without_wake_guard() {
    let (mut keeper, host) = keeper_with_mock();
    host.fail_show_indicator(true);

    let err = keeper.start().unwrap_err();
    assert!(matches!(err, KeeperError::IndicatorDisplay(_)));

    assert_eq!(keeper.state(), SessionState::Stopped);
    assert_eq!(host.acquired_wake_tokens().len(), 0, "guard never acquired");
    assert_eq!(host.foreground_indicator(), None);

    // Channel registration survives the failed attempt and is not repeated
    host.fail_show_indicator(false);
    keeper.start().unwrap();
    assert_eq!(host.register_channel_calls(), 1);
}

#[test]
fn test_promotion_failure_unwinds_indicator() {
    let (mut keeper, host) = keeper_with_mock();
    host.fail_promote(true);

    let err = keeper.start().unwrap_err();
    assert!(matches!(err, KeeperError::ForegroundPromotion(_)));

    assert_eq!(keeper.state(), SessionState::Stopped);
    assert_eq!(host.active_indicator_count(), 0, "indicator dismissed on unwind");
    assert_eq!(host.acquired_wake_tokens().len(), 0);
}

#[test]
fn test_wake_failure_unwinds_indicator_and_foreground() {
    let (mut keeper, host) = keeper_with_mock();
    host.fail_acquire_wake(true);

    let err = keeper.start().unwrap_err();
    assert!(matches!(err, KeeperError::WakeAcquisition(_)));

    assert_eq!(keeper.state(), SessionState::Stopped);
    assert_eq!(host.active_indicator_count(), 0);
    assert_eq!(host.foreground_indicator(), None);
    assert_eq!(host.active_wake_count(), 0);
}

#[test]
fn test_restart_policy_failure_unwinds_fully() {
    let (mut keeper, host) = keeper_with_mock();
    host.fail_set_restart_policy(true);

    let err = keeper.start().unwrap_err();
    assert!(matches!(err, KeeperError::RestartPolicy(_)));

    assert_eq!(keeper.state(), SessionState::Stopped);
    assert_eq!(host.active_wake_count(), 0, "guard released during unwind");
    assert_eq!(host.active_indicator_count(), 0);
    assert_eq!(host.restart_policy(), RestartPolicy::None);
}

#[test]
fn test_release_failure_is_latent_leak_not_command_failure() {
    let (mut keeper, host) = keeper_with_mock();

    keeper.start().unwrap();
    host.fail_release_wake(true);

    keeper.stop().unwrap();

    assert_eq!(keeper.state(), SessionState::Stopped);
    assert_eq!(keeper.stats().guard_release_failures, 1);
    assert_eq!(host.active_wake_count(), 1, "resource leaked until safety bound");
    assert_eq!(host.dismissed_indicators().len(), 1, "teardown continued");
    assert_eq!(host.restart_policy(), RestartPolicy::None);
}

#[test]
fn test_expired_guard_is_reconciled_without_stopping() {
    let host = Arc::new(MockHost::new());
    let mut config = Config::default();
    config.wake.max_hold_secs = 1;
    let mut keeper = SessionKeeper::new(&config, host.clone());

    keeper.start().unwrap();
    let token = keeper.wake_token_id().unwrap();

    // Safety bound elapses; the platform reclaims the resource on its own
    std::thread::sleep(Duration::from_millis(1100));
    host.expire_wake(token);

    keeper.reconcile();

    assert_eq!(keeper.state(), SessionState::Running, "expiry is not a stop");
    assert!(!keeper.wake_guard_held());
    assert_eq!(keeper.stats().guard_expirations, 1);

    // The stale token is never reported as an explicit release
    keeper.stop().unwrap();
    assert_eq!(host.released_wake_tokens().len(), 0);
    assert_eq!(keeper.state(), SessionState::Stopped);
}

#[test]
fn test_redelivered_start_behaves_like_bridge_start() {
    let (mut keeper, host) = keeper_with_mock();

    keeper.redeliver(Some(SessionCommand::Start)).unwrap();

    assert_eq!(keeper.state(), SessionState::Running);
    assert_eq!(host.shown_indicators().len(), 1);
    assert_eq!(host.active_wake_count(), 1);
    assert_eq!(
        host.restart_policy(),
        RestartPolicy::Redeliver(SessionCommand::Start)
    );
    assert_eq!(keeper.stats().redeliveries, 1);
}

#[test]
fn test_redelivered_stop_resolves_to_stopped() {
    let (mut keeper, host) = keeper_with_mock();

    keeper.redeliver(Some(SessionCommand::Start)).unwrap();
    keeper.redeliver(Some(SessionCommand::Stop)).unwrap();

    assert_eq!(keeper.state(), SessionState::Stopped);
    assert_eq!(host.active_wake_count(), 0);
    assert_eq!(host.restart_policy(), RestartPolicy::None);
}
