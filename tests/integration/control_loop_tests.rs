//! ControlLoop integration tests: detection, attribution, actuation and
//! failure handling driven through mock devices.
//!
//! Every scenario uses `test_config` (N = 12, D = 2, S = 4, settle = 4).
//! With D = 2 a flip on poll `f` that holds is confirmed on tick `f + 1`.

use std::io::ErrorKind;

use lightwatch::app::commands::LoopCommand;
use lightwatch::app::events::AppEvent;
use lightwatch::app::service::{ChangeCause, ControlLoop, IssuedCommand};
use lightwatch::config::OperatingMode;
use lightwatch::detector::Transition;
use lightwatch::error::{DeviceError, PersistenceError, ScorerError};
use lightwatch::inference::Prediction;
use lightwatch::sample::LightState;
use lightwatch::snapshot::ExportOutcome;

use crate::mock_devices::{
    LightCall, MockRig, RecordingSink, RecordingStore, ScriptedScorer, run_ticks, test_config,
};

fn observe_loop() -> ControlLoop {
    ControlLoop::new(&test_config(OperatingMode::ObserveOnly), None).unwrap()
}

fn autonomous_loop(logit: f32) -> ControlLoop {
    let (scorer, _) = ScriptedScorer::constant(logit);
    ControlLoop::new(&test_config(OperatingMode::Autonomous), Some(scorer)).unwrap()
}

// ── Observe-only ──────────────────────────────────────────────

#[test]
fn observe_only_exports_genuine_external_transition() {
    let mut lp = observe_loop();
    let mut rig = MockRig::new().with_flips(&[(4, true)]);
    let mut store = RecordingStore::new();
    let mut sink = RecordingSink::new();

    let out = run_ticks(&mut lp, &mut rig, &mut store, &mut sink, 4);
    assert!(out.iter().all(|o| o.export.is_none()));
    assert_eq!(lp.cause(), ChangeCause::ExternalOrUnknown);

    let out = run_ticks(&mut lp, &mut rig, &mut store, &mut sink, 1);
    assert_eq!(out[0].transition, Transition::GenuineTransition { to_on: true });
    assert!(matches!(out[0].export, Some(Ok(ExportOutcome::Written(_)))));
    assert_eq!(lp.cause(), ChangeCause::None);

    assert_eq!(store.saved.len(), 1);
    let (snap, name) = &store.saved[0];
    assert!(name.is_none());
    assert_eq!(snap.len(), 5);
    let on: Vec<bool> = snap.records().iter().map(|r| r.light_on).collect();
    assert_eq!(on, vec![false, false, false, true, true]);

    // Steady afterwards: nothing more is exported
    run_ticks(&mut lp, &mut rig, &mut store, &mut sink, 5);
    assert_eq!(store.saved.len(), 1);
    assert_eq!(
        sink.count(|e| matches!(
            e,
            AppEvent::TransitionDetected {
                to_on: true,
                cause: ChangeCause::ExternalOrUnknown
            }
        )),
        1
    );
    assert!(rig.commands().is_empty());
}

#[test]
fn insufficient_history_never_decides() {
    let mut lp = observe_loop();
    // Flip on the second poll; D + 1 = 3 samples are needed to decide
    let mut rig = MockRig::new().with_flips(&[(2, true)]);
    let mut store = RecordingStore::new();
    let mut sink = RecordingSink::new();

    let out = run_ticks(&mut lp, &mut rig, &mut store, &mut sink, 2);
    assert_eq!(
        out[0].transition,
        Transition::Insufficient {
            available: 1,
            required: 3
        }
    );
    assert_eq!(
        out[1].transition,
        Transition::Insufficient {
            available: 2,
            required: 3
        }
    );
    assert!(store.saved.is_empty());

    // Third sample completes the window [off, on, on]
    let out = run_ticks(&mut lp, &mut rig, &mut store, &mut sink, 1);
    assert!(out[0].transition.is_genuine());
    assert_eq!(store.saved.len(), 1);
}

#[test]
fn export_failure_leaves_buffer_intact() {
    let mut lp = observe_loop();
    let mut rig = MockRig::new().with_flips(&[(4, true)]);
    let mut store = RecordingStore {
        fail: Some(PersistenceError::Write(ErrorKind::Other)),
        ..RecordingStore::default()
    };
    let mut sink = RecordingSink::new();

    let out = run_ticks(&mut lp, &mut rig, &mut store, &mut sink, 5);
    assert_eq!(
        out[4].export,
        Some(Err(PersistenceError::Write(ErrorKind::Other)))
    );
    assert_eq!(lp.buffer().len(), 5);
    assert_eq!(lp.cause(), ChangeCause::None);
    assert_eq!(lp.counters().snapshot_failures, 1);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::SnapshotFailed(PersistenceError::Write(_)))),
        1
    );

    // The loop keeps running
    run_ticks(&mut lp, &mut rig, &mut store, &mut sink, 3);
    assert_eq!(lp.buffer().len(), 8);
}

#[test]
fn buffer_holds_only_the_newest_samples() {
    let mut lp = observe_loop();
    let mut rig = MockRig::new();
    let mut store = RecordingStore::new();
    let mut sink = RecordingSink::new();

    run_ticks(&mut lp, &mut rig, &mut store, &mut sink, 20);
    assert_eq!(lp.buffer().len(), 12);
    assert!(lp.buffer().is_full());
    assert_eq!(lp.buffer().total_appended(), 20);
    // Oldest kept sample is the ninth frame captured
    let first = lp.buffer().iter().next().unwrap();
    assert_eq!(first.frame().data()[0], 9);
}

// ── Light availability ────────────────────────────────────────

#[test]
fn unreachable_light_uses_fail_closed_default() {
    let mut lp = observe_loop();
    let mut rig = MockRig::new();
    rig.light.on = true;
    rig.unreachable = true;
    let mut store = RecordingStore::new();
    let mut sink = RecordingSink::new();

    let out = run_ticks(&mut lp, &mut rig, &mut store, &mut sink, 2);
    assert!(!out[0].light_available);
    assert_eq!(out[0].light, LightState::default());
    assert_eq!(lp.buffer().latest().map(|s| s.is_on()), Some(false));
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::LightUnavailable(DeviceError::Unreachable))),
        2
    );
    assert_eq!(lp.counters().light_failures, 2);
}

// ── Autonomous: self-feedback suppression ─────────────────────

#[test]
fn self_induced_transition_is_not_exported() {
    let mut lp = autonomous_loop(5.0);
    let mut rig = MockRig::new();
    let mut store = RecordingStore::new();
    let mut sink = RecordingSink::new();

    // Ticks 1-3: fewer than S samples, no prediction yet
    let out = run_ticks(&mut lp, &mut rig, &mut store, &mut sink, 3);
    for o in &out {
        assert!(matches!(o.prediction, Some(Prediction::Insufficient { .. })));
        assert!(o.command.is_none());
    }

    // Tick 4: model says on, light is off, one command
    let out = run_ticks(&mut lp, &mut rig, &mut store, &mut sink, 1);
    assert_eq!(
        out[0].command,
        Some(IssuedCommand {
            on: true,
            result: Ok(())
        })
    );
    assert_eq!(lp.cause(), ChangeCause::SelfInduced);
    assert_eq!(lp.pending_command(), Some(true));

    // Tick 5: the light reports on but the change is not yet confirmed
    let out = run_ticks(&mut lp, &mut rig, &mut store, &mut sink, 1);
    assert!(out[0].light.on);
    assert_eq!(out[0].transition, Transition::NoChange);
    assert!(out[0].command.is_none());
    assert_eq!(lp.cause(), ChangeCause::SelfInduced);
    assert_eq!(lp.pending_command(), Some(true));

    // Tick 6: the detector confirms our own change
    let out = run_ticks(&mut lp, &mut rig, &mut store, &mut sink, 1);
    assert_eq!(out[0].transition, Transition::GenuineTransition { to_on: true });
    assert!(out[0].export.is_none());
    assert_eq!(lp.cause(), ChangeCause::None);
    assert_eq!(lp.pending_command(), None);

    // Model and light now agree
    run_ticks(&mut lp, &mut rig, &mut store, &mut sink, 4);
    assert_eq!(rig.commands(), vec![LightCall::TurnOn]);
    assert!(store.saved.is_empty());
    assert_eq!(
        sink.count(|e| matches!(
            e,
            AppEvent::TransitionDetected {
                to_on: true,
                cause: ChangeCause::SelfInduced
            }
        )),
        1
    );
}

#[test]
fn at_most_one_command_per_tick_and_none_while_pending() {
    let (scorer, _) = ScriptedScorer::new(vec![5.0, -5.0]);
    let mut lp = ControlLoop::new(&test_config(OperatingMode::Autonomous), Some(scorer)).unwrap();
    let mut rig = MockRig::new();
    let mut store = RecordingStore::new();
    let mut sink = RecordingSink::new();

    run_ticks(&mut lp, &mut rig, &mut store, &mut sink, 30);
    assert!(rig.max_commands_per_tick() <= 1);
    assert!(store.saved.is_empty());
}

#[test]
fn slow_bulb_is_reported_but_not_commanded_twice() {
    let mut lp = autonomous_loop(5.0);
    // The bulb accepts the command but only reports on from poll 9
    let mut rig = MockRig::new().with_flips(&[(9, true)]);
    rig.ignore_commands = true;
    let mut store = RecordingStore::new();
    let mut sink = RecordingSink::new();

    // Command at tick 4; ticks 5-7 wait on it
    let out = run_ticks(&mut lp, &mut rig, &mut store, &mut sink, 7);
    assert!(out[3].command.is_some());
    assert!(out[4..7].iter().all(|o| o.command.is_none()));
    assert_eq!(lp.cause(), ChangeCause::SelfInduced);

    // Tick 8: settle window (4 ticks) elapsed; reported, still waiting
    let out = run_ticks(&mut lp, &mut rig, &mut store, &mut sink, 1);
    assert!(out[0].command.is_none());
    assert_eq!(lp.cause(), ChangeCause::SelfInduced);
    assert_eq!(lp.pending_command(), Some(true));
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::CommandUnconfirmed { on: true, ticks: 4 })),
        1
    );

    // Ticks 9-10: the bulb catches up and the detector confirms it as ours
    let out = run_ticks(&mut lp, &mut rig, &mut store, &mut sink, 2);
    assert_eq!(out[1].transition, Transition::GenuineTransition { to_on: true });
    assert!(out[1].export.is_none());
    assert_eq!(lp.cause(), ChangeCause::None);

    run_ticks(&mut lp, &mut rig, &mut store, &mut sink, 4);
    assert_eq!(rig.commands(), vec![LightCall::TurnOn]);
    assert_eq!(lp.counters().commands_unconfirmed, 1);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::CommandUnconfirmed { .. })),
        1
    );
}

#[test]
fn unresponsive_bulb_waits_until_reset() {
    let mut lp = autonomous_loop(5.0);
    let mut rig = MockRig::new();
    rig.ignore_commands = true;
    let mut store = RecordingStore::new();
    let mut sink = RecordingSink::new();

    run_ticks(&mut lp, &mut rig, &mut store, &mut sink, 12);
    assert_eq!(rig.commands(), vec![LightCall::TurnOn]);
    assert_eq!(lp.cause(), ChangeCause::SelfInduced);

    // After a reset the loop rebuilds history and may act again
    lp.handle_command(LoopCommand::Reset, &mut store, &mut sink);
    run_ticks(&mut lp, &mut rig, &mut store, &mut sink, 4);
    assert_eq!(rig.commands(), vec![LightCall::TurnOn, LightCall::TurnOn]);
}

// ── Autonomous: failures ──────────────────────────────────────

#[test]
fn failed_command_is_retried_on_next_mismatch() {
    let mut lp = autonomous_loop(5.0);
    let mut rig = MockRig::new();
    rig.fail_commands = true;
    let mut store = RecordingStore::new();
    let mut sink = RecordingSink::new();

    let out = run_ticks(&mut lp, &mut rig, &mut store, &mut sink, 5);
    assert_eq!(
        out[3].command,
        Some(IssuedCommand {
            on: true,
            result: Err(DeviceError::Rejected)
        })
    );
    assert_eq!(lp.cause(), ChangeCause::None);
    assert!(out[4].command.is_some());
    assert_eq!(lp.counters().command_failures, 2);
    assert_eq!(lp.counters().commands_issued, 0);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::ActuationFailed { on: true, .. })),
        2
    );
}

#[test]
fn scorer_failure_skips_actuation() {
    let (scorer, handle) = ScriptedScorer::constant(5.0);
    handle.borrow_mut().fail = true;
    let mut lp = ControlLoop::new(&test_config(OperatingMode::Autonomous), Some(scorer)).unwrap();
    let mut rig = MockRig::new();
    let mut store = RecordingStore::new();
    let mut sink = RecordingSink::new();

    let out = run_ticks(&mut lp, &mut rig, &mut store, &mut sink, 6);
    assert!(out[3..].iter().all(|o| o.prediction.is_none() && o.command.is_none()));
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::ScorerFailed(ScorerError::Backend))),
        3
    );
    assert!(rig.commands().is_empty());
    assert_eq!(lp.buffer().len(), 6);

    // Scorer recovers: the next tick acts
    handle.borrow_mut().fail = false;
    let out = run_ticks(&mut lp, &mut rig, &mut store, &mut sink, 1);
    assert!(out[0].command.is_some());
}

#[test]
fn non_finite_logit_is_a_scorer_failure() {
    let mut lp = autonomous_loop(f32::NAN);
    let mut rig = MockRig::new();
    let mut store = RecordingStore::new();
    let mut sink = RecordingSink::new();

    run_ticks(&mut lp, &mut rig, &mut store, &mut sink, 5);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::ScorerFailed(ScorerError::NonFinite))),
        2
    );
    assert!(rig.commands().is_empty());
}

// ── Autonomous: external overrides ────────────────────────────

#[test]
fn external_override_not_exported_by_default() {
    let mut config = test_config(OperatingMode::Autonomous);
    config.sequence_len = 10;
    let (scorer, _) = ScriptedScorer::constant(5.0);
    let mut lp = ControlLoop::new(&config, Some(scorer)).unwrap();
    let mut rig = MockRig::new().with_flips(&[(3, true)]);
    let mut store = RecordingStore::new();
    let mut sink = RecordingSink::new();

    let out = run_ticks(&mut lp, &mut rig, &mut store, &mut sink, 5);
    assert!(out[3].transition.is_genuine());
    assert!(out[3].export.is_none());
    assert!(store.saved.is_empty());
    assert_eq!(
        sink.count(|e| matches!(
            e,
            AppEvent::TransitionDetected {
                cause: ChangeCause::ExternalOrUnknown,
                ..
            }
        )),
        1
    );
}

#[test]
fn external_override_exported_when_capture_enabled() {
    let mut config = test_config(OperatingMode::Autonomous);
    config.sequence_len = 10;
    config.capture_overrides = true;
    let (scorer, _) = ScriptedScorer::constant(5.0);
    let mut lp = ControlLoop::new(&config, Some(scorer)).unwrap();
    let mut rig = MockRig::new().with_flips(&[(3, true)]);
    let mut store = RecordingStore::new();
    let mut sink = RecordingSink::new();

    let out = run_ticks(&mut lp, &mut rig, &mut store, &mut sink, 5);
    assert!(matches!(out[3].export, Some(Ok(ExportOutcome::Written(_)))));
    assert_eq!(store.saved.len(), 1);
    assert_eq!(store.saved[0].0.len(), 4);
}

// ── Operator commands ─────────────────────────────────────────

#[test]
fn save_snapshot_command_uses_explicit_name() {
    let mut lp = observe_loop();
    let mut rig = MockRig::new();
    let mut store = RecordingStore::new();
    let mut sink = RecordingSink::new();

    run_ticks(&mut lp, &mut rig, &mut store, &mut sink, 3);
    let cmd = LoopCommand::SaveSnapshot {
        name: Some("manual".into()),
    };
    let result = lp.handle_command(cmd, &mut store, &mut sink);
    assert!(matches!(result, Some(Ok(ExportOutcome::Written(_)))));
    assert_eq!(store.saved.len(), 1);
    assert_eq!(store.saved[0].1.as_deref(), Some("manual"));
    assert_eq!(store.saved[0].0.len(), 3);
    // Export leaves the buffer as it was
    assert_eq!(lp.buffer().len(), 3);
}

#[test]
fn reset_clears_history_and_decision_state() {
    let mut lp = autonomous_loop(5.0);
    let mut rig = MockRig::new();
    rig.ignore_commands = true;
    let mut store = RecordingStore::new();
    let mut sink = RecordingSink::new();

    run_ticks(&mut lp, &mut rig, &mut store, &mut sink, 5);
    assert_eq!(lp.cause(), ChangeCause::SelfInduced);

    assert!(lp.handle_command(LoopCommand::Reset, &mut store, &mut sink).is_none());
    assert!(lp.buffer().is_empty());
    assert_eq!(lp.cause(), ChangeCause::None);
    assert_eq!(lp.pending_command(), None);

    // Exporting an empty buffer writes nothing
    let result = lp.handle_command(
        LoopCommand::SaveSnapshot { name: None },
        &mut store,
        &mut sink,
    );
    assert_eq!(result, Some(Ok(ExportOutcome::Empty)));
    assert!(store.saved.is_empty());
}

// ── Telemetry ─────────────────────────────────────────────────

#[test]
fn telemetry_reflects_counters() {
    let mut lp = observe_loop();
    let mut rig = MockRig::new().with_flips(&[(4, true)]);
    let mut store = RecordingStore::new();
    let mut sink = RecordingSink::new();

    run_ticks(&mut lp, &mut rig, &mut store, &mut sink, 6);
    let t = lp.build_telemetry(None);
    assert_eq!(t.tick_count, 6);
    assert_eq!(t.buffer_len, 6);
    assert_eq!(t.buffer_capacity, 12);
    assert_eq!(t.snapshots_saved, 1);
    assert!(t.light.on);
    assert_eq!(t.cause, ChangeCause::None);
}
