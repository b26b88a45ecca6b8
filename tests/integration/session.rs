//! Session integration tests
//!
//! Drives a full session on a manual clock: metronome grid, quantized record
//! start, take rollover and discard, and multi-loop phase alignment.

use crate::helpers::tolerances::TIME_EPSILON;
use crate::helpers::*;
use approx::assert_abs_diff_eq;
use looper::core::Error as CoreError;
use looper::prelude::*;
use looper::{FrameOutcome, LoopState, SinkEvent, SourceId};

/// Record a first take into `id` and close it. Returns the clock time at which
/// recording stopped.
fn record_first_take(fx: &mut Fixture, id: LoopId) -> f64 {
    let gate = match fx.session.action(id).unwrap() {
        LoopTransition::StartedRecording { gate_opens_at } => gate_opens_at,
        other => panic!("expected recording to arm, got {:?}", other),
    };
    let length = fx.session.get_loop(id).unwrap().duration();
    // One full pass plus one frame into the next take.
    fx.run_until(gate + length + STEP, true);
    fx.session.action(id).unwrap();
    fx.now()
}

#[test]
fn test_beat_duration_at_90_bpm() {
    let mut fx = test_session(90);
    fx.session.start_metronome().unwrap();

    let metronome = fx.session.metronome();
    assert_abs_diff_eq!(metronome.beat_duration(), 60.0 / 90.0);

    let mut last = metronome.next_beat_time();
    let mut last_count = metronome.beats_count();
    for _ in 0..200 {
        fx.run(1, false);
        let metronome = fx.session.metronome();
        let scheduled = metronome.beats_count() - last_count;
        assert_abs_diff_eq!(
            metronome.next_beat_time() - last,
            scheduled as f64 * 60.0 / 90.0,
            epsilon = 1e-9
        );
        last = metronome.next_beat_time();
        last_count = metronome.beats_count();
    }
}

#[test]
fn test_first_beats_of_bar_reach_listener() {
    let mut fx = test_session(120);
    fx.session.start_metronome().unwrap();
    fx.run_until(6.0, false);

    let beats = fx.draws.beats();
    let firsts: Vec<u64> = beats
        .iter()
        .filter(|beat| beat.bar_start)
        .map(|beat| beat.num)
        .collect();
    assert_eq!(firsts, vec![1, 5, 9, 13]);
    assert_eq!(fx.draws.nums(), (1..=13).collect::<Vec<_>>());

    // Accent on the first beat of each bar only.
    let clicks = fx.sink.clicks();
    assert!(clicks[0].accent);
    assert!(!clicks[1].accent);
    assert_eq!(clicks[4].frequency, 440.0);
}

#[test]
fn test_draw_waits_for_the_clock() {
    let mut fx = test_session(120);
    fx.session.start_metronome().unwrap();

    // The lookahead already scheduled beat 1; nothing else is due.
    assert_eq!(fx.session.draw(), 1);
    fx.clock.set(0.45);
    fx.session.tick();
    assert_eq!(fx.session.metronome().beats_count(), 2);
    assert_eq!(fx.session.draw(), 0);

    fx.clock.set(0.5);
    assert_eq!(fx.session.draw(), 1);
    assert_eq!(fx.draws.nums(), vec![1, 2]);
}

#[test]
fn test_start_twice_and_stop_resets() {
    let mut fx = test_session(120);
    fx.session.start_metronome().unwrap();
    assert_eq!(fx.session.start_metronome(), Err(CoreError::AlreadyRunning));

    fx.run(64, false);
    assert!(fx.session.metronome().beats_count() > 0);

    fx.session.stop_metronome();
    fx.session.stop_metronome();
    assert_eq!(fx.session.metronome().beats_count(), 0);
    assert_eq!(fx.session.metronome().pending_beats().count(), 0);

    // Restarting renumbers from 1.
    fx.session.start_metronome().unwrap();
    assert_eq!(fx.session.metronome().beats_count(), 1);
}

#[test]
fn test_loop_beats_locked_once_recorded() {
    let mut fx = test_session(120);
    let id = fx.session.add_loop();

    assert_eq!(fx.session.set_loop_beats(id, 8), Ok(8));
    assert_abs_diff_eq!(fx.session.get_loop(id).unwrap().duration(), 4.0);
    fx.session.set_loop_beats(id, 4).unwrap();

    record_first_take(&mut fx, id);
    assert_eq!(
        fx.session.set_loop_beats(id, 8),
        Err(CoreError::InvalidLoopState(id))
    );
    assert_eq!(fx.session.get_loop(id).unwrap().beats(), 4);
}

#[test]
fn test_record_starts_on_bar_boundary() {
    let mut fx = test_session(120);
    let id = fx.session.add_loop();
    fx.clock.set(0.75);

    let gate = match fx.session.action(id).unwrap() {
        LoopTransition::StartedRecording { gate_opens_at } => gate_opens_at,
        other => panic!("unexpected {:?}", other),
    };
    // Beat 1 at 0.75, the next bar opens on beat 5.
    assert_abs_diff_eq!(gate, 2.75, epsilon = TIME_EPSILON);

    fx.run_until(2.71875, true);
    assert!(fx.session.get_loop(id).unwrap().is_locked());
    assert_eq!(fx.session.get_loop(id).unwrap().takes()[0].duration(), 0.0);

    fx.run(1, true);
    assert!(!fx.session.get_loop(id).unwrap().is_locked());
    assert_abs_diff_eq!(
        fx.session.get_loop(id).unwrap().takes()[0].duration(),
        STEP,
        epsilon = TIME_EPSILON
    );
}

#[test]
fn test_first_take_rolls_over_without_stopping() {
    let mut fx = test_session(120);
    let id = fx.session.add_loop();
    fx.session.action(id).unwrap();

    // Gate at 2.0, 2.0s loop. 2.0 - 0.025 is crossed by the 64th frame.
    fx.run_until(3.9375, true);
    let lp = fx.session.get_loop(id).unwrap();
    assert_eq!(lp.takes().len(), 1);
    assert!(lp.is_recording());

    fx.run(1, true);
    let lp = fx.session.get_loop(id).unwrap();
    assert_eq!(lp.takes().len(), 2);
    assert!(lp.is_recording());
    assert!(lp.is_overdubbing());
    assert_eq!(lp.state(), LoopState::PlayingAndRecording);
}

#[test]
fn test_short_overdub_leaves_takes_unchanged() {
    let mut fx = test_session(120);
    let id = fx.session.add_loop();
    record_first_take(&mut fx, id);
    assert_eq!(fx.session.get_loop(id).unwrap().takes().len(), 1);

    // Loop is playing and nobody records: the press arms an overdub.
    let gate = match fx.session.action(id).unwrap() {
        LoopTransition::StartedRecording { gate_opens_at } => gate_opens_at,
        other => panic!("unexpected {:?}", other),
    };
    assert_eq!(fx.session.get_loop(id).unwrap().takes().len(), 2);

    fx.run_until(gate + 0.5, true);
    assert_eq!(
        fx.session.action(id).unwrap(),
        LoopTransition::StoppedRecording { take_kept: false }
    );
    let lp = fx.session.get_loop(id).unwrap();
    assert_eq!(lp.takes().len(), 1);
    assert_eq!(lp.current_take_index(), Some(0));
    assert!(lp.is_playing());
}

#[test]
fn test_overdub_layers_play_together() {
    let mut fx = test_session(120);
    let id = fx.session.add_loop();
    record_first_take(&mut fx, id);

    // Full overdub pass.
    let gate = match fx.session.action(id).unwrap() {
        LoopTransition::StartedRecording { gate_opens_at } => gate_opens_at,
        other => panic!("unexpected {:?}", other),
    };
    fx.run_until(gate + 2.0, true);
    fx.session.action(id).unwrap();
    assert_eq!(fx.session.get_loop(id).unwrap().takes().len(), 2);

    fx.sink.clear();
    fx.run(64, false);
    let scheduled = fx.sink.scheduled();
    assert_eq!(scheduled.len(), 2);
    assert_eq!(scheduled[0].1, scheduled[1].1);
}

#[test]
fn test_loops_of_different_lengths_stay_phase_locked() {
    // 60 BPM: a one-beat loop is 1s, long enough to keep its take.
    let mut fx = test_session(60);
    let one = fx.session.add_loop_with_beats(1).unwrap();
    let four = fx.session.add_loop_with_beats(4).unwrap();
    fx.session.set_loop_destination(one, Destination(1)).unwrap();
    fx.session.set_loop_destination(four, Destination(4)).unwrap();

    record_first_take(&mut fx, one);
    record_first_take(&mut fx, four);
    assert!(fx.session.get_loop(one).unwrap().is_playing());
    assert!(fx.session.get_loop(four).unwrap().is_playing());

    fx.sink.clear();
    let start_count = fx.session.metronome().beats_count();
    fx.run(8 * 32, false);
    let end_count = fx.session.metronome().beats_count();
    assert_eq!(end_count - start_count, 8);

    let scheduled = fx.sink.scheduled();
    let times_for = |destination: Destination| -> Vec<f64> {
        scheduled
            .iter()
            .filter(|(source, _)| fx.sink.destination_of(*source) == Some(destination))
            .map(|(_, time)| *time)
            .collect()
    };
    let one_times = times_for(Destination(1));
    let four_times = times_for(Destination(4));

    assert_eq!(one_times.len(), 8);
    assert_eq!(four_times.len(), 2);
    for time in &four_times {
        assert!(one_times.contains(time));
    }

    // The four-beat loop only restarts on beats opening a group of four.
    let beat = fx.session.metronome().beat_duration();
    let first_time = fx.draws.beats()[0].time;
    for time in four_times {
        let num = ((time - first_time) / beat).round() as u64 + 1;
        assert_eq!(num % 4, 1, "four-beat loop restarted on beat {}", num);
    }
}

#[test]
fn test_only_one_loop_records_at_a_time() {
    let mut fx = test_session(120);
    let a = fx.session.add_loop();
    let b = fx.session.add_loop();

    fx.session.action(a).unwrap();
    assert_eq!(fx.session.action(b).unwrap(), LoopTransition::None);
    assert!(!fx.session.get_loop(b).unwrap().is_recording());
    assert_eq!(fx.session.loops().current_recording(), Some(a));
}

#[test]
fn test_stop_cancels_scheduled_playback() {
    let mut fx = test_session(120);
    let id = fx.session.add_loop();
    record_first_take(&mut fx, id);
    fx.run(64, false);

    let live: Vec<SourceId> = fx
        .session
        .get_loop(id)
        .unwrap()
        .scheduled()
        .iter()
        .map(|playback| playback.source)
        .collect();
    assert!(!live.is_empty());

    fx.session.stop_loop(id).unwrap();
    let stopped = fx.sink.stopped();
    for source in live {
        assert!(stopped.contains(&source));
    }
    assert!(fx
        .sink
        .events()
        .iter()
        .any(|event| matches!(event, SinkEvent::Disconnected { .. })));
    assert!(!fx.session.metronome().is_running());
}

#[test]
fn test_frames_after_stop_are_ignored() {
    let mut fx = test_session(120);
    let id = fx.session.add_loop();
    record_first_take(&mut fx, id);
    fx.session.stop_loop(id).unwrap();

    let outcome = fx.session.deliver_frame(&sine_frame(220.0)).unwrap();
    assert_eq!(outcome, looper::FrameOutcome::Ignored);
    assert_eq!(fx.session.get_loop(id).unwrap().takes().len(), 1);
}

#[test]
fn test_apply_beats_to_empty_loops() {
    let mut fx = test_session(120);
    let recorded = fx.session.add_loop();
    record_first_take(&mut fx, recorded);
    let empty = fx.session.add_loop();

    assert_eq!(fx.session.apply_beats_to_empty_loops(16), Ok(1));
    assert_eq!(fx.session.get_loop(recorded).unwrap().beats(), 4);
    assert_eq!(fx.session.get_loop(empty).unwrap().beats(), 16);
    assert_abs_diff_eq!(fx.session.get_loop(empty).unwrap().duration(), 8.0);
}

#[test]
fn test_remove_loop_while_armed() {
    let mut fx = test_session(120);
    let id = fx.session.add_loop();

    let gate = match fx.session.action(id).unwrap() {
        LoopTransition::StartedRecording { gate_opens_at } => gate_opens_at,
        other => panic!("expected recording to arm, got {:?}", other),
    };
    assert_abs_diff_eq!(gate, 2.0, epsilon = TIME_EPSILON);
    fx.run(4, true);

    fx.session.remove_loop(id).unwrap();
    assert!(fx.session.get_loop(id).is_none());
    assert_eq!(fx.session.loops().current_recording(), None);
    assert!(!fx.session.recorder().is_recording());
    assert!(!fx.session.metronome().is_running());

    // Past the old gate: nothing left to write into.
    fx.run_until(2.5, false);
    assert_eq!(
        fx.session.deliver_frame(&sine_frame(220.0)).unwrap(),
        FrameOutcome::Ignored
    );

    // The slot is free for another loop.
    let next = fx.session.add_loop();
    assert!(matches!(
        fx.session.action(next).unwrap(),
        LoopTransition::StartedRecording { .. }
    ));
    assert_eq!(fx.session.loops().current_recording(), Some(next));
}

#[test]
fn test_beats_per_bar_leniency() {
    let mut fx = test_session(120);
    assert_eq!(fx.session.set_beats_per_bar(8), 8);
    assert_eq!(fx.session.set_beats_per_bar(7), 8);
    let id = fx.session.add_loop();
    assert_eq!(fx.session.get_loop(id).unwrap().beats(), 8);
}

#[test]
fn test_concatenate_keeps_min_channels() {
    let a = AudioBuffer::silent(2, 48000, TEST_SAMPLE_RATE);
    let b = AudioBuffer::silent(1, 24000, TEST_SAMPLE_RATE);
    let joined = looper::Recorder::concatenate(&a, &b).unwrap();
    assert_eq!(joined.num_channels(), 1);
    assert_abs_diff_eq!(joined.duration(), 1.5, epsilon = TIME_EPSILON);

    let none = AudioBuffer::from_channels(Vec::new(), TEST_SAMPLE_RATE);
    assert_eq!(
        looper::Recorder::concatenate(&a, &none),
        Err(CoreError::ChannelMismatch)
    );
}

#[test]
fn test_snapshot_json_round_trip() {
    let mut fx = test_session(120);
    let id = fx.session.add_loop();
    record_first_take(&mut fx, id);

    let snapshot = fx.session.snapshot();
    assert_eq!(snapshot.loops[0].takes.len(), 1);
    assert_eq!(snapshot.loops[0].state, LoopState::Playing);

    let json = serde_json::to_string(&snapshot).unwrap();
    let back: looper::SessionSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back, snapshot);
}
