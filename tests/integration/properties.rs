//! Property tests over random control sequences.

use crate::helpers::*;
use looper::prelude::*;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Press(usize),
    Stop(usize),
    Play(usize),
    Record(usize),
    Tempo(u32),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..3).prop_map(Op::Press),
        (0usize..3).prop_map(Op::Stop),
        (1usize..40).prop_map(Op::Play),
        (1usize..80).prop_map(Op::Record),
        (20u32..=220).prop_map(Op::Tempo),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn session_invariants_hold(ops in prop::collection::vec(op(), 1..40)) {
        let mut fx = test_session(120);
        let ids: Vec<LoopId> = (0..3).map(|_| fx.session.add_loop()).collect();
        let mut last_count = 0u64;
        let mut last_next = f64::MIN;

        for op in ops {
            match op {
                Op::Press(i) => { fx.session.action(ids[i]).unwrap(); }
                Op::Stop(i) => { fx.session.stop_loop(ids[i]).unwrap(); }
                Op::Play(steps) => fx.run(steps, false),
                Op::Record(steps) => fx.run(steps, true),
                Op::Tempo(bpm) => { fx.session.set_tempo(bpm); }
            }

            let loops = fx.session.loops();
            let recording: Vec<LoopId> = loops
                .iter()
                .filter(|lp| lp.is_recording())
                .map(|lp| lp.id())
                .collect();
            prop_assert!(recording.len() <= 1);
            prop_assert_eq!(recording.first().copied(), loops.current_recording());

            let epsilon = fx.session.config().frame_epsilon;
            for lp in loops.iter() {
                for take in lp.takes() {
                    prop_assert!(take.duration() <= lp.duration() - epsilon + STEP + 1e-9);
                }
                if !lp.is_recording() {
                    prop_assert!(lp.takes().iter().all(|take| take.is_recorded()));
                }
            }

            let metronome = fx.session.metronome();
            if metronome.is_running() {
                if metronome.beats_count() >= last_count && last_count > 0 {
                    prop_assert!(metronome.next_beat_time() >= last_next);
                }
                last_count = metronome.beats_count();
                last_next = metronome.next_beat_time();
            } else {
                prop_assert_eq!(metronome.beats_count(), 0);
                last_count = 0;
                last_next = f64::MIN;
            }
        }

        let nums = fx.draws.nums();
        for pair in nums.windows(2) {
            prop_assert!(pair[1] == pair[0] + 1 || pair[1] == 1);
        }
    }
}
