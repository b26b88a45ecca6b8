//! Headless looper run: records a synthetic sine into one loop, lets it play
//! back for two bars and prints what was scheduled.
//!
//! Usage: `cargo run --example headless [tempo]`

use looper::prelude::*;
use looper::{Result, SinkEvent};
use std::env;
use std::f32::consts::TAU;
use std::thread;
use std::time::Duration;

const SAMPLE_RATE: f64 = 48_000.0;
const FRAME_MS: u64 = 25;

fn sine_frame(phase: &mut f32, frequency: f32) -> AudioBuffer {
    let frames = (SAMPLE_RATE * FRAME_MS as f64 / 1000.0) as usize;
    let step = TAU * frequency / SAMPLE_RATE as f32;
    let mut interleaved = Vec::with_capacity(frames * 2);
    for _ in 0..frames {
        let sample = 0.25 * phase.sin();
        interleaved.extend_from_slice(&[sample, sample]);
        *phase = (*phase + step) % TAU;
    }
    AudioBuffer::from_interleaved(&interleaved, 2, SAMPLE_RATE)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let tempo = env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(120);

    let log = ScheduleLog::new();
    let engine = LooperEngine::builder()
        .tempo(tempo)
        .build_with(log.clone(), |beat: &Beat| {
            tracing::info!(num = beat.num, time = beat.time, bar = beat.bar_start, "Beat");
        })?;
    let looper = engine.handle();

    let id = looper.add_loop()?;
    let transition = looper.action(id)?;
    tracing::info!(?transition, "Pressed {}", id);

    // Feed input for the count-in bar plus one full loop pass.
    let bar = 60.0 / engine.tempo() as f64 * 4.0;
    let frames = (2.0 * bar * 1000.0 / FRAME_MS as f64).ceil() as usize;
    let mut phase = 0.0;
    for _ in 0..frames {
        looper.deliver_frame(sine_frame(&mut phase, 330.0))?;
        thread::sleep(Duration::from_millis(FRAME_MS));
    }

    let transition = looper.action(id)?;
    tracing::info!(?transition, "Pressed {}", id);

    thread::sleep(Duration::from_secs_f64(bar * 2.0));
    let snapshot = looper.snapshot()?;
    println!("{snapshot:#?}");

    looper.stop_loop(id)?;
    engine.shutdown();

    let clicks = log.clicks().len();
    let playbacks = log
        .events()
        .iter()
        .filter(|event| matches!(event, SinkEvent::Scheduled { .. }))
        .count();
    println!("scheduled {playbacks} playback(s) and {clicks} click(s)");
    Ok(())
}
