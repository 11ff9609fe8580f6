use crate::audio::{CpalOutput, NullPlayer};
use crate::config::SyncConfig;
use crate::driver::{Frame, FrameDriver};
use crate::score::Score;
use crate::timing::{NoteSink, TransportCell};
use arc_swap::ArcSwapOption;
use crossbeam::channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

const FRAME_PERIOD: Duration = Duration::from_micros(16_667);
/// Keep ringing past the last note-off before auto-stopping.
const END_GRACE_SECONDS: f64 = 1.0;

#[derive(Debug, Clone)]
pub enum EngineCommand {
    LoadScore(PathBuf),
    LoadScoreData(Arc<Score>),
    Play,
    Pause,
    Stop,
    Seek(f64),
    SetRate(f64),
    SetZoom(f32),
    SetViewportWidth(f32),
}

#[derive(Debug, Clone)]
pub enum EngineUpdate {
    ScoreLoaded { events: usize, duration: f64 },
    PlaybackState { playing: bool },
    Error { message: String },
}

/// State published by the engine thread for lock-light readers: the
/// renderer polls `latest_frame`, a progress bar reads the transport
/// cell, and the score is shared read-only.
#[derive(Default)]
pub struct EngineShared {
    pub latest_frame: Mutex<Option<Frame>>,
    pub score: ArcSwapOption<Score>,
    pub transport: ArcSwapOption<TransportCell>,
}

pub struct EngineHandle {
    pub command_tx: Sender<EngineCommand>,
    pub update_rx: Receiver<EngineUpdate>,
    pub shared: Arc<EngineShared>,
}

pub fn spawn_engine(config: SyncConfig) -> EngineHandle {
    let (command_tx, command_rx) = crossbeam::channel::unbounded();
    let (update_tx, update_rx) = crossbeam::channel::unbounded();
    let shared = Arc::new(EngineShared::default());

    let thread_shared = Arc::clone(&shared);
    std::thread::spawn(move || {
        engine_thread(config, command_rx, update_tx, thread_shared);
    });

    EngineHandle {
        command_tx,
        update_rx,
        shared,
    }
}

struct EngineState {
    driver: Option<FrameDriver>,
    // The cpal stream is not Send; it lives and dies on this thread.
    _output: Option<CpalOutput>,
    config: SyncConfig,
    viewport_width: f32,
    last_tick: Instant,
}

fn engine_thread(
    config: SyncConfig,
    command_rx: Receiver<EngineCommand>,
    update_tx: Sender<EngineUpdate>,
    shared: Arc<EngineShared>,
) {
    let mut state = EngineState {
        driver: None,
        _output: None,
        config,
        viewport_width: 1200.0,
        last_tick: Instant::now(),
    };

    loop {
        match command_rx.recv_timeout(FRAME_PERIOD) {
            Ok(command) => handle_command(command, &mut state, &update_tx, &shared),
            Err(RecvTimeoutError::Timeout) => frame_tick(&mut state, &update_tx, &shared),
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn handle_command(
    command: EngineCommand,
    state: &mut EngineState,
    update_tx: &Sender<EngineUpdate>,
    shared: &Arc<EngineShared>,
) {
    match command {
        EngineCommand::LoadScore(path) => match Score::load_file(&path) {
            Ok(score) => install_score(Arc::new(score), state, update_tx, shared),
            Err(e) => {
                let _ = update_tx.send(EngineUpdate::Error {
                    message: format!("failed to load score: {e}"),
                });
            }
        },
        EngineCommand::LoadScoreData(score) => install_score(score, state, update_tx, shared),
        EngineCommand::Play => {
            if let Some(driver) = &mut state.driver {
                driver.play();
                state.last_tick = Instant::now();
                let _ = update_tx.send(EngineUpdate::PlaybackState { playing: true });
            }
        }
        EngineCommand::Pause => {
            if let Some(driver) = &mut state.driver {
                driver.pause();
                let _ = update_tx.send(EngineUpdate::PlaybackState { playing: false });
            }
        }
        EngineCommand::Stop => {
            if let Some(driver) = &mut state.driver {
                driver.stop();
                driver.rewind();
                let _ = update_tx.send(EngineUpdate::PlaybackState { playing: false });
            }
        }
        EngineCommand::Seek(target) => {
            if let Some(driver) = &mut state.driver {
                driver.seek(target);
            }
        }
        EngineCommand::SetRate(rate) => {
            if let Some(driver) = &mut state.driver {
                driver.set_rate(rate);
            }
        }
        EngineCommand::SetZoom(zoom) => {
            if let Some(driver) = &mut state.driver {
                if let Err(e) = driver.set_zoom(zoom) {
                    let _ = update_tx.send(EngineUpdate::Error {
                        message: format!("rejected zoom: {e}"),
                    });
                }
            }
        }
        EngineCommand::SetViewportWidth(width) => {
            if width.is_finite() && width > 0.0 {
                state.viewport_width = width;
            }
        }
    }
}

fn install_score(
    score: Arc<Score>,
    state: &mut EngineState,
    update_tx: &Sender<EngineUpdate>,
    shared: &Arc<EngineShared>,
) {
    // Each load gets a fresh output stream; the old one is dropped with
    // the previous driver. A machine without an audio device still gets a
    // working visual timeline through the null player.
    state._output = None;
    match CpalOutput::new() {
        Ok((output, player)) => {
            state.config.output_latency_seconds = output.output_latency();
            state._output = Some(output);
            build_driver(score, Box::new(player), state, update_tx, shared);
        }
        Err(e) => {
            warn!("audio output unavailable, continuing silent: {e}");
            build_driver(score, Box::new(NullPlayer), state, update_tx, shared);
        }
    }
}

fn build_driver(
    score: Arc<Score>,
    player: Box<dyn NoteSink>,
    state: &mut EngineState,
    update_tx: &Sender<EngineUpdate>,
    shared: &Arc<EngineShared>,
) {
    match FrameDriver::new(Arc::clone(&score), &state.config, player) {
        Ok(driver) => {
            info!(
                events = score.len(),
                duration = score.duration(),
                "score loaded"
            );
            shared.score.store(Some(Arc::clone(&score)));
            shared.transport.store(Some(driver.transport_cell()));
            *shared.latest_frame.lock() = None;
            let _ = update_tx.send(EngineUpdate::ScoreLoaded {
                events: score.len(),
                duration: score.duration(),
            });
            state.driver = Some(driver);
            state.last_tick = Instant::now();
        }
        Err(e) => {
            let _ = update_tx.send(EngineUpdate::Error {
                message: format!("invalid configuration: {e}"),
            });
        }
    }
}

fn frame_tick(
    state: &mut EngineState,
    update_tx: &Sender<EngineUpdate>,
    shared: &Arc<EngineShared>,
) {
    let Some(driver) = &mut state.driver else {
        return;
    };

    let wall_delta = state.last_tick.elapsed().as_secs_f64();
    state.last_tick = Instant::now();

    if let Some(frame) = driver.tick(wall_delta, state.viewport_width) {
        *shared.latest_frame.lock() = Some(frame);
    }

    // Auto-stop once the tail of the piece has rung out.
    if driver.is_playing() {
        let past_end = driver.transport_cell().current_time()
            > driver.score().duration() + END_GRACE_SECONDS;
        if past_end {
            driver.stop();
            let _ = update_tx.send(EngineUpdate::PlaybackState { playing: false });
        }
    }
}
