use notaroll::{EngineCommand, EngineUpdate, SyncConfig, spawn_engine};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let Some(path) = std::env::args().nth(1).map(PathBuf::from) else {
        eprintln!("usage: notaroll <score.ron>");
        std::process::exit(2);
    };

    let engine = spawn_engine(SyncConfig::default());
    let _ = engine.command_tx.send(EngineCommand::LoadScore(path));

    let mut started = false;
    loop {
        match engine.update_rx.recv_timeout(Duration::from_millis(250)) {
            Ok(EngineUpdate::ScoreLoaded { events, duration }) => {
                info!(events, duration, "score loaded, starting playback");
                let _ = engine.command_tx.send(EngineCommand::Play);
            }
            Ok(EngineUpdate::PlaybackState { playing: true }) => started = true,
            Ok(EngineUpdate::PlaybackState { playing: false }) if started => {
                info!("playback finished");
                break;
            }
            Ok(EngineUpdate::PlaybackState { playing: false }) => {}
            Ok(EngineUpdate::Error { message }) => {
                eprintln!("error: {message}");
                std::process::exit(1);
            }
            Err(crossbeam::channel::RecvTimeoutError::Timeout) => {
                if let Some(cell) = engine.shared.transport.load_full() {
                    if started {
                        info!("playing at {:.2}s", cell.current_time());
                    }
                }
            }
            Err(crossbeam::channel::RecvTimeoutError::Disconnected) => break,
        }
    }
}
