pub mod audio;
pub mod config;
pub mod driver;
pub mod engine;
pub mod events;
pub mod score;
pub mod timing;
pub mod view;

pub use config::{ConfigError, SyncConfig};
pub use driver::{Frame, FrameDriver, NoteSprite};
pub use engine::{EngineCommand, EngineHandle, EngineShared, EngineUpdate, spawn_engine};
pub use score::{
    GlyphClass, MusicalEvent, RawEvent, Score, ScoreFile, ScoreLoadError, ScoreMeta,
};
pub use timing::{
    LatencyCompensator, NoteSink, Transport, TransportCell, TriggerDetector, TriggerObserver,
    TriggerState,
};
pub use view::{ViewportGeometry, pitch_to_screen_y};
