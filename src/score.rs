use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoreLoadError {
    #[error("event {index}: duration must be > 0 (got {duration})")]
    NonPositiveDuration { index: usize, duration: f64 },
    #[error("event {index}: start_time must be >= 0 (got {start_time})")]
    NegativeStartTime { index: usize, start_time: f64 },
    #[error("event {index}: non-finite time value")]
    NonFiniteTime { index: usize },
    #[error("event {index}: pitch must be 0-127 (got {pitch})")]
    PitchOutOfRange { index: usize, pitch: u8 },
    #[error("event {index}: velocity must be 0-127 (got {velocity})")]
    VelocityOutOfRange { index: usize, velocity: u8 },
    #[error("failed to read score file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse score file: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Visual duration class of a note head, used by the renderer to pick a
/// glyph. Thresholds are in beats (quarter note = 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GlyphClass {
    Whole,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
}

impl GlyphClass {
    pub fn from_duration(duration_secs: f64, seconds_per_beat: f64) -> Self {
        let beats = duration_secs / seconds_per_beat;
        if beats >= 4.0 {
            GlyphClass::Whole
        } else if beats >= 2.0 {
            GlyphClass::Half
        } else if beats >= 1.0 {
            GlyphClass::Quarter
        } else if beats >= 0.5 {
            GlyphClass::Eighth
        } else if beats >= 0.25 {
            GlyphClass::Sixteenth
        } else {
            GlyphClass::ThirtySecond
        }
    }
}

/// One scheduled note. Immutable once the score is loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MusicalEvent {
    pub pitch: u8,
    pub velocity: u8,
    /// Seconds from the start of the piece.
    pub start_time: f64,
    /// Seconds, always > 0.
    pub duration: f64,
    pub glyph: GlyphClass,
}

impl MusicalEvent {
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}

/// Raw event tuple as produced by the MIDI parser: track-merged, but not
/// yet validated or sorted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    pub pitch: u8,
    pub start_time: f64,
    pub duration: f64,
    pub velocity: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreMeta {
    pub title: Option<String>,
    pub bpm: f64,
    pub time_signature: (u32, u32),
}

impl Default for ScoreMeta {
    fn default() -> Self {
        Self {
            title: None,
            bpm: 120.0,
            time_signature: (4, 4),
        }
    }
}

impl ScoreMeta {
    pub fn seconds_per_beat(&self) -> f64 {
        60.0 / self.bpm
    }
}

/// Serialized score file: raw events plus metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreFile {
    #[serde(default)]
    pub meta: ScoreMeta,
    pub events: Vec<RawEvent>,
}

/// Immutable, time-ordered event sequence for one piece. Sorted by
/// start_time ascending, ties broken by pitch ascending.
#[derive(Debug, Clone)]
pub struct Score {
    events: Vec<MusicalEvent>,
    meta: ScoreMeta,
}

impl Score {
    /// Validates and sorts raw events into a score. Any invalid event
    /// rejects the whole load.
    pub fn load(raw: Vec<RawEvent>, meta: ScoreMeta) -> Result<Self, ScoreLoadError> {
        let seconds_per_beat = meta.seconds_per_beat();
        let mut events = Vec::with_capacity(raw.len());

        for (index, ev) in raw.into_iter().enumerate() {
            if !ev.start_time.is_finite() || !ev.duration.is_finite() {
                return Err(ScoreLoadError::NonFiniteTime { index });
            }
            if ev.duration <= 0.0 {
                return Err(ScoreLoadError::NonPositiveDuration {
                    index,
                    duration: ev.duration,
                });
            }
            if ev.start_time < 0.0 {
                return Err(ScoreLoadError::NegativeStartTime {
                    index,
                    start_time: ev.start_time,
                });
            }
            // u8 still admits 128-255; the MIDI domain is 0-127.
            if ev.pitch > 127 {
                return Err(ScoreLoadError::PitchOutOfRange {
                    index,
                    pitch: ev.pitch,
                });
            }
            if ev.velocity > 127 {
                return Err(ScoreLoadError::VelocityOutOfRange {
                    index,
                    velocity: ev.velocity,
                });
            }

            events.push(MusicalEvent {
                pitch: ev.pitch,
                velocity: ev.velocity,
                start_time: ev.start_time,
                duration: ev.duration,
                glyph: GlyphClass::from_duration(ev.duration, seconds_per_beat),
            });
        }

        events.sort_by(|a, b| {
            a.start_time
                .total_cmp(&b.start_time)
                .then(a.pitch.cmp(&b.pitch))
        });

        Ok(Self { events, meta })
    }

    pub fn load_file(path: &Path) -> Result<Self, ScoreLoadError> {
        let text = fs::read_to_string(path)?;
        let file: ScoreFile = ron::from_str(&text)?;
        Self::load(file.events, file.meta)
    }

    pub fn events(&self) -> &[MusicalEvent] {
        &self.events
    }

    pub fn meta(&self) -> &ScoreMeta {
        &self.meta
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// End of the last-sounding event, in seconds. 0.0 for an empty score.
    pub fn duration(&self) -> f64 {
        self.events
            .iter()
            .map(|e| e.end_time())
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pitch: u8, start: f64, dur: f64) -> RawEvent {
        RawEvent {
            pitch,
            start_time: start,
            duration: dur,
            velocity: 100,
        }
    }

    #[test]
    fn load_sorts_by_start_then_pitch() {
        let score = Score::load(
            vec![raw(64, 2.0, 1.0), raw(60, 2.0, 1.0), raw(72, 0.5, 1.0)],
            ScoreMeta::default(),
        )
        .unwrap();

        let order: Vec<(u8, f64)> = score
            .events()
            .iter()
            .map(|e| (e.pitch, e.start_time))
            .collect();
        assert_eq!(order, vec![(72, 0.5), (60, 2.0), (64, 2.0)]);
    }

    #[test]
    fn load_rejects_non_positive_duration() {
        let err = Score::load(vec![raw(60, 0.0, 0.0)], ScoreMeta::default());
        assert!(matches!(
            err,
            Err(ScoreLoadError::NonPositiveDuration { index: 0, .. })
        ));
    }

    #[test]
    fn load_rejects_negative_start_time() {
        let err = Score::load(
            vec![raw(60, 0.0, 1.0), raw(62, -0.5, 1.0)],
            ScoreMeta::default(),
        );
        assert!(matches!(
            err,
            Err(ScoreLoadError::NegativeStartTime { index: 1, .. })
        ));
    }

    #[test]
    fn load_rejects_out_of_range_pitch() {
        let err = Score::load(
            vec![RawEvent {
                pitch: 200,
                start_time: 0.0,
                duration: 1.0,
                velocity: 100,
            }],
            ScoreMeta::default(),
        );
        assert!(matches!(
            err,
            Err(ScoreLoadError::PitchOutOfRange { index: 0, pitch: 200 })
        ));
    }

    #[test]
    fn load_rejects_out_of_range_velocity() {
        let err = Score::load(
            vec![RawEvent {
                pitch: 60,
                start_time: 0.0,
                duration: 1.0,
                velocity: 200,
            }],
            ScoreMeta::default(),
        );
        assert!(matches!(
            err,
            Err(ScoreLoadError::VelocityOutOfRange {
                index: 0,
                velocity: 200
            })
        ));
    }

    #[test]
    fn load_rejects_non_finite_times() {
        let err = Score::load(vec![raw(60, f64::NAN, 1.0)], ScoreMeta::default());
        assert!(matches!(err, Err(ScoreLoadError::NonFiniteTime { index: 0 })));
    }

    #[test]
    fn glyph_classification_at_120_bpm() {
        // 120 BPM: one beat = 0.5 s
        let spb = 0.5;
        assert_eq!(GlyphClass::from_duration(2.0, spb), GlyphClass::Whole);
        assert_eq!(GlyphClass::from_duration(1.0, spb), GlyphClass::Half);
        assert_eq!(GlyphClass::from_duration(0.5, spb), GlyphClass::Quarter);
        assert_eq!(GlyphClass::from_duration(0.25, spb), GlyphClass::Eighth);
        assert_eq!(GlyphClass::from_duration(0.125, spb), GlyphClass::Sixteenth);
        assert_eq!(GlyphClass::from_duration(0.06, spb), GlyphClass::ThirtySecond);
    }

    #[test]
    fn duration_is_last_event_end() {
        let score = Score::load(
            vec![raw(60, 0.0, 4.0), raw(62, 1.0, 0.5)],
            ScoreMeta::default(),
        )
        .unwrap();
        assert_eq!(score.duration(), 4.0);
    }
}
