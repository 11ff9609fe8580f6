use crate::config::{ConfigError, SyncConfig};
use crate::score::{GlyphClass, Score};
use crate::timing::{
    LatencyCompensator, NoteSink, Transport, TransportCell, TriggerDetector, TriggerObserver,
    TriggerState,
};
use crate::view::ViewportGeometry;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

/// One visible note, ready for the renderer.
#[derive(Debug, Clone)]
pub struct NoteSprite {
    pub screen_x: f32,
    pub pitch: u8,
    pub glyph: GlyphClass,
    pub state: TriggerState,
}

/// Output of one driver tick.
#[derive(Debug, Clone)]
pub struct Frame {
    pub compensated_time: f64,
    pub reference_x: f32,
    pub notes: Vec<NoteSprite>,
    /// Screen x of each visible beat line.
    pub gridlines: Vec<f32>,
}

/// Per-frame orchestrator: advances the transport, runs the trigger pass,
/// culls to the visible window and maps events to screen coordinates.
/// Owns no thread; an external periodic source calls [`FrameDriver::tick`]
/// once per frame.
pub struct FrameDriver {
    score: Arc<Score>,
    transport: Transport,
    compensator: LatencyCompensator,
    detector: TriggerDetector,
    geometry: ViewportGeometry,
    player: Box<dyn NoteSink>,
    observers: Vec<Box<dyn TriggerObserver>>,
    /// Longest event duration, bounds the left-edge cull overhang.
    max_duration: f64,
    preparation_offset: f64,
    in_tick: AtomicBool,
}

impl FrameDriver {
    pub fn new(
        score: Arc<Score>,
        config: &SyncConfig,
        player: Box<dyn NoteSink>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut transport = Transport::new(score.duration());
        transport.reset(config.preparation_offset);

        let max_duration = score
            .events()
            .iter()
            .map(|e| e.duration)
            .fold(0.0, f64::max);

        Ok(Self {
            detector: TriggerDetector::new(Arc::clone(&score), config.trigger_tolerance_seconds),
            compensator: LatencyCompensator::new(config.output_latency_seconds)?,
            geometry: ViewportGeometry::new(config.reference_x, config.pixels_per_second)?,
            transport,
            score,
            player,
            observers: Vec::new(),
            max_duration,
            preparation_offset: config.preparation_offset,
            in_tick: AtomicBool::new(false),
        })
    }

    pub fn add_observer(&mut self, observer: Box<dyn TriggerObserver>) {
        self.observers.push(observer);
    }

    pub fn transport_cell(&self) -> Arc<TransportCell> {
        self.transport.cell()
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_playing()
    }

    pub fn score(&self) -> &Arc<Score> {
        &self.score
    }

    pub fn play(&mut self) {
        self.transport.play();
    }

    pub fn pause(&mut self) {
        self.transport.pause();
    }

    /// Pause and silence everything; sounding events are force-ended with
    /// note-offs.
    pub fn stop(&mut self) {
        self.transport.pause();
        self.detector
            .stop_all(self.player.as_mut(), &mut self.observers);
    }

    /// Clamped jump. The player is silenced and affected trigger states
    /// are rewritten before the next tick, so replaying through the target
    /// cannot double-fire.
    pub fn seek(&mut self, target: f64) -> f64 {
        self.detector
            .stop_all(self.player.as_mut(), &mut self.observers);
        let clamped = self.transport.seek(target);
        self.detector.seek(self.compensator.compensate(clamped));
        clamped
    }

    pub fn set_rate(&mut self, rate: f64) {
        self.transport.set_rate(rate);
    }

    pub fn set_zoom(&mut self, zoom: f32) -> Result<(), ConfigError> {
        self.geometry.set_zoom(zoom)
    }

    /// One frame: advance the clock, run trigger detection, build the
    /// visible scene. The trigger pass runs even when the caller will not
    /// redraw, so a dropped frame never starves audio timing. An
    /// overlapping call is dropped with a warning instead of queued, to
    /// avoid catch-up bursts of note-ons.
    pub fn tick(&mut self, wall_delta: f64, viewport_width: f32) -> Option<Frame> {
        if self.in_tick.swap(true, Ordering::Acquire) {
            warn!("dropping reentrant driver tick");
            return None;
        }

        self.transport.tick(wall_delta);
        let compensated = self.compensator.compensate(self.transport.current_time());

        self.detector
            .tick(compensated, self.player.as_mut(), &mut self.observers);

        let frame = self.build_frame(compensated, viewport_width);

        self.in_tick.store(false, Ordering::Release);
        Some(frame)
    }

    fn build_frame(&self, compensated: f64, viewport_width: f32) -> Frame {
        let window = self
            .geometry
            .visible_window(compensated, viewport_width, self.max_duration);

        let events = self.score.events();
        // Everything visible starts before window.1; partition_point gives
        // the exclusive upper index in the sorted score.
        let upper = events.partition_point(|e| e.start_time <= window.1);
        let lower = events.partition_point(|e| e.start_time < window.0);

        let mut notes = Vec::with_capacity(upper - lower);
        for (offset, event) in events[lower..upper].iter().enumerate() {
            if !self.geometry.is_visible(event, window) {
                continue;
            }
            notes.push(NoteSprite {
                screen_x: self.geometry.screen_x(event.start_time, compensated),
                pitch: event.pitch,
                glyph: event.glyph,
                state: self
                    .detector
                    .state(lower + offset)
                    .unwrap_or(TriggerState::Pending),
            });
        }

        Frame {
            compensated_time: compensated,
            reference_x: self.geometry.reference_x(),
            notes,
            gridlines: self.gridlines(compensated, window),
        }
    }

    /// Beat lines, mapped with the same pure function as the notes.
    fn gridlines(&self, compensated: f64, window: (f64, f64)) -> Vec<f32> {
        let spb = self.score.meta().seconds_per_beat();
        let first = (window.0 / spb).ceil() as i64;
        let last = (window.1 / spb).floor() as i64;

        (first..=last)
            .map(|beat| self.geometry.screen_x(beat as f64 * spb, compensated))
            .collect()
    }

    /// Rewind to the lead-in position, rearming every event.
    pub fn rewind(&mut self) {
        self.detector
            .stop_all(self.player.as_mut(), &mut self.observers);
        self.transport.reset(self.preparation_offset);
        self.detector
            .seek(self.compensator.compensate(-self.preparation_offset));
    }
}
