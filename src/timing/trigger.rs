use crate::score::Score;
use std::sync::Arc;

/// Receiver of note commands at the audio boundary. Implementations must
/// not block; failures are handled (logged and swallowed) behind this
/// trait so the state machine always advances.
pub trait NoteSink {
    fn note_on(&mut self, pitch: u8, velocity: u8);
    fn note_off(&mut self, pitch: u8);
    fn stop_all(&mut self);
}

/// Synchronous callbacks for practice-mode collaborators. Invoked during
/// the detector pass, after the corresponding player call.
pub trait TriggerObserver {
    fn on_note_triggered(&mut self, _pitch: u8, _velocity: u8) {}
    fn on_note_ended(&mut self, _pitch: u8) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    Pending,
    Fired,
    Ended,
}

/// Stateful matcher deciding which events fire or end on each tick.
///
/// Events are tracked with a `Pending -> Fired -> Ended` state machine and
/// scanned through a window bounded by two cursors: `next_unfired` walks
/// the sorted score monotonically, `active` holds the handful of sounding
/// notes. Per-tick cost is amortized O(1) regardless of score length.
pub struct TriggerDetector {
    score: Arc<Score>,
    states: Vec<TriggerState>,
    /// First index that has not fired in the current monotonic pass.
    next_unfired: usize,
    /// Indices in Fired state, awaiting their end time.
    active: Vec<usize>,
    /// Early-fire margin covering discrete tick sampling. Independent of
    /// audio latency compensation.
    tolerance: f64,
}

impl TriggerDetector {
    pub fn new(score: Arc<Score>, tolerance: f64) -> Self {
        let states = vec![TriggerState::Pending; score.len()];
        Self {
            score,
            states,
            next_unfired: 0,
            active: Vec::with_capacity(16),
            tolerance,
        }
    }

    pub fn state(&self, index: usize) -> Option<TriggerState> {
        self.states.get(index).copied()
    }

    /// Index of the first event that has not fired in the current pass.
    /// Non-decreasing between seeks; only `seek` may move it backward.
    pub fn cursor(&self) -> usize {
        self.next_unfired
    }

    /// One detection pass at the given compensated time. Fires every due
    /// Pending event (no upper bound, so an event is never skipped; a very
    /// short one may fire and end within the same pass), then ends every
    /// sounding event whose end time has been reached. Within a pass,
    /// fires happen in start_time order, ties by pitch ascending, which is
    /// the score order.
    pub fn tick(
        &mut self,
        compensated_time: f64,
        sink: &mut dyn NoteSink,
        observers: &mut [Box<dyn TriggerObserver>],
    ) {
        let events = self.score.events();

        while self.next_unfired < events.len() {
            let event = &events[self.next_unfired];
            if compensated_time + self.tolerance < event.start_time {
                break;
            }
            // Seek marks already-elapsed events Ended without sounding
            // them; the cursor steps over those.
            if self.states[self.next_unfired] == TriggerState::Pending {
                self.states[self.next_unfired] = TriggerState::Fired;
                self.active.push(self.next_unfired);
                sink.note_on(event.pitch, event.velocity);
                for obs in observers.iter_mut() {
                    obs.on_note_triggered(event.pitch, event.velocity);
                }
            }
            self.next_unfired += 1;
        }

        let mut i = 0;
        while i < self.active.len() {
            let index = self.active[i];
            if compensated_time >= events[index].end_time() {
                self.states[index] = TriggerState::Ended;
                self.active.swap_remove(i);
                sink.note_off(events[index].pitch);
                for obs in observers.iter_mut() {
                    obs.on_note_ended(events[index].pitch);
                }
            } else {
                i += 1;
            }
        }
    }

    /// Atomically rewrites event states for a jump to `target`: upcoming
    /// events become Pending again, fully elapsed ones are marked Ended
    /// without emitting anything, and events spanning the target re-arm so
    /// held notes sound again from the seek point. The caller silences the
    /// player first.
    pub fn seek(&mut self, target: f64) {
        let events = self.score.events();
        self.active.clear();
        self.next_unfired = events.len();

        for (index, event) in events.iter().enumerate() {
            self.states[index] = if event.end_time() <= target {
                TriggerState::Ended
            } else {
                TriggerState::Pending
            };
            if self.states[index] == TriggerState::Pending && index < self.next_unfired {
                self.next_unfired = index;
            }
        }
    }

    /// Force-ends every sounding note, emitting note-off for each. Used on
    /// explicit playback stop.
    pub fn stop_all(&mut self, sink: &mut dyn NoteSink, observers: &mut [Box<dyn TriggerObserver>]) {
        let events = self.score.events();
        for &index in &self.active {
            self.states[index] = TriggerState::Ended;
            sink.note_off(events[index].pitch);
            for obs in observers.iter_mut() {
                obs.on_note_ended(events[index].pitch);
            }
        }
        self.active.clear();
        sink.stop_all();
    }

    pub fn sounding(&self) -> usize {
        self.active.len()
    }
}
