use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Lock-free mirror of the transport position for readers on other
/// threads (progress bars, the engine's shared state). The owning thread
/// publishes after every mutation; readers only ever load.
#[derive(Debug, Default)]
pub struct TransportCell {
    time_bits: AtomicU64,
    playing: AtomicBool,
}

impl TransportCell {
    pub fn current_time(&self) -> f64 {
        f64::from_bits(self.time_bits.load(Ordering::Relaxed))
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }

    fn publish(&self, time: f64, playing: bool) {
        self.time_bits.store(time.to_bits(), Ordering::Relaxed);
        self.playing.store(playing, Ordering::Relaxed);
    }
}

/// Authoritative playback clock. Mutated only by the driver thread, once
/// per frame; everyone else reads through the shared cell.
#[derive(Debug)]
pub struct Transport {
    current_time: f64,
    playing: bool,
    rate: f64,
    /// Lower seek bound, set on start(). Seeks clamp to [-this, end].
    preparation_offset: f64,
    /// Upper seek bound, the loaded score's duration.
    end_time: f64,
    cell: Arc<TransportCell>,
}

impl Transport {
    pub fn new(end_time: f64) -> Self {
        let transport = Self {
            current_time: 0.0,
            playing: false,
            rate: 1.0,
            preparation_offset: 0.0,
            end_time,
            cell: Arc::new(TransportCell::default()),
        };
        transport.cell.publish(0.0, false);
        transport
    }

    /// Handle for cross-thread reads.
    pub fn cell(&self) -> Arc<TransportCell> {
        Arc::clone(&self.cell)
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Rewinds to the lead-in position without starting playback. Called
    /// on score load.
    pub fn reset(&mut self, preparation_offset: f64) {
        self.preparation_offset = preparation_offset;
        self.current_time = -preparation_offset;
        self.playing = false;
        self.cell.publish(self.current_time, false);
    }

    /// Begins playback with a lead-in: events become visible and scroll
    /// toward the reference line before any of them is due.
    pub fn start(&mut self, preparation_offset: f64) {
        self.reset(preparation_offset);
        self.playing = true;
        self.cell.publish(self.current_time, true);
    }

    pub fn play(&mut self) {
        self.playing = true;
        self.cell.publish(self.current_time, true);
    }

    pub fn pause(&mut self) {
        self.playing = false;
        self.cell.publish(self.current_time, false);
    }

    /// Advances the clock by one frame's wall time, scaled by the playback
    /// rate. Called by exactly one owner, never reentrant.
    pub fn tick(&mut self, wall_delta: f64) {
        if self.playing {
            self.current_time += wall_delta * self.rate;
            self.cell.publish(self.current_time, true);
        }
    }

    /// Jumps to `target`, clamped to the score bounds. Trigger state for
    /// affected events is reset by the caller before the next tick.
    pub fn seek(&mut self, target: f64) -> f64 {
        self.current_time = target.clamp(-self.preparation_offset, self.end_time);
        self.cell.publish(self.current_time, self.playing);
        self.current_time
    }

    /// Negative rates are refused: current_time must stay monotonically
    /// non-decreasing while playing.
    pub fn set_rate(&mut self, rate: f64) {
        if rate.is_finite() && rate >= 0.0 {
            self.rate = rate;
        } else {
            tracing::warn!(rate, "ignoring invalid playback rate");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_sets_negative_lead_in() {
        let mut t = Transport::new(10.0);
        t.start(2.0);
        assert_eq!(t.current_time(), -2.0);
        assert!(t.is_playing());
    }

    #[test]
    fn tick_advances_only_while_playing() {
        let mut t = Transport::new(10.0);
        t.start(0.0);
        t.tick(1.0 / 60.0);
        let after_one = t.current_time();
        assert!((after_one - 1.0 / 60.0).abs() < 1e-12);

        t.pause();
        t.tick(1.0);
        assert_eq!(t.current_time(), after_one);
    }

    #[test]
    fn rate_scales_wall_delta() {
        let mut t = Transport::new(10.0);
        t.start(0.0);
        t.set_rate(0.5);
        t.tick(1.0);
        assert_eq!(t.current_time(), 0.5);
    }

    #[test]
    fn negative_rate_is_ignored() {
        let mut t = Transport::new(10.0);
        t.start(0.0);
        t.set_rate(-1.0);
        assert_eq!(t.rate(), 1.0);
    }

    #[test]
    fn seek_clamps_to_bounds() {
        let mut t = Transport::new(10.0);
        t.start(2.0);
        assert_eq!(t.seek(500.0), 10.0);
        assert_eq!(t.seek(-500.0), -2.0);
        assert_eq!(t.seek(4.5), 4.5);
        assert_eq!(t.current_time(), 4.5);
    }

    #[test]
    fn cell_mirrors_owner_state() {
        let mut t = Transport::new(10.0);
        let cell = t.cell();
        t.start(1.0);
        assert_eq!(cell.current_time(), -1.0);
        assert!(cell.is_playing());
        t.pause();
        assert!(!cell.is_playing());
    }
}
