use crate::config::ConfigError;
use crate::score::MusicalEvent;

/// Time -> screen mapping for the scrolling staff. Horizontal position is
/// a pure function of an event's fixed start time and the compensated
/// playback time; there is no running scroll accumulator, so the mapping
/// cannot drift and any position can be recomputed in isolation.
#[derive(Debug, Clone, Copy)]
pub struct ViewportGeometry {
    /// Fixed screen x of the "now" line.
    reference_x: f32,
    base_pixels_per_second: f32,
    zoom: f32,
}

impl ViewportGeometry {
    pub fn new(reference_x: f32, pixels_per_second: f32) -> Result<Self, ConfigError> {
        if !pixels_per_second.is_finite() || !reference_x.is_finite() {
            return Err(ConfigError::NonFinite);
        }
        if pixels_per_second <= 0.0 {
            return Err(ConfigError::NonPositiveScale(pixels_per_second));
        }
        Ok(Self {
            reference_x,
            base_pixels_per_second: pixels_per_second,
            zoom: 1.0,
        })
    }

    pub fn reference_x(&self) -> f32 {
        self.reference_x
    }

    pub fn pixels_per_second(&self) -> f32 {
        self.base_pixels_per_second * self.zoom
    }

    /// Multiplier on the base scale. Rejected unless finite and > 0; a
    /// wrong sign would invert the scroll direction.
    pub fn set_zoom(&mut self, zoom: f32) -> Result<(), ConfigError> {
        if !zoom.is_finite() {
            return Err(ConfigError::NonFinite);
        }
        if zoom <= 0.0 {
            return Err(ConfigError::NonPositiveScale(zoom));
        }
        self.zoom = zoom;
        Ok(())
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Past times land left of the reference line, upcoming ones right.
    pub fn screen_x(&self, event_time: f64, compensated_time: f64) -> f32 {
        self.reference_x + ((event_time - compensated_time) as f32) * self.pixels_per_second()
    }

    /// Time span intersecting a viewport of the given width, widened by
    /// `overhang` seconds on the left so a note's tail stays visible
    /// until its duration has fully scrolled past.
    pub fn visible_window(
        &self,
        compensated_time: f64,
        viewport_width: f32,
        overhang: f64,
    ) -> (f64, f64) {
        let scale = self.pixels_per_second() as f64;
        let min = compensated_time - self.reference_x as f64 / scale - overhang;
        let max = compensated_time + (viewport_width - self.reference_x) as f64 / scale;
        (min, max)
    }

    pub fn is_visible(&self, event: &MusicalEvent, window: (f64, f64)) -> bool {
        event.start_time <= window.1 && event.end_time() >= window.0
    }
}

/// Vertical position of a pitch: semitone rows stacked bottom-up, pure in
/// pitch alone.
pub fn pitch_to_screen_y(pitch: u8, viewport_height: f32, row_height: f32) -> f32 {
    viewport_height - (pitch as f32 + 1.0) * row_height
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> ViewportGeometry {
        ViewportGeometry::new(200.0, 100.0).unwrap()
    }

    #[test]
    fn event_at_now_sits_on_reference_line() {
        let g = geometry();
        assert_eq!(g.screen_x(3.5, 3.5), 200.0);
    }

    #[test]
    fn screen_x_is_strictly_decreasing_in_time() {
        let g = geometry();
        let mut last = f32::INFINITY;
        let mut t = 0.0;
        while t < 5.0 {
            let x = g.screen_x(2.0, t);
            assert!(x < last);
            last = x;
            t += 0.1;
        }
    }

    #[test]
    fn past_events_left_future_events_right() {
        let g = geometry();
        assert!(g.screen_x(1.0, 2.0) < 200.0);
        assert!(g.screen_x(3.0, 2.0) > 200.0);
        // one second ahead at 100 px/s
        assert_eq!(g.screen_x(3.0, 2.0), 300.0);
    }

    #[test]
    fn zoom_scales_distances_not_the_reference() {
        let mut g = geometry();
        let before = g.screen_x(3.0, 2.0);
        g.set_zoom(2.0).unwrap();
        let after = g.screen_x(3.0, 2.0);
        assert_eq!(before - 200.0, (after - 200.0) / 2.0);
        assert_eq!(g.screen_x(2.0, 2.0), 200.0);
    }

    #[test]
    fn invalid_zoom_is_rejected() {
        let mut g = geometry();
        assert!(g.set_zoom(0.0).is_err());
        assert!(g.set_zoom(-1.0).is_err());
        assert!(g.set_zoom(f32::NAN).is_err());
        assert_eq!(g.zoom(), 1.0);
    }

    #[test]
    fn invalid_scale_is_rejected_at_construction() {
        assert!(ViewportGeometry::new(200.0, 0.0).is_err());
        assert!(ViewportGeometry::new(200.0, -5.0).is_err());
    }

    #[test]
    fn visible_window_covers_the_screen() {
        let g = geometry();
        // reference at 200 px, 800 px wide: 2 s behind, 6 s ahead
        let (min, max) = g.visible_window(10.0, 800.0, 0.0);
        assert!((min - 8.0).abs() < 1e-6);
        assert!((max - 16.0).abs() < 1e-6);
    }

    #[test]
    fn pitch_rows_stack_bottom_up() {
        let low = pitch_to_screen_y(36, 600.0, 4.0);
        let high = pitch_to_screen_y(84, 600.0, 4.0);
        assert!(high < low);
    }
}
