//! Stylus state carried between DFT sub-frames.
//!
//! Position, button and pressure arrive as separate DFT windows, so the
//! running sample is accumulated here and only snapshots of it leave the
//! core. The rubber transition rule lives here too: toggling the eraser
//! while the pen is in proximity confuses downstream consumers, so the pen
//! is forced out of proximity first.

use super::model::StylusSample;

/// Running stylus snapshot, created once per pen session.
#[derive(Debug, Default)]
pub struct StylusTracker {
    sample: StylusSample,
}

impl StylusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample(&self) -> &StylusSample {
        &self.sample
    }

    /// A valid position fix: enter (or stay in) proximity and move.
    /// Returns the sample to emit.
    pub fn position(&mut self, x: f64, y: f64) -> StylusSample {
        self.sample.proximity = true;
        self.sample.x = x;
        self.sample.y = y;
        self.sample
    }

    /// Leave proximity, clearing all flags. Returns the final snapshot to
    /// emit, or `None` if the pen already was out of proximity.
    pub fn stop(&mut self) -> Option<StylusSample> {
        if !self.sample.proximity {
            return None;
        }

        self.sample.proximity = false;
        self.sample.contact = false;
        self.sample.button = false;
        self.sample.rubber = false;
        self.sample.pressure = 0.0;
        Some(self.sample)
    }

    /// Update the side-button and eraser flags. If the eraser flag changes,
    /// proximity is dropped first and the stop snapshot returned for
    /// emission.
    pub fn set_button(&mut self, button: bool, rubber: bool) -> Option<StylusSample> {
        self.sample.button = button;

        let stopped = if rubber != self.sample.rubber {
            self.stop()
        } else {
            None
        };

        self.sample.rubber = rubber;
        stopped
    }

    /// Update contact and pressure. Proximity is left untouched; it is
    /// owned by the position fixes.
    pub fn set_pressure(&mut self, contact: bool, pressure: f64) {
        self.sample.contact = contact;
        self.sample.pressure = pressure;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_only_emits_while_proximate() {
        let mut tracker = StylusTracker::new();
        assert!(tracker.stop().is_none());

        tracker.position(0.5, 0.5);
        let stopped = tracker.stop().unwrap();
        assert!(!stopped.proximity);
        assert!(!stopped.contact);
        assert_eq!(stopped.pressure, 0.0);

        assert!(tracker.stop().is_none());
    }

    #[test]
    fn test_rubber_toggle_forces_stop() {
        let mut tracker = StylusTracker::new();
        tracker.position(0.25, 0.75);

        let stopped = tracker.set_button(false, true).unwrap();
        assert!(!stopped.proximity);
        // The stop snapshot predates the new rubber value.
        assert!(!stopped.rubber);
        assert!(tracker.sample().rubber);

        // Same rubber value again: no stop.
        assert!(tracker.set_button(true, true).is_none());
        assert!(tracker.sample().button);
    }

    #[test]
    fn test_pressure_does_not_touch_proximity() {
        let mut tracker = StylusTracker::new();
        tracker.set_pressure(true, 0.5);
        assert!(!tracker.sample().proximity);
        assert!(tracker.sample().contact);

        let sample = tracker.position(0.1, 0.2);
        assert!(sample.proximity);
        assert!(sample.contact);
        assert_eq!(sample.pressure, 0.5);
    }
}
