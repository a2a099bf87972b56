//! Stylus localization from DFT windows.
//!
//! The touch controller answers an antenna sweep with per-axis DFT rows of
//! nine complex components each. Position falls out of a parabolic fit over
//! the phase-aligned center triplet, contact pressure out of frequency
//! interpolation across rows, and the side-button/eraser distinction out of
//! phase agreement with the last position sample.

use super::model::{DftWindow, StylusSample};
use super::stylus::StylusTracker;
use super::wire::{
    DftRow, DFT_BUTTON, DFT_NUM_COMPONENTS, DFT_POSITION, DFT_PRESSURE, DFT_PRESSURE_ROWS,
    MAX_PRESSURE,
};

// Calibration thresholds, matched against device captures.
pub const POSITION_MIN_AMP: f64 = 50.0;
pub const POSITION_MIN_MAG: u32 = 2000;
pub const BUTTON_MIN_MAG: u32 = 1000;
pub const FREQ_MIN_MAG: u64 = 10000;

/// Exponent applied to the amplitude triplet before the parabolic fit.
/// Tune to minimize jagginess of diagonal lines.
pub const DEFAULT_POSITION_EXP: f64 = -0.7;

/// Turns DFT windows into stylus samples.
///
/// Holds the running stylus state, the phasor of the last valid position
/// sample, and the sensor grid dimensions used to normalize positions.
/// Samples are handed to the `emit` callback of [`DftProcessor::process`];
/// a window may produce zero or one of them.
#[derive(Debug)]
pub struct DftProcessor {
    tracker: StylusTracker,
    last_real: i32,
    last_imag: i32,

    num_cols: u32,
    num_rows: u32,

    invert_x: bool,
    invert_y: bool,
    position_exp: f64,
}

impl DftProcessor {
    pub fn new(invert_x: bool, invert_y: bool) -> Self {
        Self {
            tracker: StylusTracker::new(),
            last_real: 0,
            last_imag: 0,
            num_cols: 0,
            num_rows: 0,
            invert_x,
            invert_y,
            position_exp: DEFAULT_POSITION_EXP,
        }
    }

    pub fn with_position_exp(mut self, exp: f64) -> Self {
        self.position_exp = exp;
        self
    }

    /// Sensor grid size, from the device metadata or a heatmap dimensions
    /// report. Until both are at least 2, position windows only produce
    /// stop transitions.
    pub fn set_dimensions(&mut self, columns: u32, rows: u32) {
        self.num_cols = columns;
        self.num_rows = rows;
    }

    /// Current running stylus state.
    pub fn sample(&self) -> &StylusSample {
        self.tracker.sample()
    }

    pub fn process<F: FnMut(&StylusSample)>(&mut self, window: &DftWindow, mut emit: F) {
        match window.data_type {
            DFT_POSITION => self.position(window, &mut emit),
            DFT_BUTTON => self.button(window, &mut emit),
            DFT_PRESSURE => self.pressure(window),
            _ => {}
        }
    }

    fn position<F: FnMut(&StylusSample)>(&mut self, window: &DftWindow, emit: &mut F) {
        let weak = window.rows() == 0
            || self.num_cols < 2
            || self.num_rows < 2
            || window.x[0].magnitude <= POSITION_MIN_MAG
            || window.y[0].magnitude <= POSITION_MIN_MAG;

        if weak {
            if let Some(stopped) = self.tracker.stop() {
                emit(&stopped);
            }
            return;
        }

        let mid = DFT_NUM_COMPONENTS / 2;
        self.last_real = i32::from(window.x[0].real[mid]) + i32::from(window.y[0].real[mid]);
        self.last_imag = i32::from(window.x[0].imag[mid]) + i32::from(window.y[0].imag[mid]);

        let x = interpolate_position(&window.x[0], self.position_exp);
        let y = interpolate_position(&window.y[0], self.position_exp);

        if x.is_nan() || y.is_nan() {
            if let Some(stopped) = self.tracker.stop() {
                emit(&stopped);
            }
            return;
        }

        let mut x = x / f64::from(self.num_cols - 1);
        let mut y = y / f64::from(self.num_rows - 1);
        if self.invert_x {
            x = 1.0 - x;
        }
        if self.invert_y {
            y = 1.0 - y;
        }

        let sample = self.tracker.position(x.clamp(0.0, 1.0), y.clamp(0.0, 1.0));
        emit(&sample);
    }

    fn button<F: FnMut(&StylusSample)>(&mut self, window: &DftWindow, emit: &mut F) {
        if window.rows() == 0 {
            return;
        }

        let mid = DFT_NUM_COMPONENTS / 2;
        let (button, rubber) = if window.x[0].magnitude > BUTTON_MIN_MAG
            && window.y[0].magnitude > BUTTON_MIN_MAG
        {
            // Same phase as the position signal means eraser, opposite
            // phase means side button.
            let real = i64::from(window.x[0].real[mid]) + i64::from(window.y[0].real[mid]);
            let imag = i64::from(window.x[0].imag[mid]) + i64::from(window.y[0].imag[mid]);
            let btn = i64::from(self.last_real) * real + i64::from(self.last_imag) * imag;
            (btn < 0, btn > 0)
        } else {
            (false, false)
        };

        // The new flags ride along on the next position sample; only the
        // forced stop of a rubber toggle is emitted here.
        if let Some(stopped) = self.tracker.set_button(button, rubber) {
            emit(&stopped);
        }
    }

    fn pressure(&mut self, window: &DftWindow) {
        if window.rows() < DFT_PRESSURE_ROWS {
            return;
        }

        let freq = interpolate_frequency(
            &window.x[..DFT_PRESSURE_ROWS],
            &window.y[..DFT_PRESSURE_ROWS],
        );
        let pressure = (1.0 - freq) * f64::from(MAX_PRESSURE);

        if pressure > 1.0 {
            let normalized = pressure.min(f64::from(MAX_PRESSURE)) / f64::from(MAX_PRESSURE);
            self.tracker.set_pressure(true, normalized);
        } else {
            self.tracker.set_pressure(false, 0.0);
        }
    }
}

/// Sub-pixel position of the pen along one axis, in antenna column units,
/// or NaN when the signal is too weak or the fit degenerate.
fn interpolate_position(row: &DftRow, exp: f64) -> f64 {
    // Assume the center component has the max amplitude. Off-screen
    // components are always zero; shift away from them and widen the
    // interpolation interval on that side.
    let mut center = DFT_NUM_COMPONENTS / 2;
    let mut min_d = -0.5;
    let mut max_d = 0.5;
    if row.real[center - 1] == 0 && row.imag[center - 1] == 0 {
        center += 1;
        min_d = -1.0;
    } else if row.real[center + 1] == 0 && row.imag[center + 1] == 0 {
        center -= 1;
        max_d = 1.0;
    }

    let real = f64::from(row.real[center]);
    let imag = f64::from(row.imag[center]);
    let amp = (real * real + imag * imag).sqrt();
    if amp < POSITION_MIN_AMP {
        return f64::NAN;
    }

    // Project the neighbors onto the center's phase.
    let sin = real / amp;
    let cos = imag / amp;
    let mut triplet = [
        sin * f64::from(row.real[center - 1]) + cos * f64::from(row.imag[center - 1]),
        amp,
        sin * f64::from(row.real[center + 1]) + cos * f64::from(row.imag[center + 1]),
    ];

    for value in &mut triplet {
        *value = value.powf(exp);
    }

    // The fitted parabola must open upwards, otherwise the fix is bogus.
    if triplet[0] + triplet[2] <= 2.0 * triplet[1] {
        return f64::NAN;
    }

    let d = (triplet[0] - triplet[2]) / (2.0 * (triplet[0] - 2.0 * triplet[1] + triplet[2]));

    f64::from(row.first) + center as f64 + d.clamp(min_d, max_d)
}

/// Pen carrier frequency as a fraction of the swept band, or NaN when the
/// signal is too weak. All components of a row share one phase, as do the
/// corresponding x and y rows, so everything can be summed before the fit.
fn interpolate_frequency(x: &[DftRow], y: &[DftRow]) -> f64 {
    let n = x.len();
    if n < 3 {
        return f64::NAN;
    }

    let mut max_i = 0;
    let mut max_m = 0u64;
    for i in 0..n {
        let m = u64::from(x[i].magnitude) + u64::from(y[i].magnitude);
        if m > max_m {
            max_m = m;
            max_i = i;
        }
    }
    if max_m < 2 * FREQ_MIN_MAG {
        return f64::NAN;
    }

    let mut min_d = -0.5;
    let mut max_d = 0.5;
    if max_i < 1 {
        max_i = 1;
        min_d = -1.0;
    } else if max_i > n - 2 {
        max_i = n - 2;
        max_d = 1.0;
    }

    let mut real = [0i64; 3];
    let mut imag = [0i64; 3];
    for k in 0..3 {
        let xr = &x[max_i + k - 1];
        let yr = &y[max_i + k - 1];
        for j in 0..DFT_NUM_COMPONENTS {
            real[k] += i64::from(xr.real[j]) + i64::from(yr.real[j]);
            imag[k] += i64::from(xr.imag[j]) + i64::from(yr.imag[j]);
        }
    }

    // Eric Jacobsen's modified quadratic estimator.
    let ra = real[0] - real[2];
    let rb = 2 * real[1] - real[0] - real[2];
    let ia = imag[0] - imag[2];
    let ib = 2 * imag[1] - imag[0] - imag[2];
    let d = (ra * rb + ia * ib) as f64 / (rb * rb + ib * ib) as f64;

    (max_i as f64 + d.clamp(min_d, max_d)) / (n - 1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipts::wire::DFT_MAX_ROWS;

    fn row(left: i16, center: i16, right: i16, magnitude: u32) -> DftRow {
        let mut row = DftRow::default();
        row.magnitude = magnitude;
        row.real[3] = left;
        row.real[4] = center;
        row.real[5] = right;
        row
    }

    fn window(data_type: u8, x: &[DftRow], y: &[DftRow]) -> DftWindow {
        assert_eq!(x.len(), y.len());
        let mut window = DftWindow {
            timestamp: 0,
            num_rows: x.len() as u8,
            seq_num: 0,
            data_type,
            group: None,
            x: [DftRow::default(); DFT_MAX_ROWS],
            y: [DftRow::default(); DFT_MAX_ROWS],
        };
        window.x[..x.len()].copy_from_slice(x);
        window.y[..y.len()].copy_from_slice(y);
        window
    }

    fn collect(processor: &mut DftProcessor, window: &DftWindow) -> Vec<StylusSample> {
        let mut out = Vec::new();
        processor.process(window, |sample| out.push(*sample));
        out
    }

    #[test]
    fn test_interpolate_symmetric_triplet_lands_on_center() {
        let pos = interpolate_position(&row(300, 1000, 300, 3000), DEFAULT_POSITION_EXP);
        assert!((pos - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_interpolate_weak_amplitude_is_nan() {
        assert!(interpolate_position(&row(10, 30, 10, 3000), DEFAULT_POSITION_EXP).is_nan());
    }

    #[test]
    fn test_interpolate_non_convex_triplet_is_nan() {
        // Equal amplitudes everywhere: the fitted parabola degenerates.
        assert!(interpolate_position(&row(1000, 1000, 1000, 3000), DEFAULT_POSITION_EXP).is_nan());
    }

    #[test]
    fn test_off_screen_shift_widens_interval() {
        // Component 3 is zero, so the center shifts to 5 and the interval
        // becomes [-1, 0.5]. The strongly right-leaning triplet drives the
        // vertex past +0.5, where it clamps.
        let mut shifted = DftRow::default();
        shifted.magnitude = 3000;
        shifted.real[4] = 100;
        shifted.real[5] = 1000;
        shifted.real[6] = 2000;
        let pos = interpolate_position(&shifted, DEFAULT_POSITION_EXP);
        assert!((pos - 5.5).abs() < 1e-9);

        // Mirrored triplet: the vertex lands near -0.6, inside the widened
        // interval, which an unshifted fit would have clamped at -0.5.
        let mut leaning = DftRow::default();
        leaning.magnitude = 3000;
        leaning.real[4] = 2000;
        leaning.real[5] = 1000;
        leaning.real[6] = 100;
        let pos = interpolate_position(&leaning, DEFAULT_POSITION_EXP);
        assert!(pos > 4.0 && pos < 4.5, "pos = {pos}");
    }

    #[test]
    fn test_position_window_enters_proximity() {
        let mut processor = DftProcessor::new(false, false);
        processor.set_dimensions(9, 9);

        let r = row(300, 1000, 300, 3000);
        let samples = collect(&mut processor, &window(DFT_POSITION, &[r], &[r]));
        assert_eq!(samples.len(), 1);
        assert!(samples[0].proximity);
        assert!((samples[0].x - 0.5).abs() < 1e-9);
        assert!((samples[0].y - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_position_inversion() {
        let mut processor = DftProcessor::new(true, false);
        processor.set_dimensions(5, 5);

        let r = row(300, 1000, 300, 3000);
        let samples = collect(&mut processor, &window(DFT_POSITION, &[r], &[r]));
        // Column 4 of 5 normalizes to 1.0, inverted to 0.0.
        assert!((samples[0].x - 0.0).abs() < 1e-9);
        assert!((samples[0].y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_weak_position_stops_stylus() {
        let mut processor = DftProcessor::new(false, false);
        processor.set_dimensions(9, 9);

        let strong = row(300, 1000, 300, 3000);
        collect(&mut processor, &window(DFT_POSITION, &[strong], &[strong]));

        let weak = row(300, 1000, 300, POSITION_MIN_MAG);
        let samples = collect(&mut processor, &window(DFT_POSITION, &[weak], &[weak]));
        assert_eq!(samples.len(), 1);
        assert!(!samples[0].proximity);
        assert!(!samples[0].contact);

        // Already stopped: no further emission.
        assert!(collect(&mut processor, &window(DFT_POSITION, &[weak], &[weak])).is_empty());
    }

    #[test]
    fn test_unknown_dimensions_stop_stylus() {
        let mut processor = DftProcessor::new(false, false);
        let r = row(300, 1000, 300, 3000);
        assert!(collect(&mut processor, &window(DFT_POSITION, &[r], &[r])).is_empty());
    }

    #[test]
    fn test_button_and_eraser_by_phase() {
        let mut processor = DftProcessor::new(false, false);
        processor.set_dimensions(9, 9);

        let r = row(300, 1000, 300, 3000);
        collect(&mut processor, &window(DFT_POSITION, &[r], &[r]));

        // Opposite phase to the position signal: side button.
        let pressed = row(0, -500, 0, 2000);
        let samples = collect(&mut processor, &window(DFT_BUTTON, &[pressed], &[pressed]));
        assert!(samples.is_empty());
        let samples = collect(&mut processor, &window(DFT_POSITION, &[r], &[r]));
        assert!(samples[0].button);
        assert!(!samples[0].rubber);

        // Same phase: eraser. The rubber toggle forces a stop first.
        let eraser = row(0, 500, 0, 2000);
        let samples = collect(&mut processor, &window(DFT_BUTTON, &[eraser], &[eraser]));
        assert_eq!(samples.len(), 1);
        assert!(!samples[0].proximity);
        assert!(!samples[0].rubber);

        let samples = collect(&mut processor, &window(DFT_POSITION, &[r], &[r]));
        assert!(samples[0].proximity);
        assert!(samples[0].rubber);
        assert!(!samples[0].button);
    }

    #[test]
    fn test_weak_button_clears_flags() {
        let mut processor = DftProcessor::new(false, false);
        processor.set_dimensions(9, 9);

        let r = row(300, 1000, 300, 3000);
        collect(&mut processor, &window(DFT_POSITION, &[r], &[r]));
        let pressed = row(0, -500, 0, 2000);
        collect(&mut processor, &window(DFT_BUTTON, &[pressed], &[pressed]));

        let weak = row(0, -500, 0, BUTTON_MIN_MAG);
        collect(&mut processor, &window(DFT_BUTTON, &[weak], &[weak]));
        let samples = collect(&mut processor, &window(DFT_POSITION, &[r], &[r]));
        assert!(!samples[0].button);
    }

    fn pressure_rows(values: [(i16, u32); DFT_PRESSURE_ROWS]) -> Vec<DftRow> {
        values
            .iter()
            .map(|&(value, magnitude)| {
                let mut row = DftRow::default();
                row.magnitude = magnitude;
                row.real = [value; DFT_NUM_COMPONENTS];
                row
            })
            .collect()
    }

    #[test]
    fn test_pressure_interpolation() {
        let mut processor = DftProcessor::new(false, false);

        // Row 2 dominates with a symmetric neighborhood, so the fit lands
        // exactly on it: frequency 2/5, pressure (1 - 2/5) * 4096.
        let rows = pressure_rows([
            (0, 1000),
            (100, 1000),
            (1000, 50000),
            (100, 1000),
            (0, 1000),
            (0, 1000),
        ]);
        processor.process(&window(DFT_PRESSURE, &rows, &rows), |_| {});

        let sample = processor.sample();
        assert!(sample.contact);
        assert!((sample.pressure - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_pressure_needs_magnitude() {
        let mut processor = DftProcessor::new(false, false);
        let rows = pressure_rows([
            (0, 100),
            (100, 100),
            (1000, 5000),
            (100, 100),
            (0, 100),
            (0, 100),
        ]);
        processor.process(&window(DFT_PRESSURE, &rows, &rows), |_| {});
        assert!(!processor.sample().contact);
        assert_eq!(processor.sample().pressure, 0.0);
    }

    #[test]
    fn test_short_pressure_window_ignored() {
        let mut processor = DftProcessor::new(false, false);
        let rows = pressure_rows([
            (0, 1000),
            (100, 1000),
            (1000, 50000),
            (100, 1000),
            (0, 1000),
            (0, 1000),
        ]);
        processor.process(&window(DFT_PRESSURE, &rows, &rows), |_| {});
        assert!(processor.sample().contact);

        // Five rows only: the window is ignored, contact stays.
        processor.process(&window(DFT_PRESSURE, &rows[..5], &rows[..5]), |_| {});
        assert!(processor.sample().contact);
    }
}
