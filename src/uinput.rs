//! Forward decoded stylus samples to a uinput pen device.

use std::f64::consts::FRAC_PI_4;

use evdevil::event::{Abs, AbsEvent, EventType, InputEvent, Key, KeyEvent, KeyState};
use evdevil::uinput::{AbsSetup, UinputDevice};
use evdevil::{AbsInfo, Bus, InputId, InputProp};

use crate::config::Config;
use crate::ipts::wire::{MAX_PRESSURE, MAX_X, MAX_Y};
use crate::ipts::StylusSample;

const EV_SYN: u16 = 0x00;
const SYN_REPORT: u16 = 0;

/// Tilt axis range in centidegrees.
const TILT_RANGE: i32 = 9000;

/// Units per physical unit for an axis, as reported to libinput.
fn resolution(virt: i32, phys: u32) -> i32 {
    if phys == 0 {
        return 0;
    }
    ((f64::from(virt) * 10.0) / f64::from(phys)).round() as i32
}

fn key(key: Key, pressed: bool) -> InputEvent {
    KeyEvent::new(
        key,
        if pressed {
            KeyState::PRESSED
        } else {
            KeyState::RELEASED
        },
    )
    .into()
}

/// Project altitude/azimuth (radians) onto the tilt axes, in centidegrees.
fn tilt(altitude: f64, azimuth: f64) -> (i32, i32) {
    if altitude <= 0.0 {
        return (0, 0);
    }

    let sin_alt = altitude.sin();
    let cos_alt = altitude.cos();

    let atan_x = f64::atan2(cos_alt, sin_alt * azimuth.cos());
    let atan_y = f64::atan2(cos_alt, sin_alt * azimuth.sin());

    let tx = TILT_RANGE - (atan_x * 4500.0 / FRAC_PI_4).round() as i32;
    let ty = (atan_y * 4500.0 / FRAC_PI_4).round() as i32 - TILT_RANGE;
    (tx, ty)
}

pub struct StylusDevice {
    device: UinputDevice,
}

impl StylusDevice {
    pub fn create(config: &Config) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        if config.width == 0 || config.height == 0 {
            log::warn!("Display size is 0, axis resolution disabled");
        }

        let res_x = resolution(i32::from(MAX_X), config.width);
        let res_y = resolution(i32::from(MAX_Y), config.height);
        let res_tilt = (18000.0 / std::f64::consts::PI).round() as i32;

        let axes = [
            AbsSetup::new(Abs::X, AbsInfo::new(0, i32::from(MAX_X)).with_resolution(res_x)),
            AbsSetup::new(Abs::Y, AbsInfo::new(0, i32::from(MAX_Y)).with_resolution(res_y)),
            AbsSetup::new(Abs::PRESSURE, AbsInfo::new(0, i32::from(MAX_PRESSURE))),
            AbsSetup::new(
                Abs::TILT_X,
                AbsInfo::new(-TILT_RANGE, TILT_RANGE).with_resolution(res_tilt),
            ),
            AbsSetup::new(
                Abs::TILT_Y,
                AbsInfo::new(-TILT_RANGE, TILT_RANGE).with_resolution(res_tilt),
            ),
        ];

        let device = UinputDevice::builder()?
            .with_input_id(InputId::new(Bus::USB, 0x045e, 0x0001, 0))?
            .with_props([InputProp::DIRECT])?
            .with_abs_axes(axes)?
            .with_keys([
                Key::BTN_TOUCH,
                Key::BTN_STYLUS,
                Key::BTN_TOOL_PEN,
                Key::BTN_TOOL_RUBBER,
            ])?
            .build("IPTS Stylus")?;

        if let Ok(name) = device.sysname() {
            log::info!(
                "Stylus device ready: /sys/devices/virtual/input/{}",
                name.to_string_lossy()
            );
        }

        Ok(Self { device })
    }

    pub fn emit(
        &mut self,
        sample: &StylusSample,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let (tilt_x, tilt_y) = tilt(sample.altitude, sample.azimuth);

        let batch: [InputEvent; 10] = [
            key(Key::BTN_TOOL_PEN, sample.proximity && !sample.rubber),
            key(Key::BTN_TOOL_RUBBER, sample.proximity && sample.rubber),
            key(Key::BTN_TOUCH, sample.contact),
            key(Key::BTN_STYLUS, sample.button),
            AbsEvent::new(Abs::X, (sample.x * f64::from(MAX_X)).round() as i32).into(),
            AbsEvent::new(Abs::Y, (sample.y * f64::from(MAX_Y)).round() as i32).into(),
            AbsEvent::new(
                Abs::PRESSURE,
                (sample.pressure * f64::from(MAX_PRESSURE)).round() as i32,
            )
            .into(),
            AbsEvent::new(Abs::TILT_X, tilt_x).into(),
            AbsEvent::new(Abs::TILT_Y, tilt_y).into(),
            InputEvent::new(EventType::from_raw(EV_SYN), SYN_REPORT, 0),
        ];

        self.device.write(&batch)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_near_vertical_pen_has_no_tilt() {
        // Altitude is the angle away from the screen normal.
        let (tx, ty) = tilt(1e-9, 0.0);
        assert_eq!(tx, 0);
        assert_eq!(ty, 0);
    }

    #[test]
    fn test_unsupported_tilt_is_zero() {
        assert_eq!(tilt(0.0, 0.0), (0, 0));
    }

    #[test]
    fn test_flat_pen_pegs_tilt_axis() {
        // Lying flat along the X axis.
        let (tx, _) = tilt(FRAC_PI_2, 0.0);
        assert_eq!(tx, TILT_RANGE);
    }
}
