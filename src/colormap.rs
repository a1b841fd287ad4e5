//! Colour maps for scalar fields

use crate::errors::{MovieError, Result};
use plotters::style::RGBColor;

/// Named piecewise-linear colour maps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colormap {
    Viridis,
    Magma,
    Gray,
    Coolwarm,
}

const VIRIDIS: &[(u8, u8, u8)] = &[
    (68, 1, 84),
    (72, 40, 120),
    (62, 74, 137),
    (49, 104, 142),
    (38, 130, 142),
    (31, 158, 137),
    (53, 183, 121),
    (109, 205, 89),
    (180, 222, 44),
    (253, 231, 37),
];

const MAGMA: &[(u8, u8, u8)] = &[
    (0, 0, 4),
    (28, 16, 68),
    (79, 18, 123),
    (129, 37, 129),
    (181, 54, 122),
    (229, 80, 100),
    (251, 135, 97),
    (254, 194, 135),
    (252, 253, 191),
];

const GRAY: &[(u8, u8, u8)] = &[(0, 0, 0), (255, 255, 255)];

const COOLWARM: &[(u8, u8, u8)] = &[
    (59, 76, 192),
    (124, 159, 249),
    (192, 212, 245),
    (242, 203, 183),
    (238, 132, 104),
    (180, 4, 38),
];

impl Colormap {
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "viridis" => Ok(Colormap::Viridis),
            "magma" => Ok(Colormap::Magma),
            "gray" | "grey" => Ok(Colormap::Gray),
            "coolwarm" => Ok(Colormap::Coolwarm),
            other => Err(MovieError::InvalidConfig(format!(
                "unknown colormap '{other}' (expected viridis, magma, gray or coolwarm)"
            ))),
        }
    }

    fn stops(self) -> &'static [(u8, u8, u8)] {
        match self {
            Colormap::Viridis => VIRIDIS,
            Colormap::Magma => MAGMA,
            Colormap::Gray => GRAY,
            Colormap::Coolwarm => COOLWARM,
        }
    }

    /// Colour at position `t` in `[0, 1]` (clamped)
    pub fn at(self, t: f64) -> RGBColor {
        let stops = self.stops();
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let pos = t * (stops.len() - 1) as f64;
        let i = (pos.floor() as usize).min(stops.len() - 2);
        let frac = pos - i as f64;
        let (a, b) = (stops[i], stops[i + 1]);
        let lerp = |x: u8, y: u8| (f64::from(x) + (f64::from(y) - f64::from(x)) * frac).round() as u8;
        RGBColor(lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
    }

    /// Colour for `value` on the `vmin..vmax` scale, `None` for NaN
    pub fn map(self, value: f32, vmin: f64, vmax: f64) -> Option<RGBColor> {
        if !value.is_finite() {
            return None;
        }
        let span = vmax - vmin;
        let t = if span.abs() < f64::EPSILON {
            0.5
        } else {
            (f64::from(value) - vmin) / span
        };
        Some(self.at(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_match_stops() {
        assert_eq!(Colormap::Gray.at(0.0), RGBColor(0, 0, 0));
        assert_eq!(Colormap::Gray.at(1.0), RGBColor(255, 255, 255));
        assert_eq!(Colormap::Viridis.at(2.0), RGBColor(253, 231, 37));
    }

    #[test]
    fn map_handles_flat_and_missing_values() {
        assert_eq!(Colormap::Gray.map(3.0, 3.0, 3.0), Some(RGBColor(128, 128, 128)));
        assert_eq!(Colormap::Gray.map(f32::NAN, 0.0, 1.0), None);
    }

    #[test]
    fn names_resolve() {
        assert_eq!(Colormap::from_name("Magma").unwrap(), Colormap::Magma);
        assert_eq!(Colormap::from_name("grey").unwrap(), Colormap::Gray);
        assert!(Colormap::from_name("jet").is_err());
        // diverging maps other than coolwarm are not aliased to it
        assert!(Colormap::from_name("RdBu_r").is_err());
    }
}
