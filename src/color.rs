use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};
use plotters::style::RGBColor;

use crate::data::model::Subunit;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<RGBColor> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.55, 0.6);
            let rgb: Srgb = hsl.into_color();
            to_rgb(rgb)
        })
        .collect()
}

/// Fixed colour per subunit so every chart agrees.
pub fn subunit_color(subunit: Subunit) -> RGBColor {
    match subunit {
        Subunit::ThirtyS => RGBColor(76, 114, 176),
        Subunit::FiftyS => RGBColor(221, 132, 82),
        Subunit::Other => RGBColor(140, 140, 140),
    }
}

fn to_rgb(c: Srgb) -> RGBColor {
    let c: Srgb<u8> = c.into_format();
    RGBColor(c.red, c.green, c.blue)
}

// ---------------------------------------------------------------------------
// Continuous colour scales: value → colour
// ---------------------------------------------------------------------------

/// Piecewise-linear colour scale over `[min, max]`, interpolated in linear RGB.
#[derive(Debug, Clone)]
pub struct ColorScale {
    stops: Vec<LinSrgb>,
    min: f64,
    max: f64,
    missing: RGBColor,
}

impl ColorScale {
    fn from_hex(stops: &[(u8, u8, u8)], min: f64, max: f64) -> Self {
        ColorScale {
            stops: stops
                .iter()
                .map(|&(r, g, b)| Srgb::new(r, g, b).into_format::<f32>().into_linear())
                .collect(),
            min,
            max,
            missing: RGBColor(230, 230, 230),
        }
    }

    /// Sequential white → dark blue scale.
    pub fn blues(min: f64, max: f64) -> Self {
        Self::from_hex(&[(247, 251, 255), (107, 174, 214), (8, 48, 107)], min, max)
    }

    /// Diverging blue → light grey → red scale.
    pub fn coolwarm(min: f64, max: f64) -> Self {
        Self::from_hex(&[(59, 76, 192), (221, 221, 221), (180, 4, 38)], min, max)
    }

    /// Look up the colour for a value; missing values get a neutral grey.
    pub fn color_for(&self, value: Option<f64>) -> RGBColor {
        let Some(v) = value.filter(|v| v.is_finite()) else {
            return self.missing;
        };
        let span = self.max - self.min;
        let t = if span > 0.0 {
            ((v - self.min) / span).clamp(0.0, 1.0)
        } else {
            0.5
        };

        let segments = (self.stops.len() - 1) as f64;
        let pos = t * segments;
        let idx = (pos.floor() as usize).min(self.stops.len() - 2);
        let local = (pos - idx as f64) as f32;
        let mixed = self.stops[idx].mix(self.stops[idx + 1], local);
        to_rgb(Srgb::from_linear(mixed))
    }
}
