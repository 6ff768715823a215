use std::collections::{BTreeMap, BTreeSet};

use palette::{Hsl, IntoColor, Srgb};

use crate::data::model::CellValue;

/// Colour used when a value has no entry in the map.
pub const DEFAULT_COLOR: &str = "#808080";

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct CSS colours (`#rrggbb`) using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<String> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            let rgb: Srgb<u8> = rgb.into_format();
            format!("#{:02x}{:02x}{:02x}", rgb.red, rgb.green, rgb.blue)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: cell value → CSS colour
// ---------------------------------------------------------------------------

/// Maps the unique values of a column to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<CellValue, String>,
    default_color: String,
}

impl ColorMap {
    pub fn new(unique_values: &BTreeSet<CellValue>) -> Self {
        let palette = generate_palette(unique_values.len());
        let mapping = unique_values.iter().cloned().zip(palette).collect();

        ColorMap {
            mapping,
            default_color: DEFAULT_COLOR.to_string(),
        }
    }

    pub fn color_for(&self, value: &CellValue) -> &str {
        self.mapping
            .get(value)
            .map(String::as_str)
            .unwrap_or(&self.default_color)
    }

    /// Legend entries (value label → colour), sorted by value.
    pub fn legend_entries(&self) -> Vec<(String, String)> {
        self.mapping
            .iter()
            .map(|(v, c)| (v.to_string(), c.clone()))
            .collect()
    }
}
