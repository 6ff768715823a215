/// Map layer: document model, builder and HTML rendering.
///
/// Architecture:
/// ```text
///   StationPoint list
///        │
///        ▼
///   ┌────────────┐
///   │  builder    │  add_marker / add_heatmap / add_polygon … → MapDocument
///   └────────────┘
///        │
///        ▼
///   ┌────────────┐
///   │  render     │  MapDocument → standalone Leaflet HTML
///   └────────────┘
/// ```

pub mod builder;
pub mod render;

use serde::{Deserialize, Serialize};

/// Madrid, Puerta del Sol.
pub const DEFAULT_INITIAL_LOCATION: (f64, f64) = (40.4167598, -3.7040395);
pub const DEFAULT_ZOOM: u8 = 13;
pub const DEFAULT_POPUP_MAX_WIDTH: u32 = 900;
pub const POLYGON_LAYER_NAME: &str = "Madrid Central";
pub const HEATMAP_LAYER_NAME: &str = "Tráfico";

/// Outline of the Madrid Central low emission zone, as GeoJSON `[lon, lat]` rings.
pub fn madrid_central_polygon() -> Vec<Vec<[f64; 2]>> {
    vec![vec![
        [-3.711305, 40.406807],
        [-3.702612, 40.404997],
        [-3.693235, 40.407742],
        [-3.692248, 40.409000],
        [-3.694617, 40.415505],
        [-3.690392, 40.424887],
        [-3.696207, 40.427856],
        [-3.702162, 40.429122],
        [-3.705810, 40.429681],
        [-3.714018, 40.430404],
        [-3.715059, 40.428918],
        [-3.711797, 40.424377],
        [-3.714372, 40.422988],
        [-3.712870, 40.421534],
        [-3.714029, 40.410539],
    ]]
}

// ---------------------------------------------------------------------------
// Document model
// ---------------------------------------------------------------------------

/// Base tiles drawn under every layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Tiles {
    /// A named provider, e.g. `"OpenStreetMap"`.
    Named(String),
    /// A custom XYZ template with its attribution.
    Custom { url: String, attribution: String },
}

impl Default for Tiles {
    fn default() -> Self {
        Tiles::Named("OpenStreetMap".to_string())
    }
}

const OSM_ATTRIBUTION: &str = "&copy; <a href=\"https://www.openstreetmap.org/copyright\">\
                               OpenStreetMap</a> contributors";
const CARTO_ATTRIBUTION: &str = "&copy; <a href=\"https://carto.com/attributions\">CARTO</a>";

impl Tiles {
    /// URL template, attribution and the name shown in the layer control.
    pub fn resolve(&self) -> (String, String, String) {
        match self {
            Tiles::Named(name) => match name.to_ascii_lowercase().as_str() {
                "cartodbpositron" | "cartodb positron" => (
                    "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png".to_string(),
                    format!("{OSM_ATTRIBUTION} {CARTO_ATTRIBUTION}"),
                    "cartodbpositron".to_string(),
                ),
                _ => (
                    "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
                    OSM_ATTRIBUTION.to_string(),
                    "openstreetmap".to_string(),
                ),
            },
            Tiles::Custom { url, attribution } => {
                (url.clone(), attribution.clone(), "custom".to_string())
            }
        }
    }
}

/// Popup content (HTML) shown when a layer is clicked.
#[derive(Debug, Clone, PartialEq)]
pub struct Popup {
    pub html: String,
    pub max_width: u32,
}

/// A custom marker image, already resolved to a URL (usually a data URI).
#[derive(Debug, Clone, PartialEq)]
pub struct Icon {
    pub url: String,
    pub size: (u32, u32),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    Marker {
        location: (f64, f64),
        popup: Option<Popup>,
        /// Tooltip content (HTML).
        tooltip: Option<String>,
        icon: Option<Icon>,
    },
    CircleMarker {
        location: (f64, f64),
        radius: f64,
        color: String,
        fill_color: Option<String>,
        popup: Option<Popup>,
        tooltip: Option<String>,
    },
    HeatMap {
        name: String,
        points: Vec<(f64, f64)>,
        radius: f64,
        min_opacity: f64,
        /// Gradient stops in `0.0..=1.0`, ascending.
        gradient: Vec<(f64, String)>,
    },
    Polygon {
        name: String,
        /// GeoJSON rings, each point `[lon, lat]`.
        coordinates: Vec<Vec<[f64; 2]>>,
        popup: Option<Popup>,
    },
}

impl Layer {
    /// Name shown in the layer control; unnamed layers are not listed.
    pub fn overlay_name(&self) -> Option<&str> {
        match self {
            Layer::HeatMap { name, .. } | Layer::Polygon { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Everything needed to render one HTML map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapDocument {
    pub center: (f64, f64),
    pub zoom: u8,
    pub tiles: Tiles,
    pub layers: Vec<Layer>,
    pub layer_control: bool,
    pub measure_control: bool,
}

impl MapDocument {
    pub fn new(center: (f64, f64), zoom: u8, tiles: Tiles) -> Self {
        MapDocument {
            center,
            zoom,
            tiles,
            layers: Vec::new(),
            layer_control: false,
            measure_control: false,
        }
    }

    pub fn has_heatmap(&self) -> bool {
        self.layers
            .iter()
            .any(|l| matches!(l, Layer::HeatMap { .. }))
    }
}

/// Escape text for inclusion in popup or tooltip HTML.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
