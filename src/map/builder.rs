use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine};
use log::{debug, error, info, warn};

use super::render::render_html;
use super::{
    escape_html, madrid_central_polygon, Icon, Layer, MapDocument, Popup, Tiles,
    DEFAULT_INITIAL_LOCATION, DEFAULT_POPUP_MAX_WIDTH, DEFAULT_ZOOM, HEATMAP_LAYER_NAME,
    POLYGON_LAYER_NAME,
};
use crate::error::{MapError, Result};

pub const DEFAULT_ICON_SIZE: (u32, u32) = (40, 40);

/// Static configuration of a [`MapBuilder`].
#[derive(Debug, Clone)]
pub struct MapOptions {
    pub location: (f64, f64),
    pub zoom: u8,
    pub tiles: Tiles,
    pub output_dir: PathBuf,
    pub icons_dir: PathBuf,
    pub icon_size: (u32, u32),
}

impl Default for MapOptions {
    fn default() -> Self {
        MapOptions {
            location: DEFAULT_INITIAL_LOCATION,
            zoom: DEFAULT_ZOOM,
            tiles: Tiles::default(),
            output_dir: PathBuf::from("./generated_maps/"),
            icons_dir: PathBuf::from("./resources/images/icons/"),
            icon_size: DEFAULT_ICON_SIZE,
        }
    }
}

/// Input for [`MapBuilder::add_marker`]. `legend` and `tooltip` are HTML.
#[derive(Debug, Clone, Default)]
pub struct MarkerSpec<'a> {
    pub location: (f64, f64),
    pub legend: Option<&'a str>,
    pub tooltip: Option<&'a str>,
    pub icon_file_name: Option<&'a str>,
    pub icon_size: Option<(u32, u32)>,
}

/// Input for [`MapBuilder::add_traffic_station_markers`].
#[derive(Debug, Clone, Default)]
pub struct TrafficStation {
    pub location: (f64, f64),
    /// Plain text; the running index is used when absent.
    pub name: Option<String>,
    /// CSS colour; red when absent.
    pub color: Option<String>,
}

/// Four decimal places, printed without trailing zeros.
fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Zoom levels accepted by the tile providers we render with.
pub fn check_zoom(zoom: u8) -> Result<u8> {
    if (1..17).contains(&zoom) {
        Ok(zoom)
    } else {
        Err(MapError::InvalidZoom(zoom))
    }
}

fn is_valid_location((lat, lon): (f64, f64)) -> bool {
    lat.is_finite()
        && lon.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lon)
}

fn image_mime(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

// ---------------------------------------------------------------------------
// MapBuilder
// ---------------------------------------------------------------------------

/// Accumulates layers on a [`MapDocument`] and saves it as HTML.
#[derive(Debug)]
pub struct MapBuilder {
    location: (f64, f64),
    zoom: u8,
    tiles: Tiles,
    output_dir: PathBuf,
    icons_dir: PathBuf,
    icon_size: (u32, u32),
    icon_cache: HashMap<PathBuf, String>,
    map: MapDocument,
}

impl MapBuilder {
    pub fn new(options: MapOptions) -> Result<Self> {
        let zoom = check_zoom(options.zoom)?;
        let mut builder = MapBuilder {
            location: DEFAULT_INITIAL_LOCATION,
            zoom,
            tiles: options.tiles.clone(),
            output_dir: options.output_dir,
            icons_dir: options.icons_dir,
            icon_size: options.icon_size,
            icon_cache: HashMap::new(),
            map: MapDocument::new(DEFAULT_INITIAL_LOCATION, zoom, options.tiles),
        };
        builder.set_location(options.location);
        builder.initialize_map();
        Ok(builder)
    }

    pub fn location(&self) -> (f64, f64) {
        self.location
    }

    /// Change the initial centre. Invalid coordinates are ignored.
    pub fn set_location(&mut self, location: (f64, f64)) {
        if is_valid_location(location) {
            self.location = location;
        } else {
            warn!("Ignoring invalid initial location {location:?}");
        }
    }

    pub fn map(&self) -> &MapDocument {
        &self.map
    }

    /// Start over with an empty map at the current location and zoom.
    pub fn initialize_map(&mut self) -> &mut Self {
        self.map = MapDocument::new(self.location, self.zoom, self.tiles.clone());
        self
    }

    fn create_popup(&self, html: &str, max_width: Option<u32>) -> Popup {
        Popup {
            html: html.to_string(),
            max_width: max_width.unwrap_or(DEFAULT_POPUP_MAX_WIDTH),
        }
    }

    fn create_custom_icon(
        &mut self,
        icon_file_name: &str,
        icon_size: Option<(u32, u32)>,
    ) -> Result<Icon> {
        let path = self.icons_dir.join(icon_file_name);
        let size = icon_size.unwrap_or(self.icon_size);

        if let Some(url) = self.icon_cache.get(&path) {
            return Ok(Icon { url: url.clone(), size });
        }
        if !path.is_file() {
            return Err(MapError::IconNotFound(path));
        }

        let bytes = fs::read(&path)?;
        let url = format!("data:{};base64,{}", image_mime(&path), STANDARD.encode(bytes));
        debug!("Embedded icon {}", path.display());
        self.icon_cache.insert(path, url.clone());

        Ok(Icon { url, size })
    }

    /// Add a polygon layer. `None` draws the Madrid Central outline.
    pub fn add_polygon(
        &mut self,
        coordinates: Option<Vec<Vec<[f64; 2]>>>,
        popup_text: Option<&str>,
        popup_max_width: Option<u32>,
    ) -> &mut Self {
        let coordinates = coordinates
            .filter(|rings| !rings.is_empty())
            .unwrap_or_else(madrid_central_polygon);
        let popup = popup_text.map(|text| self.create_popup(text, popup_max_width));

        self.map.layers.push(Layer::Polygon {
            name: POLYGON_LAYER_NAME.to_string(),
            coordinates,
            popup,
        });
        self
    }

    /// Add a standard marker. A marker whose location or icon cannot be used
    /// is logged and left out.
    pub fn add_marker(&mut self, spec: MarkerSpec<'_>) -> &mut Self {
        debug!("Creating the marker...");
        if !is_valid_location(spec.location) {
            error!("Location must be a tuple as follows: (lat, lon), got {:?}", spec.location);
            return self;
        }

        let icon = match spec.icon_file_name {
            Some(name) => {
                debug!("Adding a custom icon to the marker...");
                match self.create_custom_icon(name, spec.icon_size) {
                    Ok(icon) => Some(icon),
                    Err(e) => {
                        error!("{e}");
                        return self;
                    }
                }
            }
            None => None,
        };

        let popup = spec.legend.map(|text| self.create_popup(text, None));
        self.map.layers.push(Layer::Marker {
            location: spec.location,
            popup,
            tooltip: spec.tooltip.map(str::to_string),
            icon,
        });
        self
    }

    /// Add one small circle marker per station, with a tooltip showing its
    /// name and rounded coordinates.
    pub fn add_traffic_station_markers(
        &mut self,
        stations: &[TrafficStation],
        legend: Option<&str>,
    ) -> &mut Self {
        for (index, station) in stations.iter().enumerate() {
            let (lat, lon) = station.location;
            if !is_valid_location(station.location) {
                error!("Location must be a tuple (lat, lon), got {:?}", station.location);
                info!("Location skipped. Continue with the next one.");
                continue;
            }

            let name = station
                .name
                .as_deref()
                .map(escape_html)
                .unwrap_or_else(|| index.to_string());
            let tooltip = format!(
                "Station: {name}<br>Lat: {}<br>Lon: {}",
                round4(lat),
                round4(lon)
            );
            let popup = legend.map(|text| self.create_popup(text, None));

            self.map.layers.push(Layer::CircleMarker {
                location: station.location,
                radius: 2.0,
                color: station.color.clone().unwrap_or_else(|| "red".to_string()),
                fill_color: station.color.clone(),
                popup,
                tooltip: Some(tooltip),
            });
        }
        self
    }

    /// Add a heatmap of the given locations. Invalid locations are dropped.
    pub fn add_traffic_heatmap(&mut self, locations: &[(f64, f64)]) -> &mut Self {
        let points: Vec<(f64, f64)> = locations
            .iter()
            .copied()
            .filter(|&loc| is_valid_location(loc))
            .collect();
        if points.len() < locations.len() {
            warn!("{} invalid locations left out of the heatmap", locations.len() - points.len());
        }

        self.map.layers.push(Layer::HeatMap {
            name: HEATMAP_LAYER_NAME.to_string(),
            points,
            radius: 14.0,
            min_opacity: 0.8,
            gradient: vec![
                (0.4, "blue".to_string()),
                (0.8, "lime".to_string()),
                (1.0, "red".to_string()),
            ],
        });
        self
    }

    pub fn add_layer_control(&mut self) -> &mut Self {
        self.map.layer_control = true;
        self
    }

    pub fn add_measure_control(&mut self) -> &mut Self {
        self.map.measure_control = true;
        self
    }

    /// Path the map is saved to for a given name. `.html` is appended unless present.
    pub fn output_path(&self, file_name: &str) -> PathBuf {
        if file_name.to_ascii_lowercase().ends_with(".html") {
            self.output_dir.join(file_name)
        } else {
            self.output_dir.join(format!("{file_name}.html"))
        }
    }

    /// Render the map and write it into the output directory.
    pub fn save_map(&self, file_name: &str) -> Result<PathBuf> {
        let output = self.output_path(file_name);

        info!("Saving the map...");
        fs::create_dir_all(&self.output_dir)?;
        fs::write(&output, render_html(&self.map)?)?;
        info!("Saved in: {}.", output.display());

        Ok(output)
    }
}
