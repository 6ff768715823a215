use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::color::ColorMap;
use crate::config::Settings;
use crate::data::columns::ColumnMapping;
use crate::data::loader::{CsvOptions, FileReader, LoadedTable};
use crate::data::model::StationPoint;
use crate::map::builder::{MapBuilder, MarkerSpec, TrafficStation};
use crate::map::escape_html;

// ---------------------------------------------------------------------------
// MapPlotter – one CSV file in, one HTML map out
// ---------------------------------------------------------------------------

/// Default columns (lat, lon) of the traffic station files.
pub const HEATMAP_COLUMNS: &str = "[4,5]";
/// Default columns (lat, lon) of the air quality station file.
pub const EXAMPLE_MAP_COLUMNS: &str = "[25,24]";

pub struct MapPlotter {
    settings: Settings,
    file_name: String,
    output_file_name: String,
    /// `None` probes separators and encodings.
    read_options: Option<CsvOptions>,
    file_reader: FileReader,
    map_builder: MapBuilder,
}

impl MapPlotter {
    pub fn new(settings: Settings, file_name: &str, output_file_name: &str) -> Result<Self> {
        let file_reader = settings.file_reader();
        let map_builder = MapBuilder::new(settings.map_options()).context("invalid map settings")?;

        Ok(MapPlotter {
            settings,
            file_name: file_name.to_string(),
            output_file_name: output_file_name.to_string(),
            read_options: None,
            file_reader,
            map_builder,
        })
    }

    /// Read the file with one fixed configuration instead of probing.
    pub fn with_read_options(mut self, options: CsvOptions) -> Self {
        self.read_options = Some(options);
        self
    }

    pub fn file_reader(&self) -> &FileReader {
        &self.file_reader
    }

    pub fn map_builder(&self) -> &MapBuilder {
        &self.map_builder
    }

    fn load(&self) -> Result<LoadedTable> {
        info!("Loading data...");
        let loaded = match &self.read_options {
            Some(options) => self.file_reader.load_csv_using_conf(&self.file_name, options),
            None => self.file_reader.load_csv_file(&self.file_name),
        }
        .with_context(|| format!("loading '{}' from {}", self.file_name, self.file_reader))?;
        info!("Data successfully loaded.");
        Ok(loaded)
    }

    fn load_points(&self, columns: &ColumnMapping) -> Result<Vec<StationPoint>> {
        let loaded = self.load()?;
        let points = loaded
            .table
            .station_points(columns)
            .with_context(|| {
                format!("selecting columns {columns} from {}", loaded.path.display())
            })?;

        if points.is_empty() {
            warn!("No usable locations in {}", loaded.path.display());
        }
        Ok(points)
    }

    fn save(&self) -> Result<PathBuf> {
        self.map_builder
            .save_map(&self.output_file_name)
            .with_context(|| format!("saving map '{}'", self.output_file_name))
    }

    fn add_polygon(&mut self) {
        let polygon = self.settings.polygon.clone();
        let popup = escape_html(&self.settings.polygon_popup);
        self.map_builder.add_polygon(Some(polygon), Some(&popup), None);
    }

    /// Heatmap of every located row.
    pub fn generate_heatmap(&mut self, columns: &ColumnMapping) -> Result<PathBuf> {
        let points = self.load_points(columns)?;
        let locations: Vec<(f64, f64)> = points.iter().map(StationPoint::location).collect();

        self.map_builder
            .initialize_map()
            .add_traffic_heatmap(&locations)
            .add_layer_control();

        self.save()
    }

    /// One custom-icon marker per located row, with the legend column as
    /// popup and the tooltip column as tooltip.
    pub fn generate_example_map(
        &mut self,
        columns: &ColumnMapping,
        icon_file_name: Option<&str>,
        polygon: bool,
    ) -> Result<PathBuf> {
        self.map_builder.initialize_map();

        let points = self.load_points(columns)?;
        let icon = icon_file_name
            .map(str::to_string)
            .unwrap_or_else(|| self.settings.default_icon.clone());

        info!("Start adding markers...");
        for point in &points {
            let legend = point.legend.as_deref().map(escape_html);
            let tooltip = point.tooltip.as_deref().map(escape_html);
            self.map_builder.add_marker(MarkerSpec {
                location: point.location(),
                legend: legend.as_deref(),
                tooltip: tooltip.as_deref(),
                icon_file_name: Some(icon.as_str()),
                icon_size: None,
            });
        }
        info!("Markers successfully added.");

        if polygon {
            self.add_polygon();
        }
        self.map_builder.add_layer_control().add_measure_control();

        self.save()
    }

    /// Small circle markers, coloured by the legend column when one is mapped.
    pub fn generate_traffic_map(
        &mut self,
        columns: &ColumnMapping,
        polygon: bool,
    ) -> Result<PathBuf> {
        self.map_builder.initialize_map();

        let points = self.load_points(columns)?;

        let color_map = columns.legend.map(|_| {
            let values = points
                .iter()
                .filter_map(|p| p.legend_value.clone())
                .collect();
            ColorMap::new(&values)
        });
        if let Some(color_map) = &color_map {
            for (value, color) in color_map.legend_entries() {
                debug!("    {color} ← {value}");
            }
        }

        let stations: Vec<TrafficStation> = points
            .iter()
            .map(|p| TrafficStation {
                location: p.location(),
                name: Some(p.legend.clone().unwrap_or_else(|| p.row.to_string())),
                color: color_map
                    .as_ref()
                    .zip(p.legend_value.as_ref())
                    .map(|(cm, v)| cm.color_for(v).to_string()),
            })
            .collect();

        if polygon {
            self.add_polygon();
        }
        self.map_builder
            .add_traffic_station_markers(&stations, None)
            .add_layer_control()
            .add_measure_control();

        self.save()
    }
}
