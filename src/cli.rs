use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::app::{EXAMPLE_MAP_COLUMNS, HEATMAP_COLUMNS};
use crate::data::loader::{CsvOptions, Encoding, FileReader, HeaderMode};
use crate::error::Result;

/// station-mapper - render interactive HTML maps from station CSV files
#[derive(Parser, Debug)]
#[command(name = "station-mapper")]
#[command(
    about = "Render interactive HTML maps (markers, heatmaps, polygons) from station CSV files"
)]
#[command(version)]
pub struct Cli {
    /// JSON settings file. Missing keys keep their defaults.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory the CSV file names are resolved against
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Directory the generated maps are written to
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Directory custom marker icons are read from
    #[arg(long, global = true)]
    pub icons_dir: Option<PathBuf>,

    /// Initial zoom of the map (1-16)
    #[arg(long, global = true)]
    pub zoom: Option<u8>,

    /// More logging: -v for debug, -vv for trace
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Overrides for how the CSV file is read. `--separator` or `--encoding`
/// turns probing off; `--no-header` only changes the header mode.
#[derive(Args, Debug, Clone, Default)]
pub struct CsvArgs {
    /// Field separator, e.g. ',' or ';'
    #[arg(long)]
    pub separator: Option<char>,

    /// File encoding: utf-8, iso-8859-1 or latin1
    #[arg(long)]
    pub encoding: Option<String>,

    /// The first row is data, not column names
    #[arg(long)]
    pub no_header: bool,
}

impl CsvArgs {
    pub fn is_explicit(&self) -> bool {
        self.separator.is_some() || self.encoding.is_some()
    }

    pub fn header(&self, configured: HeaderMode) -> HeaderMode {
        if self.no_header {
            HeaderMode::None
        } else {
            configured
        }
    }

    /// The explicit read configuration, or `None` to probe. Parts not given
    /// on the command line take the reader's first configured value.
    pub fn read_options(&self, reader: &FileReader) -> Result<Option<CsvOptions>> {
        if !self.is_explicit() {
            return Ok(None);
        }

        let defaults = reader.default_options();
        let encoding = match &self.encoding {
            Some(label) => label.parse::<Encoding>()?,
            None => defaults.encoding,
        };

        Ok(Some(CsvOptions {
            separator: self.separator.unwrap_or(defaults.separator),
            encoding,
            header: self.header(defaults.header),
        }))
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Heatmap of station locations
    HeatMap {
        /// CSV filename to plot, relative to the data directory
        file_name: String,

        /// Name of the resulting map, without the .html extension
        #[arg(long, default_value = "heatmap_traffic_station_map")]
        output_file_name: String,

        /// Column indices: [lat, lon, legend, tooltip]
        #[arg(long, default_value = HEATMAP_COLUMNS)]
        columns: String,

        #[command(flatten)]
        csv: CsvArgs,
    },
    /// One custom-icon marker per station
    #[command(alias = "standard-map")]
    ExampleMap {
        /// CSV filename to plot: 'file_name.csv'
        #[arg(long, default_value = "madrid_air_quality_stations.csv")]
        file_name: String,

        /// Filename for the resulting map. Avoid adding the file extension,
        /// the resulting map is always an '*.html' file.
        #[arg(long, default_value = "madrid_air_quality_stations")]
        output_file_name: String,

        /// Column indices: [lat, lon, legend, tooltip]
        #[arg(long, default_value = EXAMPLE_MAP_COLUMNS)]
        columns: String,

        /// Icon file name inside the icons directory
        #[arg(long)]
        icon: Option<String>,

        /// Draw the Madrid Central polygon
        #[arg(long)]
        polygon: bool,

        #[command(flatten)]
        csv: CsvArgs,
    },
    /// Small circle markers, coloured by the legend column
    TrafficMap {
        /// CSV filename to plot, relative to the data directory
        file_name: String,

        /// Name of the resulting map, without the .html extension
        #[arg(long, default_value = "traffic_station_map")]
        output_file_name: String,

        /// Column indices: [lat, lon, legend, tooltip]
        #[arg(long, default_value = HEATMAP_COLUMNS)]
        columns: String,

        /// Draw the Madrid Central polygon
        #[arg(long)]
        polygon: bool,

        #[command(flatten)]
        csv: CsvArgs,
    },
}
