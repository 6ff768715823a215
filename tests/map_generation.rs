// End-to-end tests: CSV in a scratch data directory → HTML map in a scratch
// output directory, through the same MapPlotter the binary uses.

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use station_mapper::app::{MapPlotter, EXAMPLE_MAP_COLUMNS, HEATMAP_COLUMNS};
use station_mapper::config::Settings;
use station_mapper::data::columns::ColumnMapping;
use station_mapper::data::loader::{CsvOptions, Encoding, HeaderMode};

const TRAFFIC_CSV: &str = "\
tipo_elem,distrito,id,nombre,latitud,longitud
URB,1,1001,PM10001,40.4168,-3.7038
M30,2,1002,PM10008,40.4301,-3.6880
URB,3,1003,PM10015,not-a-number,-3.7100
M30,4,1004,PM10022,40.3990,-3.7200
";

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("data")).unwrap();
        fs::create_dir_all(dir.path().join("icons")).unwrap();
        Workspace { dir }
    }

    fn settings(&self) -> Settings {
        Settings {
            data_dir: self.dir.path().join("data"),
            output_dir: self.dir.path().join("maps"),
            icons_dir: self.dir.path().join("icons"),
            ..Settings::default()
        }
    }

    fn data(&self, name: &str, bytes: &[u8]) {
        fs::write(self.dir.path().join("data").join(name), bytes).unwrap();
    }

    fn icon(&self, name: &str) {
        fs::write(self.dir.path().join("icons").join(name), b"\x89PNG\r\n").unwrap();
    }

    fn maps(&self) -> std::path::PathBuf {
        self.dir.path().join("maps")
    }
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

/// Air quality layout: 26 columns, longitude/latitude in 24/25, `;` and Latin-1.
fn air_quality_csv() -> Vec<u8> {
    let mut header: Vec<String> = (0..24).map(|i| format!("C{i}")).collect();
    header[2] = "ESTACION".into();
    header.push("LONGITUD".into());
    header.push("LATITUD".into());

    let mut lines = vec![header.join(";")];
    for (name, lon, lat) in [
        ("Pza. de Espa\u{f1}a", "-3,712257", "40,423882"),
        ("Escuelas Aguirre", "-3,682316", "40,421553"),
        ("Legan\u{e9}s", "-3,774610", "40,340610"),
    ] {
        let mut row: Vec<String> = (0..24).map(|i| i.to_string()).collect();
        row[2] = name.into();
        row.push(lon.into());
        row.push(lat.into());
        lines.push(row.join(";"));
    }

    // ISO-8859-1: every char here is below U+0100.
    lines.join("\n").chars().map(|c| c as u8).collect()
}

#[test]
fn heat_map_from_comma_file() {
    let ws = Workspace::new();
    ws.data("traffic_stations.csv", TRAFFIC_CSV.as_bytes());

    let mut plotter = MapPlotter::new(
        ws.settings(),
        "traffic_stations.csv",
        "heatmap_traffic_station_map",
    )
    .unwrap();
    let path = plotter
        .generate_heatmap(&ColumnMapping::parse(HEATMAP_COLUMNS).unwrap())
        .unwrap();

    assert_eq!(path, ws.maps().join("heatmap_traffic_station_map.html"));
    let html = read(&path);
    assert!(html.contains("L.heatLayer([[40.4168,-3.7038],[40.4301,-3.688],[40.399,-3.72]]"));
    assert!(html.contains("overlays[\"Tráfico\"]"));
    assert!(html.contains("L.control.layers("));
}

#[test]
fn example_map_from_latin1_semicolon_file() {
    let ws = Workspace::new();
    ws.data("madrid_air_quality_stations.csv", &air_quality_csv());
    ws.icon("forecast.png");

    let mut plotter = MapPlotter::new(
        ws.settings(),
        "madrid_air_quality_stations.csv",
        "madrid_air_quality_stations",
    )
    .unwrap();
    let columns = ColumnMapping {
        legend: Some(2),
        ..ColumnMapping::parse(EXAMPLE_MAP_COLUMNS).unwrap()
    };
    let path = plotter.generate_example_map(&columns, None, true).unwrap();

    let html = read(&path);
    assert_eq!(html.matches("L.marker(").count(), 3);
    assert!(html.contains("L.marker([40.423882,-3.712257]"));
    assert!(html.contains("\"Pza. de España\""));
    assert!(html.contains("\"Leganés\""));
    assert!(html.contains("data:image/png;base64,"));
    assert!(html.contains("overlays[\"Madrid Central\"]"));
    assert!(html.contains("L.control.measure("));
}

#[test]
fn example_map_without_icon_file_has_no_markers() {
    let ws = Workspace::new();
    ws.data("madrid_air_quality_stations.csv", &air_quality_csv());

    let mut plotter =
        MapPlotter::new(ws.settings(), "madrid_air_quality_stations.csv", "no_icons").unwrap();
    let columns = ColumnMapping::parse(EXAMPLE_MAP_COLUMNS).unwrap();
    let path = plotter
        .generate_example_map(&columns, Some("missing.png"), false)
        .unwrap();

    let html = read(&path);
    assert_eq!(html.matches("L.marker(").count(), 0);
    assert!(html.contains("L.control.measure("));
}

#[test]
fn traffic_map_with_explicit_read_options() {
    let ws = Workspace::new();
    ws.data("raw.txt", b"40.41|-3.70|URB\n40.42|-3.71|M30\n");

    let plotter = MapPlotter::new(ws.settings(), "raw.txt", "traffic_station_map.html").unwrap();
    let mut plotter = plotter.with_read_options(CsvOptions {
        separator: '|',
        encoding: Encoding::Utf8,
        header: HeaderMode::None,
    });
    let path = plotter
        .generate_traffic_map(&ColumnMapping::parse("[0,1,2]").unwrap(), false)
        .unwrap();

    assert_eq!(path, ws.maps().join("traffic_station_map.html"));
    let html = read(&path);
    assert_eq!(html.matches("L.circleMarker(").count(), 2);
    assert!(html.contains("Station: URB\\u003cbr>Lat: 40.41\\u003cbr>Lon: -3.7"));
}

#[test]
fn missing_csv_reports_the_file() {
    let ws = Workspace::new();

    let mut plotter = MapPlotter::new(ws.settings(), "nowhere.csv", "nothing").unwrap();
    let err = plotter
        .generate_heatmap(&ColumnMapping::parse(HEATMAP_COLUMNS).unwrap())
        .unwrap_err();

    assert!(format!("{err:#}").contains("nowhere.csv"));
    assert!(!ws.maps().join("nothing.html").exists());
}
