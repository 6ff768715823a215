//! station-mapper - Main entry point

use anyhow::{Context, Result};
use log::{error, info, LevelFilter};

use station_mapper::app::MapPlotter;
use station_mapper::cli::{Cli, Commands, CsvArgs};
use station_mapper::config::Settings;
use station_mapper::data::columns::ColumnMapping;

/// Initialize the logger. `RUST_LOG` overrides the computed level.
fn init_logger(level: LevelFilter) {
    use env_logger::Builder;
    use std::io::Write;

    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn log_level(settings: &Settings, verbose: u8) -> LevelFilter {
    match verbose {
        0 => settings
            .log_level
            .as_deref()
            .and_then(|l| l.parse().ok())
            .unwrap_or(LevelFilter::Info),
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn apply_overrides(cli: &Cli, settings: &mut Settings) {
    if let Some(dir) = &cli.data_dir {
        settings.data_dir = dir.clone();
    }
    if let Some(dir) = &cli.output_dir {
        settings.output_dir = dir.clone();
    }
    if let Some(dir) = &cli.icons_dir {
        settings.icons_dir = dir.clone();
    }
    if let Some(zoom) = cli.zoom {
        settings.zoom = zoom;
    }
}

fn plotter(
    settings: &Settings,
    csv: &CsvArgs,
    file_name: &str,
    output: &str,
) -> Result<MapPlotter> {
    let mut settings = settings.clone();
    settings.header = csv.header(settings.header);

    let plotter = MapPlotter::new(settings, file_name, output)?;
    match csv.read_options(plotter.file_reader()).context("invalid read options")? {
        Some(options) => Ok(plotter.with_read_options(options)),
        None => Ok(plotter),
    }
}

fn run(cli: Cli, settings: Settings) -> Result<()> {
    let path = match &cli.command {
        Commands::HeatMap {
            file_name,
            output_file_name,
            columns,
            csv,
        } => {
            let columns = ColumnMapping::parse(columns)?;
            plotter(&settings, csv, file_name, output_file_name)?.generate_heatmap(&columns)?
        }
        Commands::ExampleMap {
            file_name,
            output_file_name,
            columns,
            icon,
            polygon,
            csv,
        } => {
            let columns = ColumnMapping::parse(columns)?;
            plotter(&settings, csv, file_name, output_file_name)?.generate_example_map(
                &columns,
                icon.as_deref(),
                *polygon,
            )?
        }
        Commands::TrafficMap {
            file_name,
            output_file_name,
            columns,
            polygon,
            csv,
        } => {
            let columns = ColumnMapping::parse(columns)?;
            plotter(&settings, csv, file_name, output_file_name)?
                .generate_traffic_map(&columns, *polygon)?
        }
    };

    info!("Map written to {}", path.display());
    Ok(())
}

fn main() {
    let cli = Cli::parse_args();

    let settings = Settings::load(cli.config.as_deref()).and_then(|mut settings| {
        apply_overrides(&cli, &mut settings);
        settings.validate()?;
        Ok(settings)
    });

    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            init_logger(log_level(&Settings::default(), cli.verbose));
            error!("{e:#}");
            std::process::exit(1);
        }
    };

    init_logger(log_level(&settings, cli.verbose));
    info!("Starting...");

    if let Err(e) = run(cli, settings) {
        error!("{e:#}");
        std::process::exit(1);
    }
}
