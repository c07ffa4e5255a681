use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use reelmap::{
    ConfigFile, FilmFinder, FinderConfig, FinderConfigBuilder, NominatimProvider, UserInput,
    init_logging, render,
};
use tracing::{Level, debug, info};

#[derive(Parser, Debug)]
#[command(name = "reelmap")]
#[command(about = "Map the films of a year shot closest to you")]
#[command(version)]
struct Cli {
    /// Your latitude, in degrees
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,

    /// Your longitude, in degrees
    #[arg(long, allow_negative_numbers = true)]
    lon: f64,

    /// Year the films were released
    #[arg(short, long)]
    year: i32,

    /// IMDb locations list
    #[arg(short, long, default_value = "locations.list")]
    dataset: PathBuf,

    /// Where to write the GeoJSON map
    #[arg(short, long, default_value = "films.geojson")]
    output: PathBuf,

    /// JSON config file layered over the defaults
    #[arg(short, long, env = "REELMAP_CONFIG")]
    config: Option<PathBuf>,

    /// Give up after this many seconds
    #[arg(long)]
    deadline_secs: Option<f64>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

#[cfg(feature = "system-dirs")]
fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "reelmap")
        .map(|dirs| dirs.config_dir().join("config.json"))
        .filter(|path| path.exists())
}

#[cfg(not(feature = "system-dirs"))]
fn default_config_path() -> Option<PathBuf> {
    None
}

fn load_config(path: Option<&Path>, deadline_secs: Option<f64>) -> Result<FinderConfig> {
    let mut builder = FinderConfigBuilder::new();

    let path = path.map(Path::to_path_buf).or_else(default_config_path);
    if let Some(path) = path {
        debug!(path = %path.display(), "Loading config file");
        let file = ConfigFile::from_json_file(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        builder = builder.with_file(file)?;
    }
    if let Some(secs) = deadline_secs {
        let deadline = Duration::try_from_secs_f64(secs).context("Invalid --deadline-secs")?;
        builder = builder.deadline(Some(deadline));
    }

    Ok(builder.build()?)
}

fn run(cli: &Cli, input: UserInput) -> Result<()> {
    let config = load_config(cli.config.as_deref(), cli.deadline_secs)?;
    let provider = NominatimProvider::new(config.nominatim.clone())
        .context("Failed to create geocoding client")?;
    let finder = FilmFinder::new(provider, &config);

    let map = finder
        .find_in_file(input, &cli.dataset)
        .with_context(|| format!("Failed to find films in {}", cli.dataset.display()))?;
    render::write_geojson(&map, &cli.output)
        .with_context(|| format!("Failed to write {}", cli.output.display()))?;

    info!(films = map.films.len(), output = %cli.output.display(), "Done");
    println!(
        "{} films from {} near {} ({})",
        map.films.len(),
        map.year,
        map.position,
        map.region.address
    );
    for (rank, film) in map.films.iter().enumerate() {
        println!(
            "{:>2}. {} - {} ({:.1} km)",
            rank + 1,
            film.title,
            film.location,
            film.distance_km
        );
    }
    println!("Map written to {}", cli.output.display());
    Ok(())
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(if cli.verbose { Level::DEBUG } else { Level::INFO })?;

    let input = match UserInput::new(cli.lat, cli.lon, cli.year) {
        Ok(input) => input,
        Err(e) => {
            eprintln!("Your data is wrong: {e}. Terminating the program.");
            return Ok(ExitCode::from(2));
        }
    };

    run(&cli, input)?;
    Ok(ExitCode::SUCCESS)
}
