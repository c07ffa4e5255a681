//! Nearest films without a network
//!
//! This example runs the whole pipeline against a generated dataset and a
//! scripted in-memory geocoder, then prints the selected films and writes the
//! GeoJSON map to a temporary directory.

use reelmap::dataset::{TestDatasetConfig, create_test_dataset};
use reelmap::{
    Coordinate, FilmFinder, FinderConfigBuilder, InMemoryProvider, UserInput, init_logging, render,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(tracing::Level::INFO)?;

    let dataset = TestDatasetConfig::sample();
    let file = create_test_dataset(&dataset)?;

    let user = Coordinate::new(37.77, -122.42);
    let provider = InMemoryProvider::new()
        .with_address(user, "Civic Center, San Francisco, California, 94102, United States")
        .with_place("San Francisco, California, USA", Coordinate::new(37.7749, -122.4194))
        .with_place("Los Angeles, California, USA", Coordinate::new(34.0522, -118.2437));

    let config = FinderConfigBuilder::new().build()?;
    let finder = FilmFinder::new(&provider, &config);
    let map = finder.find_in_file(UserInput::new(user.latitude, user.longitude, dataset.year)?, file.path())?;

    println!("Films from {} near {}:", map.year, map.region.address);
    for film in &map.films {
        println!("  {:<12} {:>8.1} km  {}", film.title, film.distance_km, film.location);
    }

    let dir = tempfile::tempdir()?;
    let output = dir.path().join("films.geojson");
    let document = render::write_geojson(&map, &output)?;
    println!(
        "\nWrote {} features to {} ({} geocoder calls)",
        document.features.len(),
        output.display(),
        provider.call_count()
    );

    Ok(())
}
