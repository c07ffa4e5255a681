//! Integration tests for the Reelmap pipeline
//!
//! These run the public API end to end against a generated dataset file and
//! a scripted in-memory geocoder, so no network access is needed.

use reelmap::dataset::{DatasetLayout, TestDatasetConfig, create_test_dataset, read_dataset};
use reelmap::error::ReelmapError;
use reelmap::{
    Coordinate, FilmFinder, FinderConfig, FinderConfigBuilder, GeocodeError, InMemoryProvider,
    MAX_CANDIDATES, MatchError, RetryPolicy, RunBudget, UserInput, render,
};

const LOS_ANGELES: Coordinate = Coordinate::new(34.05, -118.24);
const SAN_FRANCISCO: Coordinate = Coordinate::new(37.77, -122.42);
const LVIV: Coordinate = Coordinate::new(49.84, 24.03);

fn setup_test_env() {
    let _ = reelmap::init_logging(tracing::Level::WARN);
}

fn provider() -> InMemoryProvider {
    InMemoryProvider::new()
        .with_address(
            LOS_ANGELES,
            "City Hall, Downtown, Los Angeles, Los Angeles County, California, 90012, United States",
        )
        .with_address(LVIV, "Rynok Square, Lviv, Lviv Oblast, 79000, Ukraine")
        .with_place("Los Angeles, California, USA", LOS_ANGELES)
        .with_place("San Francisco, California, USA", SAN_FRANCISCO)
        .with_place("Austin, Texas, USA", Coordinate::new(30.27, -97.74))
        .with_place("Lviv, Lvivs'ka oblast, Ukraine", LVIV)
}

fn config() -> FinderConfig {
    FinderConfigBuilder::new()
        .retry_policy(RetryPolicy::immediate(3))
        .build()
        .expect("Default config should be valid")
}

#[test]
fn test_full_workflow() {
    setup_test_env();

    let dataset = TestDatasetConfig::sample();
    let file = create_test_dataset(&dataset).expect("Should create dataset");
    let provider = provider();
    let finder = FilmFinder::new(&provider, &config());

    // 1. Find films near Los Angeles
    let input = UserInput::new(LOS_ANGELES.latitude, LOS_ANGELES.longitude, dataset.year)
        .expect("Input should be valid");
    let map = finder
        .find_in_file(input, file.path())
        .expect("Search should work");

    assert_eq!(map.region.country, "USA");
    assert_eq!(map.region.sub_region.as_deref(), Some("California"));

    // 2. At most ten films, nearest first, all in California
    assert_eq!(map.films.len(), MAX_CANDIDATES);
    assert!(
        map.nearest
            .windows(2)
            .all(|w| w[0].distance_km <= w[1].distance_km)
    );
    assert!(map.films.iter().all(|f| f.location.contains("California")));
    assert!(!provider.calls().iter().any(|q| q.contains("Texas")));

    // 3. Films sharing a point are spread out by latitude only
    for (candidate, placed) in map.nearest.iter().zip(&map.films) {
        assert_eq!(candidate.title, placed.title);
        assert_eq!(
            candidate.coordinate.longitude.to_bits(),
            placed.coordinate.longitude.to_bits()
        );
    }
    let mut latitudes: Vec<u64> = map
        .films
        .iter()
        .map(|f| f.coordinate.latitude.to_bits())
        .collect();
    latitudes.sort_unstable();
    latitudes.dedup();
    assert_eq!(latitudes.len(), map.films.len());

    // 4. Country counts only keep well-represented countries
    assert!(!map.country_counts.is_empty());
    assert!(map.country_counts.iter().all(|(_, count)| count > 10));

    // 5. Render
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let output = dir.path().join("films.geojson");
    let document = render::write_geojson(&map, &output).expect("Should write map");
    assert_eq!(document.layer("film").count(), map.films.len());
    assert_eq!(document.layer("user").count(), 1);
    assert!(output.exists());
}

#[test]
fn test_small_country_ignores_sub_region() {
    setup_test_env();

    let dataset = TestDatasetConfig::sample();
    let file = create_test_dataset(&dataset).expect("Should create dataset");
    let provider = provider();
    let finder = FilmFinder::new(&provider, &config());

    let input = UserInput::new(LVIV.latitude, LVIV.longitude, dataset.year).unwrap();
    let map = finder.find_in_file(input, file.path()).unwrap();

    assert_eq!(map.region.country, "Ukraine");
    assert_eq!(map.films.len(), 4);
    assert!(map.films.iter().all(|f| f.location.ends_with("Ukraine")));
}

#[test]
fn test_timeouts_are_retried_within_limit() {
    setup_test_env();

    let dataset = TestDatasetConfig::minimal();
    let file = create_test_dataset(&dataset).unwrap();
    let provider = provider().with_timeouts("Los Angeles, California, USA", 2);
    let finder = FilmFinder::new(&provider, &config());

    let input = UserInput::new(LOS_ANGELES.latitude, LOS_ANGELES.longitude, dataset.year).unwrap();
    let map = finder.find_in_file(input, file.path()).unwrap();

    assert!(!map.films.is_empty());
    let retried = provider
        .calls()
        .iter()
        .filter(|q| q.as_str() == "Los Angeles, California, USA")
        .count();
    assert!(retried >= 3);
}

#[test]
fn test_exhausted_retries_abort_the_run() {
    setup_test_env();

    let dataset = TestDatasetConfig::minimal();
    let file = create_test_dataset(&dataset).unwrap();
    let provider = provider().with_timeouts("Los Angeles, California, USA", 100);
    let finder = FilmFinder::new(&provider, &config());

    let input = UserInput::new(LOS_ANGELES.latitude, LOS_ANGELES.longitude, dataset.year).unwrap();
    let err = finder.find_in_file(input, file.path()).unwrap_err();

    match err {
        ReelmapError::Geocode(GeocodeError::ProviderUnavailable { query, attempts, .. }) => {
            assert_eq!(query, "Los Angeles, California, USA");
            assert_eq!(attempts, 3);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_non_timeout_errors_abort_immediately() {
    setup_test_env();

    let dataset = TestDatasetConfig::minimal();
    let file = create_test_dataset(&dataset).unwrap();
    let provider = provider().with_failure(LOS_ANGELES.to_string(), 429);
    let finder = FilmFinder::new(&provider, &config());

    let input = UserInput::new(LOS_ANGELES.latitude, LOS_ANGELES.longitude, dataset.year).unwrap();
    let err = finder.find_in_file(input, file.path()).unwrap_err();

    assert!(matches!(
        err,
        ReelmapError::Match(MatchError::Geocode(GeocodeError::Provider(_)))
    ));
    assert_eq!(provider.call_count(), 1);
}

#[test]
fn test_expired_deadline() {
    setup_test_env();

    let dataset = TestDatasetConfig::minimal();
    let file = create_test_dataset(&dataset).unwrap();
    let provider = provider();
    let finder = FilmFinder::with_budget(
        &provider,
        &config(),
        RunBudget::with_deadline(std::time::Duration::ZERO),
    );

    let input = UserInput::new(LOS_ANGELES.latitude, LOS_ANGELES.longitude, dataset.year).unwrap();
    let err = finder.find_in_file(input, file.path()).unwrap_err();

    assert!(matches!(
        err,
        ReelmapError::Match(MatchError::Geocode(GeocodeError::DeadlineExceeded))
    ));
    assert_eq!(provider.call_count(), 0);
}

#[test]
fn test_parallel_geocoding_matches_sequential() {
    setup_test_env();

    let dataset = TestDatasetConfig::sample();
    let file = create_test_dataset(&dataset).unwrap();
    let parsed = read_dataset(file.path(), dataset.year, DatasetLayout::Detect).unwrap();
    let input = UserInput::new(LOS_ANGELES.latitude, LOS_ANGELES.longitude, dataset.year).unwrap();

    let sequential_provider = provider();
    let sequential = FilmFinder::new(&sequential_provider, &config())
        .find(input, &parsed)
        .unwrap();

    let parallel_config = FinderConfigBuilder::new()
        .retry_policy(RetryPolicy::immediate(3))
        .parallel_geocoding(true)
        .build()
        .unwrap();
    let parallel_provider = provider();
    let parallel = FilmFinder::new(&parallel_provider, &parallel_config)
        .find(input, &parsed)
        .unwrap();

    assert_eq!(sequential.nearest, parallel.nearest);
    assert_eq!(sequential.films, parallel.films);
}

#[test]
fn test_invalid_input_touches_nothing() {
    setup_test_env();

    assert!(matches!(
        UserInput::new(123.0, 0.0, 2012),
        Err(ReelmapError::InvalidInput(_))
    ));
    assert!(matches!(
        UserInput::new(0.0, 0.0, 99),
        Err(ReelmapError::InvalidInput(_))
    ));
}
