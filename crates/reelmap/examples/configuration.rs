//! Finder configuration and customization
//!
//! This example compares the configuration presets and shows how a JSON
//! config file is layered over them.

use reelmap::{ConfigFile, FinderConfig, FinderConfigBuilder};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Preset configurations:");
    describe("Default", &FinderConfigBuilder::new().build()?);
    describe("Fast", &FinderConfigBuilder::fast().build()?);
    describe("Patient", &FinderConfigBuilder::patient().build()?);

    // Presets can be overridden setting by setting
    let custom = FinderConfigBuilder::fast()
        .limit(5)
        .parallel_geocoding(true)
        .language("de")
        .build()?;
    describe("Custom", &custom);

    // Config files only need the fields they change
    let file = ConfigFile::from_json_str(
        r#"{
            "retry": {"max_attempts": 8},
            "aliases": {"Deutschland": "Germany"},
            "nominatim": {"base_url": "http://localhost:8080", "min_request_interval": 0}
        }"#,
    )?;
    let layered = FinderConfigBuilder::new().with_file(file)?.build()?;
    describe("From file", &layered);
    println!(
        "  'Deutschland' is matched as '{}', requests go to {}",
        layered.country_tables.canonical("Deutschland"),
        layered.nominatim.base_url
    );

    // Invalid settings are rejected at build time
    if let Err(e) = FinderConfigBuilder::new().max_attempts(0).build() {
        println!("\nRejected: {e}");
    }

    Ok(())
}

fn describe(name: &str, config: &FinderConfig) {
    println!(
        "  {name:<10} attempts: {:>2}, first backoff: {:?}, deadline: {:?}, limit: {}, parallel: {}",
        config.retry.max_attempts,
        config.retry.initial_backoff,
        config.deadline,
        config.selection.limit,
        config.selection.parallel_geocoding
    );
}
