use crate::error::{Error, Result};
use crate::models::question::SeedQuestion;
use std::path::Path;

/// Loads the seed-question corpus from a JSON array file. An empty corpus is
/// reported as an error: without seeds the pipeline cannot generate anything.
pub fn load_seed_pool(path: impl AsRef<Path>) -> Result<Vec<SeedQuestion>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Cannot read seed data {}: {}", path.display(), e))
    })?;
    let seeds: Vec<SeedQuestion> = serde_json::from_str(&raw)?;
    if seeds.is_empty() {
        return Err(Error::Config(format!(
            "Seed data {} contains no questions",
            path.display()
        )));
    }
    tracing::info!(count = seeds.len(), path = %path.display(), "Loaded seed questions");
    Ok(seeds)
}
