//! Option catalog: the selectable genres, moods per genre and reading levels.
//!
//! Loaded once at startup and shared read-only (`Arc<OptionCatalog>`).

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use tracing::{info, warn};

/// Catalog compiled into the binary; used when no user file is present.
pub const BUILTIN_CATALOG: &str = include_str!("../data/catalog.toml");

#[derive(Debug, Clone, Default)]
pub struct OptionCatalog {
    genres: Vec<String>,
    moods: HashMap<String, Vec<String>>,
    levels: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TomlCatalogFile {
    #[serde(default = "default_levels")]
    levels: Vec<String>,
    #[serde(default)]
    genre: Vec<TomlGenre>,
}

#[derive(Debug, Deserialize)]
struct TomlGenre {
    name: String,
    #[serde(default)]
    moods: Vec<String>,
}

fn default_levels() -> Vec<String> {
    ["Beginner", "Intermediate", "Expert"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl OptionCatalog {
    pub fn new(
        genres: Vec<String>,
        moods: HashMap<String, Vec<String>>,
        levels: Vec<String>,
    ) -> Self {
        Self {
            genres,
            moods,
            levels,
        }
    }

    pub fn genres(&self) -> &[String] {
        &self.genres
    }

    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    /// Moods valid for `genre`. Unknown or unset genres yield an empty slice.
    pub fn available_moods(&self, genre: &str) -> &[String] {
        self.moods.get(genre).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains_genre(&self, genre: &str) -> bool {
        self.moods.contains_key(genre)
    }

    pub fn builtin() -> anyhow::Result<Self> {
        parse_catalog_from_toml_str(BUILTIN_CATALOG).context("built-in catalog")
    }

    /// Load the user catalog at `path`, falling back to the built-in one.
    pub fn load_or_builtin(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            match load_catalog_from_toml(path) {
                Ok(c) => {
                    info!(
                        "Loaded catalog with {} genres from {}",
                        c.genres.len(),
                        path.display()
                    );
                    return Ok(c);
                }
                Err(e) => warn!("Failed to parse catalog {}: {:#}", path.display(), e),
            }
        }
        let c = Self::builtin()?;
        info!("Using built-in catalog ({} genres)", c.genres.len());
        Ok(c)
    }
}

pub fn load_catalog_from_toml(path: &Path) -> anyhow::Result<OptionCatalog> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    parse_catalog_from_toml_str(&content)
}

/// Parse a catalog file. A repeated genre keeps its first position and takes
/// the moods of its last entry.
pub fn parse_catalog_from_toml_str(content: &str) -> anyhow::Result<OptionCatalog> {
    let file: TomlCatalogFile = toml::from_str(content)?;
    let mut genres = Vec::with_capacity(file.genre.len());
    let mut moods = HashMap::with_capacity(file.genre.len());
    for g in file.genre {
        if moods.insert(g.name.clone(), g.moods).is_none() {
            genres.push(g.name);
        }
    }
    Ok(OptionCatalog::new(genres, moods, file.levels))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_parses() {
        let c = OptionCatalog::builtin().unwrap();
        assert!(!c.genres().is_empty());
        assert_eq!(c.levels(), ["Beginner", "Intermediate", "Expert"]);
        assert!(c.available_moods("Fantasy").iter().any(|m| m == "Adventurous"));
        for g in c.genres() {
            assert!(c.contains_genre(g));
        }
    }

    #[test]
    fn test_unknown_genre_has_no_moods() {
        let c = OptionCatalog::builtin().unwrap();
        assert!(c.available_moods("").is_empty());
        assert!(c.available_moods("Cookbooks for Cats").is_empty());
        assert!(c.available_moods("fantasy").is_empty());
    }

    #[test]
    fn test_levels_default_when_omitted() {
        let c = parse_catalog_from_toml_str(
            r#"
            [[genre]]
            name = "Western"
            moods = ["Gritty"]
            "#,
        )
        .unwrap();
        assert_eq!(c.levels().len(), 3);
        assert_eq!(c.genres(), ["Western"]);
    }

    #[test]
    fn test_duplicate_genre_keeps_order_takes_last_moods() {
        let c = parse_catalog_from_toml_str(
            r#"
            levels = ["Easy"]
            [[genre]]
            name = "A"
            moods = ["one"]
            [[genre]]
            name = "B"
            moods = ["two"]
            [[genre]]
            name = "A"
            moods = ["three"]
            "#,
        )
        .unwrap();
        assert_eq!(c.genres(), ["A", "B"]);
        assert_eq!(c.available_moods("A"), ["three"]);
        assert_eq!(c.levels(), ["Easy"]);
    }

    #[test]
    fn test_load_or_builtin_falls_back_on_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let c = OptionCatalog::load_or_builtin(&missing).unwrap();
        assert!(c.contains_genre("Fantasy"));

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "[[genre]\nname = ").unwrap();
        let c = OptionCatalog::load_or_builtin(&broken).unwrap();
        assert!(c.contains_genre("Fantasy"));

        let custom = dir.path().join("custom.toml");
        std::fs::write(&custom, "[[genre]]\nname = \"Western\"\nmoods = [\"Dusty\"]\n").unwrap();
        let c = OptionCatalog::load_or_builtin(&custom).unwrap();
        assert_eq!(c.genres(), ["Western"]);
    }
}
