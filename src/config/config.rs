use crate::wgs_metrics::PipelineSettings;
use directories::ProjectDirs;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Tuning defaults read from `config.toml`; command-line flags override them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pack_max_loci: usize,
    pub pack_max_observations: usize,
    pub queue_capacity: usize,
    pub worker_threads: usize,
    pub max_in_flight_packs: usize,
    pub min_mapping_quality: u8,
    pub min_base_quality: u8,
    pub coverage_cap: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pack_max_loci: 500,
            pack_max_observations: 3000,
            queue_capacity: 100,
            worker_threads: 4,
            max_in_flight_packs: 10,
            min_mapping_quality: 20,
            min_base_quality: 20,
            coverage_cap: 250,
        }
    }
}

impl Config {
    fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "wgs-coverage", "wgs-coverage")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Loads the user config, falling back to defaults when it is absent or unreadable.
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path).unwrap_or_else(|e| {
                warn!("Ignoring config {}: {}", path.display(), e);
                Config::default()
            }),
            _ => Config::default(),
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Writes the config to the per-user location and returns where it went.
    pub fn save(&self) -> anyhow::Result<PathBuf> {
        let path = Self::default_path()
            .ok_or_else(|| anyhow::anyhow!("No home directory for the user config"))?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings::new(
            self.pack_max_loci,
            self.pack_max_observations,
            self.queue_capacity,
            self.worker_threads,
            self.max_in_flight_packs,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "worker_threads = 8\ncoverage_cap = 100").unwrap();
        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.worker_threads, 8);
        assert_eq!(config.coverage_cap, 100);
        assert_eq!(config.max_in_flight_packs, 10);
        assert_eq!(config.pack_max_loci, 500);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "worker_threads = \"many\"").unwrap();
        assert!(Config::load_from(file.path()).is_err());
    }

    #[test]
    fn test_saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            max_in_flight_packs: 3,
            min_base_quality: 30,
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_pipeline_settings_round_trip() {
        let settings = Config::default().pipeline_settings();
        assert_eq!(settings, PipelineSettings::new(500, 3000, 100, 4, 10));
    }
}
