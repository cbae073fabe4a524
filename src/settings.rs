use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{BpError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_data_dir_string")]
    pub data_dir: String,
    #[serde(default = "default_ledger_file")]
    pub ledger_file: String,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_first_year")]
    pub first_year: i32,
    #[serde(default = "default_last_year")]
    pub last_year: i32,
    #[serde(default = "default_target_category")]
    pub target_category: String,
}

fn default_data_dir_string() -> String {
    default_data_dir().to_string_lossy().to_string()
}

fn default_ledger_file() -> String {
    "bp_forecast_tabulaire.csv".to_string()
}

fn default_seed() -> u64 {
    42
}

fn default_first_year() -> i32 {
    2023
}

fn default_last_year() -> i32 {
    2028
}

fn default_target_category() -> String {
    "Chiffre d'affaires".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir_string(),
            ledger_file: default_ledger_file(),
            seed: default_seed(),
            first_year: default_first_year(),
            last_year: default_last_year(),
            target_category: default_target_category(),
        }
    }
}

impl Settings {
    /// The ledger source; relative names resolve against the data directory.
    pub fn ledger_path(&self) -> PathBuf {
        let p = PathBuf::from(&self.ledger_file);
        if p.is_absolute() {
            p
        } else {
            PathBuf::from(&self.data_dir).join(p)
        }
    }

    pub fn exports_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("exports")
    }

    /// Update one field from a `key=value` pair typed on the command line.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let bad = |what: &str| BpError::Settings(format!("{key}: expected {what}, got '{value}'"));
        let mut next = self.clone();
        match key {
            "data_dir" => next.data_dir = shellexpand_path(value),
            "ledger_file" => next.ledger_file = value.to_string(),
            "seed" => next.seed = value.parse().map_err(|_| bad("an unsigned integer"))?,
            "first_year" => next.first_year = value.parse().map_err(|_| bad("a year"))?,
            "last_year" => next.last_year = value.parse().map_err(|_| bad("a year"))?,
            "target_category" => next.target_category = value.to_string(),
            _ => return Err(BpError::Settings(format!("unknown setting '{key}'"))),
        }
        if next.first_year > next.last_year {
            return Err(BpError::Settings(format!(
                "first_year ({}) is after last_year ({})",
                next.first_year, next.last_year
            )));
        }
        *self = next;
        Ok(())
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("bpsim")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("bpsim")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| BpError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            data_dir: "/tmp/bp".to_string(),
            seed: 7,
            ..Settings::default()
        };
        std::fs::write(&path, serde_json::to_string_pretty(&settings).unwrap()).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let loaded: Settings = serde_json::from_str(&content).unwrap();
        assert_eq!(loaded.data_dir, "/tmp/bp");
        assert_eq!(loaded.seed, 7);
        assert_eq!(loaded.last_year, 2028);
    }

    #[test]
    fn test_partial_file_merges_with_defaults() {
        let json = r#"{"data_dir": "/srv/bp", "seed": 1}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.seed, 1);
        assert_eq!(s.first_year, 2023);
        assert_eq!(s.ledger_file, "bp_forecast_tabulaire.csv");
        assert_eq!(s.target_category, "Chiffre d'affaires");
    }

    #[test]
    fn test_ledger_path_resolution() {
        let mut s = Settings {
            data_dir: "/srv/bp".to_string(),
            ..Settings::default()
        };
        assert_eq!(s.ledger_path(), PathBuf::from("/srv/bp/bp_forecast_tabulaire.csv"));
        s.ledger_file = "/data/other.csv".to_string();
        assert_eq!(s.ledger_path(), PathBuf::from("/data/other.csv"));
        assert_eq!(s.exports_dir(), PathBuf::from("/srv/bp/exports"));
    }

    #[test]
    fn test_set_values() {
        let mut s = Settings::default();
        s.set("seed", "99").unwrap();
        assert_eq!(s.seed, 99);
        s.set("target_category", "Charges").unwrap();
        assert_eq!(s.target_category, "Charges");
        assert!(s.set("seed", "-1").is_err());
        assert!(s.set("colour", "blue").is_err());
        assert!(s.set("first_year", "2030").is_err());
        assert_eq!(s.first_year, 2023);
    }
}
