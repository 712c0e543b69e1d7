use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub global: GlobalConfig,
    pub dumps: Vec<DumpConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GlobalConfig {
    pub es_url: String,
    #[serde(default = "default_index")]
    pub index: String,
    pub tmp_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DumpConfig {
    pub name: String,
    pub url: String,
}

fn default_index() -> String {
    "geonames".to_string()
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;
        if config.dumps.is_empty() {
            anyhow::bail!("Config lists no dumps");
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_batch_config() {
        let config = Config::parse(
            r#"
            [global]
            es_url = "http://localhost:9200"
            tmp_dir = "/tmp/geonames"

            [[dumps]]
            name = "United States"
            url = "http://download.geonames.org/export/dump/US.zip"

            [[dumps]]
            name = "Canada"
            url = "http://download.geonames.org/export/dump/CA.zip"
            "#,
        )
        .unwrap();

        assert_eq!(config.global.index, "geonames");
        assert_eq!(config.global.tmp_dir, PathBuf::from("/tmp/geonames"));
        assert_eq!(config.dumps.len(), 2);
        assert_eq!(config.dumps[1].name, "Canada");
    }

    #[test]
    fn test_empty_dump_list_rejected() {
        let result = Config::parse(
            r#"
            dumps = []

            [global]
            es_url = "http://localhost:9200"
            tmp_dir = "/tmp/geonames"
            "#,
        );
        assert!(result.is_err());
    }
}
