//! Configuration file parsing for logferry
//!
//! Every setting is optional. Values resolve in order: CLI flag, then
//! `logferry.toml`, then the built-in defaults from [`crate::constants`].

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::constants::{logferry_home, CONFIG_FILE};
use crate::error::{Error, Result};

/// Configuration file structure (logferry.toml)
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub forward: ForwardSection,
    #[serde(default)]
    pub collect: CollectSection,
    #[serde(default)]
    pub rotate: RotateSection,
}

/// `[forward]` section
#[derive(Debug, Default, Deserialize)]
pub struct ForwardSection {
    /// Name announced to the collector as the first line (default: host name)
    pub name: Option<String>,
    /// Path of the collector address file
    pub address_file: Option<PathBuf>,
    /// Directory for backlog spill files
    pub backlog_dir: Option<PathBuf>,
    /// Seconds between reconnect attempts
    pub retry_delay_secs: Option<u64>,
    /// Seconds to keep draining the backlog after the source ends
    pub drain_grace_secs: Option<u64>,
}

/// `[collect]` section
#[derive(Debug, Default, Deserialize)]
pub struct CollectSection {
    /// Listen address, e.g. "0.0.0.0:9440"
    pub listen: Option<SocketAddr>,
    /// Address file to publish the bound endpoint to
    pub publish: Option<PathBuf>,
}

/// `[rotate]` section
#[derive(Debug, Default, Deserialize)]
pub struct RotateSection {
    /// Directory receiving day files
    pub dir: Option<PathBuf>,
    /// File name prefix for day files and the current pointer
    pub prefix: Option<String>,
}

impl ConfigFile {
    /// Load config from an explicit path
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse config content
    pub fn parse(content: &str) -> Result<Self> {
        let config: ConfigFile = toml::from_str(content)?;
        Ok(config)
    }

    /// Find `logferry.toml` in the current directory or the logferry home,
    /// falling back to built-in defaults when neither exists
    pub fn discover() -> Result<Self> {
        for dir in [PathBuf::from("."), logferry_home()] {
            let path = dir.join(CONFIG_FILE);
            if path.exists() {
                return Self::load(&path);
            }
        }
        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_parse_full() {
        let config_content = r#"
[forward]
name = "web-04"
address_file = "/var/run/logferry/sink.addr"
backlog_dir = "/var/spool/logferry"
retry_delay_secs = 5
drain_grace_secs = 60

[collect]
listen = "0.0.0.0:9440"
publish = "/var/run/logferry/sink.addr"

[rotate]
dir = "/var/log/cluster"
prefix = "cluster"
"#;
        let config = ConfigFile::parse(config_content).unwrap();
        assert_eq!(config.forward.name.as_deref(), Some("web-04"));
        assert_eq!(config.forward.retry_delay_secs, Some(5));
        assert_eq!(
            config.collect.listen,
            Some("0.0.0.0:9440".parse().unwrap())
        );
        assert_eq!(config.rotate.prefix.as_deref(), Some("cluster"));
    }

    #[test]
    fn test_config_parse_empty_sections_default() {
        let config = ConfigFile::parse("[forward]\n").unwrap();
        assert!(config.forward.name.is_none());
        assert!(config.collect.listen.is_none());
        assert!(config.rotate.dir.is_none());
    }

    #[test]
    fn test_config_load_from_file() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        file.write_all(b"[rotate]\nprefix = \"edge\"\n").unwrap();
        let config = ConfigFile::load(file.path()).unwrap();
        assert_eq!(config.rotate.prefix.as_deref(), Some("edge"));
    }

    #[test]
    fn test_config_missing_file() {
        let err = ConfigFile::load(Path::new("/nonexistent/logferry.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound(_)));
    }

    #[test]
    fn test_config_bad_toml() {
        let err = ConfigFile::parse("[forward\nname=").unwrap_err();
        assert!(matches!(err, Error::TomlError(_)));
    }
}
