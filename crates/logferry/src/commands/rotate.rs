//! Rotate command implementation - splits stdin into day files

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use logferry_core::{constants, ConfigFile, RotateSection};
use logferry_rotate::Rotator;

use crate::cli::RotateArgs;

pub async fn execute(args: RotateArgs, config: ConfigFile) -> Result<()> {
    let (dir, prefix) = resolve(&args, &config.rotate);
    info!("Rotating into {}", dir.display());
    Rotator::new(dir, prefix).run(tokio::io::stdin()).await?;
    Ok(())
}

fn resolve(args: &RotateArgs, file: &RotateSection) -> (PathBuf, String) {
    let dir = args
        .dir
        .clone()
        .or_else(|| file.dir.clone())
        .unwrap_or_else(constants::logs_dir);
    let prefix = args
        .prefix
        .clone()
        .or_else(|| file.prefix.clone())
        .unwrap_or_else(|| constants::DEFAULT_DAY_FILE_PREFIX.to_string());
    (dir, prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_overrides_config_dir() {
        let args = RotateArgs {
            dir: Some(PathBuf::from("/var/log/cluster")),
            prefix: None,
        };
        let file = RotateSection {
            dir: Some(PathBuf::from("/elsewhere")),
            prefix: Some("cluster".to_string()),
        };

        let (dir, prefix) = resolve(&args, &file);
        assert_eq!(dir, PathBuf::from("/var/log/cluster"));
        assert_eq!(prefix, "cluster");
    }

    #[test]
    fn test_defaults_when_nothing_configured() {
        let args = RotateArgs {
            dir: None,
            prefix: None,
        };

        let (dir, prefix) = resolve(&args, &RotateSection::default());
        assert_eq!(dir, constants::logs_dir());
        assert_eq!(prefix, constants::DEFAULT_DAY_FILE_PREFIX);
    }
}
