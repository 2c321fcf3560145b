mod cli;
mod display;
mod error;

use std::path::Path;

use agrihanda::config::Config;
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use cli::{Cli, RunCommand};
use log::debug;

const DEFAULT_LOGGING_LEVEL: &str = "warn";

fn main() -> Result<()> {
    // Set RUST_LOG to `DEFAULT_LOGGING_LEVEL` if not set
    let _ =
        std::env::var("RUST_LOG").map_err(|_| std::env::set_var("RUST_LOG", DEFAULT_LOGGING_LEVEL));
    pretty_env_logger::init_timed();
    let args = Cli::parse();
    debug!("args: {args:?}");
    let config: Config = read_config_from_toml()?;
    debug!("config: {config:?}");

    if let Some(command) = args.command {
        command.run(config)?;
    }
    Ok(())
}

fn read_config_from_toml() -> Result<Config> {
    // Linux: ~/.config/agrihanda/config.toml
    let config_dir = dirs::config_dir().ok_or_else(|| anyhow!("No config directory found"))?;
    read_config_file(&config_dir.join("agrihanda").join("config.toml"))
}

fn read_config_file(file_path: &Path) -> Result<Config> {
    match std::fs::read_to_string(file_path) {
        Ok(contents) => toml::from_str(&contents)
            .with_context(|| format!("Invalid TOML in config file {}", file_path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
        Err(e) => Err(e).with_context(|| format!("Error reading config file {}", file_path.display())),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn missing_config_file_gives_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = read_config_file(&dir.path().join("config.toml"))?;
        assert_eq!(config, Config::default());
        Ok(())
    }

    #[test]
    fn config_file_overrides_some_fields() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let file_path = dir.path().join("config.toml");
        std::fs::write(
            &file_path,
            "output_dir = \"outputs\"\nwrite_divided = false\n",
        )?;
        let config = read_config_file(&file_path)?;
        assert_eq!(config.output_dir, PathBuf::from("outputs"));
        assert!(!config.write_divided);
        assert_eq!(config.list_delimiter, Config::default().list_delimiter);

        std::fs::write(&file_path, "write_divided = \"sometimes\"\n")?;
        assert!(read_config_file(&file_path).is_err());
        Ok(())
    }
}
