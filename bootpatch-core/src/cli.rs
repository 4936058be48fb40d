//! CLI argument parsing for bootpatch
//!
//! The TUI is the only entry point; flags adjust how the session starts.

use crate::os::OsRelease;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bootpatch")]
#[command(about = "bootpatch - boot configuration patcher front-end")]
#[command(long_about = "bootpatch - boot configuration patcher front-end\n\n\
    Walks through building and installing a boot-loader payload, creating a\n\
    bootable installer, and applying or reverting root volume patches.")]
pub struct Cli {
    /// Settings file (default: ~/.config/bootpatch/settings.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the detected model identifier (e.g. MacPro5,1)
    #[arg(long)]
    pub model: Option<String>,

    /// Override the detected OS release (e.g. 10.15.7, 12.1, "big sur")
    #[arg(long, value_parser = parse_os_release)]
    pub os_version: Option<OsRelease>,

    /// Use the scripted in-memory backend instead of external tools
    #[arg(long)]
    pub demo: bool,

    /// Print every step with its gate status and exit
    #[arg(long)]
    pub dump_steps: bool,
}

fn parse_os_release(value: &str) -> Result<OsRelease, String> {
    value.parse::<OsRelease>().map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_overrides() {
        let cli = Cli::try_parse_from([
            "bootpatch",
            "--model",
            "MacPro5,1",
            "--os-version",
            "10.15.7",
            "--demo",
        ])
        .unwrap();
        assert_eq!(cli.model.as_deref(), Some("MacPro5,1"));
        assert_eq!(cli.os_version, Some(OsRelease::CATALINA));
        assert!(cli.demo);
        assert!(!cli.dump_steps);
    }

    #[test]
    fn rejects_unknown_release() {
        assert!(Cli::try_parse_from(["bootpatch", "--os-version", "9.2"]).is_err());
    }
}
