//! Config subcommand handlers.

use std::path::PathBuf;

use dialoguer::Input;

use starpay_config::{self as config, Config};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::prompt_err;

const KEYS: &str = "base_url, page_size, session_file, timeout_ms";

fn format_config(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();
    let _ = writeln!(out, "base_url = \"{}\"", cfg.base_url);
    let _ = writeln!(out, "page_size = {}", cfg.page_size);
    let _ = writeln!(out, "session_file = \"{}\"", cfg.session_path().display());
    let _ = write!(out, "timeout_ms = {}", cfg.timeout_ms);
    out
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: key.into(),
        reason: "must be a positive number".into(),
    })
}

/// Apply one `key = value` change in place.
fn apply(cfg: &mut Config, key: &str, value: String) -> Result<(), CliError> {
    match key {
        "base_url" | "base-url" => cfg.base_url = value,
        "page_size" | "page-size" => cfg.page_size = parse_number(key, &value)?,
        "session_file" | "session-file" => {
            cfg.session_file = if value.is_empty() {
                None
            } else {
                Some(PathBuf::from(value))
            };
        }
        "timeout_ms" | "timeout-ms" => cfg.timeout_ms = parse_number(key, &value)?,
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!("unknown config key '{other}'. Valid keys: {KEYS}"),
            });
        }
    }
    // Reject values the dashboard would refuse at startup.
    cfg.to_dashboard_config()?;
    Ok(())
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => {
            let path = config::config_path();
            let current = config::load_file_config(&path)?;
            eprintln!("Starpay configuration");
            eprintln!("   Config path: {}\n", path.display());

            let base_url: String = Input::new()
                .with_prompt("API base URL")
                .default(current.base_url.clone())
                .interact_text()
                .map_err(prompt_err)?;

            let page_size: u32 = Input::new()
                .with_prompt("Rows per page")
                .default(current.page_size)
                .interact_text()
                .map_err(prompt_err)?;

            let mut cfg = current;
            apply(&mut cfg, "base_url", base_url)?;
            apply(&mut cfg, "page_size", page_size.to_string())?;

            let written = config::save_config(&cfg)?;
            eprintln!("\nConfiguration written to {}", written.display());
            eprintln!("  Sign in with: starpay login");
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            let out = output::render_single(&global.output, &cfg, format_config, |c| {
                c.base_url.clone()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), false);
            Ok(())
        }

        ConfigCommand::Set { key, value } => {
            let path = config::config_path();
            let mut cfg = config::load_file_config(&path)?;
            apply(&mut cfg, &key, value)?;
            config::save_config_to(&path, &cfg)?;
            if !global.quiet {
                eprintln!("Set {key}");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn apply_known_keys() {
        let mut cfg = Config::default();
        apply(&mut cfg, "page_size", "25".into()).unwrap();
        apply(&mut cfg, "base-url", "https://alerts.example.com".into()).unwrap();
        apply(&mut cfg, "session_file", "/tmp/s.json".into()).unwrap();
        assert_eq!(cfg.page_size, 25);
        assert_eq!(cfg.base_url, "https://alerts.example.com");
        assert_eq!(cfg.session_file, Some(PathBuf::from("/tmp/s.json")));

        apply(&mut cfg, "session_file", String::new()).unwrap();
        assert_eq!(cfg.session_file, None);
    }

    #[test]
    fn apply_rejects_unknown_and_invalid() {
        let mut cfg = Config::default();
        assert!(apply(&mut cfg, "colour", "red".into()).is_err());
        assert!(apply(&mut cfg, "page_size", "lots".into()).is_err());
        assert!(apply(&mut cfg, "page_size", "0".into()).is_err());
        assert!(apply(&mut cfg, "base_url", "ftp://x".into()).is_err());
    }
}
