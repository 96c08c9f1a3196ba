//! Config command - show settings or switch backends

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use serde_json::json;

use adopta_core::config::{Backend, Config};
use adopta_core::OperationResult;

use super::get_app_dir;
use crate::output;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Select the backend: local or firebase
    Backend {
        backend: Backend,
    },
}

pub fn run(command: ConfigCommands, json: bool) -> Result<()> {
    let app_dir = get_app_dir()?;

    match command {
        ConfigCommands::Show => {
            let config = Config::load(&app_dir)?;
            if json {
                let data = json!({
                    "dir": app_dir.display().to_string(),
                    "backend": config.backend,
                    "cacheKey": config.cache_key,
                    "firebase": config.firebase,
                    "authEmulatorHost": config.auth_emulator_host,
                    "firestoreEmulatorHost": config.firestore_emulator_host,
                });
                println!("{}", serde_json::to_string_pretty(&OperationResult::ok(data))?);
                return Ok(());
            }

            let mut table = output::create_table();
            table.add_row(vec!["Directory".to_string(), app_dir.display().to_string()]);
            table.add_row(vec!["Backend".to_string(), config.backend.to_string()]);
            table.add_row(vec!["Cache key".to_string(), config.cache_key.clone()]);
            if config.backend == Backend::Firebase {
                let project = config.firebase.project_id.as_deref().unwrap_or("-");
                let key_state = if config.firebase.api_key.is_some() { "set" } else { "missing" };
                table.add_row(vec!["Project".to_string(), project.to_string()]);
                table.add_row(vec!["API key".to_string(), key_state.to_string()]);
                for (label, host) in [
                    ("Auth emulator", &config.auth_emulator_host),
                    ("Firestore emulator", &config.firestore_emulator_host),
                ] {
                    if let Some(host) = host {
                        table.add_row(vec![label.to_string(), host.clone()]);
                    }
                }
            }
            println!("{}", "Adopta Configuration".bold());
            println!("{}", table);
            Ok(())
        }
        ConfigCommands::Backend { backend } => {
            let mut config = Config::load(&app_dir)?;
            config.backend = backend;
            config.save(&app_dir)?;

            if json {
                let data = json!({ "backend": backend });
                println!("{}", serde_json::to_string_pretty(&OperationResult::ok(data))?);
            } else {
                output::success(&format!("Backend set to {}", backend));
                if backend == Backend::Firebase && config.firebase_options().is_err() {
                    output::warning("Add firebase.apiKey and firebase.projectId to settings.json before signing in");
                }
            }
            Ok(())
        }
    }
}
