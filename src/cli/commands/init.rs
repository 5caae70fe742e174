//! Implementation of the `hivemind init` command.

use anyhow::{Context, Result};
use tokio::fs;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub config_path: String,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(force: bool, json_mode: bool) -> Result<()> {
    let dir = std::path::Path::new(".hivemind");
    let config_path = dir.join("config.yaml");

    if config_path.exists() && !force {
        let out = InitOutput {
            success: false,
            message: "Already initialized. Use --force to overwrite.".to_string(),
            config_path: config_path.display().to_string(),
        };
        output(&out, json_mode);
        return Ok(());
    }

    fs::create_dir_all(dir)
        .await
        .context("failed to create .hivemind directory")?;

    let yaml = serde_yaml::to_string(&Config::default())
        .context("failed to render default configuration")?;
    fs::write(&config_path, yaml)
        .await
        .context("failed to write .hivemind/config.yaml")?;

    let out = InitOutput {
        success: true,
        message: format!("Wrote starter configuration to {}", config_path.display()),
        config_path: config_path.display().to_string(),
    };
    output(&out, json_mode);
    Ok(())
}
