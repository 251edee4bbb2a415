use std::path::Path;

use {
    afk_config::AfkConfig,
    anyhow::Result,
    clap::ValueEnum,
    secrecy::Secret,
};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum ConfigFormat {
    #[default]
    Toml,
    Json,
}

/// Print the effective configuration with the credential redacted.
pub fn show_config(config: &AfkConfig, source: Option<&Path>, format: ConfigFormat) -> Result<()> {
    match source {
        Some(path) => eprintln!("# loaded from {}", path.display()),
        None => eprintln!("# no config file found, showing defaults"),
    }
    println!("{}", render(config, format)?);
    Ok(())
}

fn render(config: &AfkConfig, format: ConfigFormat) -> Result<String> {
    let redacted = redact(config);
    Ok(match format {
        ConfigFormat::Toml => toml::to_string_pretty(&redacted)?,
        ConfigFormat::Json => serde_json::to_string_pretty(&redacted)?,
    })
}

fn redact(config: &AfkConfig) -> AfkConfig {
    let mut config = config.clone();
    if config.responder.custom_api_key.is_some() {
        config.responder.custom_api_key = Some(Secret::new("[REDACTED]".to_string()));
    }
    config
}
