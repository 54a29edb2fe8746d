use clap::Args;
use engine::Currency;
use serde::Deserialize;

use crate::error::Result;

const DEFAULT_CONFIG_PATH: &str = "config/persfin.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    /// Bearer access token issued by the identity provider.
    pub token: Option<String>,
    pub level: String,
    /// Where the lock state is kept between runs.
    pub state_path: String,
    pub default_currency: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8081".to_string(),
            token: None,
            level: "info".to_string(),
            state_path: "config/persfin_state.json".to_string(),
            default_currency: "EUR".to_string(),
        }
    }
}

impl AppConfig {
    pub fn currency(&self) -> Result<Currency> {
        Ok(Currency::try_from(self.default_currency.as_str())?)
    }
}

#[derive(Debug, Args)]
pub struct Overrides {
    /// Optional config file path (TOML).
    #[arg(long, global = true)]
    config: Option<String>,
    /// Override base URL (e.g. http://127.0.0.1:8081).
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Override the access token.
    #[arg(long, global = true)]
    token: Option<String>,
    /// Override log level.
    #[arg(long, global = true)]
    level: Option<String>,
    /// Override the lock state file.
    #[arg(long, global = true)]
    state_path: Option<String>,
}

/// Config file, then `PERSFIN_*` environment variables, then command-line
/// overrides.
pub fn load(args: &Overrides) -> Result<AppConfig> {
    let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let mut builder = config::Config::builder();
    builder = builder.add_source(config::File::with_name(config_path).required(false));
    builder = builder.add_source(config::Environment::with_prefix("PERSFIN"));
    let mut settings: AppConfig = builder.build()?.try_deserialize()?;

    if let Some(base_url) = &args.base_url {
        settings.base_url = base_url.clone();
    }
    if let Some(token) = &args.token {
        settings.token = Some(token.clone());
    }
    if let Some(level) = &args.level {
        settings.level = level.clone();
    }
    if let Some(state_path) = &args.state_path {
        settings.state_path = state_path.clone();
    }

    Ok(settings)
}
