use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    pub embed: EmbedSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub catalog: CatalogSettings,
    #[serde(default)]
    pub store: StoreSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbedSettings {
    pub base_url: String,
    /// Signing key for `signed` embeds. Signed links carry no token without it.
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: i64,
}

fn default_token_ttl() -> i64 {
    600
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SessionSettings {
    pub refresh_delay_ms: u64,
    pub load_delay_ms: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            refresh_delay_ms: 1000,
            load_delay_ms: 500,
        }
    }
}

impl SessionSettings {
    pub fn refresh_delay(&self) -> Duration {
        Duration::from_millis(self.refresh_delay_ms)
    }

    pub fn load_delay(&self) -> Duration {
        Duration::from_millis(self.load_delay_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogSettings {
    pub path: PathBuf,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("config/dashboards.json"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreSettings {
    pub dir: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/boards"),
        }
    }
}

/// `config/app.toml`, then `config/app.local.toml` if present, then `DASHBOARD__*` env vars.
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    load_app_config_from("config/app")
}

pub fn load_app_config_from(base: &str) -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name(base))
        .add_source(config::File::with_name(&format!("{base}.local")).required(false))
        .add_source(config::Environment::with_prefix("DASHBOARD").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("app");
        fs::write(
            dir.path().join("app.toml"),
            "[embed]\nbase_url = \"https://bi.example.com\"\n",
        )
        .unwrap();

        let config = load_app_config_from(base.to_str().unwrap()).unwrap();
        assert_eq!(config.embed.base_url, "https://bi.example.com");
        assert_eq!(config.embed.token_ttl_secs, 600);
        assert!(config.embed.secret_key.is_none());
        assert_eq!(config.session.refresh_delay(), Duration::from_millis(1000));
        assert_eq!(config.session.load_delay(), Duration::from_millis(500));
        assert_eq!(config.server.bind, "0.0.0.0:8080");
    }

    #[test]
    fn test_local_file_overrides_base() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("app");
        fs::write(
            dir.path().join("app.toml"),
            "[embed]\nbase_url = \"https://bi.example.com\"\n\n[session]\nrefresh_delay_ms = 1000\nload_delay_ms = 500\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("app.local.toml"),
            "[embed]\nbase_url = \"http://localhost:3000\"\nsecret_key = \"dev\"\n",
        )
        .unwrap();

        let config = load_app_config_from(base.to_str().unwrap()).unwrap();
        assert_eq!(config.embed.base_url, "http://localhost:3000");
        assert_eq!(config.embed.secret_key.as_deref(), Some("dev"));
        assert_eq!(config.session.refresh_delay_ms, 1000);
    }

    #[test]
    fn test_missing_base_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("absent");
        assert!(load_app_config_from(base.to_str().unwrap()).is_err());
    }
}
