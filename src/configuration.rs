//! Layered configuration: `configuration/base.yml` + an environment overlay
//! + `APP_`-prefixed environment variables, merged via `figment`.

use figment::providers::Env;
use figment::{
    Figment,
    providers::{Format, Yaml},
};
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;
use std::fmt;

#[derive(Clone, Debug, Deserialize)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub rate_limiting: RateLimitSettings,
    pub cache: CacheSettings,
    pub annotation: AnnotationSettings,
    pub llm: LlmSettings,
    pub metadata: MetadataSettings,
    pub geoip: GeoIpSettings,
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Application Settings:")?;
        writeln!(f, "  Host: {}", self.application.host)?;
        writeln!(f, "  Port: {}", self.application.port)?;
        writeln!(f, "  Base URL: {}", self.application.base_url)?;
        writeln!(f, "Database Settings:")?;
        writeln!(f, "  Database Type: {:?}", self.database.r#type)?;
        writeln!(f, "  Database URL: {}", self.database.url)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    /// Used to construct the returned short URL and the QR code payload.
    pub base_url: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    Sqlite,
    Postgres,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DatabaseSettings {
    pub r#type: DatabaseType,
    #[serde(alias = "database_path")]
    pub url: String,
    #[serde(default)]
    pub create_if_missing: bool,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        match self.r#type {
            DatabaseType::Sqlite if self.url == ":memory:" => "sqlite::memory:".to_string(),
            _ => self.url.clone(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct RateLimitSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub window_seconds: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_requests: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CacheSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub ttl_hours: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_entries: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AnnotationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub ttl_days: i64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MetadataSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_secs: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_body_bytes: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GeoIpSettings {
    pub database_path: Option<String>,
}

#[derive(Clone, Debug)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{other} is not a supported environment. Use either `local` or `production`."
            )),
        }
    }
}

pub fn get_configuration() -> Result<Settings, Box<figment::Error>> {
    let base_path = std::env::current_dir().expect("Failed to determine the current directory");
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .expect("Failed to parse APP_ENVIRONMENT");

    let environment_filename = format!("{}.yml", environment.as_str());

    let settings: Settings = Figment::new()
        .merge(Yaml::file(configuration_directory.join("base.yml")))
        .merge(Yaml::file(
            configuration_directory.join(environment_filename),
        ))
        .merge(Env::prefixed("APP_").split("__"))
        .extract()?;

    Ok(settings)
}
