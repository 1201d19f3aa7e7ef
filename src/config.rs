use serde::{Deserialize, Serialize};

use std::{env, fmt, fs, path::Path, path::PathBuf, time::Duration};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_UPLOADS_DIR: &str = "uploads";
const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    pub database_path: PathBuf,
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: PathBuf,
    pub gemini: GeminiConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
    /// No timeout beyond the transport default when unset
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_uploads_dir() -> PathBuf {
    PathBuf::from(DEFAULT_UPLOADS_DIR)
}

fn default_gemini_model() -> String {
    DEFAULT_GEMINI_MODEL.to_string()
}

fn default_gemini_base_url() -> String {
    DEFAULT_GEMINI_BASE_URL.to_string()
}

fn parse_port(port: &str) -> Result<u16, Box<dyn std::error::Error>> {
    port.parse::<u16>()
        .map_err(|e| format!("Failed to parse LISTEN_PORT: {e}").into())
}

fn parse_timeout(timeout: &str) -> Result<Duration, Box<dyn std::error::Error>> {
    humantime_serde::re::humantime::parse_duration(timeout)
        .map_err(|e| format!("Failed to parse GEMINI_TIMEOUT: {e}").into())
}

fn load_from_env<F>(lookup: F) -> Result<Config, Box<dyn std::error::Error>>
where
    F: Fn(&str) -> Option<String>,
{
    let database_path = lookup("DATABASE_PATH")
        .map(PathBuf::from)
        .ok_or("DATABASE_PATH environment variable is required")?;

    let api_key =
        lookup("GEMINI_API_KEY").ok_or("GEMINI_API_KEY environment variable is required")?;

    let config = Config {
        port: DEFAULT_PORT,
        database_path,
        uploads_dir: default_uploads_dir(),
        gemini: GeminiConfig {
            api_key,
            model: default_gemini_model(),
            base_url: default_gemini_base_url(),
            timeout: None,
        },
    };

    apply_env_overrides(config, lookup)
}

fn load_from_file(path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    let contents = fs::read_to_string(path)?;
    serde_yaml::from_str(&contents).map_err(Into::into)
}

/// Environment values win over the ones read from a config file.
fn apply_env_overrides<F>(mut config: Config, lookup: F) -> Result<Config, Box<dyn std::error::Error>>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(database_path) = lookup("DATABASE_PATH") {
        config.database_path = PathBuf::from(database_path);
    }
    if let Some(port) = lookup("LISTEN_PORT") {
        config.port = parse_port(&port)?;
    }
    if let Some(uploads_dir) = lookup("UPLOADS_DIR") {
        config.uploads_dir = PathBuf::from(uploads_dir);
    }
    if let Some(api_key) = lookup("GEMINI_API_KEY") {
        config.gemini.api_key = api_key;
    }
    if let Some(model) = lookup("GEMINI_MODEL") {
        config.gemini.model = model;
    }
    if let Some(base_url) = lookup("GEMINI_BASE_URL") {
        config.gemini.base_url = base_url;
    }
    if let Some(timeout) = lookup("GEMINI_TIMEOUT") {
        config.gemini.timeout = Some(parse_timeout(&timeout)?);
    }
    Ok(config)
}

fn lookup_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

fn resolve_config<F>(config_path: &Path, lookup: F) -> Result<Config, Box<dyn std::error::Error>>
where
    F: Fn(&str) -> Option<String>,
{
    // Try env path
    if config_path.exists() {
        return apply_env_overrides(load_from_file(config_path)?, lookup);
    }

    // Fallback to config.yaml
    let default_path = Path::new("config.yaml");
    if default_path.exists() {
        tracing::warn!(
            "Config file '{}' not found, falling back to 'config.yaml'",
            config_path.display()
        );
        return apply_env_overrides(load_from_file(default_path)?, lookup);
    }

    // Fallback to environment variables
    tracing::info!(
        "No config file found, attempting to load configuration from environment variables"
    );
    match load_from_env(lookup) {
        Ok(config) => {
            tracing::info!("Successfully loaded configuration from environment variables");
            Ok(config)
        }
        Err(e) => Err(format!(
            "Config file not found and environment variables are incomplete. \
             Tried: '{}', 'config.yaml', and environment variables. \
             Error: {e}",
            config_path.display()
        )
        .into()),
    }
}

pub fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    // Retrieve env variable
    let config_path =
        env::var("NOTES_ANALYZER_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());

    resolve_config(Path::new(&config_path), lookup_env)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    fn lookup_in<'a>(vars: &'a HashMap<&'a str, &'a str>) -> impl Fn(&str) -> Option<String> + 'a {
        move |name: &str| vars.get(name).map(|value| (*value).to_string())
    }

    #[test]
    fn env_requires_database_path() {
        let vars = HashMap::from([("GEMINI_API_KEY", "key")]);
        let err = load_from_env(lookup_in(&vars)).unwrap_err();
        assert!(err.to_string().contains("DATABASE_PATH"));
    }

    #[test]
    fn env_requires_api_key() {
        let vars = HashMap::from([("DATABASE_PATH", "notes.db")]);
        let err = load_from_env(lookup_in(&vars)).unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn env_fills_defaults() {
        let vars = HashMap::from([("DATABASE_PATH", "data/notes.db"), ("GEMINI_API_KEY", "key")]);
        let config = load_from_env(lookup_in(&vars)).unwrap();

        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.database_path, PathBuf::from("data/notes.db"));
        assert_eq!(config.uploads_dir, PathBuf::from(DEFAULT_UPLOADS_DIR));
        assert_eq!(config.gemini.api_key, "key");
        assert_eq!(config.gemini.model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.gemini.base_url, DEFAULT_GEMINI_BASE_URL);
        assert!(config.gemini.timeout.is_none());
    }

    #[test]
    fn env_parses_port_and_timeout() {
        let vars = HashMap::from([
            ("DATABASE_PATH", "notes.db"),
            ("GEMINI_API_KEY", "key"),
            ("LISTEN_PORT", "9000"),
            ("GEMINI_TIMEOUT", "30s"),
        ]);
        let config = load_from_env(lookup_in(&vars)).unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.gemini.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn env_rejects_bad_port() {
        let vars = HashMap::from([
            ("DATABASE_PATH", "notes.db"),
            ("GEMINI_API_KEY", "key"),
            ("LISTEN_PORT", "eighty"),
        ]);
        assert!(load_from_env(lookup_in(&vars)).is_err());
    }

    fn write_config(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join("config.yaml");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn yaml_config_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "database_path: notes.db\n\
             gemini:\n  api_key: from-file\n  timeout: 2m\n",
        );

        let config = resolve_config(&path, |_| None).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.database_path, PathBuf::from("notes.db"));
        assert_eq!(config.gemini.api_key, "from-file");
        assert_eq!(config.gemini.timeout, Some(Duration::from_secs(120)));
    }

    #[test]
    fn env_overrides_every_file_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "port: 7000\n\
             database_path: file.db\n\
             uploads_dir: file-uploads\n\
             gemini:\n  api_key: from-file\n  model: file-model\n  base_url: http://file\n",
        );
        let vars = HashMap::from([
            ("DATABASE_PATH", "/tmp/env.db"),
            ("LISTEN_PORT", "9100"),
            ("UPLOADS_DIR", "env-uploads"),
            ("GEMINI_API_KEY", "from-env"),
            ("GEMINI_MODEL", "env-model"),
            ("GEMINI_BASE_URL", "http://env"),
            ("GEMINI_TIMEOUT", "5s"),
        ]);

        let config = resolve_config(&path, lookup_in(&vars)).unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/env.db"));
        assert_eq!(config.port, 9100);
        assert_eq!(config.uploads_dir, PathBuf::from("env-uploads"));
        assert_eq!(config.gemini.api_key, "from-env");
        assert_eq!(config.gemini.model, "env-model");
        assert_eq!(config.gemini.base_url, "http://env");
        assert_eq!(config.gemini.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn env_override_with_bad_port_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "database_path: notes.db\ngemini: {}\n");
        let vars = HashMap::from([("LISTEN_PORT", "x")]);

        assert!(resolve_config(&path, lookup_in(&vars)).is_err());
    }

    #[test]
    fn missing_file_falls_back_to_env() {
        let dir = tempfile::tempdir().unwrap();
        let vars = HashMap::from([
            ("DATABASE_PATH", "/tmp/from-env.db"),
            ("GEMINI_API_KEY", "key"),
        ]);

        let config = resolve_config(&dir.path().join("absent.yaml"), lookup_in(&vars)).unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/from-env.db"));
        assert_eq!(config.gemini.api_key, "key");
    }

    #[test]
    fn missing_file_without_api_key_fails() {
        let dir = tempfile::tempdir().unwrap();
        let vars = HashMap::from([("DATABASE_PATH", "/tmp/from-env.db")]);

        let err = resolve_config(&dir.path().join("absent.yaml"), lookup_in(&vars)).unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn shipped_example_has_no_usable_key() {
        let example = Path::new(env!("CARGO_MANIFEST_DIR")).join("config.example.yaml");

        let config = load_from_file(&example).unwrap();
        assert!(config.gemini.api_key.is_empty());
        assert!(crate::gemini::GeminiClient::new(&config.gemini).is_err());
    }

    #[test]
    fn debug_output_hides_api_key() {
        let config = GeminiConfig {
            api_key: "secret".to_string(),
            model: default_gemini_model(),
            base_url: default_gemini_base_url(),
            timeout: None,
        };
        assert!(!format!("{config:?}").contains("secret"));
    }
}
