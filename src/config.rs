use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::filter::FilterCriteria;
use crate::persist::OutputFormat;

pub const USERNAME_ENV: &str = "NEXTBUS_USERNAME";
pub const PASSWORD_ENV: &str = "NEXTBUS_PASSWORD";

/// HTTP Basic credentials for the feed provider.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// A group of trip prefixes shown together by the departure board.
#[derive(Debug, Clone, Deserialize)]
pub struct LineConfig {
    pub tag: String,
    pub name: String,
    pub prefixes: Vec<String>,
}

/// Settings for the `next` query.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DepartureConfig {
    pub stop_id: String,
    pub limit: usize,
    pub lines: Vec<LineConfig>,
}

impl Default for DepartureConfig {
    fn default() -> Self {
        DepartureConfig {
            stop_id: "2010".to_string(),
            limit: 3,
            lines: vec![
                LineConfig {
                    tag: "86".to_string(),
                    name: "86 - Gorge de Loup".to_string(),
                    prefixes: vec!["86A_18_2_040AM".to_string()],
                },
                LineConfig {
                    tag: "5".to_string(),
                    name: "5 - Pont Mouton".to_string(),
                    prefixes: vec!["5A_34_2_046AB".to_string()],
                },
            ],
        }
    }
}

/// Resolved feed configuration.
///
/// Every field has a default, so a config file only needs the keys it
/// changes:
/// ```json
/// {
///   "stop_ids": ["2010"],
///   "output": "~/goinfre/stop_times.csv",
///   "format": "csv"
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub url: String,
    pub member: String,
    pub credentials: Option<Credentials>,
    pub stop_ids: Vec<String>,
    pub trip_prefixes: Vec<String>,
    pub normalize_trip_ids: bool,
    pub output: PathBuf,
    pub format: OutputFormat,
    pub departures: DepartureConfig,
}

impl Default for FeedConfig {
    fn default() -> Self {
        FeedConfig {
            url: "https://download.data.grandlyon.com/files/rdata/tcl_sytral.tcltheorique/GTFS_TCL.ZIP"
                .to_string(),
            member: "stop_times.txt".to_string(),
            credentials: None,
            stop_ids: vec!["2010".to_string(), "2011".to_string()],
            trip_prefixes: vec![
                "5A_34_1_046AB".to_string(),
                "5A_34_2_046AB".to_string(),
                "86A_18_1_040AM".to_string(),
                "86A_18_2_040AM".to_string(),
            ],
            normalize_trip_ids: true,
            output: PathBuf::from("~/goinfre/stop_times.json"),
            format: OutputFormat::Json,
            departures: DepartureConfig::default(),
        }
    }
}

impl FeedConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("invalid config {}", path.display()))
    }

    /// Replaces the credentials with the ones found through `lookup`.
    ///
    /// Both username and password must be present for the override to apply.
    pub fn with_env_credentials<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let (Some(username), Some(password)) = (lookup(USERNAME_ENV), lookup(PASSWORD_ENV)) {
            self.credentials = Some(Credentials { username, password });
        }
        self
    }

    /// The output path with a leading `~` expanded.
    pub fn output_path(&self) -> PathBuf {
        expand_home(&self.output)
    }

    pub fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            stop_ids: self.stop_ids.iter().cloned().collect(),
            trip_prefixes: self.trip_prefixes.clone(),
            normalize_trip_ids: self.normalize_trip_ids,
        }
    }
}

/// Replaces a leading `~` component with the user's home directory.
///
/// Paths are returned unchanged when no home directory is known.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::env;
    use std::fs;

    #[test]
    fn test_defaults_describe_built_in_feed() {
        let config = FeedConfig::default();
        assert_eq!(config.member, "stop_times.txt");
        assert_eq!(config.format, OutputFormat::Json);
        assert!(config.credentials.is_none());
        assert_eq!(config.departures.limit, 3);

        let criteria = config.criteria();
        assert!(criteria.stop_ids.contains("2011"));
        assert_eq!(criteria.trip_prefixes[0], "5A_34_1_046AB");
        assert!(criteria.normalize_trip_ids);
    }

    #[test]
    fn test_load_partial_file() {
        let path = env::temp_dir().join("nextbus_test_config_partial.json");
        fs::write(
            &path,
            r#"{"stop_ids": ["42"], "format": "csv", "departures": {"stop_id": "42"}}"#,
        )
        .unwrap();

        let config = FeedConfig::load(&path).unwrap();

        assert_eq!(config.stop_ids, vec!["42".to_string()]);
        assert_eq!(config.format, OutputFormat::Csv);
        assert_eq!(config.departures.stop_id, "42");
        assert_eq!(config.departures.lines.len(), 2);
        assert_eq!(config.trip_prefixes.len(), 4);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_rejects_bad_format() {
        let path = env::temp_dir().join("nextbus_test_config_bad.json");
        fs::write(&path, r#"{"format": "xml"}"#).unwrap();

        assert!(FeedConfig::load(&path).is_err());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_env_credentials_need_both_values() {
        let vars: HashMap<&str, &str> = [(USERNAME_ENV, "demo")].into_iter().collect();
        let config =
            FeedConfig::default().with_env_credentials(|k| vars.get(k).map(|v| v.to_string()));
        assert!(config.credentials.is_none());

        let vars: HashMap<&str, &str> =
            [(USERNAME_ENV, "demo"), (PASSWORD_ENV, "secret")].into_iter().collect();
        let config =
            FeedConfig::default().with_env_credentials(|k| vars.get(k).map(|v| v.to_string()));
        let creds = config.credentials.unwrap();
        assert_eq!(creds.username, "demo");
        assert_eq!(creds.password, "secret");
        assert!(!format!("{creds:?}").contains("secret"));
    }

    #[test]
    fn test_expand_home() {
        let plain = Path::new("/var/tmp/stop_times.json");
        assert_eq!(expand_home(plain), plain.to_path_buf());

        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                expand_home(Path::new("~/goinfre/stop_times.json")),
                home.join("goinfre/stop_times.json")
            );
        }
    }
}
