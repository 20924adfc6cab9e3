use anyhow::Result;
use clap::Parser;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "catalog")]
#[command(about = "Runs the book catalog service", long_about = None)]
pub struct Cli {
    #[arg(short = 'c', long = "config")]
    pub config_path: Option<String>,
}

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".catalog")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct App {
    database: String,
    port: u16,
    pub default_per_page: u32,
    /// Upper bound on `per_page`. Unset means list requests are not capped.
    pub max_per_page: Option<u32>,
    pub seed_sample_data: bool,
}

impl Default for App {
    fn default() -> Self {
        App {
            database: "catalog.db".to_owned(),
            port: 5000,
            default_per_page: 5,
            max_per_page: None,
            seed_sample_data: true,
        }
    }
}

impl App {
    pub fn get_db(&self) -> &str {
        &self.database
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub app: App,
}

impl Config {
    pub fn new(path: &str) -> Result<Self> {
        let yaml_str = fs::read_to_string(path)?;
        let cfg = Config::from_yaml(&yaml_str)?;
        Ok(cfg)
    }

    pub fn from_yaml(yaml_str: &str) -> Result<Self> {
        let yaml_with_env = Config::substitute_env_vars(yaml_str);
        let mut config: Config = serde_yaml::from_str(&yaml_with_env)?;
        config.normalize();
        Ok(config)
    }

    fn normalize(&mut self) {
        let defaults = App::default();
        if self.app.default_per_page == 0 {
            self.app.default_per_page = defaults.default_per_page;
        }
        if let Some(max) = self.app.max_per_page {
            self.app.max_per_page = Some(max.max(self.app.default_per_page));
        }
    }

    /// Expands `${VAR}` and `${VAR:-default}` references. An unset variable
    /// without a default expands to an empty string.
    fn substitute_env_vars(yaml_str: &str) -> String {
        let mut result = yaml_str.to_string();
        let mut offset = 0;

        while let Some(start) = result[offset..].find("${") {
            let actual_start = offset + start;
            let Some(end) = result[actual_start..].find('}') else {
                break;
            };
            let reference = &result[actual_start + 2..actual_start + end];

            let env_value = match reference.split_once(":-") {
                Some((var, default_val)) => env::var(var).unwrap_or_else(|_| default_val.to_string()),
                None => env::var(reference).unwrap_or_else(|_| {
                    tracing::warn!("environment variable '{}' not found", reference);
                    String::new()
                }),
            };

            result.replace_range(actual_start..actual_start + end + 1, &env_value);
            offset = actual_start + env_value.len();
        }

        result
    }
}
