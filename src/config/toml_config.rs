use crate::utils::error::{BatchError, Result};
use crate::utils::validation::{
    validate_database_url, validate_distinct_paths, validate_non_empty_string, validate_path,
    validate_port, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub job: JobConfig,
    pub files: FilesConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    pub name: String,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            name: "user-job".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    pub input_path: String,
    pub output_path: String,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            input_path: "data/people.csv".to_string(),
            output_path: "data/export.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://data/users.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| BatchError::ConfigError {
            message: format!("cannot read {}: {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置，先替換 ${VAR} 環境變數
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = substitute_env_vars(content)?;

        toml::from_str(&processed).map_err(|e| BatchError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Reads `USER_BATCH_*` variables, falling back to the defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let port = match env::var("USER_BATCH_PORT") {
            Ok(raw) => raw.parse::<u16>().map_err(|e| BatchError::InvalidConfigValue {
                field: "USER_BATCH_PORT".to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            Err(_) => defaults.server.port,
        };

        Ok(Self {
            job: JobConfig {
                name: env::var("USER_BATCH_JOB_NAME").unwrap_or(defaults.job.name),
            },
            files: FilesConfig {
                input_path: env::var("USER_BATCH_INPUT").unwrap_or(defaults.files.input_path),
                output_path: env::var("USER_BATCH_OUTPUT").unwrap_or(defaults.files.output_path),
            },
            database: DatabaseConfig {
                url: env::var("USER_BATCH_DATABASE_URL").unwrap_or(defaults.database.url),
            },
            server: ServerConfig {
                host: env::var("USER_BATCH_HOST").unwrap_or(defaults.server.host),
                port,
            },
        })
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.server.host.clone(), self.server.port)
    }
}

/// 替換環境變數 (例如 ${DATA_DIR})，未定義的變數保留原樣
fn substitute_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| BatchError::ConfigError {
        message: format!("invalid substitution pattern: {}", e),
    })?;

    let result = re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    });

    Ok(result.into_owned())
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("job.name", &self.job.name)?;
        validate_path("files.input_path", &self.files.input_path)?;
        validate_path("files.output_path", &self.files.output_path)?;
        validate_distinct_paths(
            "files.output_path",
            &self.files.input_path,
            &self.files.output_path,
        )?;
        validate_database_url("database.url", &self.database.url)?;
        validate_non_empty_string("server.host", &self.server.host)?;
        validate_port("server.port", self.server.port)?;

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }
}
