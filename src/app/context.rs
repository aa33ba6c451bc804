use crate::adapters::table::UserTable;
use crate::config::AppConfig;
use crate::utils::error::Result;
use std::path::PathBuf;

/// Everything the transfer steps need, built once and passed in explicitly.
#[derive(Debug, Clone)]
pub struct BatchContext {
    pub table: UserTable,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
}

impl BatchContext {
    pub fn new(table: UserTable, input_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            table,
            input_path: input_path.into(),
            output_path: output_path.into(),
        }
    }

    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let table = UserTable::connect(&config.database.url).await?;
        Ok(Self::new(
            table,
            &config.files.input_path,
            &config.files.output_path,
        ))
    }
}
