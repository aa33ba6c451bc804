pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::{Cli, Command};

pub use adapters::table::UserTable;
pub use app::context::BatchContext;
pub use app::user_transfer::build_user_transfer_job;
pub use config::AppConfig;
pub use crate::core::job::{JobExecution, JobParameters, JobSequence, JobState};
pub use crate::core::registry::RunRegistry;
pub use domain::model::UserRecord;
pub use utils::error::{BatchError, Result};
