pub mod job;
pub mod registry;
pub mod step;

pub use crate::domain::model::UserRecord;
pub use crate::domain::ports::{ItemReader, ItemWriter};
pub use crate::utils::error::Result;
