use crate::utils::error::Result;
use async_trait::async_trait;

/// Lazy, finite source of items. `Ok(None)` signals exhaustion.
#[async_trait]
pub trait ItemReader<T>: Send {
    async fn read(&mut self) -> Result<Option<T>>;
}

/// Sink receiving one item at a time. Shared by concurrent units of work,
/// hence `&self`.
#[async_trait]
pub trait ItemWriter<T>: Send + Sync {
    async fn write(&self, item: T) -> Result<()>;

    /// Called once a chunk has been fully written.
    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}
