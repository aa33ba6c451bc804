use crate::domain::ports::{ItemReader, ItemWriter};
use crate::utils::error::{BatchError, Result};
use futures::stream::{self, TryStreamExt};
use serde::Serialize;
use std::time::Instant;

/// Ceiling on concurrent writes inside a chunk.
pub const MAX_WRITE_CONCURRENCY: usize = 10;

/// Per-item transform applied between read and write.
pub type ItemTransform<T> = fn(T) -> Result<T>;

/// Pass-through transform used by both transfer directions.
pub fn identity<T>(item: T) -> Result<T> {
    Ok(item)
}

/// Step 執行結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub step_name: String,
    pub read_count: usize,
    pub write_count: usize,
    pub chunk_count: usize,
    pub duration_ms: u64,
}

/// Drives read → transform → write in fixed-size chunks.
///
/// Each chunk is pulled from the reader until it holds `chunk_size` items or
/// the reader is exhausted. The whole chunk is transformed before anything
/// is written, so a failing transform leaves that chunk unwritten. The run
/// ends on the first pull that yields no items.
///
/// Transforms run in read order on the calling task. Writes are sequential
/// and in read order unless [`with_unordered_writes`](Self::with_unordered_writes)
/// is set, in which case several writes of a chunk are in flight at once and
/// their completion order is unspecified. Chunks never overlap either way.
pub struct ChunkStep<T> {
    name: String,
    chunk_size: usize,
    write_concurrency: Option<usize>,
    transform: ItemTransform<T>,
}

impl<T: Send> ChunkStep<T> {
    pub fn new(name: impl Into<String>, chunk_size: usize) -> Self {
        Self {
            name: name.into(),
            chunk_size: chunk_size.max(1),
            write_concurrency: None,
            transform: identity::<T>,
        }
    }

    pub fn with_transform(mut self, transform: ItemTransform<T>) -> Self {
        self.transform = transform;
        self
    }

    /// Lets up to `limit` writes of a chunk run at once, capped at
    /// [`MAX_WRITE_CONCURRENCY`].
    pub fn with_unordered_writes(mut self, limit: usize) -> Self {
        self.write_concurrency = Some(limit.clamp(1, MAX_WRITE_CONCURRENCY));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn execute<R, W>(&self, reader: &mut R, writer: &W) -> Result<StepReport>
    where
        R: ItemReader<T> + ?Sized,
        W: ItemWriter<T> + ?Sized,
    {
        let started = Instant::now();
        let mut report = StepReport {
            step_name: self.name.clone(),
            read_count: 0,
            write_count: 0,
            chunk_count: 0,
            duration_ms: 0,
        };

        match self.write_concurrency {
            None => tracing::info!(
                "▶️ Step '{}' started (chunk size {}, ordered writes)",
                self.name,
                self.chunk_size
            ),
            Some(limit) => tracing::info!(
                "▶️ Step '{}' started (chunk size {}, up to {} concurrent writes)",
                self.name,
                self.chunk_size,
                limit
            ),
        }

        loop {
            let chunk = self.read_chunk(reader).await?;
            if chunk.is_empty() {
                break;
            }
            let chunk_len = chunk.len();
            report.read_count += chunk_len;

            let transformed = self.transform_chunk(chunk).map_err(|e| {
                tracing::error!(
                    "❌ Step '{}' chunk {} rejected by transform: {}",
                    self.name,
                    report.chunk_count + 1,
                    e
                );
                e
            })?;

            self.write_chunk(writer, transformed).await?;
            writer.flush().await?;

            report.write_count += chunk_len;
            report.chunk_count += 1;
            tracing::debug!(
                "📦 Step '{}' chunk {} committed ({} items)",
                self.name,
                report.chunk_count,
                chunk_len
            );
        }

        report.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::info!(
            "✅ Step '{}' finished (read: {}, written: {}, chunks: {}, {} ms)",
            report.step_name,
            report.read_count,
            report.write_count,
            report.chunk_count,
            report.duration_ms
        );

        Ok(report)
    }

    async fn read_chunk<R>(&self, reader: &mut R) -> Result<Vec<T>>
    where
        R: ItemReader<T> + ?Sized,
    {
        let mut chunk = Vec::with_capacity(self.chunk_size);
        while chunk.len() < self.chunk_size {
            match reader.read().await? {
                Some(item) => chunk.push(item),
                None => break,
            }
        }
        Ok(chunk)
    }

    fn transform_chunk(&self, chunk: Vec<T>) -> Result<Vec<T>> {
        chunk.into_iter().map(self.transform).collect()
    }

    async fn write_chunk<W>(&self, writer: &W, items: Vec<T>) -> Result<()>
    where
        W: ItemWriter<T> + ?Sized,
    {
        let Some(limit) = self.write_concurrency else {
            for item in items {
                writer.write(item).await?;
            }
            return Ok(());
        };

        stream::iter(items.into_iter().map(Ok::<T, BatchError>))
            .try_for_each_concurrent(limit, |item| writer.write(item))
            .await
    }
}
