use crate::adapters::csv_file::{CsvFileReader, CsvFileWriter};
use crate::adapters::table::{TablePageReader, TableWriter, EXPORT_PAGE_SIZE};
use crate::app::context::BatchContext;
use crate::core::job::{JobPhase, JobSequence, JobStep};
use crate::core::registry::RunRegistry;
use crate::core::step::{ChunkStep, StepReport};
use crate::domain::model::{ColumnLayout, UserRecord, EXPORT_HEADER, INPUT_COLUMNS};
use crate::utils::error::Result;
use async_trait::async_trait;

pub const LOAD_CHUNK_SIZE: usize = 10;
pub const EXPORT_CHUNK_SIZE: usize = 1;

/// CSV 檔案 → user_tb
pub struct CsvToTableLoader {
    context: BatchContext,
    step: ChunkStep<UserRecord>,
}

impl CsvToTableLoader {
    pub fn new(context: BatchContext) -> Self {
        Self {
            context,
            step: ChunkStep::new("csv-to-table", LOAD_CHUNK_SIZE),
        }
    }
}

#[async_trait]
impl JobStep for CsvToTableLoader {
    fn name(&self) -> &str {
        self.step.name()
    }

    fn phase(&self) -> JobPhase {
        JobPhase::Load
    }

    async fn execute(&self) -> Result<StepReport> {
        let layout = ColumnLayout::new(&INPUT_COLUMNS)?;
        let mut reader = CsvFileReader::open(&self.context.input_path, layout)?;
        let writer = TableWriter::new(self.context.table.clone());

        let report = self.step.execute(&mut reader, &writer).await?;
        let stored = self.context.table.count().await?;
        tracing::info!(
            "📥 Loaded {} rows from {} (table now holds {})",
            report.write_count,
            self.context.input_path.display(),
            stored
        );
        Ok(report)
    }
}

/// user_tb → CSV 檔案
pub struct TableToCsvExporter {
    context: BatchContext,
    step: ChunkStep<UserRecord>,
}

impl TableToCsvExporter {
    pub fn new(context: BatchContext) -> Self {
        Self {
            context,
            step: ChunkStep::new("table-to-csv", EXPORT_CHUNK_SIZE),
        }
    }
}

#[async_trait]
impl JobStep for TableToCsvExporter {
    fn name(&self) -> &str {
        self.step.name()
    }

    fn phase(&self) -> JobPhase {
        JobPhase::Export
    }

    async fn execute(&self) -> Result<StepReport> {
        let mut reader = TablePageReader::new(self.context.table.clone(), EXPORT_PAGE_SIZE);
        let writer = CsvFileWriter::create(
            &self.context.output_path,
            &EXPORT_HEADER,
            ColumnLayout::standard(),
        )?;

        let report = self.step.execute(&mut reader, &writer).await?;
        tracing::info!(
            "📤 Exported {} rows to {}",
            report.write_count,
            writer.path().display()
        );
        Ok(report)
    }
}

/// Load, then export, under one job name.
pub fn build_user_transfer_job(
    job_name: &str,
    context: BatchContext,
    registry: RunRegistry,
) -> JobSequence {
    JobSequence::new(job_name, registry)
        .with_step(Box::new(CsvToTableLoader::new(context.clone())))
        .with_step(Box::new(TableToCsvExporter::new(context)))
}
