use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use user_batch::adapters::http::{start_server, TriggerState};
use user_batch::utils::error::ErrorCategory;
use user_batch::utils::{logger, validation::Validate};
use user_batch::{
    build_user_transfer_job, AppConfig, BatchContext, Cli, Command, JobParameters, RunRegistry,
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 初始化日誌
    logger::init_logger(cli.verbose, cli.log_json);
    tracing::info!("Starting user-batch");

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            AppConfig::from_file(path).with_context(|| format!("failed to load config file '{}'", path))?
        }
        None => AppConfig::from_env().context("failed to read configuration from environment")?,
    };
    if cli.verbose {
        tracing::debug!("Config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    let context = BatchContext::from_config(&config)
        .await
        .context("failed to open the user table")?;
    let job = Arc::new(build_user_transfer_job(
        &config.job.name,
        context,
        RunRegistry::new(),
    ));

    match cli.command {
        Command::Serve => {
            start_server(TriggerState::new(job), config.bind_address())?.await?;
        }
        Command::Run => match job.run(JobParameters::now()).await {
            Ok(execution) => {
                println!("✅ Job '{}' completed", execution.job_name);
                println!("{}", serde_json::to_string_pretty(&execution.summary())?);
            }
            Err(e) => {
                tracing::error!("❌ Job failed: {} (Category: {:?})", e, e.category());
                eprintln!("❌ {}", e);
                std::process::exit(exit_code(e.category()));
            }
        },
    }

    Ok(())
}

fn exit_code(category: ErrorCategory) -> i32 {
    match category {
        ErrorCategory::Config => 1,
        ErrorCategory::Input | ErrorCategory::Transform => 2,
        ErrorCategory::Persistence | ErrorCategory::Io => 3,
        ErrorCategory::Conflict => 4,
    }
}
