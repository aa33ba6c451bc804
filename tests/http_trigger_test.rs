use actix_web::{http::StatusCode, test, web, App};
use async_trait::async_trait;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Notify;
use user_batch::adapters::http::{configure, TriggerState, SUCCESS_TOKEN};
use user_batch::core::job::{JobPhase, JobStep};
use user_batch::core::step::StepReport;
use user_batch::{
    build_user_transfer_job, BatchContext, JobParameters, JobSequence, JobState, RunRegistry,
    UserTable,
};

async fn trigger_state(dir: &TempDir, with_input: bool) -> TriggerState {
    let input_path = dir.path().join("people.csv");
    if with_input {
        std::fs::write(
            &input_path,
            "id,userId,firstName,lastName,sex,email,phone,dateOfBirth,jobTitle\n\
             ,u1,Ann,Lee,F,ann@x.com,555,1990-01-01,Eng\n\
             ,u2,Bob,Ray,M,bob@x.com,556,1991-02-02,Ops\n",
        )
        .unwrap();
    }

    let table = UserTable::connect("sqlite::memory:").await.unwrap();
    let context = BatchContext::new(table, input_path, dir.path().join("export.csv"));
    let job = build_user_transfer_job("user-job", context, RunRegistry::new());
    TriggerState::new(Arc::new(job))
}

#[actix_web::test]
async fn test_trigger_returns_done_after_full_run() {
    let dir = TempDir::new().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(trigger_state(&dir, true).await))
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::get().uri("/batch-processor/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    assert_eq!(body, SUCCESS_TOKEN.as_bytes());

    let exported = std::fs::read_to_string(dir.path().join("export.csv")).unwrap();
    assert_eq!(exported.lines().count(), 3);
    assert!(exported.contains("2,u2,Bob,Ray,M,bob@x.com,556,1991-02-02,Ops"));
}

#[actix_web::test]
async fn test_status_reports_latest_execution() {
    let dir = TempDir::new().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(trigger_state(&dir, true).await))
            .configure(configure),
    )
    .await;

    let before = test::call_service(
        &app,
        test::TestRequest::get().uri("/batch-processor/status").to_request(),
    )
    .await;
    assert_eq!(before.status(), StatusCode::NOT_FOUND);

    test::call_service(
        &app,
        test::TestRequest::get().uri("/batch-processor/").to_request(),
    )
    .await;

    let status: serde_json::Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/batch-processor/status").to_request(),
    )
    .await;
    assert_eq!(status["state"], "COMPLETED");
    assert_eq!(status["steps"][0]["step_name"], "csv-to-table");
    assert_eq!(status["steps"][0]["write_count"], 2);
    assert_eq!(status["steps"][1]["step_name"], "table-to-csv");
}

#[actix_web::test]
async fn test_trigger_surfaces_failure() {
    let dir = TempDir::new().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(trigger_state(&dir, false).await))
            .configure(configure),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/batch-processor/").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = test::read_body(resp).await;
    assert_ne!(body, SUCCESS_TOKEN.as_bytes());
    assert!(!dir.path().join("export.csv").exists());
}

/// Step that holds the run open until released.
struct HeldStep {
    phase: JobPhase,
    started: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl JobStep for HeldStep {
    fn name(&self) -> &str {
        "held"
    }

    fn phase(&self) -> JobPhase {
        self.phase
    }

    async fn execute(&self) -> user_batch::Result<StepReport> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(StepReport {
            step_name: "held".to_string(),
            read_count: 0,
            write_count: 0,
            chunk_count: 0,
            duration_ms: 0,
        })
    }
}

#[actix_web::test]
async fn test_trigger_while_running_is_conflict() {
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    // 匯出步驟不需等待
    let export_release = Arc::new(Notify::new());
    export_release.notify_one();
    let job = Arc::new(
        JobSequence::new("user-job", RunRegistry::new())
            .with_step(Box::new(HeldStep {
                phase: JobPhase::Load,
                started: started.clone(),
                release: release.clone(),
            }))
            .with_step(Box::new(HeldStep {
                phase: JobPhase::Export,
                started: Arc::new(Notify::new()),
                release: export_release,
            })),
    );

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(TriggerState::new(job.clone())))
            .configure(configure),
    )
    .await;

    let background = {
        let job = job.clone();
        actix_web::rt::spawn(async move { job.run(JobParameters::new(1)).await })
    };
    started.notified().await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/batch-processor/").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body = test::read_body(resp).await;
    assert!(String::from_utf8_lossy(&body).contains("already running"));

    release.notify_one();
    let first = background.await.unwrap().unwrap();
    assert_eq!(first.state, JobState::Completed);
}
