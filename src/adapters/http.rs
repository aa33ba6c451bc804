use crate::core::job::{JobParameters, JobSequence};
use actix_web::{dev::Server, get, web, App, HttpResponse, HttpServer, Responder};
use std::sync::Arc;

/// Body returned once a triggered run has completed.
pub const SUCCESS_TOKEN: &str = "done";

pub struct TriggerState {
    pub job: Arc<JobSequence>,
}

impl TriggerState {
    pub fn new(job: Arc<JobSequence>) -> Self {
        Self { job }
    }
}

/// Runs the whole job and answers when it has finished.
///
/// The run lives on its own task, so a client that disconnects early does
/// not cancel it half-way.
#[get("/batch-processor/")]
async fn trigger(state: web::Data<TriggerState>) -> impl Responder {
    let parameters = JobParameters::now();
    tracing::info!(
        "📨 Trigger received for '{}' (run token {})",
        state.job.name(),
        parameters.run_token
    );

    let job = Arc::clone(&state.job);
    let handle = actix_web::rt::spawn(async move { job.run(parameters).await });

    match handle.await {
        Ok(Ok(_)) => HttpResponse::Ok().body(SUCCESS_TOKEN),
        Ok(Err(e)) if e.is_rejection() => HttpResponse::Conflict().body(e.to_string()),
        Ok(Err(e)) => HttpResponse::InternalServerError().body(e.to_string()),
        Err(e) => {
            tracing::error!("❌ Job task for '{}' aborted: {}", state.job.name(), e);
            HttpResponse::InternalServerError().body("job task aborted")
        }
    }
}

#[get("/batch-processor/status")]
async fn status(state: web::Data<TriggerState>) -> impl Responder {
    match state.job.registry().latest(state.job.name()) {
        Some(execution) => HttpResponse::Ok().json(execution),
        None => HttpResponse::NotFound().body("no run yet"),
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(trigger).service(status);
}

pub fn start_server(state: TriggerState, bind: (String, u16)) -> std::io::Result<Server> {
    let state = web::Data::new(state);

    tracing::info!("🌐 Listening on http://{}:{}/batch-processor/", bind.0, bind.1);
    let server = HttpServer::new(move || App::new().app_data(state.clone()).configure(configure))
        .bind(bind)?
        .run();

    Ok(server)
}
