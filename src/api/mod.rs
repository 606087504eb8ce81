pub mod dashboard;
pub mod metrics;
pub mod process;

pub use dashboard::dashboard;
pub use metrics::get_metrics;
pub use process::{add_process, delete_process, get_status, list_processes};

use actix_web::{web, HttpResponse, Responder};

use crate::state::AppState;

pub async fn health(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "sampler_running": data.is_running(),
        "sampling_interval_secs": data.sampling_interval().as_secs()
    }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/dashboard", web::get().to(dashboard))
        .route("/status", web::get().to(get_status))
        .route("/processes", web::get().to(list_processes))
        .route("/add_process", web::post().to(add_process))
        .route("/delete_process", web::delete().to(delete_process))
        .route("/metrics", web::get().to(get_metrics))
        .route("/health", web::get().to(health));
}
