use actix_web::{web, HttpResponse, Responder};

use crate::metrics::METRICS;
use crate::state::AppState;

pub async fn get_metrics(data: web::Data<AppState>) -> impl Responder {
    // 每次抓取时从最新状态表重建 metrics，已移除的进程不会残留
    match METRICS.update_and_render(&data.get_status()) {
        Ok(metrics_text) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(metrics_text),
        Err(e) => {
            log::error!("Failed to render metrics: {}", e);
            HttpResponse::InternalServerError().body("Failed to render metrics")
        }
    }
}
