use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;

use crate::state::{AddOutcome, AppState, RemoveOutcome};

#[derive(Deserialize)]
pub struct ProcessRequest {
    pub name: String,
}

fn invalid_name(name: &str, err: impl std::fmt::Display) -> HttpResponse {
    log::warn!("Rejected process name {:?}: {}", name, err);
    HttpResponse::BadRequest().json(serde_json::json!({
        "status": "error",
        "message": err.to_string()
    }))
}

pub async fn add_process(
    data: web::Data<AppState>,
    req: web::Json<ProcessRequest>,
) -> impl Responder {
    match data.add_process(&req.name) {
        Ok(outcome) => {
            let name = req.name.trim().to_lowercase();
            let message = match outcome {
                AddOutcome::Added => format!("Process '{}' added to monitoring", name),
                AddOutcome::AlreadyMonitored => format!("Process '{}' is already being monitored", name),
            };
            HttpResponse::Ok().json(serde_json::json!({
                "status": "success",
                "outcome": outcome,
                "message": message
            }))
        }
        Err(e) => invalid_name(&req.name, e),
    }
}

pub async fn delete_process(
    data: web::Data<AppState>,
    req: web::Json<ProcessRequest>,
) -> impl Responder {
    match data.remove_process(&req.name) {
        Ok(outcome) => {
            let name = req.name.trim().to_lowercase();
            let message = match outcome {
                RemoveOutcome::Removed => format!("Process '{}' removed from monitoring", name),
                RemoveOutcome::NotMonitored => format!("Process '{}' is not being monitored", name),
            };
            HttpResponse::Ok().json(serde_json::json!({
                "status": "success",
                "outcome": outcome,
                "message": message
            }))
        }
        Err(e) => invalid_name(&req.name, e),
    }
}

pub async fn get_status(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(data.get_status())
}

pub async fn list_processes(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(data.watchlist())
}
