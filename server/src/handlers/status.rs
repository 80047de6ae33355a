use crate::registry::Registry;
use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use system::serde_json::json;

pub fn configure_status_handlers(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/status").route(web::get().to(get)));
}

async fn get(registry: web::Data<Arc<Registry>>) -> impl Responder {
    let stats = registry.stats();
    HttpResponse::Ok().json(json!({
        "sessions": registry.session_ids(),
        "registered": stats.registered,
        "unregistered": stats.unregistered,
        "broadcasts": stats.broadcasts,
        "delivered": stats.delivered,
        "saved": stats.saved,
        "failedSaves": stats.failed_saves,
    }))
}
