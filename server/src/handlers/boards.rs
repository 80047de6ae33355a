use crate::registry::Registry;
use crate::storage::is_valid_name;
use actix_web::{error, web, HttpResponse, Responder};
use std::sync::Arc;
use system::serde_json::json;

pub fn configure_board_handlers(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/boards").route(web::get().to(list)))
        .service(web::resource("/boards/{name}").route(web::get().to(show)));
}

async fn list(registry: web::Data<Arc<Registry>>) -> Result<impl Responder, error::Error> {
    let names = registry.store().list().await.map_err(|err| {
        log::warn!("Listing saved boards failed: {}", err);
        error::ErrorInternalServerError("Internal Server Error")
    })?;
    Ok(HttpResponse::Ok().json(json!(names)))
}

async fn show(
    registry: web::Data<Arc<Registry>>,
    name: web::Path<String>,
) -> Result<impl Responder, error::Error> {
    let name = name.into_inner();
    if !is_valid_name(&name) {
        return Err(error::ErrorBadRequest("invalid board name"));
    }
    let bytes = registry
        .store()
        .load(&name)
        .await
        .map_err(|err| {
            log::warn!("Loading saved board {} failed: {}", name, err);
            error::ErrorInternalServerError("Internal Server Error")
        })?
        .ok_or_else(|| error::ErrorNotFound("no such board"))?;
    Ok(HttpResponse::Ok().content_type("image/png").body(bytes))
}
