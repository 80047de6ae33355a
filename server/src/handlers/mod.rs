use crate::handlers::boards::configure_board_handlers;
use crate::handlers::status::configure_status_handlers;
use actix_web::web;

mod boards;
mod status;

pub fn root(cfg: &mut web::ServiceConfig) {
    configure_status_handlers(cfg);
    configure_board_handlers(cfg);
}
