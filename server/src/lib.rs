pub extern crate actix_web;

pub mod config;
pub mod handlers;
pub mod registry;
pub mod server;
pub mod session;
pub mod storage;
