pub mod config;
pub mod error;
pub mod input;
pub mod painter;
pub mod session;

pub use error::ClientError;
pub use session::Whiteboard;
