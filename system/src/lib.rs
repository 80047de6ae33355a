pub extern crate euclid;
pub extern crate image;
pub extern crate serde;
pub extern crate serde_json;

mod bulk;
mod canvas;
mod codec;
mod connection;
mod error;
mod message;
mod replay;

pub use bulk::{receive_bulk, send_bulk, READ_CHUNK_SIZE};
pub use canvas::{Canvas, DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH};
pub use codec::{decode, encode};
pub use connection::{MessageReader, MessageWriter, MAX_MESSAGE_BYTES};
pub use error::{Result, SystemError};
pub use message::*;
pub use replay::StrokeReplay;

/// PNG file signature.
pub const PNG_SIGNATURE: [u8; 8] = *b"\x89PNG\r\n\x1a\n";

pub fn is_png(bytes: &[u8]) -> bool {
    bytes.starts_with(&PNG_SIGNATURE)
}
