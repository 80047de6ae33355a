use system::image::ImageError;
use system::SystemError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    System(#[from] SystemError),

    #[error("could not encode canvas: {0}")]
    Image(#[from] ImageError),

    #[error("invalid brush: {0}")]
    InvalidBrush(String),

    /// The relay answered a save request with `saveFailed`.
    #[error("save rejected by relay: {0}")]
    SaveRejected(String),

    #[error("painter task stopped")]
    PainterStopped,

    #[error("disconnected from relay")]
    Disconnected,
}
