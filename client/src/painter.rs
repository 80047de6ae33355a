use std::path::PathBuf;

use system::image::ImageResult;
use system::{Canvas, StrokeReplay, StrokeSegment};
use tokio::sync::mpsc::{channel, Sender};
use tokio::sync::oneshot;

use crate::error::ClientError;

const PAINTER_QUEUE: usize = 1024;

pub enum PainterCommand {
    Apply(StrokeSegment),
    EncodePng {
        tx: oneshot::Sender<ImageResult<Vec<u8>>>,
    },
    Export {
        path: PathBuf,
        tx: oneshot::Sender<ImageResult<()>>,
    },
    Snapshot {
        tx: oneshot::Sender<Canvas>,
    },
}

pub type PainterTx = Sender<PainterCommand>;

/// Moves `canvas` into its own task. Local input and received strokes both
/// reach it through the returned sender, so they are applied one at a time
/// in arrival order.
pub fn spawn_painter(mut canvas: Canvas) -> PainterTx {
    let (tx, mut rx) = channel::<PainterCommand>(PAINTER_QUEUE);

    tokio::spawn(async move {
        while let Some(command) = rx.recv().await {
            match command {
                PainterCommand::Apply(segment) => canvas.apply(&segment),
                PainterCommand::EncodePng { tx } => {
                    let _ = tx.send(canvas.to_png());
                }
                PainterCommand::Export { path, tx } => {
                    log::info!("Exporting canvas to {}", path.display());
                    let _ = tx.send(canvas.export(&path));
                }
                PainterCommand::Snapshot { tx } => {
                    let _ = tx.send(canvas.clone());
                }
            }
        }
        log::debug!("Painter stopped");
    });

    tx
}

/// Handle used by the rest of the client to reach the painter task.
#[derive(Clone)]
pub struct Painter {
    tx: PainterTx,
}

impl Painter {
    pub fn spawn(canvas: Canvas) -> Self {
        Self {
            tx: spawn_painter(canvas),
        }
    }

    pub async fn apply(&self, segment: StrokeSegment) -> Result<(), ClientError> {
        self.tx
            .send(PainterCommand::Apply(segment))
            .await
            .map_err(|_| ClientError::PainterStopped)
    }

    pub async fn encode_png(&self) -> Result<Vec<u8>, ClientError> {
        let (tx, rx) = oneshot::channel();
        self.request(PainterCommand::EncodePng { tx }, rx)
            .await?
            .map_err(ClientError::from)
    }

    pub async fn export(&self, path: PathBuf) -> Result<(), ClientError> {
        let (tx, rx) = oneshot::channel();
        self.request(PainterCommand::Export { path, tx }, rx)
            .await?
            .map_err(ClientError::from)
    }

    /// A copy of the canvas with every command queued so far applied.
    pub async fn snapshot(&self) -> Result<Canvas, ClientError> {
        let (tx, rx) = oneshot::channel();
        self.request(PainterCommand::Snapshot { tx }, rx).await
    }

    async fn request<T>(
        &self,
        command: PainterCommand,
        rx: oneshot::Receiver<T>,
    ) -> Result<T, ClientError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| ClientError::PainterStopped)?;
        rx.await.map_err(|_| ClientError::PainterStopped)
    }
}
