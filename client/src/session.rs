use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use system::{
    BrushSettings, Canvas, Color, MessageReader, MessageWriter, Point, StrokeSegment,
    SystemError, WireMessage,
};
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::ClientError;
use crate::painter::Painter;

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;
type SaveOutcome = Result<String, String>;

/// Save requests waiting for the relay's answer. The relay answers them in
/// the order they were sent.
#[derive(Clone, Default)]
struct PendingSaves(Arc<Mutex<VecDeque<oneshot::Sender<SaveOutcome>>>>);

impl PendingSaves {
    fn lock(&self) -> MutexGuard<'_, VecDeque<oneshot::Sender<SaveOutcome>>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self) -> oneshot::Receiver<SaveOutcome> {
        let (tx, rx) = oneshot::channel();
        self.lock().push_back(tx);
        rx
    }

    fn complete(&self, outcome: SaveOutcome) -> Result<(), SystemError> {
        match self.lock().pop_front() {
            Some(tx) => {
                let _ = tx.send(outcome);
                Ok(())
            }
            None => Err(SystemError::ProtocolViolation(
                "save reply without a pending save".into(),
            )),
        }
    }

    fn abandon(&self) {
        self.lock().clear();
    }
}

/// One participant's view of the shared board.
pub struct Whiteboard {
    writer: Arc<MessageWriter<BoxedWriter>>,
    painter: Painter,
    pending_saves: PendingSaves,
    inbound: JoinHandle<Result<(), SystemError>>,
    color: Color,
    brush: BrushSettings,
}

impl Whiteboard {
    pub async fn connect<A: ToSocketAddrs>(addr: A, canvas: Canvas) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await.map_err(SystemError::from)?;
        if let Err(err) = stream.set_nodelay(true) {
            log::debug!("Could not set TCP_NODELAY: {}", err);
        }
        log::info!("Connected to relay at {}", stream.peer_addr().map_err(SystemError::from)?);
        let (read_half, write_half) = stream.into_split();
        Ok(Self::start(read_half, write_half, canvas))
    }

    /// Joins over an already established transport.
    pub fn start<R, W>(read_half: R, write_half: W, canvas: Canvas) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let painter = Painter::spawn(canvas);
        let pending_saves = PendingSaves::default();
        let inbound = tokio::spawn(receive_loop(
            MessageReader::new(BufReader::new(read_half)),
            painter.clone(),
            pending_saves.clone(),
        ));
        Self {
            writer: Arc::new(MessageWriter::new(Box::new(write_half) as BoxedWriter)),
            painter,
            pending_saves,
            inbound,
            color: Color::default(),
            brush: BrushSettings::default(),
        }
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn brush(&self) -> BrushSettings {
        self.brush
    }

    /// Replaces the brush for strokes drawn from now on. Strokes already
    /// sent keep the brush they were drawn with.
    pub fn set_brush(&mut self, brush: BrushSettings) -> Result<(), ClientError> {
        brush.validate().map_err(ClientError::InvalidBrush)?;
        self.brush = brush;
        Ok(())
    }

    /// Paints one segment locally with the current colour and brush, then
    /// sends it to the relay.
    pub async fn draw(&self, from: Point, to: Point) -> Result<StrokeSegment, ClientError> {
        let segment = StrokeSegment::new(from, to, self.color, self.brush);
        self.painter.apply(segment).await?;
        self.writer.send(&WireMessage::Draw(segment)).await?;
        Ok(segment)
    }

    /// Pushes the current canvas to the relay and waits for the name it was
    /// stored under.
    pub async fn save(&self) -> Result<String, ClientError> {
        let png = self.painter.encode_png().await?;
        let pending_saves = &self.pending_saves;
        let mut reply = None;
        self.writer
            .send_with_bulk_ordered(&WireMessage::Save, &png, || {
                reply = Some(pending_saves.push())
            })
            .await?;
        log::info!("Sent {} byte snapshot to relay", png.len());
        let reply = reply.ok_or(ClientError::Disconnected)?;
        match reply.await {
            Ok(Ok(name)) => Ok(name),
            Ok(Err(reason)) => Err(ClientError::SaveRejected(reason)),
            Err(_) => Err(ClientError::Disconnected),
        }
    }

    pub async fn export<P: Into<PathBuf>>(&self, path: P) -> Result<(), ClientError> {
        self.painter.export(path.into()).await
    }

    pub async fn snapshot(&self) -> Result<Canvas, ClientError> {
        self.painter.snapshot().await
    }

    pub fn is_connected(&self) -> bool {
        !self.inbound.is_finished()
    }

    /// Closes the outgoing half and waits for the relay to hang up.
    pub async fn close(self) -> Result<(), ClientError> {
        if let Err(err) = self.writer.shutdown().await {
            log::debug!("Shutdown: {}", err);
        }
        self.closed().await
    }

    /// Waits until the relay ends the session. A clean hang-up is `Ok`.
    pub async fn closed(self) -> Result<(), ClientError> {
        match self.inbound.await {
            Ok(result) => result.map_err(ClientError::from),
            Err(_) => Err(ClientError::Disconnected),
        }
    }
}

async fn receive_loop<R>(
    mut reader: MessageReader<R>,
    painter: Painter,
    pending_saves: PendingSaves,
) -> Result<(), SystemError>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    let result = loop {
        let message = match reader.next_message().await {
            Ok(Some(message)) => message,
            Ok(None) => {
                log::info!("Relay closed the connection");
                break Ok(());
            }
            Err(err) if !err.is_session_fatal() => {
                log::warn!("Dropping message from relay: {}", err);
                continue;
            }
            Err(err) => break Err(err),
        };
        let handled = match message {
            WireMessage::Draw(segment) => {
                if painter.apply(segment).await.is_err() {
                    break Ok(());
                }
                Ok(())
            }
            WireMessage::Saved { name } => {
                log::info!("Relay stored board as {}", name);
                pending_saves.complete(Ok(name))
            }
            WireMessage::SaveFailed { reason } => pending_saves.complete(Err(reason)),
            other => Err(SystemError::ProtocolViolation(format!(
                "relay may not send {:?} messages",
                other.tag()
            ))),
        };
        if let Err(err) = handled {
            break Err(err);
        }
    };

    if let Err(err) = &result {
        log::warn!("Session with relay ended: {}", err);
    }
    pending_saves.abandon();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use system::{BrushMode, StrokeReplay};
    use tokio::io::DuplexStream;

    struct FakeRelay {
        reader: MessageReader<BufReader<tokio::io::ReadHalf<DuplexStream>>>,
        writer: MessageWriter<tokio::io::WriteHalf<DuplexStream>>,
    }

    fn joined() -> (Whiteboard, FakeRelay) {
        let (client_side, relay_side) = tokio::io::duplex(1 << 20);
        let (client_read, client_write) = tokio::io::split(client_side);
        let (relay_read, relay_write) = tokio::io::split(relay_side);
        (
            Whiteboard::start(client_read, client_write, Canvas::new(40, 40)),
            FakeRelay {
                reader: MessageReader::new(BufReader::new(relay_read)),
                writer: MessageWriter::new(relay_write),
            },
        )
    }

    #[tokio::test]
    async fn it_should_paint_locally_and_send() {
        let (mut board, mut relay) = joined();
        board.set_color(Color::rgb(200, 0, 0));
        let sent = board.draw(Point::new(5, 5), Point::new(15, 5)).await.expect("");

        assert_eq!(
            relay.reader.next_message().await.expect(""),
            Some(WireMessage::Draw(sent))
        );
        let canvas = board.snapshot().await.expect("");
        assert_eq!(canvas.pixel(10, 5), Some(Color::rgb(200, 0, 0)));
    }

    #[tokio::test]
    async fn it_should_replay_received_strokes() {
        let (board, relay) = joined();
        let segment = StrokeSegment::new(
            Point::new(10, 10),
            Point::new(20, 20),
            Color::BLACK,
            BrushSettings::default(),
        );
        relay
            .writer
            .send(&WireMessage::Draw(segment))
            .await
            .expect("");

        let mut expected = Canvas::new(40, 40);
        expected.apply(&segment);
        let mut canvas = board.snapshot().await.expect("");
        for _ in 0..100 {
            if canvas.as_raw() == expected.as_raw() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            canvas = board.snapshot().await.expect("");
        }
        assert_eq!(canvas.as_raw(), expected.as_raw());
    }

    #[tokio::test]
    async fn it_should_keep_the_brush_a_stroke_was_drawn_with() {
        let (mut board, mut relay) = joined();
        let first = board.draw(Point::new(1, 1), Point::new(2, 2)).await.expect("");
        board.set_brush(BrushSettings::spray()).expect("");
        let second = board.draw(Point::new(3, 3), Point::new(4, 4)).await.expect("");

        assert_eq!(first.brush.mode, BrushMode::Line);
        assert_eq!(second.brush.mode, BrushMode::Spray);
        assert_eq!(
            relay.reader.next_message().await.expect(""),
            Some(WireMessage::Draw(first))
        );
    }

    #[tokio::test]
    async fn it_should_refuse_out_of_range_brushes() {
        let (mut board, _relay) = joined();
        let mut brush = BrushSettings::default();
        brush.width = 0;
        assert!(matches!(
            board.set_brush(brush),
            Err(ClientError::InvalidBrush(_))
        ));
        assert_eq!(board.brush(), BrushSettings::default());
    }

    #[tokio::test]
    async fn it_should_push_the_canvas_on_save() {
        let (board, mut relay) = joined();
        board.draw(Point::new(1, 1), Point::new(30, 30)).await.expect("");
        let expected = board.snapshot().await.expect("");

        let relay_task = tokio::spawn(async move {
            let _ = relay.reader.next_message().await.expect("");
            assert_eq!(
                relay.reader.next_message().await.expect(""),
                Some(WireMessage::Save)
            );
            let png = relay.reader.read_bulk(1 << 20).await.expect("");
            relay
                .writer
                .send(&WireMessage::Saved {
                    name: "board.png".into(),
                })
                .await
                .expect("");
            png
        });

        assert_eq!(board.save().await.expect(""), "board.png");
        let png = relay_task.await.expect("");
        let decoded = system::image::load_from_memory(&png).expect("").to_rgba8();
        assert_eq!(decoded.as_raw().as_slice(), expected.as_raw());
    }

    #[tokio::test]
    async fn it_should_report_a_rejected_save() {
        let (board, mut relay) = joined();
        let relay_task = tokio::spawn(async move {
            relay.reader.next_message().await.expect("");
            relay.reader.read_bulk(1 << 20).await.expect("");
            relay
                .writer
                .send(&WireMessage::SaveFailed {
                    reason: "disk full".into(),
                })
                .await
                .expect("");
            relay
        });
        assert!(matches!(
            board.save().await,
            Err(ClientError::SaveRejected(reason)) if reason == "disk full"
        ));
        drop(relay_task.await.expect(""));
    }

    #[tokio::test]
    async fn it_should_end_the_session_on_unexpected_messages() {
        let (board, relay) = joined();
        relay.writer.send(&WireMessage::Save).await.expect("");
        assert!(matches!(
            board.closed().await,
            Err(ClientError::System(SystemError::ProtocolViolation(_)))
        ));
    }

    #[tokio::test]
    async fn it_should_end_cleanly_when_the_relay_hangs_up() {
        let (board, relay) = joined();
        drop(relay);
        board.closed().await.expect("");
    }
}
