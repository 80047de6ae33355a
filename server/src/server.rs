use std::io;
use std::sync::Arc;

use system::{MessageReader, SystemError, WireMessage};
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::net::TcpListener;

use crate::registry::Registry;
use crate::session::Session;

/// Accepts participants until the listener fails for good. Every connection
/// gets its own task.
pub async fn serve(listener: TcpListener, registry: Arc<Registry>) -> io::Result<()> {
    log::info!("Relay listening on {}", listener.local_addr()?);
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) if is_transient_accept_error(&err) => {
                log::warn!("Accept failed, continuing: {}", err);
                continue;
            }
            Err(err) => {
                log::error!("Accept failed, relay stops accepting: {}", err);
                return Err(err);
            }
        };
        if let Err(err) = stream.set_nodelay(true) {
            log::debug!("Could not set TCP_NODELAY for {}: {}", peer, err);
        }
        log::info!("New client connected: {}", peer);

        let registry = registry.clone();
        tokio::spawn(async move {
            let (read_half, write_half) = stream.into_split();
            handle_connection(registry, read_half, write_half).await;
            log::info!("Client {} disconnected", peer);
        });
    }
}

fn is_transient_accept_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    )
}

/// Drives one participant: registers it, relays its strokes, serves its save
/// requests and unregisters it when the stream ends or faults.
pub async fn handle_connection<R, W>(registry: Arc<Registry>, read_half: R, write_half: W)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Send + Unpin + 'static,
{
    let session = registry.register(Box::new(write_half));
    let mut reader = MessageReader::new(BufReader::new(read_half));

    loop {
        let next = tokio::select! {
            next = reader.next_message() => next,
            _ = session.closed() => break,
        };
        match next {
            Ok(Some(message)) => {
                if let Err(err) = dispatch(&registry, &session, &mut reader, message).await {
                    log::warn!("Closing session {}: {}", session.id(), err);
                    break;
                }
            }
            Ok(None) => {
                log::info!("Session {} closed by peer", session.id());
                break;
            }
            Err(err) if !err.is_session_fatal() => {
                log::warn!("Dropping message from session {}: {}", session.id(), err);
            }
            Err(err) => {
                log::warn!("Closing session {}: {}", session.id(), err);
                break;
            }
        }
    }

    registry.disconnect(&session).await;
}

async fn dispatch<R>(
    registry: &Registry,
    session: &Session,
    reader: &mut MessageReader<R>,
    message: WireMessage,
) -> Result<(), SystemError>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    match message {
        WireMessage::Draw(_) => {
            registry.broadcast(&message, session.id()).await;
            Ok(())
        }
        WireMessage::Save => registry.handle_save_request(session, reader).await.map(|_| ()),
        other => Err(SystemError::ProtocolViolation(format!(
            "clients may not send {:?} messages",
            other.tag()
        ))),
    }
}
