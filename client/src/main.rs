use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};

use client::config::ClientConfig;
use client::input::InputCommand;
use client::Whiteboard;
use system::Canvas;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = ClientConfig::from_env()?;
    log::info!("Starting whiteboard client with {:?}", config);

    let mut board = Whiteboard::connect(
        config.relay_addr,
        Canvas::new(config.canvas_width, config.canvas_height),
    )
    .await
    .with_context(|| format!("could not join relay at {}", config.relay_addr))?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("could not read input")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let line = match line {
            Some(line) => line,
            None => break,
        };
        if line.trim().is_empty() {
            continue;
        }
        if !board.is_connected() {
            log::warn!("Relay connection is gone; only export is possible");
        }

        let command = match line.parse::<InputCommand>() {
            Ok(command) => command,
            Err(err) => {
                log::warn!("{}", err);
                continue;
            }
        };
        let result = match command {
            InputCommand::Draw(from, to) => board.draw(from, to).await.map(|_| ()),
            InputCommand::Color(color) => {
                board.set_color(color);
                Ok(())
            }
            InputCommand::Brush(change) => board.set_brush(change.apply_to(board.brush())),
            InputCommand::Save => board.save().await.map(|name| {
                println!("saved as {}", name);
            }),
            InputCommand::Export(path) => board
                .export(path.unwrap_or_else(|| config.export_path.clone()))
                .await,
            InputCommand::Quit => break,
        };
        if let Err(err) = result {
            log::warn!("{}", err);
        }
    }

    if config.save_on_exit {
        match board.save().await {
            Ok(name) => log::info!("Saved board as {}", name),
            Err(err) => log::error!("Save on exit failed: {}", err),
        }
    }
    board
        .export(config.export_path.clone())
        .await
        .with_context(|| format!("could not export to {}", config.export_path.display()))?;
    if let Err(err) = board.close().await {
        log::debug!("Session ended with {}", err);
    }
    Ok(())
}
