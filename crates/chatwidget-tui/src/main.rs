use std::fs::{self, File};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use chatwidget_core::WidgetConfig;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let config = WidgetConfig::load().context("failed to load widget config")?;
    let mut app = App::new(&config)?;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;

            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event),
                None => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    app.widget.unmount();
    tui::restore()?;
    result
}

/// Log to a file under the local data dir; the terminal belongs to the UI
fn init_logging() -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow!("Could not determine data directory"))?
        .join("chatwidget");
    fs::create_dir_all(&log_dir)?;
    let log_file = File::create(log_dir.join("chatwidget.log"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();

    Ok(())
}
