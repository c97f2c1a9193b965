//! worksheet - a keyboard-driven SQLite and PostgreSQL client for the terminal
//!
//! This is the main entry point. The actual logic lives in the library
//! modules for better testability.

use anyhow::{Context, Result, bail};
use clap::Parser;
use crossterm::event::{
    DisableBracketedPaste, EnableBracketedPaste, Event, EventStream, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use futures::StreamExt;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use worksheet::app::{App, AppEvent};
use worksheet::config::{self, ConnectionProfile, ProfileStore, load_settings};
use worksheet::db::{ConnectionManager, ConnectionNotice};
use worksheet::dispatch::Dispatcher;
use worksheet::ui::render::render;

const TICK_RATE: Duration = Duration::from_millis(250);

#[derive(Debug, Parser)]
#[command(name = "worksheet", version, about)]
struct Cli {
    /// Directory holding connections.toml, config.toml and the log file
    #[arg(long, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Saved connection to bind the first worksheet to
    #[arg(short, long, value_name = "NAME")]
    connection: Option<String>,

    /// Ad-hoc connection URL (postgres://..., sqlite://..., or a .db path); not saved
    #[arg(long, value_name = "URL", conflicts_with = "connection")]
    url: Option<String>,

    /// Log filter when WORKSHEET_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
}

type Tui = Terminal<CrosstermBackend<Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let dir = match cli.config_dir {
        Some(dir) => dir,
        None => config::config_dir()?,
    };
    let settings = load_settings(&dir).context("loading config.toml")?;
    let level = cli.log_level.as_deref().unwrap_or(&settings.log_level);
    worksheet::logging::init(&dir, level)?;

    let mut store = ProfileStore::load(dir.join(config::CONNECTIONS_FILE))
        .context("loading connections.toml")?;
    let mut initial = cli.connection;
    if let Some(url) = cli.url.as_deref() {
        let profile = ConnectionProfile::from_url(url)?;
        initial = Some(profile.name.clone());
        store.add_transient(profile)?;
    }
    if let Some(name) = initial.as_deref()
        && !store.contains(name)
    {
        bail!("Unknown connection '{}'", name);
    }

    let (notice_tx, notice_rx) = mpsc::unbounded_channel();
    let manager =
        Arc::new(ConnectionManager::new(store, settings.query_timeout()).with_notices(notice_tx));
    let mut app = App::new(&settings, manager.list_profiles().await, initial.clone());

    install_panic_hook();
    let mut terminal = setup_terminal()?;
    let result = run(&mut terminal, &mut app, Arc::clone(&manager), notice_rx, initial).await;
    restore_terminal(&mut terminal)?;

    manager.close_all().await;
    tracing::info!("worksheet exiting");
    result
}

async fn run(
    terminal: &mut Tui,
    app: &mut App,
    manager: Arc<ConnectionManager>,
    mut notices: mpsc::UnboundedReceiver<ConnectionNotice>,
    initial: Option<String>,
) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let dispatcher = Dispatcher::new(manager, tx);
    let mut events = EventStream::new();
    let mut tick = tokio::time::interval(TICK_RATE);

    if let Some(name) = initial {
        dispatcher.dispatch(worksheet::app::Action::Open(name));
    }

    while app.running {
        terminal.draw(|frame| render(frame, app))?;

        let event = tokio::select! {
            maybe = events.next() => match maybe {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => AppEvent::Key(key),
                Some(Ok(Event::Paste(data))) => AppEvent::Paste(data),
                Some(Ok(Event::Resize(_, _))) => AppEvent::Resize,
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
            Some(event) = rx.recv() => event,
            Some(ConnectionNotice::Lost { profile, message }) = notices.recv() => {
                AppEvent::ConnectionLost { profile, message }
            }
            _ = tick.tick() => AppEvent::Tick,
        };

        let action = app.handle_event(event)?;
        if !dispatcher.dispatch(action) {
            break;
        }
    }
    Ok(())
}

fn setup_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableBracketedPaste
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Leave the alternate screen before printing a panic
fn install_panic_hook() {
    let default = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableBracketedPaste);
        tracing::error!(panic = %info, "worksheet panicked");
        default(info);
    }));
}
