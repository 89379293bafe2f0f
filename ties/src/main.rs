//! Ties TUI application.
//!
//! A terminal address book for people and the ties between them.
//!
//! ```bash
//! cargo run -p ties -- --db ~/notes/people.json
//! ```

mod app;
mod config;
mod events;
mod logging;
mod ui;

use clap::Parser;
use crossterm::{
    event, execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, stdout};
use std::path::Path;
use ties_core::{migrate_store, FileStore, Repository, Session, StoreBackend};
use tracing::{error, info, warn};

use app::App;
use config::{Args, Config};
use events::{handle_event, EventResult};
use ui::render::render;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::from_args(Args::parse());

    if let Err(e) = config.ensure_store_dir() {
        eprintln!("{e}");
        std::process::exit(1);
    }

    if let Err(e) = logging::init(&config.log_path) {
        eprintln!(
            "Warning: could not open log file {}: {e}",
            config.log_path.display()
        );
    }
    info!("Starting with document {}", config.store_path.display());

    // Schema migration must succeed before anything reads the document
    let mut store = FileStore::new(&config.store_path);
    if let Err(e) = migrate_store(&mut store) {
        error!("Migration failed: {e}");
        eprintln!("Error running migrations: {e}");
        std::process::exit(1);
    }

    let (repo, report) = Repository::load(store);
    info!("Loaded document: {report:?}");
    let app = App::new(Session::new(repo, &report));

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    let code = exit_code(result, &config.store_path);
    info!("Exiting");
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

/// Report how the event loop ended and pick the process exit code.
fn exit_code<S: StoreBackend>(result: io::Result<App<S>>, store_path: &Path) -> i32 {
    match result {
        Ok(app) => {
            if app.session.has_unsaved_changes() {
                warn!("Exiting with unsaved changes");
                eprintln!(
                    "Warning: some changes could not be saved to {}",
                    store_path.display()
                );
            }
            0
        }
        Err(e) => {
            error!("Terminal error: {e}");
            eprintln!("Error: {e}");
            1
        }
    }
}

/// Draw, then block for the next event. One event is fully handled before
/// the next is read.
fn run_app<B: ratatui::backend::Backend, S: StoreBackend>(
    terminal: &mut Terminal<B>,
    mut app: App<S>,
) -> io::Result<App<S>> {
    loop {
        terminal.draw(|f| render(f, &app))?;

        if handle_event(&mut app, event::read()?) == EventResult::Quit {
            return Ok(app);
        }
    }
}
