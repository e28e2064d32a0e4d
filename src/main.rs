use std::fs::File;
use std::io::stdout;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::EnableMouseCapture,
    execute,
    terminal::{EnterAlternateScreen, enable_raw_mode},
};
use log::{error, info};
use ratatui::{Terminal, backend::CrosstermBackend};
use simplelog::{Config, LevelFilter, WriteLogger};

use folio::event_source::TerminalEventSource;
use folio::main_app::{App, run_app_with_event_source};
use folio::panic_handler;
use folio::settings::Settings;

#[derive(Parser)]
#[command(name = "folio", version, about = "A terminal EPUB reader with page-by-page navigation")]
struct Cli {
    /// EPUB file to open right away.
    path: Option<PathBuf>,

    /// Directory to list books from (overrides the configured one).
    #[arg(long)]
    library: Option<PathBuf>,

    /// Where to write the log file.
    #[arg(long, default_value = "folio.log")]
    log_file: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    WriteLogger::init(
        LevelFilter::Info,
        Config::default(),
        File::create(&cli.log_file)?,
    )?;
    info!("starting folio");

    panic_handler::initialize_panic_handler();

    let mut settings = Settings::load();
    if let Some(library) = &cli.library {
        settings.library_dir = library.display().to_string();
    }

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(settings);
    if let Some(path) = cli.path {
        app.open_path(path);
    }
    let mut event_source = TerminalEventSource;
    let result = run_app_with_event_source(&mut terminal, &mut app, &mut event_source);

    panic_handler::restore_terminal();

    if let Err(err) = &result {
        error!("application error: {err:?}");
        println!("{err:?}");
    }

    info!("shutting down folio");
    result
}
