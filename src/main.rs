use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{io, path::PathBuf};

mod app;
mod export;
mod mapping;
mod ocr;
mod schedule;
mod table;
mod ui;

use app::App;
use mapping::ColumnMap;

#[derive(Parser)]
#[command(
    name = "ganttscan",
    version,
    about = "Scan a schedule photo into an editable Gantt chart"
)]
struct Cli {
    /// Image file to scan on startup
    image: Option<PathBuf>,
    /// Language hint passed to the recognition engine
    #[arg(long, default_value = "jpn")]
    lang: String,
    /// Column-mapping JSON file (header synonyms per field)
    #[arg(long)]
    mapping: Option<PathBuf>,
    /// Session file, loaded when no image is given and saved on quit
    #[arg(long, default_value = "schedule_session.json")]
    session: PathBuf,
    /// Output path for the exported PDF
    #[arg(long, default_value = "gantt_chart.pdf")]
    out: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let mapping = match &cli.mapping {
        Some(path) => ColumnMap::from_file(path)?,
        None => ColumnMap::default(),
    };

    let mut app = App::new(mapping, cli.lang, cli.out, cli.session);
    match cli.image {
        Some(image) => app.open_image(image),
        None => app.load_session(),
    }

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = ui::run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    // Keep the edited table for the next session
    app.save_session();

    if let Err(err) = result {
        eprintln!("{:?}", err);
    }
    Ok(())
}
