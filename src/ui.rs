use crate::app::App;
use crossterm::{
    event::{self, Event, KeyCode},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, Borders, Cell as GridCell, List, ListItem, Paragraph, Row as GridRow,
        Table as GridTable,
    },
    Frame, Terminal,
};
use std::{
    io,
    path::{Path, PathBuf},
    time::Duration,
};

const SPINNER: [char; 4] = ['|', '/', '-', '\\'];
const NAME_COLUMN: usize = 20;

pub fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| draw(f, app))?;
        app.poll_scan();

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') => return Ok(()), // Quit
                    KeyCode::Char('o') => {
                        if let Some(path) = prompt("Image path to scan") {
                            if !path.is_empty() {
                                app.open_image(PathBuf::from(path));
                            }
                        }
                    }
                    KeyCode::Char('p') => app.export_pdf(),
                    KeyCode::Char('c') => {
                        if let Some(path) = prompt("CSV output path (default schedule.csv)") {
                            let path = if path.is_empty() {
                                String::from("schedule.csv")
                            } else {
                                path
                            };
                            app.export_csv(Path::new(&path));
                        }
                    }
                    KeyCode::Enter => {
                        if let Some(header) = app.selected_header().map(str::to_string) {
                            if let Some(value) = prompt(&format!("New value for {}", header)) {
                                app.edit_cell(&value);
                            }
                        }
                    }
                    KeyCode::Left => app.move_cursor(0, -1),
                    KeyCode::Right => app.move_cursor(0, 1),
                    KeyCode::Up => app.move_cursor(-1, 0),
                    KeyCode::Down => app.move_cursor(1, 0),
                    _ => {}
                }
            }
        }
        app.tick = app.tick.wrapping_add(1);
    }
}

fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Percentage(45),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(f.area());

    draw_grid(f, app, chunks[0]);
    draw_timeline(f, app, chunks[1]);
    draw_status(f, app, chunks[2]);
}

fn draw_grid(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().title("Extracted Table").borders(Borders::ALL);
    if app.edited.headers.is_empty() {
        let hint = Paragraph::new("No table yet - press o to scan an image").block(block);
        f.render_widget(hint, area);
        return;
    }

    let header = GridRow::new(app.edited.headers.iter().map(|h| {
        GridCell::from(Span::styled(
            h.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ))
    }));

    let rows = app.edited.rows.iter().enumerate().map(|(r, row)| {
        GridRow::new(row.iter().enumerate().map(|(c, cell)| {
            let style = if app.cursor == (r, c) {
                Style::default().bg(Color::Cyan).fg(Color::Black)
            } else {
                Style::default()
            };
            GridCell::from(Span::styled(cell.to_string(), style))
        }))
    });

    let widths: Vec<Constraint> = app
        .edited
        .headers
        .iter()
        .map(|_| Constraint::Min(8))
        .collect();
    let grid = GridTable::new(rows, widths)
        .header(header)
        .block(block)
        .column_spacing(1);
    f.render_widget(grid, area);
}

fn draw_timeline(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().title("Gantt").borders(Borders::ALL);
    if app.tasks.is_empty() {
        f.render_widget(Paragraph::new("No tasks derived").block(block), area);
        return;
    }

    let mut first = app.tasks[0].start;
    let mut last = app.tasks[0].end.max(app.tasks[0].start);
    for task in &app.tasks {
        first = first.min(task.start);
        last = last.max(task.end.max(task.start));
    }
    let span = (last - first).num_days().max(1);
    let bar_width = ((area.width as i64) - 2 - NAME_COLUMN as i64 - 1 - 6).max(10) as usize;

    let axis = Line::from(vec![
        Span::raw(format!("{:<width$} ", "", width = NAME_COLUMN)),
        Span::styled(
            format!(
                "{:<left$}{:>right$}",
                first.format("%m/%d").to_string(),
                last.format("%m/%d").to_string(),
                left = bar_width / 2,
                right = bar_width - bar_width / 2
            ),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let mut items: Vec<ListItem> = vec![ListItem::new(axis)];
    for task in &app.tasks {
        let offset = ((task.start - first).num_days() as f64 / span as f64 * bar_width as f64)
            .round() as usize;
        let offset = offset.min(bar_width - 1);
        let len = (task.span_days() as f64 / span as f64 * bar_width as f64).round() as usize;
        let len = len.max(1).min(bar_width - offset);
        let filled = ((task.progress / 100.0) * len as f64).round() as usize;
        let filled = filled.min(len);

        let mut name = task.name.clone();
        if name.chars().count() > NAME_COLUMN {
            name = name.chars().take(NAME_COLUMN - 1).collect::<String>() + "…";
        }
        let selected = app.cursor.0 + 1 == task.id.parse::<usize>().unwrap_or(0);
        let name_style = if selected {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };

        items.push(ListItem::new(Line::from(vec![
            Span::styled(format!("{:<width$} ", name, width = NAME_COLUMN), name_style),
            Span::raw(" ".repeat(offset)),
            Span::styled("█".repeat(filled), Style::default().fg(Color::Cyan)),
            Span::styled("░".repeat(len - filled), Style::default().fg(Color::DarkGray)),
            Span::styled(
                format!(" {:.0}%", task.progress),
                Style::default().fg(Color::DarkGray),
            ),
        ])));
    }

    f.render_widget(List::new(items).block(block), area);
}

fn draw_status(f: &mut Frame, app: &App, area: Rect) {
    let spinner = if app.loading {
        format!("{} ", SPINNER[(app.tick / 2) as usize % SPINNER.len()])
    } else {
        String::new()
    };
    let line = Line::from(vec![
        Span::styled(spinner, Style::default().fg(Color::Yellow)),
        Span::raw(app.status.clone()),
        Span::styled(
            "  |  o:scan  enter:edit  p:pdf  c:csv  q:quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

fn prompt(message: &str) -> Option<String> {
    disable_raw_mode().ok();
    println!("{}", message);
    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_ok() {
        enable_raw_mode().ok();
        Some(input.trim().to_string())
    } else {
        enable_raw_mode().ok();
        None
    }
}
