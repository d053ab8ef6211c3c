use crate::export::{self, ExportError};
use crate::mapping::ColumnMap;
use crate::ocr::{self, OcrError};
use crate::schedule::{derive_tasks, Task};
use crate::table::Table;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::thread;

/// Top-level application state: the pristine extraction, its editable copy,
/// the derived task list, and the in-flight scan if one is running.
pub struct App {
    pub source: Table,
    pub edited: Table,
    pub tasks: Vec<Task>,
    pub mapping: ColumnMap,
    pub lang: String,
    pub cursor: (usize, usize), // (row, column) in the editable grid
    pub loading: bool,
    pub status: String,
    pub tick: u64,
    pdf_out: PathBuf,
    session: PathBuf,
    scan: Option<Receiver<Result<String, OcrError>>>,
}

impl App {
    pub fn new(mapping: ColumnMap, lang: String, pdf_out: PathBuf, session: PathBuf) -> Self {
        Self {
            source: Table::default(),
            edited: Table::default(),
            tasks: Vec::new(),
            mapping,
            lang,
            cursor: (0, 0),
            loading: false,
            status: String::from("Press o to scan an image"),
            tick: 0,
            pdf_out,
            session,
            scan: None,
        }
    }

    /// Kick off recognition on a background thread; the event loop picks the
    /// result up via `poll_scan`.
    pub fn open_image(&mut self, image: PathBuf) {
        let (tx, rx) = channel();
        let lang = self.lang.clone();
        self.loading = true;
        self.status = format!("Scanning {}...", image.display());
        log::info!("starting recognition of {}", image.display());
        thread::spawn(move || {
            let _ = tx.send(ocr::recognize(&image, &lang));
        });
        self.scan = Some(rx);
    }

    /// Drain a finished scan, if any. Returns true when state changed.
    pub fn poll_scan(&mut self) -> bool {
        let Some(rx) = &self.scan else {
            return false;
        };
        match rx.try_recv() {
            Ok(Ok(text)) => {
                self.scan = None;
                self.loading = false;
                self.apply_scan(&text);
                true
            }
            Ok(Err(err)) => {
                self.scan = None;
                self.loading = false;
                log::error!("recognition failed: {err}");
                self.status = String::from("Recognition failed (see log)");
                true
            }
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Disconnected) => {
                self.scan = None;
                self.loading = false;
                log::error!("recognition thread exited without a result");
                self.status = String::from("Recognition failed (see log)");
                true
            }
        }
    }

    /// Rebuild the whole state from freshly recognized text.
    pub fn apply_scan(&mut self, text: &str) {
        let table = Table::reconstruct(text);
        if table.rows.is_empty() {
            log::warn!("recognized text produced no table rows");
        }
        self.edited = table.clone();
        self.source = table;
        self.cursor = (0, 0);
        self.rederive();
    }

    /// Replace one cell of the editable copy and re-derive every task from
    /// the full edited table.
    pub fn edit_cell(&mut self, value: &str) {
        let (row, col) = self.cursor;
        self.edited.set(row, col, value);
        self.rederive();
    }

    fn rederive(&mut self) {
        self.tasks = derive_tasks(&self.edited, &self.mapping);
        self.status = format!("{} rows, {} tasks", self.edited.rows.len(), self.tasks.len());
    }

    pub fn move_cursor(&mut self, d_row: isize, d_col: isize) {
        let rows = self.edited.rows.len();
        let cols = self.edited.headers.len();
        if rows == 0 || cols == 0 {
            return;
        }
        let row = (self.cursor.0 as isize + d_row).clamp(0, rows as isize - 1) as usize;
        let col = (self.cursor.1 as isize + d_col).clamp(0, cols as isize - 1) as usize;
        self.cursor = (row, col);
    }

    pub fn selected_header(&self) -> Option<&str> {
        self.edited.headers.get(self.cursor.1).map(String::as_str)
    }

    pub fn export_pdf(&mut self) {
        match export::export_pdf(&self.tasks, &self.pdf_out) {
            Ok(()) => self.status = format!("Chart written to {}", self.pdf_out.display()),
            Err(err) => self.fail_export(err),
        }
    }

    pub fn export_csv(&mut self, out: &Path) {
        match export::export_csv(&self.edited, out) {
            Ok(()) => self.status = format!("Table written to {}", out.display()),
            Err(err) => self.fail_export(err),
        }
    }

    fn fail_export(&mut self, err: ExportError) {
        log::error!("export failed: {err}");
        self.status = format!("Export failed: {err}");
    }

    pub fn load_session(&mut self) {
        if !self.session.exists() {
            return;
        }
        if let Ok(data) = fs::read_to_string(&self.session) {
            let table: Table = serde_json::from_str(&data).unwrap_or_default();
            self.edited = table.clone();
            self.source = table;
            self.rederive();
            self.status = format!("Session restored from {}", self.session.display());
        }
    }

    pub fn save_session(&self) {
        if self.edited.headers.is_empty() {
            return;
        }
        match serde_json::to_string_pretty(&self.edited) {
            Ok(json) => {
                if let Err(err) = fs::write(&self.session, json) {
                    eprintln!("Failed to save session: {}", err);
                }
            }
            Err(err) => eprintln!("Failed to save session: {}", err),
        }
    }
}
