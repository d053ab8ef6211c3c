//! Chart rasterization and export: the task list is drawn to an in-memory
//! bitmap, which becomes the single full-page image of the generated PDF.
//! The corrected table can also be written out as CSV.

use crate::schedule::Task;
use crate::table::Table;
use chrono::NaiveDate;
use plotters::prelude::*;
use printpdf::image_crate::{DynamicImage, RgbImage};
use printpdf::{BuiltinFont, Image, ImageTransform, Mm, PdfDocument};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use thiserror::Error;

// Bitmap geometry, in pixels. The left gutter stays blank in the raster and
// receives the task labels as page text.
const CHART_WIDTH: u32 = 1200;
const ROW_HEIGHT: u32 = 44;
const HEADER_HEIGHT: u32 = 48;
const FOOTER_HEIGHT: u32 = 20;
const LABEL_GUTTER: u32 = 230;
const RIGHT_MARGIN: u32 = 30;

// A4 portrait.
const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const RASTER_DPI: f32 = 150.0;

const BAR_FILL: RGBColor = RGBColor(147, 197, 253);
const BAR_PROGRESS: RGBColor = RGBColor(37, 99, 235);
const GRID_LINE: RGBColor = RGBColor(226, 232, 240);
const FRAME_LINE: RGBColor = RGBColor(100, 116, 139);

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no tasks to chart")]
    NoTasks,
    #[error("chart rendering failed: {0}")]
    Render(String),
    #[error("pdf assembly failed: {0}")]
    Pdf(String),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Raw RGB chart bitmap plus the geometry needed to anchor page text to it.
pub struct ChartBitmap {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub first_day: NaiveDate,
    pub span_days: i64,
}

impl ChartBitmap {
    fn row_center(&self, row: usize) -> u32 {
        HEADER_HEIGHT + row as u32 * ROW_HEIGHT + ROW_HEIGHT / 2
    }
}

/// Draw the timeline into an in-memory RGB buffer: one bar per task across
/// the common date span, with the progress fraction overlaid.
pub fn render_chart(tasks: &[Task]) -> Result<ChartBitmap, ExportError> {
    if tasks.is_empty() {
        return Err(ExportError::NoTasks);
    }

    let mut first_day = tasks[0].start;
    let mut last_day = tasks[0].end.max(tasks[0].start);
    for task in tasks {
        first_day = first_day.min(task.start);
        last_day = last_day.max(task.end.max(task.start));
    }
    let span_days = (last_day - first_day).num_days().max(1);

    let width = CHART_WIDTH;
    let height = HEADER_HEIGHT + tasks.len() as u32 * ROW_HEIGHT + FOOTER_HEIGHT;
    let mut data = vec![255u8; (width * height * 3) as usize];

    {
        let root = BitMapBackend::with_buffer(&mut data, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let plot_left = LABEL_GUTTER as i32;
        let plot_right = (width - RIGHT_MARGIN) as i32;
        let plot_top = HEADER_HEIGHT as i32;
        let plot_bottom = (height - FOOTER_HEIGHT) as i32;
        let plot_width = (plot_right - plot_left) as f64;

        let day_x = |days: i64| -> i32 {
            plot_left + (days as f64 / span_days as f64 * plot_width).round() as i32
        };

        // Day grid, thinned so wide spans stay readable.
        let step = (span_days / 14).max(1);
        let mut day = 0;
        while day <= span_days {
            let x = day_x(day);
            root.draw(&PathElement::new(vec![(x, plot_top), (x, plot_bottom)], &GRID_LINE))
                .map_err(render_err)?;
            day += step;
        }

        for (row, task) in tasks.iter().enumerate() {
            let y0 = plot_top + row as i32 * ROW_HEIGHT as i32;
            let y1 = y0 + ROW_HEIGHT as i32;

            root.draw(&PathElement::new(vec![(plot_left, y1), (plot_right, y1)], &GRID_LINE))
                .map_err(render_err)?;

            let offset = (task.start - first_day).num_days();
            let bar_x0 = day_x(offset);
            let bar_x1 = day_x(offset + task.span_days()).max(bar_x0 + 2);
            let bar_y0 = y0 + ROW_HEIGHT as i32 / 5;
            let bar_y1 = y1 - ROW_HEIGHT as i32 / 5;

            root.draw(&Rectangle::new([(bar_x0, bar_y0), (bar_x1, bar_y1)], BAR_FILL.filled()))
                .map_err(render_err)?;

            let done = bar_x0 + ((bar_x1 - bar_x0) as f64 * task.progress / 100.0).round() as i32;
            if done > bar_x0 {
                root.draw(&Rectangle::new(
                    [(bar_x0, bar_y0), (done, bar_y1)],
                    BAR_PROGRESS.filled(),
                ))
                .map_err(render_err)?;
            }
        }

        root.draw(&Rectangle::new(
            [(plot_left, plot_top), (plot_right, plot_bottom)],
            FRAME_LINE.stroke_width(1),
        ))
        .map_err(render_err)?;

        root.present().map_err(render_err)?;
    }

    Ok(ChartBitmap {
        width,
        height,
        data,
        first_day,
        span_days,
    })
}

/// Render the task list and write a one-page A4 PDF: the chart bitmap is
/// scaled to the page width with its height following the aspect ratio, and
/// task labels plus the date range are placed over its gutter as page text.
pub fn export_pdf(tasks: &[Task], out: &Path) -> Result<(), ExportError> {
    let chart = render_chart(tasks)?;

    let (doc, page, layer) = PdfDocument::new(
        "Gantt Chart",
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "chart",
    );
    let layer = doc.get_page(page).get_layer(layer);
    let font = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?;
    let font_bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(pdf_err)?;

    // Natural size at the raster DPI, then scaled to fill the page width.
    let natural_w = chart.width as f32 / RASTER_DPI * 25.4;
    let natural_h = chart.height as f32 / RASTER_DPI * 25.4;
    let scale = PAGE_WIDTH_MM / natural_w;
    let image_h = natural_h * scale;
    let mm_per_px = image_h / chart.height as f32;

    let rgb = RgbImage::from_raw(chart.width, chart.height, chart.data.clone())
        .ok_or_else(|| ExportError::Render("bitmap buffer size mismatch".to_string()))?;
    Image::from_dynamic_image(&DynamicImage::ImageRgb8(rgb)).add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(0.0)),
            translate_y: Some(Mm(PAGE_HEIGHT_MM - image_h)),
            scale_x: Some(scale),
            scale_y: Some(scale),
            dpi: Some(RASTER_DPI),
            ..Default::default()
        },
    );

    let text_y = |y_px: u32| Mm(PAGE_HEIGHT_MM - y_px as f32 * mm_per_px - 1.2);

    layer.use_text("Gantt Chart", 13.0, Mm(4.0), text_y(HEADER_HEIGHT / 2), &font_bold);
    layer.use_text(
        chart.first_day.format("%Y-%m-%d").to_string(),
        8.0,
        Mm(LABEL_GUTTER as f32 * mm_per_px),
        text_y(HEADER_HEIGHT - 8),
        &font,
    );
    let last_day = chart.first_day + chrono::Duration::days(chart.span_days);
    layer.use_text(
        last_day.format("%Y-%m-%d").to_string(),
        8.0,
        Mm(PAGE_WIDTH_MM - 24.0),
        text_y(HEADER_HEIGHT - 8),
        &font,
    );

    for (row, task) in tasks.iter().enumerate() {
        layer.use_text(gutter_label(task), 9.0, Mm(4.0), text_y(chart.row_center(row)), &font);
    }

    doc.save(&mut BufWriter::new(File::create(out)?))
        .map_err(pdf_err)?;
    log::info!("wrote {}", out.display());
    Ok(())
}

/// Write the corrected table as CSV, headers first.
pub fn export_csv(table: &Table, out: &Path) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_path(out)?;
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|cell| cell.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

// The builtin PDF fonts carry no CJK glyphs, so anything outside Latin-1 is
// replaced; the row number keeps the label unambiguous.
fn gutter_label(task: &Task) -> String {
    let name: String = task
        .name
        .chars()
        .map(|c| if (c as u32) < 0x100 { c } else { '?' })
        .take(26)
        .collect();
    format!("{}. {}", task.id, name)
}

fn render_err<E: std::fmt::Display>(err: E) -> ExportError {
    ExportError::Render(err.to_string())
}

fn pdf_err<E: std::fmt::Display>(err: E) -> ExportError {
    ExportError::Pdf(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(name: &str, start: (i32, u32, u32), end: (i32, u32, u32), progress: f64) -> Task {
        Task {
            id: "1".into(),
            name: name.into(),
            start: NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            end: NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
            progress,
            dependencies: String::new(),
        }
    }

    #[test]
    fn chart_has_the_requested_geometry() {
        let tasks = vec![
            task("a", (2025, 1, 1), (2025, 1, 3), 50.0),
            task("b", (2025, 1, 2), (2025, 1, 5), 0.0),
        ];
        let chart = render_chart(&tasks).unwrap();
        assert_eq!(chart.width, CHART_WIDTH);
        assert_eq!(chart.height, HEADER_HEIGHT + 2 * ROW_HEIGHT + FOOTER_HEIGHT);
        assert_eq!(chart.data.len(), (chart.width * chart.height * 3) as usize);
        // the bars leave non-white pixels behind
        assert!(chart.data.iter().any(|&b| b != 255));
    }

    #[test]
    fn empty_task_list_is_an_export_error() {
        assert!(matches!(render_chart(&[]), Err(ExportError::NoTasks)));
        let out = std::env::temp_dir().join("ganttscan_empty.pdf");
        assert!(matches!(export_pdf(&[], &out), Err(ExportError::NoTasks)));
    }

    #[test]
    fn pdf_export_writes_a_pdf_file() {
        let out = std::env::temp_dir().join("ganttscan_test_gantt_chart.pdf");
        let tasks = vec![task("組立", (2025, 1, 1), (2025, 1, 3), 75.0)];
        export_pdf(&tasks, &out).unwrap();
        let bytes = std::fs::read(&out).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn csv_round_trips_headers_and_cells() {
        let table = Table::reconstruct("名前 開始 数量\nA 2025/01/01 300");
        let out = std::env::temp_dir().join("ganttscan_test_table.csv");
        export_csv(&table, &out).unwrap();
        let written = std::fs::read_to_string(&out).unwrap();
        assert!(written.starts_with("名前,開始,数量"));
        assert!(written.contains("A,2025/01/01,300"));
    }
}
