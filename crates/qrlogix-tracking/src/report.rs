//! Cycle report for a range of plant-local days.
//!
//! Rows are collected through the service; rendering to xlsx needs the
//! `report` feature.

use crate::domain::time::{format_report, start_of_day};
use crate::domain::{has_skips, Checkpoint, TrackingError, TrackingResult};
use crate::service::CheckinService;
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Serialize;

/// Column headers, in order.
pub const REPORT_HEADERS: [&str; 6] = [
    "Placa",
    "Inicio",
    "Fin",
    "Duración (min)",
    "Saltos",
    "Estado",
];

pub const REPORT_SHEET_NAME: &str = "Informe QRLogix";

const COLUMN_WIDTHS: [f64; 6] = [14.0, 20.0, 20.0, 18.0, 10.0, 15.0];

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// One cycle in the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub plate: String,
    pub started_at: DateTime<Utc>,
    /// `ended_at`, or the last scan of a cycle still open.
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_minutes: f64,
    pub skipped: bool,
    pub completed: bool,
}

impl ReportRow {
    fn cells(&self) -> [String; 6] {
        [
            self.plate.clone(),
            format_report(self.started_at),
            self.ended_at.map(format_report).unwrap_or_default(),
            format!("{:.1}", self.duration_minutes),
            if self.skipped { "Sí" } else { "No" }.to_string(),
            if self.completed { "Completado" } else { "Incompleto" }.to_string(),
        ]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub rows: Vec<ReportRow>,
}

impl CycleReport {
    /// Download name, e.g. `informe_qrlogix_2025-10-01_a_2025-10-31.xlsx`.
    pub fn filename(&self) -> String {
        report_filename(self.from, self.to)
    }

    /// Rows as display strings, header first.
    pub fn table(&self) -> Vec<[String; 6]> {
        let header = REPORT_HEADERS.map(str::to_string);
        std::iter::once(header)
            .chain(self.rows.iter().map(ReportRow::cells))
            .collect()
    }

    /// Render the workbook.
    #[cfg(feature = "report")]
    pub fn to_xlsx(&self) -> TrackingResult<Vec<u8>> {
        xlsx::render(self).map_err(|e| TrackingError::Report(e.to_string()))
    }
}

pub fn report_filename(from: NaiveDate, to: NaiveDate) -> String {
    format!(
        "informe_qrlogix_{}_a_{}.xlsx",
        from.format("%Y-%m-%d"),
        to.format("%Y-%m-%d")
    )
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl CheckinService {
    /// Cycles started on the local days `from..=to`.
    pub async fn cycle_report(&self, from: NaiveDate, to: NaiveDate) -> TrackingResult<CycleReport> {
        if to < from {
            return Err(TrackingError::InvalidDateRange);
        }
        let range_start = start_of_day(from);
        let range_end = to
            .checked_add_days(Days::new(1))
            .map(start_of_day)
            .ok_or(TrackingError::InvalidDateRange)?;

        let mut rows = Vec::new();
        for cycle in self
            .repo
            .cycles_started_between(range_start, range_end)
            .await?
        {
            let Some(session) = self.repo.session(cycle.session_id).await? else {
                continue;
            };
            let scans = self.repo.scans_for_cycle(cycle.id).await?;
            let scanned: Vec<Checkpoint> = scans.iter().map(|s| s.checkpoint).collect();

            let ended_at = cycle.ended_at.or_else(|| scans.last().map(|s| s.scanned_at));
            let duration_minutes = ended_at
                .map(|end| (end - cycle.started_at).num_milliseconds() as f64 / 60_000.0)
                .map(round_one_decimal)
                .unwrap_or(0.0);

            rows.push(ReportRow {
                plate: session.plate,
                started_at: cycle.started_at,
                ended_at,
                duration_minutes,
                skipped: has_skips(&scanned),
                completed: cycle.completed,
            });
        }

        Ok(CycleReport { from, to, rows })
    }
}

#[cfg(feature = "report")]
mod xlsx {
    use super::{CycleReport, COLUMN_WIDTHS, REPORT_HEADERS, REPORT_SHEET_NAME};
    use crate::domain::time::format_report;
    use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, XlsxError};

    const BRAND_BLUE: u32 = 0x071D49;
    const BORDER_GREY: u32 = 0xE0E0E0;

    pub(super) fn render(report: &CycleReport) -> Result<Vec<u8>, XlsxError> {
        let header_format = Format::new()
            .set_bold()
            .set_font_name("Arial")
            .set_font_size(12)
            .set_font_color(Color::White)
            .set_background_color(Color::RGB(BRAND_BLUE))
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter);
        let cell_format = Format::new()
            .set_font_name("Arial")
            .set_font_size(11)
            .set_font_color(Color::RGB(BRAND_BLUE))
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_border(FormatBorder::Thin)
            .set_border_color(Color::RGB(BORDER_GREY));

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(REPORT_SHEET_NAME)?;

        for (col, header) in REPORT_HEADERS.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *header, &header_format)?;
        }

        for (idx, row) in report.rows.iter().enumerate() {
            let r = idx as u32 + 1;
            let ended = row.ended_at.map(format_report).unwrap_or_default();
            sheet.write_string_with_format(r, 0, &row.plate, &cell_format)?;
            sheet.write_string_with_format(r, 1, format_report(row.started_at), &cell_format)?;
            sheet.write_string_with_format(r, 2, ended, &cell_format)?;
            sheet.write_number_with_format(r, 3, row.duration_minutes, &cell_format)?;
            sheet.write_string_with_format(r, 4, if row.skipped { "Sí" } else { "No" }, &cell_format)?;
            sheet.write_string_with_format(
                r,
                5,
                if row.completed { "Completado" } else { "Incompleto" },
                &cell_format,
            )?;
        }

        for (col, width) in COLUMN_WIDTHS.iter().enumerate() {
            sheet.set_column_width(col as u16, *width)?;
        }
        sheet.set_freeze_panes(1, 0)?;
        sheet.autofilter(0, 0, 0, (REPORT_HEADERS.len() - 1) as u16)?;

        workbook.save_to_buffer()
    }
}
