use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};
use tracing::info;

use crate::report::{CandidateRow, Columns, table_rows};

/// One worksheet worth of candidate rows.
pub struct ExportSection<'a> {
    pub sheet: &'a str,
    pub rows: &'a [CandidateRow],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub sheets: usize,
    pub rows: usize,
}

pub fn export_workbook(path: &Path, sections: &[ExportSection<'_>]) -> Result<ExportReport> {
    let mut workbook = Workbook::new();
    let mut rows = 0usize;
    for section in sections {
        let sheet = workbook.add_worksheet();
        sheet.set_name(section.sheet)?;
        write_rows(sheet, &table_rows(section.rows, Columns::FULL))?;
        rows += section.rows.len();
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    info!(path = %path.display(), sheets = sections.len(), rows, "workbook exported");
    Ok(ExportReport {
        sheets: sections.len(),
        rows,
    })
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
