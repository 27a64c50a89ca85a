//! xlsx serialization of an [`ExportTable`]

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use super::formatting::{create_header_format, create_not_applicable_format, create_number_format};
use super::table::{Cell, ExportTable, Sheet};

/// Serialize the table into workbook bytes
pub fn write_workbook(table: &ExportTable, column_width: f64) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();

    for sheet in &table.sheets {
        let worksheet = workbook.add_worksheet();
        write_sheet(worksheet, &table.header, sheet, column_width)
            .with_context(|| format!("Failed to write sheet '{}'", sheet.name))?;
    }

    let bytes = workbook
        .save_to_buffer()
        .context("Failed to serialize workbook")?;

    log::debug!(
        "Wrote workbook with {} sheet(s), {} bytes",
        table.sheets.len(),
        bytes.len()
    );
    Ok(bytes)
}

fn write_sheet(worksheet: &mut Worksheet, header: &[String], sheet: &Sheet, column_width: f64) -> Result<()> {
    worksheet.set_name(&sheet.name)?;

    let header_format = create_header_format();
    let not_applicable_format = create_not_applicable_format();
    let number_format = create_number_format();

    for (col, title) in header.iter().enumerate() {
        let col = col as u16;
        worksheet.set_column_width(col, column_width)?;
        worksheet.write_string_with_format(0, col, title, &header_format)?;
    }
    worksheet.set_freeze_panes(1, 0)?;

    for (index, cells) in sheet.rows.iter().enumerate() {
        let row = index as u32 + 1;
        for (col, cell) in cells.iter().enumerate() {
            let col = col as u16;
            match cell {
                Cell::Empty => {}
                Cell::Text(text) => {
                    worksheet.write_string(row, col, text)?;
                }
                Cell::Number(value) => {
                    worksheet.write_number_with_format(row, col, *value as f64, &number_format)?;
                }
                Cell::NotApplicable => {
                    worksheet.write_string_with_format(row, col, &cell.display(), &not_applicable_format)?;
                }
            }
        }
    }

    Ok(())
}
