// Reading score sheets from Excel files.

use calamine::{open_workbook, DataType, Reader, Xlsx};

use crate::evaluation::{
    io_common::{simplify_file_name, ParsedRow, SheetColumns},
    *,
};

/// Reads the given worksheet, or the first one of the workbook.
pub fn read_excel_scores(path: &str, worksheet: Option<&str>) -> EvalResult<Vec<ParsedRow>> {
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;
    let wrange = match worksheet {
        Some(name) => workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu { path, name })?
            .context(OpeningExcelSnafu { path })?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptySheetSnafu { path })?
            .context(OpeningExcelSnafu { path })?,
    };

    let mut iter = wrange.rows();
    let header_cells = iter.next().context(EmptySheetSnafu { path })?;
    let header = read_cells(1, header_cells)?;
    debug!("read_excel_scores: header: {:?}", header);
    let columns = SheetColumns::from_header(&header, path)?;

    let mut res: Vec<ParsedRow> = Vec::new();
    for (idx, row) in iter.enumerate() {
        let lineno = idx + 2;
        let cells = read_cells(lineno, row)?;
        if let Some(parsed) = columns.parse_row(lineno, &cells)? {
            res.push(parsed);
        }
    }
    info!(
        "read_excel_scores: {} scores in {}",
        res.len(),
        simplify_file_name(path)
    );
    Ok(res)
}

fn read_cells(lineno: usize, row: &[DataType]) -> EvalResult<Vec<String>> {
    row.iter().map(|cell| read_cell(lineno, cell)).collect()
}

fn read_cell(lineno: usize, cell: &DataType) -> EvalResult<String> {
    match cell {
        DataType::String(s) => Ok(s.clone()),
        DataType::Float(f) => Ok(f.to_string()),
        DataType::Int(i) => Ok(i.to_string()),
        DataType::Empty => Ok(String::new()),
        _ => ExcelWrongCellTypeSnafu {
            lineno,
            content: format!("{:?}", cell),
        }
        .fail(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_cells_as_text() {
        let row = vec![
            DataType::String("Solar".to_string()),
            DataType::Float(4.0),
            DataType::Float(3.5),
            DataType::Int(2),
            DataType::Empty,
        ];
        assert_eq!(read_cells(2, &row).unwrap(), vec!["Solar", "4", "3.5", "2", ""]);
    }

    #[test]
    fn boolean_cell_is_rejected() {
        assert!(matches!(
            read_cell(7, &DataType::Bool(true)),
            Err(EvalError::ExcelWrongCellType { lineno: 7, .. })
        ));
    }

    fn workbook_path() -> String {
        format!(
            "{}/testdata/innovation_call/innovation_call_scores.xlsx",
            env!("CARGO_MANIFEST_DIR")
        )
    }

    #[test]
    fn reads_named_worksheet() {
        let rows = read_excel_scores(&workbook_path(), Some("Scores")).unwrap();
        // Line 10 is a comment row.
        assert_eq!(rows.len(), 13);
        assert_eq!(rows[0].entry.application, "Solar schools");
        assert_eq!(rows[0].entry.criterion, "Reach");
        assert_eq!(rows[0].entry.username, "alice");
        assert_eq!(rows[0].score, 2.0);
        assert_eq!(rows[1].entry.first_name, "");
        assert_eq!(rows[1].entry.username, "bob");
        assert_eq!(rows[8].entry.lineno, 11);
        assert_eq!(rows[8].entry.application, "Bike lanes");
    }

    #[test]
    fn unknown_worksheet_is_reported() {
        assert!(matches!(
            read_excel_scores(&workbook_path(), Some("Totals")),
            Err(EvalError::MissingWorksheet { .. })
        ));
    }

    #[test]
    fn first_worksheet_by_default() {
        // The first worksheet only holds a note.
        assert!(matches!(
            read_excel_scores(&workbook_path(), None),
            Err(EvalError::MissingColumn { .. })
        ));
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            read_excel_scores("/nonexistent/evalscore.xlsx", None),
            Err(EvalError::OpeningExcel { .. })
        ));
    }
}
