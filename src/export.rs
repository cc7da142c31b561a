//! Renders a view of the ledger as an `.xlsx` workbook with a summary block at the bottom.

use crate::error::{ErrorType, IntoResult};
use crate::model::{format_date, Amount, Kind, Transaction, TransactionColumn};
use crate::query::{aggregate, DateRange, Filter};
use crate::Result;
use anyhow::Context;
use chrono::{Datelike, NaiveDate};
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook};

const MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

/// What an export covers. This decides the summary labels, the worksheet name and the file name.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ExportScope {
    /// The month of `today`, through `today`.
    Month { today: NaiveDate },
    Range(DateRange),
    Total,
}

impl ExportScope {
    /// The filter that selects the transactions this scope covers.
    pub fn filter(&self) -> Filter {
        match self {
            ExportScope::Month { today } => Filter::CurrentMonth { today: *today },
            ExportScope::Range(range) => Filter::Range(*range),
            ExportScope::Total => Filter::All,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ExportScope::Month { .. } => "MES",
            ExportScope::Range(_) => "RANGO",
            ExportScope::Total => "TOTAL",
        }
    }

    fn sheet_name(&self) -> &'static str {
        match self {
            ExportScope::Month { .. } => "Caroney Mes",
            ExportScope::Range(_) => "Caroney Rango",
            ExportScope::Total => "Caroney",
        }
    }

    /// Captions for the income, expense and balance rows.
    fn captions(&self) -> [&'static str; 3] {
        match self {
            ExportScope::Month { .. } => [
                "Ingresos del mes",
                "Egresos del mes",
                "Balance neto del mes",
            ],
            ExportScope::Range(_) => [
                "Ingresos (rango)",
                "Egresos (rango)",
                "Balance neto (rango)",
            ],
            ExportScope::Total => ["Ingresos totales", "Egresos totales", "Balance neto"],
        }
    }

    pub fn file_name(&self) -> String {
        match self {
            ExportScope::Month { today } => {
                let month = MONTHS[today.month0() as usize];
                format!("caroney_mes_{month}_{}.xlsx", today.year())
            }
            ExportScope::Range(range) => format!(
                "caroney_filtrado_{}_a_{}.xlsx",
                format_date(range.start),
                format_date(range.end)
            ),
            ExportScope::Total => "caroney_completo.xlsx".to_string(),
        }
    }
}

/// A rendered workbook and the name it should be saved under.
#[derive(Debug, Clone)]
pub struct Export {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Renders `view` as a workbook. `view` should already be filtered to `scope`, see
/// `ExportScope::filter`.
///
/// The worksheet has a header row, one row per transaction, a blank row and then three summary
/// rows for income, expenses and the balance.
pub fn export(view: &[Transaction], scope: ExportScope) -> Result<Export> {
    let grid = layout(view, scope);
    let bytes = render(&grid, scope.sheet_name())
        .with_context(|| format!("Unable to create the workbook for {}", scope.file_name()))
        .pub_result(ErrorType::Export)?;
    Ok(Export {
        file_name: scope.file_name(),
        bytes,
    })
}

#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Empty,
    Text(String),
    Number(Amount),
}

impl Cell {
    fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s)
        }
    }

    /// The number of characters the cell shows, which drives the column width.
    fn width(&self) -> usize {
        match self {
            Cell::Empty => 0,
            Cell::Text(s) => s.chars().count(),
            Cell::Number(amount) => amount.to_plain_string().len(),
        }
    }
}

fn layout(view: &[Transaction], scope: ExportScope) -> Vec<Vec<Cell>> {
    let mut grid = Vec::with_capacity(view.len() + 5);
    grid.push(
        TransactionColumn::ALL
            .iter()
            .map(|c| Cell::text(c.header()))
            .collect(),
    );
    for t in view {
        grid.push(vec![
            Cell::text(format_date(t.date())),
            Cell::Number(t.amount()),
            Cell::text(t.kind().to_string()),
            Cell::text(t.category()),
            Cell::text(t.description()),
        ]);
    }
    grid.push(Vec::new());

    let totals = aggregate(view);
    let [income, expense, balance] = scope.captions();
    let label = scope.label();
    for (amount, kind, caption) in [
        (totals.income, Some(Kind::Income), income),
        (totals.expense, Some(Kind::Expense), expense),
        (totals.balance, None, balance),
    ] {
        grid.push(vec![
            Cell::text(label),
            Cell::Number(amount),
            kind.map_or(Cell::Empty, |k| Cell::text(k.to_string())),
            Cell::Empty,
            Cell::text(caption),
        ]);
    }
    grid
}

fn render(grid: &[Vec<Cell>], sheet_name: &str) -> anyhow::Result<Vec<u8>> {
    let header = Format::new()
        .set_bold()
        .set_align(FormatAlign::Center)
        .set_border(FormatBorder::Thin);
    let text = Format::new().set_border(FormatBorder::Thin);
    let number = Format::new()
        .set_border(FormatBorder::Thin)
        .set_num_format("0.00");

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    for (row_ix, row) in grid.iter().enumerate() {
        let row_num = u32::try_from(row_ix).context("Too many rows for a worksheet")?;
        for (col_ix, cell) in row.iter().enumerate() {
            let col_num = u16::try_from(col_ix).context("Too many columns for a worksheet")?;
            match cell {
                Cell::Empty => {}
                Cell::Text(s) if row_ix == 0 => {
                    worksheet.write_string_with_format(row_num, col_num, s, &header)?;
                }
                Cell::Text(s) => {
                    worksheet.write_string_with_format(row_num, col_num, s, &text)?;
                }
                Cell::Number(amount) => {
                    worksheet.write_number_with_format(row_num, col_num, amount.to_f64(), &number)?;
                }
            }
        }
    }

    for (col_ix, width) in column_widths(grid).into_iter().enumerate() {
        let col_num = u16::try_from(col_ix).context("Too many columns for a worksheet")?;
        worksheet.set_column_width(col_num, width as f64)?;
    }

    Ok(workbook.save_to_buffer()?)
}

/// Each column is as wide as its longest value plus two.
fn column_widths(grid: &[Vec<Cell>]) -> Vec<usize> {
    let columns = grid.iter().map(|row| row.len()).max().unwrap_or_default();
    (0..columns)
        .map(|col| {
            grid.iter()
                .filter_map(|row| row.get(col))
                .map(Cell::width)
                .max()
                .unwrap_or_default()
                + 2
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{date, expense, income, seed_transactions};
    use calamine::{open_workbook_auto, Data, Reader};
    use tempfile::TempDir;

    /// Writes the export to disk and reads its only worksheet back.
    fn read_back(export: &Export) -> (Vec<String>, Vec<Vec<Data>>) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(&export.file_name);
        std::fs::write(&path, &export.bytes).unwrap();
        let mut workbook = open_workbook_auto(&path).unwrap();
        let names = workbook.sheet_names();
        let range = workbook.worksheet_range(&names[0]).unwrap();
        let rows = range.rows().map(|r| r.to_vec()).collect();
        (names, rows)
    }

    fn s(value: &str) -> Data {
        Data::String(value.to_string())
    }

    #[test]
    fn test_file_names() {
        let month = ExportScope::Month {
            today: date(2024, 10, 15),
        };
        assert_eq!(month.file_name(), "caroney_mes_octubre_2024.xlsx");
        let range = ExportScope::Range(DateRange::new(date(2024, 2, 1), date(2024, 2, 29)));
        assert_eq!(
            range.file_name(),
            "caroney_filtrado_2024-02-01_a_2024-02-29.xlsx"
        );
        assert_eq!(ExportScope::Total.file_name(), "caroney_completo.xlsx");
    }

    #[test]
    fn test_export_layout() {
        let view = vec![income(2024, 1, 5, 100), expense(2024, 1, 6, 40)];
        let export = export(&view, ExportScope::Total).unwrap();
        let (names, rows) = read_back(&export);
        assert_eq!(names, vec!["Caroney"]);
        assert_eq!(rows.len(), 7);
        assert_eq!(
            rows[0],
            vec![s("Fecha"), s("Monto"), s("Tipo"), s("Categoría"), s("Descripción")]
        );
        assert_eq!(rows[1][0], s("2024-01-05"));
        assert_eq!(rows[1][1], Data::Float(100.0));
        assert_eq!(rows[2][1], Data::Float(-40.0));
        assert_eq!(rows[2][2], s("Egreso"));
        assert!(rows[3].iter().all(|c| *c == Data::Empty));

        assert_eq!(rows[4][0], s("TOTAL"));
        assert_eq!(rows[4][1], Data::Float(100.0));
        assert_eq!(rows[4][2], s("Ingreso"));
        assert_eq!(rows[4][4], s("Ingresos totales"));
        assert_eq!(rows[5][1], Data::Float(40.0));
        assert_eq!(rows[5][2], s("Egreso"));
        assert_eq!(rows[5][4], s("Egresos totales"));
        assert_eq!(rows[6][1], Data::Float(60.0));
        assert_eq!(rows[6][2], Data::Empty);
        assert_eq!(rows[6][3], Data::Empty);
        assert_eq!(rows[6][4], s("Balance neto"));
    }

    #[test]
    fn test_export_month_of_seed() {
        let today = date(2024, 2, 29);
        let scope = ExportScope::Month { today };
        let view = scope.filter().apply(&seed_transactions());
        let export = export(&view, scope).unwrap();
        assert_eq!(export.file_name, "caroney_mes_febrero_2024.xlsx");

        let (names, rows) = read_back(&export);
        assert_eq!(names, vec!["Caroney Mes"]);
        // header, 3 transactions, blank, 3 summary rows
        assert_eq!(rows.len(), 8);
        assert_eq!(rows[3][3], s("Sin categoría"));
        let summary: Vec<(Data, Data)> = rows[5..]
            .iter()
            .map(|r| (r[0].clone(), r[4].clone()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (s("MES"), s("Ingresos del mes")),
                (s("MES"), s("Egresos del mes")),
                (s("MES"), s("Balance neto del mes")),
            ]
        );
        assert_eq!(rows[6][1], Data::Float(180.75));
    }

    #[test]
    fn test_export_empty_view() {
        let range = DateRange::new(date(2030, 1, 1), date(2030, 1, 31));
        let export = export(&[], ExportScope::Range(range)).unwrap();
        let (names, rows) = read_back(&export);
        assert_eq!(names, vec!["Caroney Rango"]);
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[2][0], s("RANGO"));
        assert_eq!(rows[2][1], Data::Float(0.0));
        assert_eq!(rows[4][4], s("Balance neto (rango)"));
    }

    #[test]
    fn test_column_widths() {
        let view = vec![income(2024, 1, 5, 1500)];
        let grid = layout(&view, ExportScope::Total);
        // Fecha: "2024-01-05", Monto: "1500.00", Tipo: "Ingreso",
        // Categoría: "Sin categoría", Descripción: "Ingresos totales"
        assert_eq!(column_widths(&grid), vec![12, 9, 9, 15, 18]);
    }

    #[test]
    fn test_blank_cells_are_not_written() {
        let view = vec![income(2024, 1, 5, 10)];
        let grid = layout(&view, ExportScope::Total);
        assert_eq!(grid[1][4], Cell::Empty);
        assert!(grid[2].is_empty());
        assert_eq!(grid[5][2], Cell::Empty);
    }
}
