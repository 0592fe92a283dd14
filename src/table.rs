//! Plain-text table rendering for terminal output.

use std::fmt::Write as _;

use itertools::Itertools;

/// Renders `rows` under `headers`. Columns whose every cell looks numeric
/// (including `$`/`%` decorations) are right-aligned.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let column_count = headers.len();
    let mut widths = headers.iter().map(|h| h.chars().count()).collect::<Vec<_>>();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(cell.chars().count());
        }
    }
    for width in &mut widths {
        *width = (*width).max(3);
    }
    let numeric = (0..column_count)
        .map(|idx| {
            !rows.is_empty()
                && rows
                    .iter()
                    .all(|row| row.get(idx).is_none_or(|cell| looks_numeric(cell)))
        })
        .collect::<Vec<_>>();

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths, &numeric));
    let separator = widths.iter().map(|w| "-".repeat(*w)).join("  ");
    let _ = writeln!(output, "{separator}");
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths, &numeric));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn format_row(values: &[String], widths: &[usize], numeric: &[bool]) -> String {
    values
        .iter()
        .zip(widths)
        .zip(numeric)
        .map(|((value, width), right)| {
            let width = *width;
            let cell = value.replace(['\n', '\r', '\t'], " ");
            if *right {
                format!("{cell:>width$}")
            } else {
                format!("{cell:<width$}")
            }
        })
        .join("  ")
        .trim_end()
        .to_string()
}

fn looks_numeric(cell: &str) -> bool {
    let stripped = cell
        .trim()
        .trim_start_matches('-')
        .trim_start_matches('$')
        .trim_end_matches('%')
        .replace(',', "");
    !stripped.is_empty() && stripped.parse::<f64>().is_ok()
}
