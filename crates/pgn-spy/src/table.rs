//! Plain-text rendering of a report.

use move_quality::Report;

/// Render `report` as an aligned table followed by the run summary.
pub fn render(report: &Report) -> String {
    let header = report.columns();
    let rows: Vec<Vec<String>> = report
        .rows
        .iter()
        .map(|row| {
            let mut cells = vec![row.position_type.to_string(), row.positions.to_string()];
            cells.extend(row.best_matches.iter().map(usize::to_string));
            cells.push(
                row.avg_centipawn_loss
                    .map(|loss| format!("{:.2}", loss))
                    .unwrap_or_else(|| "-".to_string()),
            );
            cells
        })
        .collect();

    let widths: Vec<usize> = (0..header.len())
        .map(|col| {
            std::iter::once(&header[col])
                .chain(rows.iter().map(|r| &r[col]))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    push_line(&mut out, &header, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&mut out, &rule, &widths);
    for row in &rows {
        push_line(&mut out, row, &widths);
    }
    out.push('\n');
    out.push_str(&format!(
        "Analysed moves: {} / {}\n",
        report.analysed_moves, report.player_moves
    ));
    out
}

/// First column left-aligned, the rest right-aligned.
fn push_line(out: &mut String, cells: &[String], widths: &[usize]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(i, (cell, &width))| {
            if i == 0 {
                format!("{:<width$}", cell)
            } else {
                format!("{:>width$}", cell)
            }
        })
        .collect();
    out.push_str(line.join("  ").trim_end());
    out.push('\n');
}
