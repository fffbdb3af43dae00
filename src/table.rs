//! Minimal fixed-width text table for terminal output.

use std::fmt::Write as _;

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths = headers.iter().map(|h| h.chars().count()).collect::<Vec<_>>();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(widths.len()) {
            widths[idx] = widths[idx].max(cell.chars().count());
        }
    }
    for width in &mut widths {
        *width = (*width).max(3);
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths));
    let separator = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separator, &widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let mut cells = Vec::with_capacity(values.len());
    for (idx, value) in values.iter().enumerate().take(widths.len()) {
        let mut cell = sanitize_cell(value);
        let padding = widths[idx].saturating_sub(cell.chars().count());
        if padding > 0 {
            cell.push_str(&" ".repeat(padding));
        }
        cells.push(cell);
    }
    let mut line = cells.join("  ");
    while line.ends_with(' ') {
        line.pop();
    }
    line
}

fn sanitize_cell(value: &str) -> String {
    value
        .chars()
        .map(|ch| match ch {
            '\n' | '\r' | '\t' => ' ',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn columns_align_to_widest_cell() {
        let rendered = render_table(
            &strings(&["col", "otra"]),
            &[strings(&["x", "valor largo"]), strings(&["yy", "z"])],
        );
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "col  otra");
        assert!(lines[1].starts_with("---"));
        assert_eq!(lines[2], "x    valor largo");
        assert_eq!(lines[3], "yy   z");
    }

    #[test]
    fn newlines_in_cells_are_flattened() {
        let rendered = render_table(&strings(&["c"]), &[strings(&["a\nb"])]);
        assert!(rendered.contains("a b"));
    }
}
