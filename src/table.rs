//! Plain-text tables for terminal previews.

use std::fmt::Write as _;

use itertools::Itertools;

const COLUMN_GAP: &str = "  ";

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let widths = headers
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            rows.iter()
                .filter_map(|row| row.get(idx))
                .map(|cell| cell_text(cell).chars().count())
                .chain(std::iter::once(cell_text(header).chars().count()))
                .max()
                .unwrap_or(0)
                .max(3)
        })
        .collect::<Vec<_>>();

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_line(headers, &widths));
    let rule = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_line(&rule, &widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_line(row, &widths));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn format_line(cells: &[String], widths: &[usize]) -> String {
    widths
        .iter()
        .enumerate()
        .map(|(idx, width)| {
            let text = cells.get(idx).map(|c| cell_text(c)).unwrap_or_default();
            format!("{text:<width$}")
        })
        .join(COLUMN_GAP)
        .trim_end()
        .to_string()
}

fn cell_text(value: &str) -> String {
    value.replace(['\n', '\r', '\t'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn aligns_columns_and_pads_missing_cells() {
        let rendered = render_table(
            &strings(&["Name", "Email"]),
            &[strings(&["Ada Lovelace", "ada@example.com"]), strings(&["Bob"])],
        );
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "Name          Email");
        assert_eq!(lines[1], "------------  ---------------");
        assert_eq!(lines[3], "Bob");
    }

    #[test]
    fn flattens_multiline_cells() {
        let rendered = render_table(&strings(&["v"]), &[strings(&["a\nb"]), strings(&["c\td"])]);
        assert_eq!(rendered.lines().nth(2), Some("a b"));
        assert_eq!(rendered.lines().nth(3), Some("c d"));
    }
}
