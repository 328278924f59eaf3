use std::borrow::Cow;
use std::fmt::Write as _;

/// Renders an ASCII table with a dashed separator under the header row.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let column_count = headers.len();
    let mut widths = headers.iter().map(|h| h.chars().count()).collect::<Vec<_>>();

    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(sanitize_cell(cell).chars().count());
        }
    }

    for width in &mut widths {
        *width = (*width).max(3);
    }

    let mut output = String::new();
    let header_cells = headers.iter().map(|h| h.to_string()).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&header_cells, &widths));

    let separator_cells = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separator_cells, &widths));

    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }

    output
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let mut line = values
        .iter()
        .zip(widths)
        .map(|(value, width)| {
            let sanitized = sanitize_cell(value);
            format!("{:<width$}", sanitized, width = *width)
        })
        .collect::<Vec<_>>()
        .join("  ");
    while line.ends_with(' ') {
        line.pop();
    }
    line
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_table_pads_columns_and_trims_trailing_space() {
        let rows = vec![
            vec!["1".to_string(), "created".to_string(), "DateTime".to_string()],
            vec!["2".to_string(), "id".to_string(), "Int64".to_string()],
        ];
        let rendered = render_table(&["#", "name", "type"], &rows);
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "#    name     type");
        assert_eq!(lines[1], "---  -------  --------");
        assert_eq!(lines[2], "1    created  DateTime");
        assert_eq!(lines[3], "2    id       Int64");
    }

    #[test]
    fn control_characters_become_spaces() {
        let rows = vec![vec!["a\tb".to_string()]];
        let rendered = render_table(&["v"], &rows);
        assert!(rendered.contains("a b"));
    }
}
