use std::cmp;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy)]
pub struct Column<'a> {
    pub name: &'a str,
    pub align: Align,
}

impl<'a> Column<'a> {
    pub const fn left(name: &'a str) -> Self {
        Self {
            name,
            align: Align::Left,
        }
    }

    pub const fn right(name: &'a str) -> Self {
        Self {
            name,
            align: Align::Right,
        }
    }
}

const INDENT: usize = 2;
const COLUMN_GAP: usize = 2;
const MIN_COLUMN_WIDTH: usize = 6;

pub fn terminal_width() -> usize {
    let columns = std::env::var("COLUMNS")
        .ok()
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(120);
    cmp::max(columns, 40)
}

pub fn key_value_rows(entries: &[(&str, String)], indent: usize) -> Vec<String> {
    let label_width = entries
        .iter()
        .map(|(label, _)| label.len())
        .max()
        .unwrap_or(0);
    let padding = " ".repeat(indent);

    entries
        .iter()
        .map(|(label, value)| format!("{padding}{label:<label_width$}  {value}"))
        .collect()
}

/// Renders `rows` as an aligned table, wrapping long cells onto extra lines.
///
/// When the columns cannot fit in `max_width` even at their minimum widths,
/// each row is printed as a labelled block instead.
pub fn render_table_or_blocks(
    columns: &[Column<'_>],
    rows: &[Vec<String>],
    max_width: usize,
    block_label: &str,
) -> Vec<String> {
    if columns.is_empty() {
        return Vec::new();
    }

    let minimums: Vec<usize> = columns
        .iter()
        .map(|column| cmp::max(column.name.len(), MIN_COLUMN_WIDTH))
        .collect();
    let gaps = COLUMN_GAP * columns.len().saturating_sub(1);
    let budget = max_width.saturating_sub(INDENT + gaps);

    let Some(widths) = fit_widths(&natural_widths(columns, rows), &minimums, budget) else {
        return render_blocks(columns, rows, block_label);
    };

    let header: Vec<String> = columns.iter().map(|column| column.name.to_string()).collect();
    let mut output = vec![format_line(columns, &header, &widths)];

    for row in rows {
        let wrapped: Vec<Vec<String>> = widths
            .iter()
            .enumerate()
            .map(|(index, width)| wrap_cell(row.get(index).map_or("", String::as_str), *width))
            .collect();
        let height = wrapped.iter().map(Vec::len).max().unwrap_or(1);

        for line in 0..height {
            let cells: Vec<String> = wrapped
                .iter()
                .map(|chunks| chunks.get(line).cloned().unwrap_or_default())
                .collect();
            output.push(format_line(columns, &cells, &widths));
        }
    }

    output
}

fn natural_widths(columns: &[Column<'_>], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = columns.iter().map(|column| column.name.len()).collect();
    for row in rows {
        for (width, value) in widths.iter_mut().zip(row) {
            *width = cmp::max(*width, value.chars().count());
        }
    }
    widths
}

// Shrinks the widest columns first until the row fits, never below a minimum.
fn fit_widths(natural: &[usize], minimums: &[usize], budget: usize) -> Option<Vec<usize>> {
    if minimums.iter().sum::<usize>() > budget {
        return None;
    }

    let mut widths: Vec<usize> = natural
        .iter()
        .zip(minimums)
        .map(|(natural, minimum)| cmp::max(*natural, *minimum))
        .collect();
    let mut total: usize = widths.iter().sum();

    while total > budget {
        let widest = widths
            .iter()
            .enumerate()
            .filter(|(index, width)| **width > minimums[*index])
            .max_by_key(|(_, width)| **width)
            .map(|(index, _)| index)?;
        widths[widest] -= 1;
        total -= 1;
    }

    Some(widths)
}

fn format_line(columns: &[Column<'_>], cells: &[String], widths: &[usize]) -> String {
    let pieces: Vec<String> = columns
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(index, (column, width))| {
            let value = cells.get(index).map_or("", String::as_str);
            match column.align {
                Align::Left => format!("{value:<width$}"),
                Align::Right => format!("{value:>width$}"),
            }
        })
        .collect();

    format!("{}{}", " ".repeat(INDENT), pieces.join(&" ".repeat(COLUMN_GAP)))
        .trim_end()
        .to_string()
}

fn wrap_cell(value: &str, width: usize) -> Vec<String> {
    if width == 0 || value.chars().count() <= width {
        return vec![value.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    for word in value.split_whitespace() {
        let word_len = word.chars().count();
        let current_len = current.chars().count();

        if !current.is_empty() && current_len + 1 + word_len <= width {
            current.push(' ');
            current.push_str(word);
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if word_len <= width {
            current.push_str(word);
        } else {
            lines.extend(split_token(word, width));
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    if lines.is_empty() {
        vec![value.to_string()]
    } else {
        lines
    }
}

fn split_token(token: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = token.chars().collect();
    chars
        .chunks(cmp::max(width, 1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

fn render_blocks(columns: &[Column<'_>], rows: &[Vec<String>], block_label: &str) -> Vec<String> {
    let label_width = columns
        .iter()
        .map(|column| column.name.len() + 1)
        .max()
        .unwrap_or(0);

    let mut output = Vec::new();
    for (row_index, row) in rows.iter().enumerate() {
        if row_index > 0 {
            output.push(String::new());
        }
        output.push(format!("  {block_label} {}:", row_index + 1));
        for (column_index, column) in columns.iter().enumerate() {
            let label = format!("{}:", column.name);
            let value = row.get(column_index).map_or("", String::as_str);
            output.push(format!("    {label:<label_width$}  {value}"));
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::{Column, fit_widths, key_value_rows, render_table_or_blocks, split_token};

    fn columns() -> [Column<'static>; 3] {
        [
            Column::left("Date"),
            Column::right("Amount"),
            Column::left("Description"),
        ]
    }

    #[test]
    fn key_value_rows_align_labels() {
        let rows = key_value_rows(
            &[
                ("Rows read:", "12".to_string()),
                ("Rows invalid:", "1".to_string()),
            ],
            2,
        );

        assert_eq!(rows[0], "  Rows read:     12");
        assert_eq!(rows[1], "  Rows invalid:  1");
    }

    #[test]
    fn wide_terminal_renders_single_line_rows() {
        let rows = vec![vec![
            "2024-01-05".to_string(),
            "-12.50".to_string(),
            "COFFEE SHOP".to_string(),
        ]];

        let rendered = render_table_or_blocks(&columns(), &rows, 80, "Row");
        assert_eq!(rendered.len(), 2);
        assert!(rendered[0].contains("Description"));
        assert!(rendered[1].contains("COFFEE SHOP"));
        assert!(rendered[1].contains("-12.50"));
    }

    #[test]
    fn long_cells_wrap_without_truncation() {
        let rows = vec![vec![
            "2024-01-05".to_string(),
            "-12.50".to_string(),
            "MST 4411 SUPERMART ORCHARD ROAD SINGAPORE".to_string(),
        ]];

        let rendered = render_table_or_blocks(&columns(), &rows, 48, "Row");
        assert!(rendered.len() > 2);
        for word in ["SUPERMART", "ORCHARD", "SINGAPORE"] {
            assert!(rendered.iter().any(|line| line.contains(word)));
        }
    }

    #[test]
    fn narrow_width_falls_back_to_blocks() {
        let rows = vec![vec![
            "2024-01-05".to_string(),
            "-12.50".to_string(),
            "Coffee".to_string(),
        ]];

        let rendered = render_table_or_blocks(&columns(), &rows, 20, "Discrepancy");
        assert_eq!(rendered[0], "  Discrepancy 1:");
        assert!(rendered[1].contains("Date:"));
        assert!(rendered[3].contains("Description:"));
    }

    #[test]
    fn fit_widths_shrinks_widest_column_first() {
        let fitted = fit_widths(&[20, 12], &[8, 10], 24);
        assert_eq!(fitted, Some(vec![12, 12]));
        assert_eq!(fit_widths(&[20, 12], &[8, 10], 17), None);
    }

    #[test]
    fn split_token_handles_multibyte_characters() {
        assert_eq!(split_token("éééé", 3), vec!["ééé".to_string(), "é".to_string()]);
    }
}
