use crate::table::{DataTable, cell_text};

/// Configuration for plain-text table output
#[derive(Debug, Clone)]
pub struct TextTableConfig {
    /// Longest cell rendered before truncation with `…` (0 = unlimited)
    pub max_cell_width: usize,

    /// Column separator
    pub separator: String,
}

impl Default for TextTableConfig {
    fn default() -> Self {
        Self { max_cell_width: 40, separator: " | ".to_string() }
    }
}

/// Render a table as aligned plain text with a header underline
pub fn to_text_table(table: &DataTable, config: &TextTableConfig) -> String {
    if table.columns.is_empty() {
        return String::new();
    }

    let header: Vec<String> = table.columns.iter().map(|c| fit(c, config.max_cell_width)).collect();
    let body: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| row.iter().map(|v| fit(&cell_text(v), config.max_cell_width)).collect())
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in &body {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut lines = Vec::with_capacity(body.len() + 2);
    lines.push(render_line(&header, &widths, &config.separator));
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join(&"-".repeat(config.separator.chars().count())),
    );
    for row in &body {
        lines.push(render_line(row, &widths, &config.separator));
    }

    lines.join("\n")
}

fn render_line(cells: &[String], widths: &[usize], separator: &str) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = width))
        .collect::<Vec<_>>()
        .join(separator)
        .trim_end()
        .to_string()
}

/// Single-line cell, cut to `max` characters
fn fit(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if max == 0 || flat.chars().count() <= max {
        return flat;
    }
    let kept: String = flat.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", kept)
}
