//! Plain-text tables for terminal output. Columns whose cells all look like
//! amounts are right-aligned.

use std::borrow::Cow;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
}

pub fn render_table<H, C>(headers: &[H], rows: &[Vec<C>]) -> String
where
    H: AsRef<str>,
    C: AsRef<str>,
{
    let column_count = headers.len();
    let mut widths = headers
        .iter()
        .map(|h| display_width(h.as_ref()).max(3))
        .collect::<Vec<_>>();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(display_width(cell.as_ref()));
        }
    }
    let aligns = (0..column_count)
        .map(|idx| column_alignment(rows.iter().filter_map(|row| row.get(idx))))
        .collect::<Vec<_>>();

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths, &aligns));
    let separator = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separator, &widths, &aligns));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths, &aligns));
    }
    output
}

pub fn print_table<H, C>(headers: &[H], rows: &[Vec<C>])
where
    H: AsRef<str>,
    C: AsRef<str>,
{
    print!("{}", render_table(headers, rows));
}

fn looks_numeric(value: &str) -> bool {
    let trimmed = value.trim();
    let digits = trimmed.replace(',', "");
    trimmed.chars().any(|c| c.is_ascii_digit()) && digits.parse::<f64>().is_ok()
}

fn column_alignment<'a, C, I>(cells: I) -> Align
where
    C: AsRef<str> + 'a,
    I: Iterator<Item = &'a C>,
{
    let mut seen = false;
    for cell in cells {
        let cell = cell.as_ref();
        if cell.trim().is_empty() {
            continue;
        }
        if !looks_numeric(cell) {
            return Align::Left;
        }
        seen = true;
    }
    if seen { Align::Right } else { Align::Left }
}

fn format_row<V: AsRef<str>>(values: &[V], widths: &[usize], aligns: &[Align]) -> String {
    let mut cells = Vec::with_capacity(widths.len());
    for (idx, width) in widths.iter().enumerate() {
        let value = values.get(idx).map(|v| v.as_ref()).unwrap_or("");
        let sanitized = sanitize_cell(value);
        let padding = " ".repeat(width.saturating_sub(display_width(&sanitized)));
        let cell = match aligns.get(idx).copied().unwrap_or(Align::Left) {
            Align::Left => format!("{sanitized}{padding}"),
            Align::Right => format!("{padding}{sanitized}"),
        };
        cells.push(cell);
    }
    cells.join("  ").trim_end().to_string()
}

fn display_width(value: &str) -> usize {
    let mut width = 0usize;
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch == '\u{1b}' {
            // ANSI escape sequence such as \x1b[31m
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else {
            width += 1;
        }
    }
    width
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
