//! Grid rendering for table fields
//!
//! Stretch columns share whatever the fixed columns leave over; the delete-row
//! action column is always last.

use crate::model::field::{FieldControl, TextControl};
use crate::model::schema::{ColumnDefinition, ResizePolicy};
use crate::model::table::TableModel;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const SEPARATOR: &str = " │ ";
const SEPARATOR_WIDTH: u16 = 3;

/// Widths in cells for each column given the inner width of the panel
pub fn column_widths(columns: &[ColumnDefinition], total: u16) -> Vec<u16> {
    if columns.is_empty() {
        return Vec::new();
    }
    let gaps = SEPARATOR_WIDTH * (columns.len() as u16 - 1);
    let usable = total.saturating_sub(gaps);

    let fixed: u16 = columns
        .iter()
        .filter_map(|c| match c.column_type.resize_policy() {
            ResizePolicy::Fixed(w) => Some(w),
            ResizePolicy::Stretch => None,
        })
        .sum();
    let stretch: Vec<usize> = columns
        .iter()
        .enumerate()
        .filter(|(_, c)| c.column_type.resize_policy() == ResizePolicy::Stretch)
        .map(|(i, _)| i)
        .collect();

    let mut widths: Vec<u16> = columns
        .iter()
        .map(|c| match c.column_type.resize_policy() {
            ResizePolicy::Fixed(w) => w,
            ResizePolicy::Stretch => 0,
        })
        .collect();
    if stretch.is_empty() {
        return widths;
    }

    let remaining = usable.saturating_sub(fixed);
    let preferred: u16 = stretch
        .iter()
        .map(|&i| columns[i].column_type.preferred_width())
        .sum();
    let count = stretch.len() as u16;

    if remaining < preferred {
        let share = (remaining / count).max(1);
        for &i in &stretch {
            widths[i] = share;
        }
    } else {
        let extra = remaining - preferred;
        let each = extra / count;
        let leftover = extra % count;
        for (n, &i) in stretch.iter().enumerate() {
            widths[i] = columns[i].column_type.preferred_width() + each;
            if n == 0 {
                widths[i] += leftover;
            }
        }
    }
    widths
}

/// Pad or cut `text` to exactly `width` display cells
pub fn fit(text: &str, width: usize) -> String {
    if text.width() <= width {
        let pad = width - text.width();
        return format!("{}{}", text, " ".repeat(pad));
    }
    let mut out = String::new();
    let mut used = 0;
    let limit = width.saturating_sub(1);
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > limit {
            break;
        }
        out.push(c);
        used += w;
    }
    if width > 0 {
        out.push('…');
        used += 1;
    }
    out.push_str(&" ".repeat(width.saturating_sub(used)));
    out
}

fn cell_text(cell: &FieldControl) -> String {
    match cell {
        FieldControl::Boolean(b) => if b.checked() { "✓" } else { "·" }.to_string(),
        other => other.display(),
    }
}

/// Header, separator and one line per visible row
pub fn build_table_lines(
    table: &TableModel,
    widths: &[u16],
    focused: bool,
    edit_buffer: Option<&TextControl>,
    visible_rows: usize,
) -> Vec<Line<'static>> {
    let columns = table.display_columns();
    let mut lines = Vec::new();

    let header: Vec<Span> = columns
        .iter()
        .zip(widths)
        .enumerate()
        .flat_map(|(i, (col, w))| {
            let mut spans = vec![Span::styled(
                fit(&col.name, *w as usize),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )];
            if i + 1 < columns.len() {
                spans.push(Span::styled(SEPARATOR, Style::default().fg(Color::DarkGray)));
            }
            spans
        })
        .collect();
    lines.push(Line::from(header));

    let separator = widths
        .iter()
        .map(|w| "─".repeat(*w as usize))
        .collect::<Vec<_>>()
        .join("─┼─");
    lines.push(Line::from(Span::styled(
        separator,
        Style::default().fg(Color::DarkGray),
    )));

    if table.row_count() == 0 {
        lines.push(Line::from(Span::styled(
            "No rows. Press 'a' to add one.",
            Style::default().fg(Color::DarkGray),
        )));
        return lines;
    }

    let (cursor_row, cursor_col) = table.cursor();
    let offset = cursor_row.saturating_sub(visible_rows.saturating_sub(1));

    for (r, row) in table
        .table_rows()
        .iter()
        .enumerate()
        .skip(offset)
        .take(visible_rows.max(1))
    {
        let mut spans = Vec::new();
        for (c, w) in widths.iter().enumerate() {
            let is_cursor = focused && r == cursor_row && c == cursor_col;
            let text = match (row.cells.get(c), is_cursor, edit_buffer) {
                (_, true, Some(buffer)) => buffer.text().to_string(),
                (Some(cell), _, _) => cell_text(cell),
                (None, _, _) => "✕".to_string(),
            };
            let base = if c == widths.len() - 1 {
                Style::default().fg(Color::Red)
            } else {
                Style::default().fg(Color::White)
            };
            let style = if is_cursor {
                base.bg(Color::Blue).add_modifier(Modifier::BOLD)
            } else if r == cursor_row && focused {
                base.bg(Color::Rgb(30, 30, 50))
            } else {
                base
            };
            spans.push(Span::styled(fit(&text, *w as usize), style));
            if c + 1 < widths.len() {
                spans.push(Span::styled(SEPARATOR, Style::default().fg(Color::DarkGray)));
            }
        }
        lines.push(Line::from(spans));
    }
    lines
}

pub fn draw_table(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    table: &TableModel,
    focused: bool,
    edit_buffer: Option<&TextControl>,
) {
    let inner_width = area.width.saturating_sub(2);
    let widths = column_widths(&table.display_columns(), inner_width);
    let visible_rows = area.height.saturating_sub(4) as usize;
    let lines = build_table_lines(table, &widths, focused, edit_buffer, visible_rows);

    let border = if focused { Color::Cyan } else { Color::DarkGray };
    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ({} rows) ", title, table.row_count()))
            .border_style(Style::default().fg(border)),
    );
    frame.render_widget(paragraph, area);
}
