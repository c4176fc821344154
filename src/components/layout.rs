//! Layout calculations for the UI

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Main screen layout areas
pub struct MainLayout {
    pub title: Rect,
    pub body: Rect,
    pub status: Rect,
    pub help: Rect,
}

/// Form body areas
pub struct FormLayout {
    pub tabs: Rect,
    pub list: Rect,
    pub detail: Rect,
    pub table: Option<Rect>,
}

/// Calculate centered popup area
pub fn centered_popup(area: Rect, width: u16, height: u16) -> Rect {
    let popup_x = area.x + (area.width.saturating_sub(width)) / 2;
    let popup_y = area.y + (area.height.saturating_sub(height)) / 2;

    Rect::new(
        popup_x,
        popup_y,
        width.min(area.width),
        height.min(area.height),
    )
}

/// Title bar, body, status line and help bar
pub fn calculate_main_layout(area: Rect) -> MainLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(3),
        ])
        .split(area);

    MainLayout {
        title: chunks[0],
        body: chunks[1],
        status: chunks[2],
        help: chunks[3],
    }
}

/// Page tabs on top, field list left, detail (and table) right
pub fn calculate_form_layout(area: Rect, has_table: bool) -> FormLayout {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(0)])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(vertical[1]);

    let (detail, table) = if has_table {
        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(10), Constraint::Min(0)])
            .split(horizontal[1]);
        (right[0], Some(right[1]))
    } else {
        (horizontal[1], None)
    };

    FormLayout {
        tabs: vertical[0],
        list: horizontal[0],
        detail,
        table,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_popup_is_centered_and_clamped() {
        let area = Rect::new(0, 0, 100, 40);
        assert_eq!(centered_popup(area, 60, 20), Rect::new(20, 10, 60, 20));
        assert_eq!(centered_popup(area, 200, 80), Rect::new(0, 0, 100, 40));
    }

    #[test]
    fn test_table_area_only_when_page_has_table() {
        let area = Rect::new(0, 0, 120, 40);
        assert!(calculate_form_layout(area, false).table.is_none());
        let with_table = calculate_form_layout(area, true);
        let table = with_table.table.unwrap();
        assert_eq!(with_table.detail.height, 10);
        assert_eq!(table.y, with_table.detail.y + 10);
    }
}
