//! Category list rendering.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
};

use crate::app::{App, PanelFocus};

use super::theme;

/// Render the category panel.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let items: Vec<ListItem> = app
        .categories
        .categories()
        .iter()
        .map(|category| {
            let swatch = Span::styled(
                "\u{25a0} ",
                ratatui::style::Style::default()
                    .fg(theme::hex_color(&category.color, app.theme.fg_dim)),
            );
            let name = Span::styled(category.name.clone(), app.theme.normal());
            ListItem::new(Line::from(vec![swatch, name]))
        })
        .collect();

    let border = if app.focus == PanelFocus::Categories {
        app.theme.focused_border()
    } else {
        app.theme.normal()
    };
    let block = Block::default()
        .title("Categories (n: new)")
        .borders(Borders::ALL)
        .border_style(border);

    let list = List::new(items)
        .block(block)
        .highlight_style(app.theme.selected());

    let mut state = ListState::default();
    if !app.categories.categories().is_empty() && app.focus == PanelFocus::Categories {
        state.select(Some(app.selected_category));
    }
    frame.render_stateful_widget(list, area, &mut state);
}
