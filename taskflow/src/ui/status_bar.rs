//! Status bar rendering.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
};

use crate::app::App;

/// Render the one-line status bar.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let user = app
        .user
        .as_ref()
        .map_or("(signed out)", |u| u.display_name.as_str());
    let pending = app.manager.pending_len();
    let connection = if app.connected { "online" } else { "offline" };

    let clock = chrono::Local::now()
        .format(&app.timestamp_format)
        .to_string();
    let mut spans = vec![Span::raw(format!(
        " {clock} \u{2502} {user} \u{2502} {connection}"
    ))];
    if pending > 0 {
        spans.push(Span::styled(
            format!(" \u{2502} {pending} pending"),
            ratatui::style::Style::default().fg(app.theme.warning),
        ));
    }
    if let Some(ref notice) = app.notice {
        spans.push(Span::styled(
            format!(" \u{2502} {notice}"),
            ratatui::style::Style::default().fg(app.theme.warning),
        ));
    } else {
        spans.push(Span::raw(
            " \u{2502} Tab: focus  Space: toggle  m: move  e: edit  d: delete  r: reset  t: theme  T: color  q: quit",
        ));
    }

    let bar = Paragraph::new(Line::from(spans)).style(app.theme.status_bar());
    frame.render_widget(bar, area);
}
