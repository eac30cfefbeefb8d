//! Sign-in screen rendering.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::app::{App, SignInField};

/// Render the sign-in / sign-up form centered in the terminal.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let form_area = super::centered_rect(48, 12, area);

    let field_line = |label: &str, value: &str, field: SignInField, mask: bool| {
        let shown = if mask {
            "*".repeat(value.chars().count())
        } else {
            value.to_string()
        };
        let style = if app.form.field == field {
            app.theme.focused_border()
        } else {
            app.theme.normal()
        };
        Line::from(vec![
            Span::styled(format!("{label:>13}: "), app.theme.dimmed()),
            Span::styled(shown, style),
            if app.form.field == field {
                Span::styled("\u{2588}", style)
            } else {
                Span::raw("")
            },
        ])
    };

    let mut lines = vec![
        Line::from(""),
        field_line("Email", &app.form.email, SignInField::Email, false),
        field_line("Password", &app.form.password, SignInField::Password, true),
    ];
    if app.form.creating {
        lines.push(field_line(
            "Display name",
            &app.form.display_name,
            SignInField::DisplayName,
            false,
        ));
    }
    lines.push(Line::from(""));
    if let Some(ref error) = app.form.error {
        lines.push(Line::from(Span::styled(
            format!("  {error}"),
            ratatui::style::Style::default().fg(app.theme.error),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  Tab: next field   F2: sign-in/sign-up   Enter: go",
        app.theme.dimmed(),
    )));

    let title = if app.form.creating {
        "TaskFlow \u{2014} create account"
    } else {
        "TaskFlow \u{2014} sign in"
    };
    let form = Paragraph::new(lines).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(app.theme.focused_border()),
    );
    frame.render_widget(form, form_area);
}
