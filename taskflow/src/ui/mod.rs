//! Terminal UI rendering.

pub mod category_panel;
pub mod checklist_panel;
pub mod sign_in;
pub mod status_bar;
pub mod theme;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::app::{App, Mode, PanelFocus, Screen};

/// Main draw function for the entire UI.
pub fn draw(frame: &mut Frame, app: &App) {
    if app.screen == Screen::SignIn {
        sign_in::render(frame, frame.area(), app);
        return;
    }

    // Input line on top, status bar at the bottom, content in between.
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_input(frame, main_chunks[0], app);

    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(main_chunks[1]);

    checklist_panel::render(frame, content_chunks[0], app);
    category_panel::render(frame, content_chunks[1], app);
    status_bar::render(frame, main_chunks[2], app);

    if let Mode::ConfirmDelete(id) = app.mode {
        render_delete_modal(frame, app, id);
    }
}

/// Renders the input line, retitled for whichever draft is being edited.
fn render_input(frame: &mut Frame, area: Rect, app: &App) {
    let title = match app.mode {
        Mode::EditingTask(_) => "Edit task",
        Mode::EditingCategory(_) => "Rename category",
        Mode::NewCategory => "New category",
        Mode::Normal | Mode::Move | Mode::ConfirmDelete(_) => "Add task",
    };
    let editing = !matches!(app.mode, Mode::Normal | Mode::Move | Mode::ConfirmDelete(_));
    let border = if app.focus == PanelFocus::Input || editing {
        app.theme.focused_border()
    } else {
        app.theme.normal()
    };
    let input = Paragraph::new(app.input.as_str())
        .style(app.theme.normal())
        .block(Block::default().borders(Borders::ALL).title(title).border_style(border));
    frame.render_widget(input, area);

    if app.focus == PanelFocus::Input || editing {
        let cursor_x = area.x + 1 + u16::try_from(app.cursor_position).unwrap_or(u16::MAX);
        frame.set_cursor_position((cursor_x.min(area.right().saturating_sub(2)), area.y + 1));
    }
}

/// Renders the delete confirmation modal over the checklist.
fn render_delete_modal(frame: &mut Frame, app: &App, id: taskflow_proto::task::TaskId) {
    let text = app
        .manager
        .task(id)
        .map_or_else(String::new, |t| t.text.clone());
    let area = centered_rect(50, 5, frame.area());
    frame.render_widget(Clear, area);
    let body = vec![
        Line::from(Span::styled(
            format!("Delete \"{text}\"?"),
            app.theme.normal(),
        )),
        Line::from(""),
        Line::from(Span::styled("y: delete   n: cancel", app.theme.dimmed())),
    ];
    let modal = Paragraph::new(body).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Confirm delete")
            .border_style(
                ratatui::style::Style::default().fg(app.theme.error),
            ),
    );
    frame.render_widget(modal, area);
}

/// A centered rectangle of at most `width` columns and `height` rows.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    }
}
