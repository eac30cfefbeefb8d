//! Task list rendering.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState},
};

use crate::app::{App, Mode, PanelFocus};

use super::theme;

/// Checkbox glyph for a task row.
fn checkbox(completed: bool, locked: bool) -> &'static str {
    if completed {
        "[\u{2713}]"
    } else if locked {
        "[\u{2022}]"
    } else {
        "[ ]"
    }
}

/// Render the checklist panel: the task list with a progress gauge under it.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);

    render_list(frame, chunks[0], app);
    render_progress(frame, chunks[1], app);
}

fn render_list(frame: &mut Frame, area: Rect, app: &App) {
    let items: Vec<ListItem> = app
        .manager
        .tasks()
        .iter()
        .map(|task| {
            let style = if task.locked {
                app.theme.locked_style()
            } else if task.completed {
                app.theme.dimmed().add_modifier(Modifier::CROSSED_OUT)
            } else {
                app.theme.normal()
            };
            let mut spans = vec![
                Span::styled(checkbox(task.completed, task.locked), style),
                Span::raw(" "),
            ];
            if let Some(color) = app.categories.color_of(task.category_id) {
                spans.push(Span::styled(
                    "\u{25cf} ",
                    Style::default().fg(theme::hex_color(color, app.theme.fg_dim)),
                ));
            }
            spans.push(Span::styled(task.text.clone(), style));
            if task.locked {
                spans.push(Span::styled("  locked", app.theme.locked_style()));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let title = if app.mode == Mode::Move {
        "Tasks (moving: \u{2191}\u{2193}, Esc done)"
    } else {
        "Tasks"
    };
    let border = if app.focus == PanelFocus::Checklist {
        app.theme.focused_border()
    } else {
        app.theme.normal()
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border);

    let list = List::new(items)
        .block(block)
        .highlight_style(app.theme.selected());

    let mut state = ListState::default();
    if !app.manager.tasks().is_empty() && app.focus == PanelFocus::Checklist {
        state.select(Some(app.selected_task));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_progress(frame: &mut Frame, area: Rect, app: &App) {
    let percent = app.manager.progress_percent();
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(app.theme.highlight).bg(app.theme.bg))
        .percent(u16::from(percent))
        .label(format!("{percent}% done"));
    frame.render_widget(gauge, area);
}
