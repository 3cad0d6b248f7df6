use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Frame,
};

use super::catalog::CatalogState;
use super::drop_list::{Badge, DropEntryView, ListBody};
use super::editor::{DropEditor, EditorPhase, Field};
use super::targets::{TargetRow, EMPTY_PLACEHOLDER};
use super::{display_user, App};
use crate::format::{sanitize, single_line, truncate};
use crate::models::TargetCategory;

const ACCENT: Color = Color::Cyan;
const HEADER_BG: Color = Color::DarkGray;
const SELECTED_BG: Color = Color::Rgb(40, 40, 60);
const DIM: Color = Color::DarkGray;
const GOOD: Color = Color::Green;
const WARN: Color = Color::Yellow;
const BAD: Color = Color::Red;

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

// ─── Main render ────────────────────────────────────────────────────────────

pub fn render(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.area());

    render_view_toggle(f, app, chunks[0]);
    render_user(f, app, chunks[0]);
    render_drops(f, app, chunks[1]);
    render_status_bar(f, app, chunks[2]);

    if app.editor.is_open() {
        render_editor(f, &app.editor, app.frame_count);
    }
    if let Some(pending) = &app.confirm_delete {
        render_confirm(f, &pending.title);
    }
}

fn spinner(frame: u64) -> &'static str {
    SPINNER[(frame as usize) % SPINNER.len()]
}

fn badge_color(category: TargetCategory) -> Color {
    match category {
        TargetCategory::General => GOOD,
        TargetCategory::Division => Color::Magenta,
        TargetCategory::YearGroup => Color::Blue,
        TargetCategory::Class => WARN,
        TargetCategory::Student => ACCENT,
    }
}

fn titled_block(title: String) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_style(Style::default().fg(ACCENT))
}

/// A `percent_x` by `percent_y` rectangle centred in `area`.
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let width = (u32::from(area.width) * u32::from(percent_x.min(100)) / 100) as u16;
    let height = (u32::from(area.height) * u32::from(percent_y.min(100)) / 100) as u16;
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

// ─── View toggle ────────────────────────────────────────────────────────────

fn render_view_toggle(f: &mut Frame, app: &App, area: Rect) {
    let toggles = app.views.toggles();
    let titles: Vec<Line> = toggles
        .iter()
        .enumerate()
        .map(|(i, (view, _))| {
            Line::from(vec![
                Span::styled(format!(" {} ", i + 1), Style::default().fg(DIM)),
                Span::styled(
                    format!("{} ", view.toggle_label()),
                    Style::default().fg(Color::White),
                ),
            ])
        })
        .collect();

    let selected = toggles.iter().position(|(_, on)| *on).unwrap_or(0);

    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .borders(Borders::BOTTOM)
                .title(" Droplet ")
                .title_style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)),
        )
        .select(selected)
        .highlight_style(
            Style::default()
                .fg(ACCENT)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        );

    f.render_widget(tabs, area);
}

fn render_user(f: &mut Frame, app: &App, header: Rect) {
    let who = format!(" {} ", single_line(&display_user(&app.user)));
    let width = (who.chars().count() as u16).min(header.width);
    let area = Rect {
        x: header.right().saturating_sub(width),
        y: header.y,
        width,
        height: 1,
    };
    f.render_widget(Paragraph::new(who).style(Style::default().fg(ACCENT)), area);
}

// ─── Status Bar ─────────────────────────────────────────────────────────────

fn render_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let (message, color) = match &app.error_message {
        Some(err) => (err.as_str(), BAD),
        None if app.list.is_loading() || app.is_deleting() => (app.status_message.as_str(), WARN),
        None => (app.status_message.as_str(), Color::White),
    };

    let status = Paragraph::new(Line::from(vec![
        Span::raw(" "),
        Span::styled(single_line(message), Style::default().fg(color)),
        Span::styled(
            "  q:quit  1/2:view  j/k:nav  n:new  e:edit  d:delete  r:refresh  L:logout  ",
            Style::default().fg(DIM),
        ),
    ]))
    .style(Style::default().bg(HEADER_BG));

    f.render_widget(status, area);
}

// ─── Drop list ──────────────────────────────────────────────────────────────

fn render_drops(f: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let view = app.list.view_model(&app.user);
    let block = titled_block(format!(" {} ", view.heading));

    let entries = match view.body {
        ListBody::Loading => {
            let p = Paragraph::new(format!("  {} Loading drops…", spinner(app.frame_count)))
                .style(Style::default().fg(WARN))
                .block(block);
            f.render_widget(p, chunks[0]);
            render_detail(f, None, chunks[1]);
            return;
        }
        ListBody::Error(message) => {
            let p = Paragraph::new(format!("  {message}"))
                .style(Style::default().fg(BAD))
                .wrap(Wrap { trim: true })
                .block(block);
            f.render_widget(p, chunks[0]);
            render_detail(f, None, chunks[1]);
            return;
        }
        ListBody::Empty(message) => {
            let p = Paragraph::new(format!("  {message}"))
                .style(Style::default().fg(DIM))
                .wrap(Wrap { trim: true })
                .block(block);
            f.render_widget(p, chunks[0]);
            render_detail(f, None, chunks[1]);
            return;
        }
        ListBody::Entries(entries) => entries,
    };

    let selected = app.list.state.selected;
    let title_width = chunks[0].width.saturating_sub(8) as usize;
    let items: Vec<ListItem> = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let is_selected = i == selected;
            let marker = if is_selected { "> " } else { "  " };
            let title_style = Style::default().fg(Color::White).add_modifier(Modifier::BOLD);

            let mut first = vec![
                Span::styled(marker, Style::default().fg(ACCENT)),
                Span::styled(
                    truncate(&entry.title, title_width),
                    if is_selected { title_style.bg(SELECTED_BG) } else { title_style },
                ),
            ];
            if entry.can_manage {
                first.push(Span::styled("  ✎", Style::default().fg(DIM)));
            }

            let mut badges = vec![Span::raw("    ")];
            badges.extend(badge_spans(&entry.badges));

            ListItem::new(vec![
                Line::from(first),
                Line::from(vec![
                    Span::raw("    "),
                    Span::styled(
                        format!("Posted {}  ·  Expires {}", entry.posted, entry.expires),
                        Style::default().fg(DIM),
                    ),
                ]),
                Line::from(badges),
            ])
        })
        .collect();

    let list = List::new(items).block(titled_block(format!(
        " {} ({}) ",
        view.heading,
        entries.len()
    )));

    app.list.state.inner.select(Some(selected));
    f.render_stateful_widget(list, chunks[0], &mut app.list.state.inner);

    render_detail(f, entries.get(selected), chunks[1]);
}

fn badge_spans(badges: &[Badge]) -> Vec<Span<'static>> {
    if badges.is_empty() {
        return vec![Span::styled("no targets", Style::default().fg(DIM))];
    }
    badges
        .iter()
        .flat_map(|b| {
            [
                Span::styled(
                    format!(" {} ", b.label),
                    Style::default().fg(Color::Black).bg(badge_color(b.category)),
                ),
                Span::raw(" "),
            ]
        })
        .collect()
}

fn render_detail(f: &mut Frame, entry: Option<&DropEntryView>, area: Rect) {
    let Some(entry) = entry else {
        let p = Paragraph::new("  Select a drop to view details.").block(titled_block(" Detail ".into()));
        f.render_widget(p, area);
        return;
    };

    let mut lines = vec![
        Line::from(Span::styled(
            entry.title.clone(),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(entry.tooltip.clone(), Style::default().fg(DIM))),
        Line::from(Span::styled(
            format!("Posted {}  ·  Expires {}", entry.posted, entry.expires),
            Style::default().fg(DIM),
        )),
        Line::from(badge_spans(&entry.badges)),
        Line::from(""),
    ];
    if entry.content.trim().is_empty() {
        lines.push(Line::from(Span::styled("(no content)", Style::default().fg(DIM))));
    } else {
        lines.extend(entry.content.lines().map(|l| Line::from(l.to_string())));
    }

    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(titled_block(" Detail ".into()));
    f.render_widget(p, area);
}

// ─── Editor modal ───────────────────────────────────────────────────────────

fn field_block(editor: &DropEditor, field: Field, title: String) -> Block<'static> {
    let focused = editor.focus == field && editor.phase == EditorPhase::Open;
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(if focused { ACCENT } else { DIM }))
}

fn text_value(editor: &DropEditor, field: Field, value: &str, hint: &str) -> Paragraph<'static> {
    let focused = editor.focus == field && editor.phase == EditorPhase::Open;
    let mut text = sanitize(value);
    if focused {
        text.push('▏');
    }
    let para = if value.is_empty() && !focused {
        Paragraph::new(Span::styled(hint.to_string(), Style::default().fg(DIM)))
    } else {
        Paragraph::new(text)
    };
    para.wrap(Wrap { trim: false })
        .block(field_block(editor, field, format!(" {} ", field.label())))
}

fn render_editor(f: &mut Frame, editor: &DropEditor, frame: u64) {
    let area = centered_rect(80, 85, f.area());
    f.render_widget(Clear, area);

    let outer = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", editor.heading()))
        .title_style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD));
    let inner = outer.inner(area);
    f.render_widget(outer, area);

    if editor.phase == EditorPhase::Loading {
        let p = Paragraph::new(format!("  {} Loading drop…", spinner(frame)))
            .style(Style::default().fg(WARN));
        f.render_widget(p, inner);
        return;
    }
    if let Some(err) = &editor.load_error {
        let p = Paragraph::new(vec![
            Line::from(Span::styled(single_line(err), Style::default().fg(BAD))),
            Line::from(""),
            Line::from(Span::styled("Esc to close", Style::default().fg(DIM))),
        ])
        .wrap(Wrap { trim: true });
        f.render_widget(p, inner);
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(4),
            Constraint::Length(2),
        ])
        .split(inner);

    f.render_widget(text_value(editor, Field::Title, &editor.title, "Title"), rows[0]);
    f.render_widget(
        text_value(editor, Field::Content, &editor.content, "Content (Ctrl+E opens $EDITOR)"),
        rows[1],
    );

    let dates = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[2]);
    f.render_widget(
        text_value(editor, Field::PostDate, &editor.post_date, "YYYY-MM-DD (optional)"),
        dates[0],
    );
    f.render_widget(
        text_value(editor, Field::ExpireDate, &editor.expire_date, "YYYY-MM-DD (never)"),
        dates[1],
    );

    let pickers = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(rows[3]);
    render_category_picker(f, editor, pickers[0]);
    render_name_picker(f, editor, pickers[1]);

    render_target_rows(f, editor, rows[4]);
    render_editor_footer(f, editor, frame, rows[5]);
}

fn render_category_picker(f: &mut Frame, editor: &DropEditor, area: Rect) {
    let line = match editor.catalog.category() {
        Some(c) => Line::from(vec![
            Span::styled("◀ ", Style::default().fg(DIM)),
            Span::styled(c.label(), Style::default().fg(badge_color(c))),
            Span::styled(" ▶", Style::default().fg(DIM)),
        ]),
        None => Line::from(Span::styled("◀ -- select type -- ▶", Style::default().fg(DIM))),
    };
    f.render_widget(
        Paragraph::new(line).block(field_block(
            editor,
            Field::Category,
            format!(" {} ", Field::Category.label()),
        )),
        area,
    );
}

fn render_name_picker(f: &mut Frame, editor: &DropEditor, area: Rect) {
    let catalog = &editor.catalog;
    let line = match &catalog.state {
        CatalogState::Idle => Line::from(Span::styled(
            "Select a target type first",
            Style::default().fg(DIM),
        )),
        CatalogState::Loading => Line::from(Span::styled("Loading…", Style::default().fg(WARN))),
        CatalogState::Empty => Line::from(Span::styled("None found", Style::default().fg(DIM))),
        CatalogState::Failed(msg) => {
            Line::from(Span::styled(single_line(msg), Style::default().fg(BAD)))
        }
        CatalogState::Loaded(options) => {
            let label = catalog.selected().map(|o| o.label.as_str()).unwrap_or("");
            Line::from(vec![
                Span::styled("◀ ", Style::default().fg(DIM)),
                Span::styled(label.to_string(), Style::default().fg(Color::White)),
                Span::styled(
                    format!(" ▶  ({}/{})  Enter: add", catalog.cursor + 1, options.len()),
                    Style::default().fg(DIM),
                ),
            ])
        }
    };
    f.render_widget(
        Paragraph::new(line).block(field_block(
            editor,
            Field::Name,
            format!(" {} ", Field::Name.label()),
        )),
        area,
    );
}

fn render_target_rows(f: &mut Frame, editor: &DropEditor, area: Rect) {
    let focused = editor.focus == Field::Targets;
    let items: Vec<ListItem> = editor
        .targets
        .rows()
        .into_iter()
        .map(|row| match row {
            TargetRow::Placeholder => {
                ListItem::new(Span::styled(EMPTY_PLACEHOLDER, Style::default().fg(DIM)))
            }
            TargetRow::Entry { index, category, label } => {
                let is_selected = focused && index == editor.target_cursor;
                let marker = if is_selected { "> " } else { "  " };
                let mut line = Line::from(vec![
                    Span::styled(marker, Style::default().fg(ACCENT)),
                    Span::styled(
                        format!(" {} ", category.label()),
                        Style::default().fg(Color::Black).bg(badge_color(category)),
                    ),
                    Span::raw(format!(" {label}")),
                ]);
                if is_selected {
                    line = line.style(Style::default().bg(SELECTED_BG));
                }
                ListItem::new(line)
            }
        })
        .collect();

    let title = format!(" {} ({}) ", Field::Targets.label(), editor.targets.len());
    let block = field_block(editor, Field::Targets, title);
    // Rebuilt each frame; ratatui scrolls just far enough to show the cursor.
    let mut state = ListState::default();
    if !editor.targets.is_empty() {
        state.select(Some(editor.target_cursor));
    }
    f.render_stateful_widget(List::new(items).block(block), area, &mut state);
}

fn render_editor_footer(f: &mut Frame, editor: &DropEditor, frame: u64, area: Rect) {
    let line = if editor.phase == EditorPhase::Submitting {
        Line::from(Span::styled(
            format!("{} Saving…", spinner(frame)),
            Style::default().fg(WARN),
        ))
    } else if let Some(err) = &editor.error {
        Line::from(Span::styled(single_line(err), Style::default().fg(BAD)))
    } else {
        Line::from(Span::styled(
            "Tab: next field  ←/→: choose  Enter: add target  x: remove  Ctrl+S: save  Esc: cancel",
            Style::default().fg(DIM),
        ))
    };
    f.render_widget(Paragraph::new(line).wrap(Wrap { trim: true }), area);
}

// ─── Delete confirmation ────────────────────────────────────────────────────

fn render_confirm(f: &mut Frame, title: &str) {
    let area = centered_rect(50, 20, f.area());
    f.render_widget(Clear, area);

    let name = if title.trim().is_empty() {
        "this drop".to_string()
    } else {
        format!("\"{}\"", truncate(&single_line(title), 40))
    };
    let p = Paragraph::new(vec![
        Line::from(format!("Delete {name}?")),
        Line::from(""),
        Line::from(Span::styled("y: delete   n: cancel", Style::default().fg(DIM))),
    ])
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Confirm ")
            .title_style(Style::default().fg(BAD).add_modifier(Modifier::BOLD)),
    );
    f.render_widget(p, area);
}
