use crossterm::event::{self, Event, KeyCode, KeyModifiers};
use std::time::Duration;

use super::editor::{EditorPhase, Field};
use super::view::View;
use super::{Action, App};

pub fn poll_event(timeout: Duration) -> anyhow::Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}

pub fn handle_key(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    if let (KeyCode::Char('c'), KeyModifiers::CONTROL) = (code, modifiers) {
        app.dispatch(Action::Quit);
        return;
    }

    // ── Delete confirmation intercepts all keys while open ────────────
    if app.confirm_delete.is_some() {
        match code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                app.dispatch(Action::ConfirmDelete)
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.dispatch(Action::CancelDelete)
            }
            _ => {}
        }
        return;
    }

    // ── Editor modal owns input while open ────────────────────────────
    if app.editor.is_open() {
        handle_editor_key(app, code, modifiers);
        return;
    }

    if let Some(action) = list_action(code) {
        app.dispatch(action);
    }
}

/// Key table for the list screen.
pub fn list_action(code: KeyCode) -> Option<Action> {
    let action = match code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Char('1') | KeyCode::Char('m') => Action::ShowView(View::Mine),
        KeyCode::Char('2') | KeyCode::Char('a') => Action::ShowView(View::All),
        KeyCode::Tab | KeyCode::BackTab => Action::ToggleView,
        KeyCode::Char('r') => Action::Refresh,
        KeyCode::Down | KeyCode::Char('j') => Action::SelectNext,
        KeyCode::Up | KeyCode::Char('k') => Action::SelectPrev,
        KeyCode::Home | KeyCode::Char('g') => Action::SelectFirst,
        KeyCode::End | KeyCode::Char('G') => Action::SelectLast,
        KeyCode::Char('n') => Action::NewDrop,
        KeyCode::Enter | KeyCode::Char('e') => Action::EditSelected,
        KeyCode::Delete | KeyCode::Char('d') => Action::DeleteSelected,
        KeyCode::Char('L') => Action::Logout,
        _ => return None,
    };
    Some(action)
}

fn handle_editor_key(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    let ctrl = modifiers.contains(KeyModifiers::CONTROL);
    match code {
        KeyCode::Esc => {
            app.editor.request_close();
            return;
        }
        KeyCode::Char('s') if ctrl => {
            app.editor.submit(&app.client);
            return;
        }
        KeyCode::Char('e')
            if ctrl
                && app.editor.focus == Field::Content
                && app.editor.phase == EditorPhase::Open =>
        {
            app.launch_editor = true;
            return;
        }
        KeyCode::Tab => {
            app.editor.focus = app.editor.focus.next();
            return;
        }
        KeyCode::BackTab => {
            app.editor.focus = app.editor.focus.prev();
            return;
        }
        _ => {}
    }

    let editor = &mut app.editor;
    match editor.focus {
        field if field.is_text() => match code {
            KeyCode::Char(c) if !ctrl => editor.input_char(c),
            KeyCode::Backspace => editor.backspace(),
            KeyCode::Enter if field == Field::Content => editor.newline(),
            KeyCode::Enter | KeyCode::Down => editor.focus = field.next(),
            KeyCode::Up => editor.focus = field.prev(),
            _ => {}
        },
        Field::Category => match code {
            KeyCode::Right | KeyCode::Char(' ') => editor.cycle_category(true, &app.client),
            KeyCode::Left => editor.cycle_category(false, &app.client),
            KeyCode::Enter | KeyCode::Down => editor.focus = Field::Name,
            KeyCode::Up => editor.focus = Field::ExpireDate,
            _ => {}
        },
        Field::Name => match code {
            KeyCode::Right | KeyCode::Char(' ') => editor.cycle_name(true),
            KeyCode::Left => editor.cycle_name(false),
            KeyCode::Enter | KeyCode::Char('+') => editor.add_selected_target(),
            KeyCode::Down => editor.focus = Field::Targets,
            KeyCode::Up => editor.focus = Field::Category,
            _ => {}
        },
        Field::Targets => match code {
            KeyCode::Down | KeyCode::Char('j') => editor.target_cursor_next(),
            KeyCode::Up | KeyCode::Char('k') => editor.target_cursor_prev(),
            KeyCode::Delete | KeyCode::Backspace | KeyCode::Char('x') => {
                editor.remove_selected_target()
            }
            _ => {}
        },
        _ => {}
    }
}
