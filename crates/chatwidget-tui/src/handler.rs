use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::App;
use crate::tui::WidgetEvent;

pub fn handle_event(app: &mut App, event: WidgetEvent) {
    match event {
        WidgetEvent::Key(key) => handle_key(app, key),
        WidgetEvent::Resize => {}
        WidgetEvent::Tick => app.tick(),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    // Global keys that work whether or not the pop-up is open
    match key.code {
        KeyCode::Char('c') if ctrl => {
            app.quit();
            return;
        }
        KeyCode::Char('o') if ctrl => {
            app.toggle();
            return;
        }
        KeyCode::Esc => {
            app.toggle();
            return;
        }
        _ => {}
    }

    if !app.view.is_open {
        // The closed widget is just the button; Enter or Space presses it
        if matches!(key.code, KeyCode::Enter | KeyCode::Char(' ')) {
            app.toggle();
        }
        return;
    }

    match key.code {
        KeyCode::Enter => app.submit_input(),
        KeyCode::Backspace => app.backspace(),
        KeyCode::Delete => app.delete(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::PageUp => app.scroll_up(app.chat_height.max(1)),
        KeyCode::PageDown => app.scroll_down(app.chat_height.max(1)),
        KeyCode::Char(c) if !ctrl => app.insert_char(c),
        _ => {}
    }
}
