use chatwidget_core::{Appearance, SubmitOutcome, ViewModel, WidgetConfig, WidgetController};
use tokio::sync::mpsc;

/// Terminal host for one mounted widget.
///
/// The controller owns the conversation; this struct only keeps what the
/// terminal needs on top of it: the input line, scrolling and the last view
/// the controller published.
pub struct App {
    pub should_quit: bool,
    pub widget: WidgetController,
    pub view: ViewModel,
    views: mpsc::UnboundedReceiver<ViewModel>,
    pub appearance: Appearance,

    // Input line
    pub input: String,
    pub cursor: usize, // cursor position in chars

    // Chat area
    pub chat_scroll: u16,
    pub follow_tail: bool,
    pub chat_height: u16, // updated during render
    pub chat_width: u16,

    pub animation_frame: u8, // 0-2 for typing indicator
}

impl App {
    pub fn new(config: &WidgetConfig) -> anyhow::Result<Self> {
        let widget = WidgetController::mount(config)?;
        Ok(Self::with_widget(widget))
    }

    pub fn with_widget(mut widget: WidgetController) -> Self {
        let (tx, views) = mpsc::unbounded_channel();
        widget.attach(tx);
        let appearance = widget.appearance().clone();

        let mut app = Self {
            should_quit: false,
            view: widget.view_model(),
            widget,
            views,
            appearance,
            input: String::new(),
            cursor: 0,
            chat_scroll: 0,
            follow_tail: true,
            chat_height: 0,
            chat_width: 0,
            animation_frame: 0,
        };
        app.sync_view();
        app
    }

    /// Drain published views, keeping the newest
    pub fn sync_view(&mut self) {
        while let Ok(view) = self.views.try_recv() {
            let changed = view.display_messages.len() != self.view.display_messages.len()
                || view.is_awaiting_reply != self.view.is_awaiting_reply;
            self.view = view;
            if changed {
                self.follow_tail = true;
            }
        }
    }

    /// Called on every tick event
    pub fn tick(&mut self) {
        self.widget.poll_reply();
        self.sync_view();
        if self.view.is_awaiting_reply {
            self.animation_frame = (self.animation_frame + 1) % 3;
        } else {
            self.animation_frame = 0;
        }
    }

    pub fn toggle(&mut self) {
        self.widget.toggle_visibility();
        self.sync_view();
    }

    /// Send the input line. It is only cleared when the widget accepted it.
    pub fn submit_input(&mut self) {
        if let SubmitOutcome::Accepted(_) = self.widget.submit(&self.input) {
            self.input.clear();
            self.cursor = 0;
        }
        self.sync_view();
    }

    pub fn quit(&mut self) {
        self.widget.unmount();
        self.should_quit = true;
    }

    // Input editing

    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.input.chars().count() {
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.input.chars().count());
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.input.chars().count();
    }

    // Chat scrolling

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_tail = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.max_scroll();
        self.chat_scroll = (self.chat_scroll + lines).min(max);
        if self.chat_scroll == max {
            self.follow_tail = true;
        }
    }

    /// Pin the chat to its last line if following the tail
    pub fn update_scroll(&mut self) {
        if self.follow_tail {
            self.chat_scroll = self.max_scroll();
        }
    }

    fn max_scroll(&self) -> u16 {
        let height = if self.chat_height > 0 { self.chat_height } else { 20 };
        self.chat_line_count().saturating_sub(height)
    }

    /// Rows the chat occupies once wrapped, mirroring the layout in ui.rs
    pub fn chat_line_count(&self) -> u16 {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total: usize = 0;
        for message in &self.view.display_messages {
            total += 1; // sender and time label
            for line in message.text.lines() {
                total += wrapped_rows(line, wrap_width);
            }
            total += 1; // blank line after message
        }
        if self.view.is_awaiting_reply {
            total += 2;
        }
        total.min(u16::MAX as usize) as u16
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

fn wrapped_rows(line: &str, width: usize) -> usize {
    let chars = line.chars().count();
    if chars == 0 {
        1
    } else {
        chars.div_ceil(width.max(1))
    }
}
