use crate::config::Config;
use crate::state::{SessionController, SessionUpdate, TurnState, UserAction};
use crate::terminal::{self, TerminalType};
use crate::types::ChatMessage;
use crate::ui::input_metrics::{
    clamp_to_char_boundary_left, next_char_boundary, prev_char_boundary,
};
use crate::ui::render;
use crate::ui::transcript::{format_args_preview, transcript_lines};
use anyhow::{bail, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::layout::{Constraint, Direction, Layout};
use std::io::IsTerminal;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

const TICK_INTERVAL: Duration = Duration::from_millis(120);
const NOTICE_TTL: Duration = Duration::from_secs(4);
const SCROLL_STEP: usize = 5;

struct Notice {
    text: String,
    shown_at: Instant,
}

/// Terminal front end over the session controller. Holds display state
/// only; everything conversational lives behind the controller.
pub struct App {
    controller: SessionController,
    update_rx: mpsc::UnboundedReceiver<SessionUpdate>,
    terminal: TerminalType,
    messages: Vec<ChatMessage>,
    transcript: Vec<String>,
    state: TurnState,
    ended: bool,
    input: String,
    cursor: usize,
    scroll_offset: usize,
    follow_tail: bool,
    notice: Option<Notice>,
    poll_degraded: bool,
    should_quit: bool,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        if !std::io::stdin().is_terminal() || !std::io::stdout().is_terminal() {
            bail!("attache needs an interactive terminal");
        }

        let (controller, update_rx) = SessionController::new(&config);
        let terminal = terminal::setup()?;

        Ok(Self {
            controller,
            update_rx,
            terminal,
            messages: Vec::new(),
            transcript: Vec::new(),
            state: TurnState::AwaitingUserInput,
            ended: true,
            input: String::new(),
            cursor: 0,
            scroll_offset: 0,
            follow_tail: true,
            notice: None,
            poll_degraded: false,
            should_quit: false,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        self.controller.start_polling();

        let mut tick = tokio::time::interval(TICK_INTERVAL);
        while !self.should_quit {
            self.draw_frame()?;
            self.process_terminal_events()?;

            tokio::select! {
                _ = tick.tick() => {
                    self.expire_notice();
                }
                _ = tokio::signal::ctrl_c() => {
                    self.should_quit = true;
                }
                update = self.update_rx.recv() => {
                    match update {
                        Some(update) => self.handle_update(update),
                        None => self.should_quit = true,
                    }
                }
            }
        }

        self.controller.stop_polling();
        terminal::restore()?;
        Ok(())
    }

    fn handle_update(&mut self, update: SessionUpdate) {
        self.controller.apply_update(&update);

        match update {
            SessionUpdate::Snapshot { result, messages } => {
                self.poll_degraded = false;
                if result.changed {
                    self.messages = messages;
                    self.state = result.state;
                    self.ended = result.ended;
                    self.follow_tail = true;
                    self.refresh_transcript();
                }
            }
            SessionUpdate::PollFailed { .. } => {
                self.poll_degraded = true;
            }
            SessionUpdate::ActionCompleted(UserAction::Confirm { .. }) => {
                // The proposal block flips to its running state.
                self.refresh_transcript();
            }
            SessionUpdate::ActionCompleted(_) => {}
            SessionUpdate::ActionFailed { error, .. } => {
                self.show_notice(error.notice());
            }
        }
    }

    fn refresh_transcript(&mut self) {
        self.transcript = transcript_lines(&self.messages, self.controller.pending_confirmation());
    }

    fn draw_frame(&mut self) -> Result<()> {
        let status = self.status_line();
        let alert = self.notice.is_some() || self.poll_degraded;
        let input_enabled = self.input_enabled();
        let placeholder = self.input_placeholder();
        let modal = self.confirm_modal_content();
        let follow_tail = self.follow_tail;
        let scroll_offset = self.scroll_offset;
        let transcript = &self.transcript;
        let input = &self.input;
        let cursor = self.cursor;

        self.terminal.draw(|frame| {
            let size = frame.area();
            let layout = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Min(1),
                    Constraint::Length(1),
                    Constraint::Length(1),
                ])
                .split(size);

            let viewport = layout[0].height as usize;
            let max_scroll = transcript.len().saturating_sub(viewport);
            let scroll = if follow_tail {
                max_scroll
            } else {
                scroll_offset.min(max_scroll)
            };

            render::render_messages(frame, layout[0], transcript, scroll);
            render::render_status_line(frame, layout[1], &status, alert);
            render::render_input(frame, layout[2], input, cursor, input_enabled, &placeholder);

            if let Some((tool, args_preview)) = &modal {
                render::render_confirm_modal(frame, tool, args_preview);
            }
        })?;

        Ok(())
    }

    fn process_terminal_events(&mut self) -> Result<()> {
        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Paste(text) => {
                    if self.input_enabled() && !text.is_empty() {
                        self.insert_text(&sanitize_paste(&text));
                    }
                }
                Event::Key(key)
                    if key.kind == KeyEventKind::Press || key.kind == KeyEventKind::Repeat =>
                {
                    self.handle_key_event(key);
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Char('c') if ctrl => {
                self.should_quit = true;
                return;
            }
            KeyCode::Char('d') if ctrl && self.input.is_empty() => {
                self.should_quit = true;
                return;
            }
            KeyCode::Char('n') if ctrl => {
                self.start_new_chat();
                return;
            }
            KeyCode::PageUp => {
                self.follow_tail = false;
                self.scroll_offset = self
                    .effective_scroll()
                    .saturating_sub(SCROLL_STEP);
                return;
            }
            KeyCode::PageDown => {
                self.scroll_offset = self.scroll_offset.saturating_add(SCROLL_STEP);
                if self.scroll_offset.saturating_add(SCROLL_STEP) >= self.transcript.len() {
                    self.follow_tail = true;
                }
                return;
            }
            _ => {}
        }

        // The confirmation modal owns the keyboard while a proposal is
        // pending; free-text input is gated off.
        if self.controller.should_prompt_confirm() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y')) {
                self.controller.confirm();
                self.refresh_transcript();
            }
            return;
        }

        if self.state == TurnState::Ended {
            if key.code == KeyCode::Enter {
                self.start_new_chat();
            }
            return;
        }

        match key.code {
            KeyCode::Enter => self.submit_input(),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete_forward(),
            KeyCode::Left => self.cursor = prev_char_boundary(&self.input, self.cursor),
            KeyCode::Right => self.cursor = next_char_boundary(&self.input, self.cursor),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.input.len(),
            KeyCode::Char(ch) if !ctrl && !key.modifiers.contains(KeyModifiers::ALT) => {
                self.insert_text(&ch.to_string());
            }
            _ => {}
        }
    }

    fn submit_input(&mut self) {
        // Soft mutual exclusion: no second action while one is pending.
        if self.controller.is_busy() {
            return;
        }
        if self.input.trim().is_empty() {
            return;
        }

        let text = self.input.clone();
        match self.controller.send_message(&text) {
            Ok(()) => {
                self.input.clear();
                self.cursor = 0;
            }
            Err(error) => self.show_notice(error.notice()),
        }
    }

    fn start_new_chat(&mut self) {
        self.controller.start_new_chat();
        self.show_notice("starting a new chat".to_string());
    }

    fn insert_text(&mut self, text: &str) {
        let cursor = clamp_to_char_boundary_left(&self.input, self.cursor);
        self.input.insert_str(cursor, text);
        self.cursor = cursor + text.len();
    }

    fn backspace(&mut self) {
        let end = clamp_to_char_boundary_left(&self.input, self.cursor);
        if end == 0 {
            return;
        }
        let start = prev_char_boundary(&self.input, end);
        self.input.replace_range(start..end, "");
        self.cursor = start;
    }

    fn delete_forward(&mut self) {
        let start = clamp_to_char_boundary_left(&self.input, self.cursor);
        if start >= self.input.len() {
            return;
        }
        let end = next_char_boundary(&self.input, start);
        self.input.replace_range(start..end, "");
        self.cursor = start;
    }

    fn input_enabled(&self) -> bool {
        !self.controller.should_prompt_confirm() && self.state != TurnState::Ended
    }

    fn input_placeholder(&self) -> String {
        if self.controller.should_prompt_confirm() {
            "confirm the tool run to continue".to_string()
        } else if self.state == TurnState::Ended {
            "conversation ended - press enter or ctrl+n to start a new chat".to_string()
        } else {
            String::new()
        }
    }

    fn confirm_modal_content(&self) -> Option<(String, String)> {
        if !self.controller.should_prompt_confirm() {
            return None;
        }
        let pending = self.controller.pending_confirmation()?;
        let tool = pending
            .tool
            .clone()
            .unwrap_or_else(|| "unknown".to_string());
        let args_preview = pending
            .args
            .as_ref()
            .map(format_args_preview)
            .unwrap_or_else(|| "{}".to_string());
        Some((tool, args_preview))
    }

    fn status_line(&self) -> String {
        if let Some(notice) = &self.notice {
            return format!("! {}", notice.text);
        }

        let mut status = self.state.label().to_string();
        if self.controller.is_busy() {
            status.push_str(" · working");
        }
        if self.poll_degraded {
            status.push_str(" · backend unreachable, retrying");
        }
        if self.ended && self.state != TurnState::Ended {
            status.push_str(" · type a message or ctrl+n to start");
        }
        status
    }

    fn effective_scroll(&self) -> usize {
        if self.follow_tail {
            self.transcript.len()
        } else {
            self.scroll_offset
        }
    }

    fn show_notice(&mut self, text: String) {
        self.notice = Some(Notice {
            text,
            shown_at: Instant::now(),
        });
    }

    fn expire_notice(&mut self) {
        if self
            .notice
            .as_ref()
            .is_some_and(|notice| notice.shown_at.elapsed() >= NOTICE_TTL)
        {
            self.notice = None;
        }
    }
}

fn sanitize_paste(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_paste_flattens_newlines() {
        assert_eq!(sanitize_paste("line one\r\nline two"), "line one  line two");
        assert_eq!(sanitize_paste("plain"), "plain");
    }
}
