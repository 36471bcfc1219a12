use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use textwrap::wrap;
use unicode_width::UnicodeWidthStr;

use crate::catalog::{self, Catalog};
use crate::controller::{Controller, CycleDirection, Focus, ModalState, Tab};
use crate::player;

// Palette lifted from the channel page stylesheet (dark scheme).
const COLOR_BG: Color = Color::Rgb(0, 0, 0);
const COLOR_PANEL_BG: Color = Color::Rgb(28, 28, 30);
const COLOR_CARD_BG: Color = Color::Rgb(44, 44, 46);
const COLOR_BORDER: Color = Color::Rgb(56, 56, 58);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(245, 245, 247);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(152, 152, 157);
const COLOR_ACCENT: Color = Color::Rgb(255, 107, 53);
const COLOR_LINK: Color = Color::Rgb(0, 122, 255);

const TICK_RATE: Duration = Duration::from_millis(120);

pub struct Options {
    pub status_message: String,
    pub catalog: Catalog,
    pub controller: Controller,
    pub config_path: String,
}

pub struct Model {
    status_message: String,
    catalog: Catalog,
    controller: Controller,
    selected_card: usize,
    card_state: ListState,
    about_scroll: u16,
    needs_redraw: bool,
    config_path: String,
}

impl Model {
    pub fn new(opts: Options) -> Self {
        let mut card_state = ListState::default();
        if !opts.catalog.videos.is_empty() {
            card_state.select(Some(0));
        }
        Self {
            status_message: opts.status_message,
            catalog: opts.catalog,
            controller: opts.controller,
            selected_card: 0,
            card_state,
            about_scroll: 0,
            needs_redraw: true,
            config_path: opts.config_path,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();

        loop {
            if self.controller.tick(Instant::now()) {
                self.mark_dirty();
            }

            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }

            let timeout = TICK_RATE
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(16));

            if event::poll(timeout)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        match self.handle_key(key) {
                            Ok(true) => break,
                            Ok(false) => {}
                            Err(err) => {
                                self.status_message = format!("Error: {}", err);
                                self.mark_dirty();
                            }
                        }
                    }
                }
            }

            if last_tick.elapsed() >= TICK_RATE {
                last_tick = Instant::now();
            }
        }

        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        let now = Instant::now();
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if !self.controller.modal_hidden() {
            return self.handle_modal_key(key, now);
        }

        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Esc => {
                // Escape only closes an open modal; with none open it is a
                // no-op.
                self.controller.escape(now);
            }
            KeyCode::Right if ctrl => {
                self.controller.cycle_tab(CycleDirection::Forward, now);
                self.mark_dirty();
            }
            KeyCode::Left if ctrl => {
                self.controller.cycle_tab(CycleDirection::Backward, now);
                self.mark_dirty();
            }
            KeyCode::Char(ch @ '1'..='9') => {
                let index = (ch as usize) - ('1' as usize);
                let name = Tab::ALL
                    .get(index)
                    .map(|tab| tab.hash_name())
                    .unwrap_or("unknown");
                self.switch_tab_named(name, now);
            }
            KeyCode::Char('l') => {
                self.controller.cycle_tab(CycleDirection::Forward, now);
                self.mark_dirty();
            }
            KeyCode::Char('h') => {
                self.controller.cycle_tab(CycleDirection::Backward, now);
                self.mark_dirty();
            }
            KeyCode::Backspace | KeyCode::Char('[') => {
                if self.controller.navigate_back(now) {
                    self.status_message = format!("Back to {}", self.controller.hash());
                } else {
                    self.status_message = "Already at the oldest entry.".to_string();
                }
                self.mark_dirty();
            }
            KeyCode::Char('f') | KeyCode::Char(']') => {
                if self.controller.navigate_forward(now) {
                    self.status_message = format!("Forward to {}", self.controller.hash());
                } else {
                    self.status_message = "Already at the newest entry.".to_string();
                }
                self.mark_dirty();
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.move_selection(1);
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.move_selection(-1);
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                self.open_selected_video(now);
            }
            KeyCode::Char('o') => {
                self.open_share_link();
            }
            KeyCode::Char('s') => {
                self.open_channel_page();
            }
            _ => {}
        }

        Ok(false)
    }

    fn handle_modal_key(&mut self, key: KeyEvent, now: Instant) -> Result<bool> {
        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Esc | KeyCode::Enter => {
                // Enter activates the focused close control; Escape is the
                // keyboard contract. Both land on the same transition.
                if self.controller.escape(now) {
                    self.status_message = "Player closed.".to_string();
                    self.mark_dirty();
                }
            }
            KeyCode::Char('o') => {
                let video_id = match self.controller.modal() {
                    ModalState::Open { video_id, .. } => Some(video_id.clone()),
                    ModalState::Closed => None,
                };
                if let Some(video_id) = video_id {
                    self.open_share_link_for(&video_id);
                }
            }
            // Background scrolling is suspended while the modal is open.
            _ => {}
        }
        Ok(false)
    }

    fn switch_tab_named(&mut self, name: &str, now: Instant) {
        match self.controller.switch_tab_named(name, now) {
            Ok(()) => {
                self.status_message = format!(
                    "{} - {}",
                    self.controller.active_tab().title(),
                    self.controller.hash()
                );
            }
            Err(reject) => {
                self.status_message = reject.to_string();
            }
        }
        self.mark_dirty();
    }

    fn move_selection(&mut self, delta: i64) {
        match self.controller.active_tab() {
            Tab::Videos => {
                if self.catalog.videos.is_empty() {
                    return;
                }
                let last = self.catalog.videos.len() - 1;
                let current = self.selected_card as i64;
                let next = (current + delta).clamp(0, last as i64) as usize;
                if next != self.selected_card {
                    self.selected_card = next;
                    self.card_state.select(Some(next));
                    self.controller.set_card_focus(next);
                    self.mark_dirty();
                }
            }
            Tab::About => {
                let next = if delta > 0 {
                    self.about_scroll.saturating_add(1)
                } else {
                    self.about_scroll.saturating_sub(1)
                };
                if next != self.about_scroll {
                    self.about_scroll = next;
                    self.mark_dirty();
                }
            }
        }
    }

    fn open_selected_video(&mut self, now: Instant) {
        if self.controller.active_tab() != Tab::Videos {
            return;
        }
        let Some(video) = self.catalog.videos.get(self.selected_card) else {
            self.status_message = "No video selected.".to_string();
            self.mark_dirty();
            return;
        };
        let (id, title) = (video.id.clone(), video.title.clone());
        match self
            .controller
            .open_modal(&id, &title, Some(self.selected_card), now)
        {
            Ok(()) => {
                self.status_message = format!("Playing: {title}");
            }
            Err(reject) => {
                self.status_message = reject.to_string();
            }
        }
        self.mark_dirty();
    }

    fn open_share_link(&mut self) {
        let Some(video) = self.catalog.videos.get(self.selected_card) else {
            self.status_message = "No video selected.".to_string();
            self.mark_dirty();
            return;
        };
        let id = video.id.clone();
        self.open_share_link_for(&id);
    }

    fn open_share_link_for(&mut self, video_id: &str) {
        match player::open_watch_page(video_id) {
            Ok(url) => {
                self.status_message = format!("Opened {url} in your browser.");
            }
            Err(err) => {
                self.status_message = format!("Failed to open share link: {err}");
            }
        }
        self.mark_dirty();
    }

    fn open_channel_page(&mut self) {
        match webbrowser::open(player::CHANNEL_URL) {
            Ok(_) => {
                self.status_message = "Opened the channel page in your browser.".to_string();
            }
            Err(err) => {
                self.status_message = format!("Failed to open channel page: {err}");
            }
        }
        self.mark_dirty();
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let full = frame.size();
        frame.render_widget(Block::default().style(Style::default().bg(COLOR_BG)), full);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(full);

        let status_line = Paragraph::new(self.status_message.clone()).style(
            Style::default()
                .fg(COLOR_TEXT_PRIMARY)
                .bg(COLOR_CARD_BG)
                .add_modifier(Modifier::BOLD),
        );
        frame.render_widget(status_line, layout[0]);

        self.draw_header(frame, layout[1]);
        self.draw_tab_bar(frame, layout[2]);
        self.draw_panes(frame, layout[3]);

        let footer = Paragraph::new(self.footer_text())
            .style(
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .bg(COLOR_PANEL_BG)
                    .add_modifier(Modifier::ITALIC),
            )
            .alignment(Alignment::Center);
        frame.render_widget(footer, layout[4]);

        if !self.controller.modal_hidden() {
            self.draw_modal(frame, layout[3]);
        }
    }

    fn draw_header(&self, frame: &mut Frame<'_>, area: Rect) {
        let channel = &self.catalog.channel;
        let lines = vec![
            Line::from(vec![
                Span::styled(
                    format!(" {} ", channel.name),
                    Style::default()
                        .fg(COLOR_ACCENT)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    channel.handle.clone(),
                    Style::default().fg(COLOR_TEXT_SECONDARY),
                ),
            ]),
            Line::from(Span::styled(
                format!(" {}", channel.tagline),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )),
            Line::from(vec![
                Span::styled(
                    format!(" {} subscribers", compact_count(channel.subscribers)),
                    Style::default().fg(COLOR_TEXT_PRIMARY),
                ),
                Span::styled(
                    "  [s] Subscribe on YouTube",
                    Style::default().fg(COLOR_LINK),
                ),
            ]),
        ];
        let header = Paragraph::new(lines).style(Style::default().bg(COLOR_PANEL_BG));
        frame.render_widget(header, area);
    }

    fn draw_tab_bar(&self, frame: &mut Frame<'_>, area: Rect) {
        let mut spans = Vec::new();
        for (index, tab) in Tab::ALL.iter().enumerate() {
            let selected = self.controller.is_selected(*tab);
            let label = format!("  {} {}  ", index + 1, tab.title());
            let style = if selected {
                Style::default()
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
            } else {
                Style::default().fg(COLOR_TEXT_SECONDARY)
            };
            spans.push(Span::styled(label, style));
        }

        // The current location hash sits at the right edge of the bar.
        let hash = self.controller.hash().to_string();
        let used: usize = spans.iter().map(|span| span.content.width()).sum();
        let pad = (area.width as usize)
            .saturating_sub(used)
            .saturating_sub(hash.width() + 1);
        spans.push(Span::raw(" ".repeat(pad)));
        spans.push(Span::styled(hash, Style::default().fg(COLOR_TEXT_SECONDARY)));

        let bar = Paragraph::new(Line::from(spans)).style(Style::default().bg(COLOR_BG));
        frame.render_widget(bar, area);
    }

    fn draw_panes(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let panes = self.controller.visible_panes();
        if panes.len() == 1 {
            self.draw_pane(frame, area, panes[0]);
            return;
        }

        // Mid-transition: the outgoing pane is still in layout next to the
        // incoming one until its hide fires.
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);
        for (pane, chunk) in panes.iter().zip(chunks.iter()) {
            self.draw_pane(frame, *chunk, *pane);
        }
    }

    fn draw_pane(&mut self, frame: &mut Frame<'_>, area: Rect, pane: Tab) {
        match pane {
            Tab::Videos => self.draw_videos(frame, area),
            Tab::About => self.draw_about(frame, area),
        }
    }

    fn draw_videos(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let block = self.pane_block(Tab::Videos);
        let inner_width = area.width.saturating_sub(4).max(10) as usize;

        let items: Vec<ListItem> = self
            .catalog
            .videos
            .iter()
            .map(|video| {
                let mut lines = vec![
                    Line::from(Span::styled(
                        video.title.clone(),
                        Style::default()
                            .fg(COLOR_TEXT_PRIMARY)
                            .add_modifier(Modifier::BOLD),
                    )),
                    Line::from(Span::styled(
                        format!(
                            "{}  {}  {}",
                            catalog::format_views(video.views),
                            video.duration,
                            video.published
                        ),
                        Style::default().fg(COLOR_TEXT_SECONDARY),
                    )),
                ];
                for piece in wrap(&video.description, inner_width).into_iter().take(2) {
                    lines.push(Line::from(Span::styled(
                        piece.into_owned(),
                        Style::default().fg(COLOR_TEXT_SECONDARY),
                    )));
                }
                lines.push(Line::from(""));
                ListItem::new(Text::from(lines))
            })
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(
                Style::default()
                    .bg(COLOR_CARD_BG)
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("▶ ");
        frame.render_stateful_widget(list, area, &mut self.card_state);
    }

    fn draw_about(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let block = self.pane_block(Tab::About);
        let channel = &self.catalog.channel;

        let mut lines = vec![
            Line::from(Span::styled(
                channel.name.clone(),
                Style::default()
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
        ];
        let inner_width = area.width.saturating_sub(4).max(10) as usize;
        for piece in wrap(&channel.description, inner_width) {
            lines.push(Line::from(Span::styled(
                piece.into_owned(),
                Style::default().fg(COLOR_TEXT_PRIMARY),
            )));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(
                "{} subscribers  •  {}  •  {} videos",
                compact_count(channel.subscribers),
                catalog::format_views(channel.total_views),
                self.catalog.videos.len()
            ),
            Style::default().fg(COLOR_TEXT_SECONDARY),
        )));
        for link in &channel.links {
            lines.push(Line::from(Span::styled(
                format!("{}: {}", link.label, link.url),
                Style::default().fg(COLOR_LINK),
            )));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("Config: {}", self.config_path),
            Style::default().fg(COLOR_TEXT_SECONDARY),
        )));

        let about = Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((self.about_scroll, 0));
        frame.render_widget(about, area);
    }

    fn pane_block(&self, pane: Tab) -> Block<'static> {
        let selected = self.controller.is_selected(pane);
        let border = if selected { COLOR_ACCENT } else { COLOR_BORDER };
        Block::default()
            .title(format!(" {} ", pane.title()))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .style(Style::default().bg(COLOR_PANEL_BG))
    }

    fn draw_modal(&self, frame: &mut Frame<'_>, area: Rect) {
        let ModalState::Open { video_id, title } = self.controller.modal() else {
            return;
        };

        let popup_area = centered_rect(70, 70, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title(format!(" {} ", title))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(COLOR_ACCENT))
            .style(Style::default().bg(COLOR_PANEL_BG));
        let inner = block.inner(popup_area);
        frame.render_widget(block, popup_area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(inner);

        let mut player_lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                "▶ Playing (autoplay)",
                Style::default()
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD),
            )),
        ];
        if let Some(src) = self.controller.player_src() {
            player_lines.push(Line::from(Span::styled(
                src.to_string(),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )));
        }
        let player_frame = Paragraph::new(player_lines)
            .alignment(Alignment::Center)
            .style(Style::default().bg(COLOR_BG))
            .wrap(Wrap { trim: true });
        frame.render_widget(player_frame, chunks[0]);

        let share = player::watch_url(video_id)
            .map(|url| format!("Watch on YouTube: {url}"))
            .unwrap_or_default();
        let share_line = Paragraph::new(share)
            .alignment(Alignment::Center)
            .style(Style::default().fg(COLOR_LINK));
        frame.render_widget(share_line, chunks[1]);

        let close_focused = self.controller.focus() == Focus::ModalClose;
        let close_style = if close_focused {
            Style::default()
                .fg(COLOR_BG)
                .bg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(COLOR_TEXT_PRIMARY)
        };
        let close_line = Paragraph::new(Line::from(vec![
            Span::styled(" ✕ Close ", close_style),
            Span::styled(
                "  Esc close • o share",
                Style::default().fg(COLOR_TEXT_SECONDARY),
            ),
        ]))
        .alignment(Alignment::Center);
        frame.render_widget(close_line, chunks[2]);
    }

    fn footer_text(&self) -> String {
        if self.controller.modal_hidden() {
            "q quit • 1/2 or Ctrl+←/→ tabs • j/k select • Enter play • o share • Backspace/f history • s subscribe"
                .to_string()
        } else {
            "Esc close • o share • q quit".to_string()
        }
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let percent_x = percent_x.min(100);
    let percent_y = percent_y.min(100);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage(100 - percent_x - (100 - percent_x) / 2),
        ])
        .split(area);
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage(100 - percent_y - (100 - percent_y) / 2),
        ])
        .split(horizontal[1]);
    vertical[1]
}

fn compact_count(value: u64) -> String {
    match value {
        v if v >= 1_000_000 => format!("{:.1}M", v as f64 / 1_000_000.0),
        v if v >= 1_000 => format!("{:.1}K", v as f64 / 1_000.0),
        v => v.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_rect_stays_inside_the_area() {
        let area = Rect::new(0, 0, 100, 40);
        let popup = centered_rect(70, 70, area);
        assert!(popup.width <= area.width);
        assert!(popup.height <= area.height);
        assert!(popup.x >= area.x && popup.y >= area.y);
    }

    #[test]
    fn compact_counts() {
        assert_eq!(compact_count(950), "950");
        assert_eq!(compact_count(128_000), "128.0K");
        assert_eq!(compact_count(9_400_000), "9.4M");
    }
}
