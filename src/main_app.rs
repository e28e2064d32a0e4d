use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{Event, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};
use log::{debug, error, info};
use ratatui::{
    Terminal,
    layout::{Alignment, Constraint, Direction, Layout, Position, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};

use crate::book_picker::BookPicker;
use crate::engine::{Element, EpubRendition, Rendition, Viewport};
use crate::event_source::{EventSource, KeyCode};
use crate::inputs::{KeyRouter, SwipeTracker};
use crate::loader::{DocumentLoader, LoadError};
use crate::navigation::{self, NavIntent};
use crate::session::SessionState;
use crate::settings::Settings;
use crate::theme::{INTERFACE, StyleRules};

const TICK_RATE: Duration = Duration::from_millis(50);
const EVENTS_PER_FRAME: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Picker,
    Reader,
}

/// Input bindings that exist only while the reader screen is mounted.
/// Dropping this struct is what detaches the arrow keys and the swipe
/// surface.
pub struct ReaderScreen {
    key_router: KeyRouter,
    swipe: SwipeTracker,
}

impl ReaderScreen {
    fn new() -> Self {
        Self {
            key_router: KeyRouter::new(),
            swipe: SwipeTracker::new(),
        }
    }
}

/// Clickable regions, refreshed on every draw.
#[derive(Debug, Clone, Copy, Default)]
struct Zones {
    prev_button: Option<Rect>,
    next_button: Option<Rect>,
    open_button: Option<Rect>,
    content: Option<Rect>,
    picker_list: Option<Rect>,
}

pub struct App {
    pub session: SessionState,
    loader: DocumentLoader,
    picker: BookPicker,
    reader: Option<ReaderScreen>,
    settings: Settings,
    viewport: Viewport,
    zones: Zones,
    picker_state: ListState,
}

impl App {
    pub fn new(settings: Settings) -> Self {
        let picker = BookPicker::scan(settings.library_dir.clone());
        let mut picker_state = ListState::default();
        if !picker.is_empty() {
            picker_state.select(Some(0));
        }
        Self {
            session: SessionState::new(),
            loader: DocumentLoader::new(),
            picker,
            reader: None,
            settings,
            viewport: Viewport::new(80, 24),
            zones: Zones::default(),
            picker_state,
        }
    }

    pub fn screen(&self) -> Screen {
        if self.reader.is_some() {
            Screen::Reader
        } else {
            Screen::Picker
        }
    }

    /// Start loading a file. The current screen and session stay as they
    /// are until the load resolves on a later tick.
    pub fn open_path(&mut self, path: impl Into<PathBuf>) {
        self.loader.begin(path);
    }

    /// Open whatever the picker has selected; with nothing selected this is
    /// a no-op, like a cancelled file dialog.
    pub fn open_selected(&mut self) {
        let Some(entry) = self.picker.selected_entry() else {
            debug!("open requested with no selection");
            return;
        };
        let path = entry.path.clone();
        self.open_path(path);
    }

    /// Mount the reader screen, attaching its input bindings.
    pub fn mount_reader(&mut self) {
        if self.reader.is_none() {
            self.reader = Some(ReaderScreen::new());
        }
    }

    /// Unmount the reader: bindings are dropped with the screen and the
    /// session goes with them — the rendition does not outlive its screen.
    pub fn close_reader(&mut self) {
        if self.reader.take().is_some() {
            debug!("reader unmounted");
        }
        self.session.close();
        self.picker.rescan();
        self.sync_picker_state();
    }

    fn sync_picker_state(&mut self) {
        if self.picker.is_empty() {
            self.picker_state.select(None);
        } else {
            self.picker_state.select(Some(self.picker.selected_index()));
        }
    }

    /// Per-tick housekeeping: resolve finished loads, then pull engine
    /// notifications into the session label.
    pub fn on_tick(&mut self) {
        self.resolve_loads();
        if let Some(active) = self.session.active_mut() {
            active.drain_engine_events();
        }
    }

    fn resolve_loads(&mut self) {
        while let Some(completion) = self.loader.poll() {
            if self.loader.is_stale(completion.ticket) {
                info!(
                    "discarding stale load #{} ({})",
                    completion.ticket,
                    completion.path.display()
                );
                continue;
            }
            match completion.result {
                Ok(rendition) => self.publish(rendition, &completion.path),
                Err(err) => self.session.fail(err.to_string()),
            }
        }
    }

    /// Bring a freshly constructed rendition on screen. The order is fixed:
    /// attach, check readiness, force the readable theme, first display,
    /// and only then publish the session.
    fn publish(&mut self, mut rendition: EpubRendition, path: &Path) {
        if let Err(e) = rendition.render_to(self.viewport) {
            error!("attaching {} failed: {e}", path.display());
            self.session.fail(LoadError::UnparsableDocument.to_string());
            return;
        }
        if !rendition.is_ready() {
            error!("engine never became ready for {}", path.display());
            self.session.fail(LoadError::UnparsableDocument.to_string());
            return;
        }
        rendition.apply_theme(&StyleRules::readable());
        if let Err(e) = rendition.display() {
            error!("initial display of {} failed: {e}", path.display());
            self.session.fail(LoadError::UnparsableDocument.to_string());
            return;
        }
        info!("opened {}", path.display());
        self.session.install(Box::new(rendition));
        self.mount_reader();
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<AppAction> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        if key.code == KeyCode::Char('q') {
            return Some(AppAction::Quit);
        }

        match self.screen() {
            Screen::Reader => {
                if key.code == KeyCode::Char('o') {
                    self.close_reader();
                    return None;
                }
                let intent = self
                    .reader
                    .as_ref()
                    .and_then(|reader| reader.key_router.route(key));
                if let Some(intent) = intent {
                    navigation::dispatch(intent, &mut self.session);
                }
            }
            Screen::Picker => match key.code {
                KeyCode::Char('j') | KeyCode::Down => {
                    self.picker.select_next();
                    self.sync_picker_state();
                }
                KeyCode::Char('k') | KeyCode::Up => {
                    self.picker.select_prev();
                    self.sync_picker_state();
                }
                KeyCode::Enter => self.open_selected(),
                _ => {}
            },
        }
        None
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        let position = Position::new(mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if self.reader.is_some() {
                    self.reader_mouse_down(position);
                } else if let Some(list) = self.zones.picker_list
                    && list.contains(position)
                {
                    let index = (mouse.row - list.y) as usize;
                    self.picker.select_index(index);
                    self.sync_picker_state();
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if let Some(reader) = self.reader.as_mut()
                    && reader.swipe.is_tracking()
                {
                    reader.swipe.on_move(mouse.column as i32);
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if let Some(reader) = self.reader.as_mut()
                    && let Some(intent) = reader.swipe.on_end()
                {
                    navigation::dispatch(intent, &mut self.session);
                }
            }
            _ => {}
        }
    }

    fn reader_mouse_down(&mut self, position: Position) {
        let zone_hit = |zone: Option<Rect>| zone.is_some_and(|rect| rect.contains(position));

        // Buttons are non-interactive without a session.
        if self.session.has_session() {
            if zone_hit(self.zones.prev_button) {
                navigation::dispatch(NavIntent::Previous, &mut self.session);
                return;
            }
            if zone_hit(self.zones.next_button) {
                navigation::dispatch(NavIntent::Next, &mut self.session);
                return;
            }
        }
        if zone_hit(self.zones.open_button) {
            self.close_reader();
            return;
        }
        if zone_hit(self.zones.content)
            && let Some(reader) = self.reader.as_mut()
        {
            reader.swipe.on_start(position.x as i32);
        }
    }

    pub fn handle_resize(&mut self, width: u16, height: u16) {
        debug!("terminal resized to {width}x{height}");
        // The next draw picks the new geometry up and relays the engine out.
    }

    pub fn draw(&mut self, frame: &mut ratatui::Frame) {
        self.zones = Zones::default();
        match self.screen() {
            Screen::Picker => self.draw_picker(frame),
            Screen::Reader => self.draw_reader(frame),
        }
    }

    fn draw_picker(&mut self, frame: &mut ratatui::Frame) {
        let (banner, body, bottom) = split_screen(frame.area(), self.session.last_error().is_some());
        self.draw_error_banner(frame, banner);

        let items: Vec<ListItem> = self
            .picker
            .entries()
            .iter()
            .map(|entry| {
                ListItem::new(Line::from(Span::styled(
                    entry.display_name.clone(),
                    Style::default().fg(INTERFACE.text),
                )))
            })
            .collect();

        let title = format!(" Books ({}) ", self.picker.entries().len());
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(title)
                    .border_style(Style::default().fg(INTERFACE.border)),
            )
            .highlight_style(
                Style::default()
                    .bg(INTERFACE.highlight_bg)
                    .fg(INTERFACE.highlight_fg),
            );
        let list_area = body;
        frame.render_stateful_widget(list, list_area, &mut self.picker_state);
        // Rows start inside the border.
        self.zones.picker_list = Some(Rect {
            x: list_area.x + 1,
            y: list_area.y + 1,
            width: list_area.width.saturating_sub(2),
            height: list_area.height.saturating_sub(2),
        });

        let help_text = if self.loader.in_flight() > 0 {
            "Loading..."
        } else if self.picker.is_empty() {
            "No .epub files here | q: Quit"
        } else {
            "j/k: Select | Enter: Open | q: Quit"
        };
        let help = Paragraph::new(help_text)
            .style(Style::default().fg(INTERFACE.muted))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(INTERFACE.border)),
            );
        frame.render_widget(help, bottom);
    }

    fn draw_reader(&mut self, frame: &mut ratatui::Frame) {
        let (banner, body, footer) = split_screen(frame.area(), self.session.last_error().is_some());
        self.draw_error_banner(frame, banner);

        let title = self
            .session
            .active()
            .and_then(|active| active.rendition().title())
            .unwrap_or_else(|| "folio".to_string());
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", fit_to_width(&title, body.width.saturating_sub(4) as usize)))
            .border_style(Style::default().fg(INTERFACE.border));
        let inner = block.inner(body);
        frame.render_widget(block, body);

        let margin = self.settings.margin.min(inner.width / 2);
        let content = Rect {
            x: inner.x + margin,
            y: inner.y,
            width: inner.width.saturating_sub(margin * 2),
            height: inner.height,
        };
        self.zones.content = Some(content);

        // The engine owns this surface; hand it the current geometry before
        // asking what to draw.
        let desired = Viewport::new(content.width, content.height);
        if desired != self.viewport {
            self.viewport = desired;
            if let Some(active) = self.session.active_mut()
                && let Err(e) = active.rendition_mut().render_to(desired)
            {
                error!("relayout failed: {e}");
            }
        }

        if let Some(active) = self.session.active() {
            let rendition = active.rendition();
            let body_style = rendition.resolved_style(Element::Body);
            if let Some(view) = rendition.page_view() {
                let lines: Vec<Line> = view
                    .lines
                    .iter()
                    .map(|line| {
                        let props = rendition.resolved_style(line.element);
                        let mut style = Style::default();
                        if let Some(color) = props.color {
                            style = style.fg(color);
                        }
                        if let Some(background) = props.background.or(body_style.background) {
                            style = style.bg(background);
                        }
                        Line::from(Span::styled(line.text.clone(), style))
                    })
                    .collect();
                let mut page_style = Style::default();
                if let Some(background) = body_style.background {
                    page_style = page_style.bg(background);
                }
                let page = Paragraph::new(lines).style(page_style);
                frame.render_widget(page, content);
            }
        } else {
            let placeholder = Paragraph::new("No document loaded")
                .style(Style::default().fg(INTERFACE.muted))
                .alignment(Alignment::Center);
            frame.render_widget(placeholder, content);
        }

        self.draw_footer(frame, footer);
    }

    fn draw_footer(&mut self, frame: &mut ratatui::Frame, footer: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(INTERFACE.border));
        let inner = block.inner(footer);
        frame.render_widget(block, footer);

        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(10),
                Constraint::Min(0),
                Constraint::Length(10),
                Constraint::Length(10),
            ])
            .split(inner);

        let enabled = self.session.has_session();
        let button_style = if enabled {
            Style::default().fg(INTERFACE.text)
        } else {
            Style::default().fg(INTERFACE.muted)
        };

        frame.render_widget(
            Paragraph::new("[ < Prev ]").style(button_style),
            chunks[0],
        );
        let label = self
            .session
            .active()
            .map(|active| active.page_label().to_string())
            .filter(|label| !label.is_empty())
            .unwrap_or_else(|| "-".to_string());
        frame.render_widget(
            Paragraph::new(format!("Page: {label}"))
                .style(Style::default().fg(INTERFACE.muted))
                .alignment(Alignment::Center),
            chunks[1],
        );
        frame.render_widget(
            Paragraph::new("[ Next > ]").style(button_style),
            chunks[2],
        );
        frame.render_widget(
            Paragraph::new("[ Open ]").style(Style::default().fg(INTERFACE.text)),
            chunks[3],
        );

        self.zones.prev_button = Some(chunks[0]);
        self.zones.next_button = Some(chunks[2]);
        self.zones.open_button = Some(chunks[3]);
    }

    fn draw_error_banner(&self, frame: &mut ratatui::Frame, banner: Option<Rect>) {
        if let (Some(area), Some(message)) = (banner, self.session.last_error()) {
            let paragraph = Paragraph::new(message.to_string())
                .style(Style::default().fg(INTERFACE.error))
                .alignment(Alignment::Center);
            frame.render_widget(paragraph, area);
        }
    }
}

/// Vertical screen split: optional one-line error banner, body, bottom bar.
fn split_screen(area: Rect, with_banner: bool) -> (Option<Rect>, Rect, Rect) {
    if with_banner {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(3),
            ])
            .split(area);
        (Some(chunks[0]), chunks[1], chunks[2])
    } else {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(3)])
            .split(area);
        (None, chunks[0], chunks[1])
    }
}

fn fit_to_width(text: &str, max: usize) -> String {
    use unicode_width::UnicodeWidthChar;

    let mut width = 0;
    let mut out = String::new();
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if width + w > max {
            out.push('\u{2026}');
            break;
        }
        width += w;
        out.push(ch);
    }
    out
}

pub fn run_app_with_event_source<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    event_source: &mut dyn EventSource,
) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    let mut last_tick = Instant::now();
    loop {
        terminal.draw(|frame| app.draw(frame))?;

        let timeout = TICK_RATE
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event_source.poll(timeout)? {
            let mut processed = 0;
            while processed < EVENTS_PER_FRAME && event_source.poll(Duration::ZERO)? {
                match event_source.read()? {
                    Event::Key(key) => {
                        if app.handle_key(key) == Some(AppAction::Quit) {
                            return Ok(());
                        }
                    }
                    Event::Mouse(mouse) => app.handle_mouse(mouse),
                    Event::Resize(width, height) => app.handle_resize(width, height),
                    _ => {}
                }
                processed += 1;
            }
        }

        if last_tick.elapsed() >= TICK_RATE {
            app.on_tick();
            last_tick = Instant::now();
        }
    }
}
