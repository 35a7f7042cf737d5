use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use crossterm::event::{KeyCode, KeyEvent};
use log::{info, warn};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};

use crate::challenge::sync::{ProgressSource, ProgressView, SyncError, ToggleOutcome};
use crate::challenge::{ChallengeDataset, DayFilter, UnlockClock, activity_from_records, build_calendar_grid};
use crate::config::AppConfig;
use crate::db::{Database, StoreError};
use crate::models::{CalendarGrid, CompletionRecord, User};
use crate::tui::events::{Event, EventHandler};
use crate::tui::theme;
use crate::tui::widgets::days::DayRow;
use crate::tui::widgets::header::HeaderInfo;
use crate::tui::widgets::{confirm, days, header, heatmap, stats, statusbar};

/// The dashboard's view of the authoritative store: one user's records in
/// the local database.
pub struct LocalStore {
    db: Database,
    user_id: i64,
}

impl LocalStore {
    pub fn new(db: Database, user_id: i64) -> Self {
        Self { db, user_id }
    }
}

fn sync_error(err: StoreError) -> SyncError {
    match err {
        StoreError::Conflict | StoreError::Sqlite(_) => SyncError::Unavailable(err.to_string()),
        other => SyncError::Rejected(other.to_string()),
    }
}

impl ProgressSource for LocalStore {
    fn fetch(&mut self) -> Result<Vec<CompletionRecord>, SyncError> {
        self.db.completions(self.user_id).map_err(sync_error)
    }

    fn toggle(&mut self, day: u32) -> Result<Vec<CompletionRecord>, SyncError> {
        self.db
            .toggle_day(self.user_id, day, Utc::now())
            .map_err(sync_error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum View {
    Days,
    Calendar,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputMode {
    Normal,
    Confirm,
    Search,
}

pub struct App<S: ProgressSource> {
    pub view: View,
    pub input_mode: InputMode,
    pub should_quit: bool,
    pub focus_idx: usize,
    pub input_buffer: String,
    pub input_error: Option<String>,

    student: String,
    clock: UnlockClock,
    dataset: Arc<ChallengeDataset>,
    source: S,
    progress: ProgressView,
    now: DateTime<Utc>,
    unlocked: u32,
    units: Vec<String>,
    /// Index into `units`; `None` shows every unit.
    unit_idx: Option<usize>,
    search: String,
    visible: Vec<u32>,
    grid: CalendarGrid,
}

impl<S: ProgressSource> App<S> {
    pub fn new(student: &User, clock: UnlockClock, dataset: Arc<ChallengeDataset>, source: S, now: DateTime<Utc>) -> Self {
        let units = dataset.units();
        let mut app = App {
            view: View::Days,
            input_mode: InputMode::Normal,
            should_quit: false,
            focus_idx: 0,
            input_buffer: String::new(),
            input_error: None,
            student: student.name.clone(),
            unlocked: clock.unlocked_day_count(now),
            clock,
            dataset,
            source,
            progress: ProgressView::new(),
            now,
            units,
            unit_idx: None,
            search: String::new(),
            visible: Vec::new(),
            grid: build_calendar_grid(&Default::default(), now.date_naive()),
        };
        app.refresh_visible();
        app
    }

    pub fn progress(&self) -> &ProgressView {
        &self.progress
    }

    pub fn load(&mut self) {
        if let Err(e) = self.progress.refresh(&mut self.source) {
            warn!("Loading progress failed: {}", e);
        }
        self.after_sync();
    }

    /// Re-derive everything that depends on the clock. The visible list only
    /// changes when a new day opens.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        self.now = now;
        let unlocked = self.clock.unlocked_day_count(now);
        if unlocked != self.unlocked {
            info!("Day {} unlocked", unlocked);
            self.unlocked = unlocked;
            self.refresh_visible();
        }
    }

    fn after_sync(&mut self) {
        self.grid = build_calendar_grid(&activity_from_records(self.progress.records()), self.now.date_naive());
    }

    fn filter(&self) -> DayFilter {
        DayFilter {
            unit: self.unit_idx.and_then(|i| self.units.get(i).cloned()),
            search: Some(self.search.clone()).filter(|s| !s.is_empty()),
        }
    }

    fn refresh_visible(&mut self) {
        let filter = self.filter();
        // newest first
        self.visible = self
            .dataset
            .visible(self.unlocked, &filter)
            .map(|(d, _)| d.day)
            .collect();
        self.visible.reverse();
        self.focus_idx = self.focus_idx.min(self.visible.len().saturating_sub(1));
    }

    fn focused_day(&self) -> Option<u32> {
        self.visible.get(self.focus_idx).copied()
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        match self.input_mode {
            InputMode::Confirm => self.handle_confirm_key(key),
            InputMode::Search => self.handle_search_key(key),
            InputMode::Normal => match self.view {
                View::Days => self.handle_days_key(key),
                View::Calendar | View::Help => {
                    if matches!(key.code, KeyCode::Esc | KeyCode::Char('c') | KeyCode::Char('?')) {
                        self.view = View::Days;
                    }
                }
            },
        }
    }

    fn handle_days_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.view = View::Help,
            KeyCode::Char('c') => self.view = View::Calendar,
            KeyCode::Char('r') => self.load(),
            KeyCode::Char('/') => {
                self.input_mode = InputMode::Search;
                self.input_buffer = self.search.clone();
            }
            KeyCode::Char('f') => {
                self.unit_idx = match self.unit_idx {
                    None if !self.units.is_empty() => Some(0),
                    Some(i) if i + 1 < self.units.len() => Some(i + 1),
                    _ => None,
                };
                self.focus_idx = 0;
                self.refresh_visible();
            }
            KeyCode::Up => self.focus_idx = self.focus_idx.saturating_sub(1),
            KeyCode::Down => {
                if self.focus_idx + 1 < self.visible.len() {
                    self.focus_idx += 1;
                }
            }
            KeyCode::Enter | KeyCode::Char('m') => self.toggle_focused(),
            _ => {}
        }
    }

    fn toggle_focused(&mut self) {
        let Some(day) = self.focused_day() else {
            return;
        };
        match self.progress.request_toggle(day, &mut self.source) {
            Ok(ToggleOutcome::AwaitingConfirmation(_)) => {
                self.input_mode = InputMode::Confirm;
                self.input_buffer.clear();
                self.input_error = None;
            }
            Ok(_) => self.after_sync(),
            Err(e) => warn!("Toggle of day {} failed: {}", day, e),
        }
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.progress.cancel();
                self.input_mode = InputMode::Normal;
                self.input_buffer.clear();
                self.input_error = None;
            }
            KeyCode::Enter => match self.progress.confirm(&self.input_buffer, &mut self.source) {
                Ok(ToggleOutcome::Mismatch) => {
                    self.input_error = Some("That doesn't match, check the day number".to_string());
                }
                Ok(_) => {
                    self.input_mode = InputMode::Normal;
                    self.input_buffer.clear();
                    self.input_error = None;
                    self.after_sync();
                }
                Err(e) => {
                    self.input_mode = InputMode::Normal;
                    self.input_error = None;
                    warn!("Confirming completion failed: {}", e);
                }
            },
            KeyCode::Backspace => {
                self.input_buffer.pop();
                self.input_error = None;
            }
            KeyCode::Char(c) => {
                self.input_buffer.push(c);
                self.input_error = None;
            }
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.input_mode = InputMode::Normal;
                self.input_buffer.clear();
            }
            KeyCode::Enter => {
                self.search = self.input_buffer.trim().to_string();
                self.input_mode = InputMode::Normal;
                self.input_buffer.clear();
                self.focus_idx = 0;
                self.refresh_visible();
            }
            KeyCode::Backspace => {
                self.input_buffer.pop();
            }
            KeyCode::Char(c) => self.input_buffer.push(c),
            _ => {}
        }
    }

    fn list_title(&self) -> String {
        let unit = self
            .unit_idx
            .and_then(|i| self.units.get(i))
            .map(String::as_str)
            .unwrap_or("All units");
        if self.search.is_empty() {
            format!("{} ({})", unit, self.visible.len())
        } else {
            format!("{} · \"{}\" ({})", unit, self.search, self.visible.len())
        }
    }

    pub fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        frame.render_widget(Block::default().style(theme::base()), area);

        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(5), // header
                Constraint::Min(0),    // body
                Constraint::Length(1), // status bar
            ])
            .split(area);

        header::render(
            frame,
            outer[0],
            &HeaderInfo {
                student: &self.student,
                unlocked: self.unlocked,
                next_unlock: self.clock.next_unlock(self.now),
                seconds_until_next: self.clock.seconds_until_next_unlock(self.now),
            },
        );
        statusbar::render(frame, outer[2], self.progress.last_error());

        match self.view {
            View::Calendar => heatmap::render(frame, outer[1], &self.grid, "Challenge activity"),
            View::Days | View::Help => self.draw_days(frame, outer[1]),
        }

        if self.view == View::Help {
            self.draw_help(frame);
        }
        match self.input_mode {
            InputMode::Confirm => {
                if let Some(pending) = self.progress.pending() {
                    confirm::render(frame, &pending.expected, &self.input_buffer, self.input_error.as_deref());
                }
            }
            InputMode::Search => self.draw_search(frame),
            InputMode::Normal => {}
        }
    }

    fn draw_days(&self, frame: &mut Frame, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);

        let rows: Vec<DayRow> = self
            .visible
            .iter()
            .filter_map(|&day| self.dataset.get(day))
            .map(|d| DayRow {
                day: d,
                status: self.clock.day_status(d.day, self.now),
                completed: self.progress.is_completed(d.day),
            })
            .collect();
        days::render_list(frame, columns[0], &rows, self.focus_idx, &self.list_title());

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(7), Constraint::Min(0)])
            .split(columns[1]);
        stats::render(frame, right[0], &self.progress.stats(self.unlocked));
        days::render_detail(frame, right[1], rows.get(self.focus_idx));
    }

    fn draw_search(&self, frame: &mut Frame) {
        let area = frame.area();
        let popup = Rect {
            x: area.width / 4,
            y: (area.height / 2).saturating_sub(2),
            width: area.width / 2,
            height: 3.min(area.height),
        };
        frame.render_widget(Clear, popup);
        let line = Line::from(vec![
            Span::styled(" / ", theme::dim()),
            Span::styled(self.input_buffer.as_str(), theme::accent().add_modifier(Modifier::BOLD)),
            Span::styled("█", theme::amber()),
        ]);
        let block = Block::default()
            .title(Span::styled(" Search day, title or topic ", theme::accent()))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::amber())
            .style(theme::surface());
        frame.render_widget(Paragraph::new(line).block(block), popup);
    }

    fn draw_help(&self, frame: &mut Frame) {
        let area = frame.area();
        let popup = Rect {
            x: area.width / 4,
            y: area.height / 4,
            width: area.width / 2,
            height: area.height / 2,
        };
        frame.render_widget(Clear, popup);

        let bindings = [
            ("[↑ ↓]", "Move between days"),
            ("[Enter] / [m]", "Complete or reopen the focused day"),
            ("[f]", "Cycle unit filter"),
            ("[/]", "Search by day, title or topic"),
            ("[c]", "Challenge calendar"),
            ("[r]", "Reload from the store"),
            ("[?]", "Toggle help"),
            ("[Esc]", "Quit"),
        ];
        let mut text = vec![
            Line::from(Span::styled("  Keybindings", theme::accent().add_modifier(Modifier::BOLD))),
            Line::from(""),
        ];
        for (key, what) in bindings {
            text.push(Line::from(vec![
                Span::styled(format!("  {:<15}", key), theme::accent()),
                Span::styled(what, theme::dim()),
            ]));
        }

        let block = Block::default()
            .title(Span::styled(" Help ", theme::accent()))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::accent())
            .style(theme::surface());
        frame.render_widget(Paragraph::new(text).block(block), popup);
    }
}

/// Run the dashboard event loop for one student.
pub fn run(db: Database, config: &AppConfig, dataset: Arc<ChallengeDataset>, student: &User) -> Result<()> {
    let clock = UnlockClock::from_config(&config.challenge)?;
    let source = LocalStore::new(db, student.id);
    let mut app = App::new(student, clock, dataset, source, Utc::now());
    app.load();

    let mut terminal = ratatui::init();
    let events = EventHandler::new(Duration::from_millis(config.dashboard.tick_ms));

    let result = loop {
        if let Err(e) = terminal.draw(|frame| app.draw(frame)) {
            break Err(e.into());
        }
        match events.next() {
            Ok(Event::Key(key)) => {
                app.handle_key(key);
                if app.should_quit {
                    break Ok(());
                }
            }
            Ok(Event::Tick) => app.tick(Utc::now()),
            Ok(Event::Resize) => {}
            Err(e) => break Err(e.into()),
        }
    };

    ratatui::restore();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge::dataset::tests::sample_dataset;
    use crate::db::repository::UserRepo;
    use crate::models::NewUser;
    use chrono::{NaiveDate, NaiveTime, TimeZone};
    use crossterm::event::KeyModifiers;
    use ratatui::{Terminal, backend::TestBackend};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(app: &mut App<LocalStore>, text: &str) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
    }

    fn setup() -> (tempfile::TempDir, Database, App<LocalStore>) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("tui.db")).unwrap();
        let user = db
            .with_conn(|c| {
                UserRepo::create(
                    c,
                    &NewUser {
                        name: "Ana".into(),
                        email: "ana@upes.ac.in".into(),
                        sap_id: Some("50000001".into()),
                        practice_handle: None,
                        password_hash: None,
                    },
                    Utc::now(),
                )
            })
            .unwrap();
        let clock = UnlockClock::new(
            NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            330,
        )
        .unwrap();
        // day 10 opened at 07:00 local
        let now = Utc.with_ymd_and_hms(2025, 2, 10, 12, 0, 0).unwrap();
        let source = LocalStore::new(db.clone(), user.id);
        let mut app = App::new(&user, clock, Arc::new(sample_dataset()), source, now);
        app.load();
        (dir, db, app)
    }

    #[test]
    fn lists_open_days_newest_first() {
        let (_dir, _db, app) = setup();
        assert_eq!(app.visible.len(), 10);
        assert_eq!(app.visible[0], 10);
    }

    #[test]
    fn completing_requires_typed_phrase() {
        let (_dir, db, mut app) = setup();
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.input_mode, InputMode::Confirm);

        type_text(&mut app, "day 9");
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.input_mode, InputMode::Confirm);
        assert!(app.input_error.is_some());

        for _ in 0..5 {
            app.handle_key(key(KeyCode::Backspace));
        }
        type_text(&mut app, " DAY 10 ");
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.progress().is_completed(10));

        let stored: Vec<u32> = db.completions(1).unwrap().iter().map(|r| r.day).collect();
        assert_eq!(stored, vec![10]);

        // reopening skips the confirmation
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(!app.progress().is_completed(10));
    }

    #[test]
    fn escape_cancels_confirmation() {
        let (_dir, _db, mut app) = setup();
        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Enter));
        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.progress().pending().is_none());
        assert!(!app.should_quit);
        assert!(app.progress().completed().is_empty());
    }

    #[test]
    fn search_and_unit_filter_narrow_the_list() {
        let (_dir, _db, mut app) = setup();
        app.handle_key(key(KeyCode::Char('/')));
        type_text(&mut app, "two sum");
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.visible, vec![7]);

        app.handle_key(key(KeyCode::Char('/')));
        for _ in 0..7 {
            app.handle_key(key(KeyCode::Backspace));
        }
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.visible.len(), 10);

        // only "Unit 1" has open days this early
        app.handle_key(key(KeyCode::Char('f')));
        assert_eq!(app.visible.len(), 10);
        app.handle_key(key(KeyCode::Char('f')));
        assert!(app.visible.is_empty());
    }

    #[test]
    fn tick_opens_the_next_day() {
        let (_dir, _db, mut app) = setup();
        app.tick(Utc.with_ymd_and_hms(2025, 2, 11, 1, 30, 0).unwrap());
        assert_eq!(app.visible[0], 11);
    }

    #[test]
    fn every_view_renders() {
        let (_dir, _db, mut app) = setup();
        let mut terminal = Terminal::new(TestBackend::new(140, 40)).unwrap();
        for view in [View::Days, View::Calendar, View::Help] {
            app.view = view;
            terminal.draw(|f| app.draw(f)).unwrap();
        }
        app.view = View::Days;
        app.handle_key(key(KeyCode::Enter));
        terminal.draw(|f| app.draw(f)).unwrap();
    }
}
