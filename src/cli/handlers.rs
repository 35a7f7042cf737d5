use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use chrono::Utc;
use log::info;

use crate::challenge::sync::{confirmation_matches, confirmation_phrase};
use crate::challenge::{
    ChallengeDataset, TOTAL_DAYS, UnlockClock, activity_from_records, build_calendar_grid, derive_stats,
};
use crate::config::AppConfig;
use crate::db::Database;
use crate::db::repository::UserRepo;
use crate::models::user::is_valid_sap_id;
use crate::models::{CalendarGrid, Solution, User, completed_days};
use crate::practice::{ActivitySource, PracticeClient};
use crate::server::{self, AppState};
use crate::tui;
use crate::utils::format::{format_countdown, format_percent, format_unlock, progress_bar};

// ─── ANSI helpers ────────────────────────────────────────────────────────────

macro_rules! println_colored {
    ($color:expr, $($arg:tt)*) => {{
        print!("{}", $color);
        print!($($arg)*);
        println!("\x1b[0m");
    }};
}

const GREEN: &str = "\x1b[32m";
const AMBER: &str = "\x1b[33m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const BLUE: &str = "\x1b[38;2;88;166;255m";
const RESET: &str = "\x1b[0m";

/// 256-colour shades for heatmap levels 0-4.
const LEVEL_COLORS: [&str; 5] = [
    "\x1b[38;5;236m",
    "\x1b[38;5;22m",
    "\x1b[38;5;28m",
    "\x1b[38;5;34m",
    "\x1b[38;5;46m",
];

// ─── Shared lookups ──────────────────────────────────────────────────────────

fn find_student(db: &Database, sap_id: &str) -> Result<User> {
    let sap_id = sap_id.trim();
    if !is_valid_sap_id(sap_id) {
        bail!("'{}' is not a valid SAP ID (expected 8 digits)", sap_id);
    }
    db.with_conn(|conn| UserRepo::find_by_sap_id(conn, sap_id))?
        .ok_or_else(|| anyhow!("No student with SAP ID {}", sap_id))
}

fn load_dataset(config: &AppConfig) -> Result<Arc<ChallengeDataset>> {
    let path = config.dataset_path()?;
    let dataset = ChallengeDataset::load(&path)
        .with_context(|| format!("Challenge dataset is required; set challenge.dataset_path or place it at {:?}", path))?;
    Ok(Arc::new(dataset))
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("Starting async runtime")
}

// ─── Init ────────────────────────────────────────────────────────────────────

pub fn handle_init(config_path: &Path, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        println!("Config already exists at {:?}. Use --force to overwrite.", config_path);
        return Ok(());
    }
    AppConfig::default().save(config_path)?;
    println_colored!(GREEN, "  ✓ Wrote default config to {:?}", config_path);
    Ok(())
}

// ─── Serve ───────────────────────────────────────────────────────────────────

pub fn handle_serve(db: Database, mut config: AppConfig, bind: Option<String>) -> Result<()> {
    if config.server.jwt_secret.trim().is_empty() {
        bail!("No signing secret configured; set JWT_SECRET or server.jwt_secret");
    }
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    let dataset = load_dataset(&config)?;
    let practice: Arc<dyn ActivitySource> = Arc::new(PracticeClient::new(&config.practice)?);
    let state = Arc::new(AppState::new(db, config, dataset, practice)?);

    info!("Starting server");
    runtime()?.block_on(server::serve(state))
}

// ─── Status ──────────────────────────────────────────────────────────────────

pub fn handle_status(db: &Database, config: &AppConfig) -> Result<()> {
    let clock = UnlockClock::from_config(&config.challenge)?;
    let now = Utc::now();
    let unlocked = clock.unlocked_day_count(now);
    let students = db.with_conn(|conn| UserRepo::count(conn))?;

    println!();
    println_colored!(BLUE, "  100 Days of Code");
    println!();
    if let Some(start) = clock.start() {
        println!("  {DIM}Started{RESET}      {}", format_unlock(start));
    }
    println!(
        "  {DIM}Open days{RESET}    {BOLD}{}{RESET}/{}  {GREEN}{}{RESET}",
        unlocked,
        TOTAL_DAYS,
        progress_bar(unlocked, TOTAL_DAYS, 20)
    );
    match (clock.next_unlock(now), clock.seconds_until_next_unlock(now)) {
        (Some(at), Some(secs)) => println!(
            "  {DIM}Next unlock{RESET}  {} {AMBER}(in {}){RESET}",
            format_unlock(at),
            format_countdown(secs)
        ),
        _ => println_colored!(GREEN, "  Every day is open"),
    }
    println!("  {DIM}Students{RESET}     {}", students);
    println!();
    Ok(())
}

// ─── Progress ────────────────────────────────────────────────────────────────

pub fn handle_progress(db: &Database, config: &AppConfig, sap_id: &str) -> Result<()> {
    let student = find_student(db, sap_id)?;
    let clock = UnlockClock::from_config(&config.challenge)?;
    let unlocked = clock.unlocked_day_count(Utc::now());
    let records = db.completions(student.id)?;
    let stats = derive_stats(&completed_days(&records), unlocked);

    println!();
    println_colored!(BLUE, "  {} ({})", student.name, sap_id.trim());
    println!();
    println!(
        "  {GREEN}{}{RESET}  {BOLD}{}{RESET}",
        progress_bar(stats.completed_count, stats.unlocked_day_count, 20),
        format_percent(stats.percent_complete)
    );
    println!(
        "  {DIM}Completed{RESET}  {}/{}   {DIM}Streak{RESET}  {AMBER}{} days{RESET}",
        stats.completed_count, stats.unlocked_day_count, stats.current_streak
    );
    println!();

    if records.is_empty() {
        println_colored!(DIM, "  No days completed yet");
    } else {
        for r in &records {
            println!(
                "  {GREEN}●{RESET} Day {:<4} {DIM}{}{RESET}",
                r.day,
                r.completed_at.format("%Y-%m-%d %H:%M UTC")
            );
        }
    }
    println!();
    Ok(())
}

// ─── Toggle ──────────────────────────────────────────────────────────────────

fn confirm_on_stdin(day: u32) -> Result<bool> {
    print!("  Type \"{}\" to mark it complete: ", confirmation_phrase(day));
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(confirmation_matches(day, &line))
}

pub fn handle_toggle(db: &Database, sap_id: &str, day: u32, yes: bool) -> Result<()> {
    let student = find_student(db, sap_id)?;
    let already = db.completions(student.id)?.iter().any(|r| r.day == day);

    if !already && !yes && !confirm_on_stdin(day)? {
        println_colored!(AMBER, "  ✗ Confirmation did not match, nothing changed");
        return Ok(());
    }

    let records = db.toggle_day(student.id, day, Utc::now())?;
    if records.iter().any(|r| r.day == day) {
        println_colored!(GREEN, "  ✓ Day {} completed for {}", day, student.name);
    } else {
        println_colored!(AMBER, "  ○ Day {} reopened for {}", day, student.name);
    }
    Ok(())
}

// ─── Search ──────────────────────────────────────────────────────────────────

pub fn handle_search(db: &Database, config: &AppConfig, sap_id: &str) -> Result<()> {
    handle_progress(db, config, sap_id)?;
    let student = find_student(db, sap_id)?;

    let Some(handle) = student.practice_handle.as_deref() else {
        println_colored!(AMBER, "  No practice handle linked to this student");
        println!();
        return Ok(());
    };

    let client = PracticeClient::new(&config.practice)?;
    let profile = runtime()?.block_on(client.profile(handle))?;

    println_colored!(BLUE, "  Practice profile: {}", profile.username);
    println!();
    for bucket in &profile.submission_counts_by_difficulty {
        println!("  {DIM}{:<8}{RESET} {BOLD}{}{RESET}", bucket.difficulty, bucket.count);
    }
    println!(
        "  {DIM}Active days{RESET} {}   {DIM}Streak{RESET} {}",
        profile.calendar.total_active_days, profile.calendar.current_streak
    );
    if !profile.badges.is_empty() {
        let names: Vec<&str> = profile.badges.iter().map(|b| b.display_name.as_str()).collect();
        println!("  {DIM}Badges{RESET}      {}", names.join(", "));
    }
    println!();
    Ok(())
}

// ─── Calendar ────────────────────────────────────────────────────────────────

fn print_grid(grid: &CalendarGrid) {
    let weeks: Vec<_> = grid.weeks().collect();

    let mut header = vec![' '; weeks.len() * 2];
    for month in &grid.months {
        for (i, ch) in month.label.chars().enumerate() {
            if let Some(slot) = header.get_mut(month.column * 2 + i) {
                *slot = ch;
            }
        }
    }
    println!("      {DIM}{}{RESET}", header.into_iter().collect::<String>());

    for (weekday, label) in ["", "Mon", "", "Wed", "", "Fri", ""].iter().enumerate() {
        print!("  {DIM}{:<4}{RESET}", label);
        for week in &weeks {
            match week.get(weekday) {
                Some(cell) if cell.in_range => print!("{}■ {RESET}", LEVEL_COLORS[cell.level as usize]),
                _ => print!("  "),
            }
        }
        println!();
    }
    println!();
    println!(
        "  {DIM}{} in the last year across {} active days{RESET}",
        grid.total_in_range(),
        grid.active_days()
    );
}

pub fn handle_calendar(db: &Database, config: &AppConfig, sap_id: &str, practice: bool) -> Result<()> {
    let student = find_student(db, sap_id)?;
    let today = Utc::now().date_naive();

    let grid = if practice {
        let handle = student
            .practice_handle
            .as_deref()
            .ok_or_else(|| anyhow!("{} has no practice handle linked", student.name))?;
        let client = PracticeClient::new(&config.practice)?;
        let profile = runtime()?.block_on(client.profile(handle))?;
        build_calendar_grid(&profile.calendar.activity_by_epoch_day, today)
    } else {
        build_calendar_grid(&activity_from_records(&db.completions(student.id)?), today)
    };

    println!();
    println_colored!(BLUE, "  {}", student.name);
    println!();
    print_grid(&grid);
    println!();
    Ok(())
}

// ─── Dataset ─────────────────────────────────────────────────────────────────

pub fn handle_dataset(config: &AppConfig) -> Result<()> {
    let dataset = load_dataset(config)?;
    let days = dataset.days();

    println!();
    println_colored!(GREEN, "  ✓ {} days, numbered 1-{} in order", days.len(), TOTAL_DAYS);
    println!();
    for unit in dataset.units() {
        let in_unit: Vec<_> = days.iter().filter(|d| d.unit == unit).collect();
        let first = in_unit.first().map(|d| d.day).unwrap_or_default();
        let last = in_unit.last().map(|d| d.day).unwrap_or_default();
        println!("  {BOLD}{:<24}{RESET} {DIM}days {}-{} ({}){RESET}", unit, first, last, in_unit.len());
    }

    let with_solutions = days
        .iter()
        .filter(|d| {
            d.solutions.as_ref().is_some_and(|s| {
                s.question1.iter().chain(&s.question2).any(|sol| !matches!(sol, Solution::Other))
            })
        })
        .count();
    println!();
    println!("  {DIM}Days with solution material:{RESET} {}", with_solutions);
    println!();
    Ok(())
}

// ─── Dashboard ───────────────────────────────────────────────────────────────

pub fn handle_dashboard(db: Database, config: &AppConfig, student: Option<&str>) -> Result<()> {
    let sap_id = student
        .or(config.dashboard.student.as_deref())
        .ok_or_else(|| anyhow!("Pass --student <SAP ID> or set dashboard.student in the config"))?;
    let student = find_student(&db, sap_id)?;
    let dataset = load_dataset(config)?;
    tui::app::run(db, config, dataset, &student)
}
