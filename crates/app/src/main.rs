use std::env;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use services::{AppServices, Clock, CourseStore, Outcome, StoreNotice};
use storage::repository::Storage;
use study_core::model::{Course, Topic, UserId};
use study_core::views;
use tokio::sync::broadcast;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt as tracing_fmt};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidUserId { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidUserId { raw } => write!(f, "invalid --user value: {raw:?}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

const DEFAULT_DB_URL: &str = "sqlite://study.sqlite3";

#[derive(Debug)]
struct Args {
    db_url: String,
    user: UserId,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- dashboard [--db <sqlite_url>] [--user <id>]");
    eprintln!("  cargo run -p app -- tree      [--db <sqlite_url>] [--user <id>]");
    eprintln!("  cargo run -p app -- calendar  [--db <sqlite_url>] [--user <id>]");
    eprintln!("  cargo run -p app -- seed      [--db <sqlite_url>] [--user <id>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://study.sqlite3");
    eprintln!("  --user local");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  STUDY_DB_URL, STUDY_USER_ID, STUDY_LOG, STUDY_LOG_FORMAT=json");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Dashboard,
    Tree,
    Calendar,
    Seed,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "dashboard" => Some(Self::Dashboard),
            "tree" => Some(Self::Tree),
            "calendar" => Some(Self::Calendar),
            "seed" => Some(Self::Seed),
            _ => None,
        }
    }
}

impl Args {
    fn parse(
        args: &mut impl Iterator<Item = String>,
        env_db: Option<String>,
        env_user: Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut db_url = normalize_sqlite_url(env_db.unwrap_or_else(|| DEFAULT_DB_URL.into()));
        let mut user = env_user
            .and_then(|value| value.parse::<UserId>().ok())
            .unwrap_or_else(|| UserId::new("local"));

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--user" => {
                    let value = require_value(args, "--user")?;
                    user = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidUserId { raw: value.clone() })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self { db_url, user })
    }
}

/// Turn any file-backed SQLite URL into `sqlite://<absolute path>`, keeping a
/// trailing `?query`. In-memory URLs pass through untouched.
fn normalize_sqlite_url(raw: String) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite:file:") {
        return trimmed.to_string();
    }

    let rest = trimmed
        .strip_prefix("sqlite://")
        .or_else(|| trimmed.strip_prefix("sqlite:"))
        .unwrap_or(trimmed);
    let (path_str, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };
    let path = std::path::Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    match query {
        Some(query) => format!("sqlite://{}?{query}", absolute.display()),
        None => format!("sqlite://{}", absolute.display()),
    }
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" || db_url.starts_with("sqlite:file:") {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("STUDY_LOG")
        .unwrap_or_else(|_| EnvFilter::new("services=info,storage=info,warn"));
    let format = env::var("STUDY_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr; stdout carries the command output.
    match format.as_str() {
        "json" => {
            registry
                .with(
                    tracing_fmt::layer()
                        .json()
                        .with_ansi(false)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            registry
                .with(tracing_fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn applied<T>(outcome: Outcome<T>, what: &str) -> Result<T, Box<dyn std::error::Error>> {
    outcome
        .applied()
        .ok_or_else(|| format!("seed: {what} vanished while seeding").into())
}

async fn seed(
    store: &mut CourseStore,
    now: DateTime<Utc>,
) -> Result<(), Box<dyn std::error::Error>> {
    if !store.snapshot().is_empty() {
        println!("seed: forest already has courses, leaving it alone");
        return Ok(());
    }

    let algebra = applied(
        store
            .create_course("Algebra", "Linear functions", now + Duration::days(10))
            .await?,
        "course",
    )?;
    let functions = applied(store.create_subject(&algebra, "Functions").await?, "subject")?;
    let linear = applied(
        store.create_chapter(&algebra, &functions, "Linear").await?,
        "chapter",
    )?;
    let slope = applied(
        store.create_topic(&algebra, &functions, &linear, "Slope").await?,
        "topic",
    )?;
    let intercept = applied(
        store
            .create_topic(&algebra, &functions, &linear, "Intercept")
            .await?,
        "topic",
    )?;
    applied(
        store
            .update_topic(&algebra, &functions, &linear, &slope, true)
            .await?,
        "topic",
    )?;
    applied(
        store
            .create_subtopic(&algebra, &functions, &linear, &intercept, "Practice")
            .await?,
        "subtopic",
    )?;

    let biology = applied(
        store
            .create_course("Biology", "Cells and membranes", now + Duration::days(5))
            .await?,
        "course",
    )?;
    let cells = applied(store.create_subject(&biology, "Cells").await?, "subject")?;
    let membranes = applied(
        store.create_chapter(&biology, &cells, "Membranes").await?,
        "chapter",
    )?;
    applied(
        store
            .create_topic(&biology, &cells, &membranes, "Transport")
            .await?,
        "topic",
    )?;

    println!("seed: created {} courses", store.snapshot().len());
    Ok(())
}

fn print_topic(topic: &Topic) {
    let mark = if topic.is_completed() { "x" } else { " " };
    println!("      [{mark}] {}", topic.name());
    for subtopic in topic.subtopics() {
        let mark = if subtopic.is_completed() { "x" } else { " " };
        println!("        [{mark}] {}", subtopic.name());
    }
}

fn print_course_line(course: &Course, now: DateTime<Utc>) {
    println!(
        "{}  {}  due {} ({} days left)",
        course.name(),
        course.progress(),
        course.deadline().format("%Y-%m-%d"),
        views::days_left(course, now)
    );
}

fn print_tree(store: &CourseStore, now: DateTime<Utc>) {
    let forest = store.snapshot();
    if forest.is_empty() {
        println!("no courses yet; try `seed`");
        return;
    }
    for course in forest.iter() {
        print_course_line(course, now);
        for subject in course.subjects() {
            println!("  {}  {}", subject.name(), subject.progress());
            for chapter in subject.chapters() {
                println!("    {}  {}", chapter.name(), chapter.progress());
                chapter.topics().iter().for_each(print_topic);
            }
        }
    }
}

fn print_dashboard(store: &CourseStore, now: DateTime<Utc>) {
    let forest = store.snapshot();
    let overall = views::overall_progress(&forest);
    println!(
        "Overall progress: {overall} ({})",
        views::progress_label(overall)
    );
    println!(
        "Courses: {}  Subjects: {}",
        forest.len(),
        views::subject_count(&forest)
    );

    println!();
    println!("Upcoming deadlines:");
    for course in views::upcoming_deadlines(&forest, now, Duration::days(7), 3) {
        print_course_line(course, now);
    }

    println!();
    println!("Needs attention:");
    for course in views::needs_attention(&forest, now, 3) {
        print_course_line(course, now);
    }

    println!();
    println!("Recent courses:");
    for course in views::recent_courses(&forest, 3) {
        print_course_line(course, now);
    }
}

fn print_calendar(store: &CourseStore, now: DateTime<Utc>) {
    let forest = store.snapshot();
    let days = views::deadline_days(&forest);
    if days.is_empty() {
        println!("no deadlines");
        return;
    }
    for day in days {
        println!("{}", day.format("%a %Y-%m-%d"));
        for course in views::deadlines_on(&forest, day) {
            print!("  ");
            print_course_line(course, now);
        }
    }
}

fn report_notices(notices: &mut broadcast::Receiver<StoreNotice>) {
    while let Ok(notice) = notices.try_recv() {
        match notice {
            StoreNotice::Applied(_) => tracing::debug!(%notice, "store notice"),
            StoreNotice::PersistenceFailed { .. } | StoreNotice::LoadFailed { .. } => {
                eprintln!("{notice}");
            }
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = env::args().skip(1).collect();

    // No subcommand shows the dashboard.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Dashboard,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Dashboard,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(
        &mut iter,
        env::var("STUDY_DB_URL").ok(),
        env::var("STUDY_USER_ID").ok(),
    )
    .map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite here so the library crates never touch the filesystem.
    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;
    let clock = Clock::default();
    let services = AppServices::from_storage(&storage, clock);
    tracing::debug!(db = %parsed.db_url, ?cmd, "storage ready");

    let store = services.store();
    let mut notices = store.lock().await.notices();
    services.session().login(parsed.user);
    services.follow_session().await;

    let mut store = store.lock().await;
    let now = clock.now();
    match cmd {
        Command::Seed => seed(&mut store, now).await?,
        Command::Tree => print_tree(&store, now),
        Command::Dashboard => print_dashboard(&store, now),
        Command::Calendar => print_calendar(&store, now),
    }
    report_notices(&mut notices);
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, ArgsError> {
        let mut iter = args.iter().map(ToString::to_string);
        Args::parse(&mut iter, None, None)
    }

    #[test]
    fn defaults_apply_without_flags() {
        let args = parse(&[]).unwrap();
        assert!(args.db_url.starts_with("sqlite:///"));
        assert!(args.db_url.ends_with("/study.sqlite3"));
        assert_eq!(args.user, UserId::new("local"));
    }

    #[test]
    fn flags_override_environment() {
        let mut iter = ["--user", "bob"].iter().map(ToString::to_string);
        let args = Args::parse(
            &mut iter,
            Some("sqlite:///tmp/env.sqlite3".into()),
            Some("alice".into()),
        )
        .unwrap();
        assert_eq!(args.db_url, "sqlite:///tmp/env.sqlite3");
        assert_eq!(args.user, UserId::new("bob"));
    }

    #[test]
    fn bad_flags_are_reported() {
        assert!(matches!(
            parse(&["--db"]),
            Err(ArgsError::MissingValue { flag: "--db" })
        ));
        assert!(matches!(
            parse(&["--user", "  "]),
            Err(ArgsError::InvalidUserId { .. })
        ));
        assert!(matches!(parse(&["--nope"]), Err(ArgsError::UnknownArg(_))));
    }

    #[test]
    fn relative_sqlite_paths_become_absolute() {
        let url = normalize_sqlite_url("sqlite:data/study.sqlite3".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/study.sqlite3"));
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
    }

    #[tokio::test]
    async fn seed_builds_both_courses_and_skips_a_populated_forest() {
        use std::sync::Arc;

        use storage::repository::InMemoryKeyValueStore;
        use study_core::time::{fixed_clock, fixed_now};

        let mut store = CourseStore::new(fixed_clock(), Arc::new(InMemoryKeyValueStore::new()));
        store.set_active_user(Some(UserId::new("local"))).await;

        seed(&mut store, fixed_now()).await.unwrap();
        let forest = store.snapshot();
        assert_eq!(forest.len(), 2);
        let algebra = &forest.courses()[0];
        let topics = algebra.subjects()[0].chapters()[0].topics();
        assert!(topics[0].is_completed());
        assert_eq!(topics[1].subtopics().len(), 1);
        assert_eq!(algebra.progress().value(), 50);

        seed(&mut store, fixed_now()).await.unwrap();
        assert_eq!(store.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn seed_without_a_user_fails() {
        use std::sync::Arc;

        use storage::repository::InMemoryKeyValueStore;
        use study_core::time::{fixed_clock, fixed_now};

        let mut store = CourseStore::new(fixed_clock(), Arc::new(InMemoryKeyValueStore::new()));
        assert!(seed(&mut store, fixed_now()).await.is_err());
    }

    #[test]
    fn relative_paths_after_double_slash_become_absolute() {
        let url = normalize_sqlite_url("sqlite://nested/study.sqlite3?mode=rwc".into());
        let cwd = env::current_dir().unwrap();
        assert_eq!(
            url,
            format!("sqlite://{}?mode=rwc", cwd.join("nested/study.sqlite3").display())
        );
        assert_eq!(
            normalize_sqlite_url("sqlite:///var/lib/study.sqlite3".into()),
            "sqlite:///var/lib/study.sqlite3"
        );
        assert_eq!(
            normalize_sqlite_url("sqlite:file:mem?mode=memory&cache=shared".into()),
            "sqlite:file:mem?mode=memory&cache=shared"
        );
    }
}
