use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use week_planner::{
    AppConfig, ClassPatch, Collaborators, ConsoleNotifier, DayAgenda, ExamPatch, FileStorage,
    LocalSharer, NotePatch, Planner, PlannerOptions, ReminderPolicy, SystemClock, ViewContext,
    Weekday, format_date, parse_date,
};

#[derive(Parser, Debug)]
#[command(name = "week-planner")]
#[command(about = "Weekly planner for classes, exams and notes")]
struct Args {
    /// Date to view (DD/MM/YYYY), defaults to today
    #[arg(long, global = true)]
    date: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the agenda of the selected day
    Day,
    /// Show the agenda of every day in the viewed week
    Week,
    /// List the weeks offered by the week picker
    Weeks,
    /// List every exam in chronological order
    Exams,
    /// Manage recurring classes
    Class {
        #[command(subcommand)]
        action: ClassAction,
    },
    /// Manage exams
    Exam {
        #[command(subcommand)]
        action: ExamAction,
    },
    /// Manage notes
    Note {
        #[command(subcommand)]
        action: NoteAction,
    },
    /// Write a CSV export
    Export {
        #[command(subcommand)]
        target: ExportTarget,
    },
}

#[derive(Subcommand, Debug)]
enum ClassAction {
    Add(ClassFields),
    Edit {
        id: String,
        #[command(flatten)]
        fields: ClassFields,
    },
    Rm { id: String },
}

#[derive(Subcommand, Debug)]
enum ExamAction {
    Add(ExamFields),
    Edit {
        id: String,
        #[command(flatten)]
        fields: ExamFields,
    },
    Rm { id: String },
}

#[derive(Subcommand, Debug)]
enum NoteAction {
    Add(NoteFields),
    Edit {
        id: String,
        #[command(flatten)]
        fields: NoteFields,
    },
    Rm { id: String },
}

#[derive(Subcommand, Debug)]
enum ExportTarget {
    /// Timetable of the viewed week
    Schedule,
    /// All exams
    Exams,
}

fn parse_reminder(s: &str) -> Result<ReminderPolicy, String> {
    ReminderPolicy::ALL
        .into_iter()
        .find(|policy| policy.as_str() == s)
        .ok_or_else(|| format!("expected one of: off, 1w, 3d, 1d, 1h, 30m (got '{}')", s))
}

#[derive(ClapArgs, Debug)]
struct ClassFields {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    teacher: Option<String>,
    #[arg(long)]
    room: Option<String>,
    /// Start time (HH:MM)
    #[arg(long)]
    start: Option<String>,
    /// End time (HH:MM)
    #[arg(long)]
    end: Option<String>,
    /// Weekday, e.g. monday or mon
    #[arg(long)]
    day: Option<Weekday>,
    #[arg(long)]
    color: Option<String>,
    #[arg(long)]
    notes: Option<String>,
    /// First date the class runs (DD/MM/YYYY)
    #[arg(long)]
    from: Option<String>,
    /// Last date the class runs (DD/MM/YYYY)
    #[arg(long)]
    until: Option<String>,
    #[arg(long, value_parser = parse_reminder)]
    reminder: Option<ReminderPolicy>,
}

impl From<ClassFields> for ClassPatch {
    fn from(f: ClassFields) -> Self {
        ClassPatch {
            name: f.name,
            teacher: f.teacher,
            room: f.room,
            start_time: f.start,
            end_time: f.end,
            weekday: f.day,
            color: f.color,
            notes: f.notes,
            start_date: f.from,
            end_date: f.until,
            reminder: f.reminder,
        }
    }
}

#[derive(ClapArgs, Debug)]
struct ExamFields {
    #[arg(long)]
    subject: Option<String>,
    /// Exam date (DD/MM/YYYY)
    #[arg(long = "on")]
    date: Option<String>,
    /// Start time (HH:MM)
    #[arg(long)]
    time: Option<String>,
    #[arg(long)]
    room: Option<String>,
    #[arg(long, value_parser = parse_reminder)]
    reminder: Option<ReminderPolicy>,
}

impl From<ExamFields> for ExamPatch {
    fn from(f: ExamFields) -> Self {
        ExamPatch {
            subject: f.subject,
            date: f.date,
            time: f.time,
            room: f.room,
            reminder: f.reminder,
        }
    }
}

#[derive(ClapArgs, Debug)]
struct NoteFields {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    content: Option<String>,
    /// Weekdays the note repeats on (comma separated)
    #[arg(long, value_delimiter = ',')]
    days: Option<Vec<Weekday>>,
    /// One-off date (DD/MM/YYYY)
    #[arg(long = "on")]
    date: Option<String>,
    #[arg(long, value_parser = parse_reminder)]
    reminder: Option<ReminderPolicy>,
}

impl From<NoteFields> for NotePatch {
    fn from(f: NoteFields) -> Self {
        NotePatch {
            title: f.title,
            content: f.content,
            weekdays: f.days,
            date: f.date,
            reminder: f.reminder,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
        .parse_lossy("week_planner=debug");

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let rt = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;

    tracing::info!(data_dir = %config.storage.data_dir.display(), "opening planner");
    let deps = Collaborators {
        storage: Arc::new(FileStorage::new(&config.storage.data_dir)),
        clock: Arc::new(SystemClock),
        notifier: Arc::new(ConsoleNotifier),
        sharer: Arc::new(LocalSharer),
    };
    let mut planner = Planner::open(deps, PlannerOptions::from(&config), rt.handle().clone());

    if let Some(raw) = &args.date {
        let date = parse_date(raw).with_context(|| format!("Invalid date '{}'", raw))?;
        *planner.view_mut() = ViewContext::for_date(date);
    }

    let outcome = run(&mut planner, &rt, &config, args.command.unwrap_or(Command::Day));

    // Pending writes must land even when the command failed.
    rt.block_on(planner.flush());
    outcome
}

fn run(
    planner: &mut Planner,
    rt: &tokio::runtime::Runtime,
    config: &AppConfig,
    command: Command,
) -> Result<()> {
    match command {
        Command::Day => print_day(&planner.day()),
        Command::Week => {
            for day in planner.week() {
                print_day(&day);
                println!();
            }
        }
        Command::Weeks => {
            for option in planner.week_options(config.view.weeks_before, config.view.weeks_after) {
                let marker = if option.offset == 0 { "*" } else { " " };
                println!("{} {:+3}  {}", marker, option.offset, option.label);
            }
        }
        Command::Exams => {
            let exams = planner.exam_list();
            if exams.is_empty() {
                println!("No exams scheduled");
            }
            for exam in exams {
                println!("{}  {}  {}  {}  [{}]", exam.date, exam.time, exam.subject, exam.room, exam.id);
            }
        }
        Command::Class { action } => match action {
            ClassAction::Add(fields) => created(planner.save_class(None, fields.into()))?,
            ClassAction::Edit { id, fields } => updated(planner.save_class(Some(&id), fields.into()))?,
            ClassAction::Rm { id } => removed(planner.delete_class(&id), &id),
        },
        Command::Exam { action } => match action {
            ExamAction::Add(fields) => created(planner.save_exam(None, fields.into()))?,
            ExamAction::Edit { id, fields } => updated(planner.save_exam(Some(&id), fields.into()))?,
            ExamAction::Rm { id } => removed(planner.delete_exam(&id), &id),
        },
        Command::Note { action } => match action {
            NoteAction::Add(fields) => created(planner.save_note(None, fields.into()))?,
            NoteAction::Edit { id, fields } => updated(planner.save_note(Some(&id), fields.into()))?,
            NoteAction::Rm { id } => removed(planner.delete_note(&id), &id),
        },
        Command::Export { target } => {
            let path = match target {
                ExportTarget::Schedule => rt.block_on(planner.export_week()),
                ExportTarget::Exams => rt.block_on(planner.export_exams()),
            };
            match path {
                Some(path) => println!("{}", path.display()),
                None => anyhow::bail!("Export failed"),
            }
        }
    }
    Ok(())
}

fn created<E: std::error::Error + Send + Sync + 'static>(result: Result<String, E>) -> Result<()> {
    let id = result.context("Entry rejected")?;
    println!("created {}", id);
    Ok(())
}

fn updated<E: std::error::Error + Send + Sync + 'static>(result: Result<String, E>) -> Result<()> {
    let id = result.context("Edit rejected")?;
    println!("updated {}", id);
    Ok(())
}

fn removed(found: bool, id: &str) {
    if found {
        println!("removed {}", id);
    } else {
        tracing::warn!(id, "nothing to remove");
    }
}

fn print_day(day: &DayAgenda<'_>) {
    println!("{} {}", day.weekday, format_date(day.date));

    if day.is_empty() {
        println!("  Nothing planned");
        return;
    }
    for class in &day.classes {
        println!(
            "  {}  {} ({}, {})  [{}]",
            class.time_span(),
            class.name,
            class.teacher,
            class.room,
            class.id
        );
    }
    for exam in &day.exams {
        println!("  {}  EXAM {} ({})  [{}]", exam.time, exam.subject, exam.room, exam.id);
    }
    for note in &day.notes {
        match note.content.as_deref() {
            Some(content) => println!("  - {}: {}  [{}]", note.title, content, note.id),
            None => println!("  - {}  [{}]", note.title, note.id),
        }
    }
}
