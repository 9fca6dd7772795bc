use chrono::{Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use habit_core::activity::MAX_HISTORY_DAYS;
use habit_core::xp::{level_progress, xp_to_next_level};
use habit_core::*;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "habit")]
#[command(about = "Habit tracker with streaks, XP and achievements", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Act as this user instead of the configured one
    #[arg(long, global = true)]
    user: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new habit
    Add {
        title: String,

        #[arg(long)]
        description: Option<String>,

        /// daily, weekly or monthly
        #[arg(long, default_value = "daily")]
        frequency: String,

        /// Completions per period
        #[arg(long, default_value_t = 1)]
        target: u32,

        #[arg(long, default_value = "#10b981")]
        color: String,
    },

    /// List habits
    List,

    /// Mark a habit done (today unless --date is given)
    Done {
        /// Habit id, id prefix, or title
        habit: String,

        /// Day to mark, YYYY-MM-DD
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Un-mark a habit
    Undo {
        /// Habit id, id prefix, or title
        habit: String,

        /// Day to un-mark, YYYY-MM-DD
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Show streaks, level and milestones (default)
    Stats,

    /// Show achievement progress
    Achievements,

    /// Show daily completions for recent days
    History {
        #[arg(
            long,
            default_value_t = 30,
            value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_HISTORY_DAYS))
        )]
        days: u32,
    },

    /// Export completions to CSV
    Export {
        /// Output path (defaults to <data-dir>/completions.csv)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Rewrite the completion ledger without superseded entries
    Compact,
}

fn main() -> Result<()> {
    habit_core::logging::init_with_level("warn");

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let user_id = cli.user.unwrap_or_else(|| config.user.id.clone());
    tracing::debug!("Using data dir {:?} as user {}", data_dir, user_id);

    let catalog = Catalog::from_config(&config);
    let errors = catalog.validate();
    if !errors.is_empty() {
        eprintln!("Catalog validation errors:");
        for error in &errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::Validation("Invalid catalog".into()));
    }

    let repo = FileRepository::new(&data_dir);
    let mut tracker = Tracker::new(repo, user_id, catalog, config.xp.policy())?;
    let today = Local::now().date_naive();

    match cli.command {
        Some(Commands::Add {
            title,
            description,
            frequency,
            target,
            color,
        }) => cmd_add(&mut tracker, title, description, &frequency, target, color),
        Some(Commands::List) => cmd_list(&tracker),
        Some(Commands::Done { habit, date }) => {
            cmd_toggle(&mut tracker, &habit, date.unwrap_or(today), today, true)
        }
        Some(Commands::Undo { habit, date }) => {
            cmd_toggle(&mut tracker, &habit, date.unwrap_or(today), today, false)
        }
        Some(Commands::Achievements) => cmd_achievements(&mut tracker, today),
        Some(Commands::History { days }) => cmd_history(&tracker, today, days),
        Some(Commands::Export { output }) => {
            let path = output.unwrap_or_else(|| data_dir.join("completions.csv"));
            cmd_export(&tracker, &path)
        }
        Some(Commands::Compact) => cmd_compact(&mut tracker),
        Some(Commands::Stats) | None => cmd_stats(&tracker, today),
    }
}

fn cmd_add(
    tracker: &mut Tracker<FileRepository>,
    title: String,
    description: Option<String>,
    frequency: &str,
    target: u32,
    color: String,
) -> Result<()> {
    let frequency = Frequency::parse(frequency).unwrap_or_else(|| {
        eprintln!("Unknown frequency: {}. Using daily.", frequency);
        Frequency::Daily
    });

    let mut habit = Habit::new(tracker.user_id(), title, Utc::now());
    habit.description = description;
    habit.frequency = frequency;
    habit.target_completion = target;
    habit.color = color;

    let habit = tracker.add_habit(habit)?;
    println!("✓ Added habit '{}'", habit.title);
    println!("  id: {}", habit.id);
    Ok(())
}

fn cmd_list(tracker: &Tracker<FileRepository>) -> Result<()> {
    let profile = tracker.profile()?;
    if profile.habits.is_empty() {
        println!("No habits yet. Add one with `habit add <title>`.");
        return Ok(());
    }

    for habit in &profile.habits {
        println!(
            "  {}  {:<24} {:?} x{}",
            &habit.id[..8.min(habit.id.len())],
            habit.title,
            habit.frequency,
            habit.target_completion
        );
        if let Some(ref description) = habit.description {
            println!("            {}", description);
        }
    }
    Ok(())
}

fn cmd_toggle(
    tracker: &mut Tracker<FileRepository>,
    query: &str,
    date: NaiveDate,
    today: NaiveDate,
    completed: bool,
) -> Result<()> {
    let habit = tracker.find_habit(query)?;
    let now = Utc::now();

    let outcome = if completed {
        tracker.complete(&habit.id, date, now, today)?
    } else {
        tracker.uncomplete(&habit.id, date, now, today)?
    };

    if !outcome.changed {
        if completed {
            println!("'{}' was already done on {}", habit.title, date);
        } else {
            println!("'{}' was not done on {}", habit.title, date);
        }
        return Ok(());
    }

    let delta = tracker.policy().delta(completed);
    if completed {
        println!("✓ Habit completed! {:+} XP", delta);
    } else {
        println!("✗ Habit un-completed. {:+} XP", delta);
    }
    println!(
        "  Level {} · {} XP · streak {} day(s)",
        outcome.xp.level, outcome.xp.xp, outcome.streak.current_streak
    );

    if outcome.levels_gained > 0 {
        println!("\n★ Level up! You are now level {}", outcome.xp.level);
    }

    for id in &outcome.unlocked {
        if let Some(def) = tracker.catalog().achievement(id) {
            println!("\n{} Achievement unlocked: {}", def.icon, def.title);
            println!("  {}", def.description);
        }
    }

    Ok(())
}

fn cmd_stats(tracker: &Tracker<FileRepository>, today: NaiveDate) -> Result<()> {
    let summary = tracker.summary(today)?;

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  PROGRESS");
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!(
        "  Level {}  ({} XP, {} to next level, {:.0}%)",
        summary.xp.level,
        summary.xp.xp,
        xp_to_next_level(summary.xp, summary.xp_per_level),
        level_progress(summary.xp, summary.xp_per_level) * 100.0
    );
    println!("  Current streak: {} day(s)", summary.streak.current_streak);
    println!("  Longest streak: {} day(s)", summary.streak.longest_streak);
    match summary.streak.last_completed_date {
        Some(date) => println!("  Last completed: {}", date),
        None => println!("  Last completed: never"),
    }
    println!("  Total completions: {}", summary.completion_count);

    println!();
    println!("  Milestones:");
    for milestone in &summary.milestones {
        println!(
            "    {} {:<18} {:>3} days  {}",
            milestone.icon,
            milestone.name,
            milestone.days,
            if milestone.achieved { "Achieved" } else { "In Progress" }
        );
    }

    if let Some(next) = summary.next_milestone {
        println!(
            "\n  Next: {} ({:.0}% of {} days)",
            next.milestone.name, next.percent, next.milestone.days
        );
    }
    println!();
    Ok(())
}

fn cmd_achievements(tracker: &mut Tracker<FileRepository>, today: NaiveDate) -> Result<()> {
    let profile = tracker.refresh_achievements(Utc::now(), today)?;
    let achieved = profile.achievements.values().filter(|p| p.achieved).count();

    println!(
        "\nAchievements: {} / {} unlocked\n",
        achieved,
        tracker.catalog().achievements.len()
    );

    for def in &tracker.catalog().achievements {
        let Some(progress) = profile.achievements.get(&def.id) else {
            continue;
        };
        let status = if progress.achieved {
            "Achieved"
        } else {
            "In Progress"
        };
        println!(
            "  {} {:<16} {:>4} / {:<4} {}",
            def.icon,
            def.title,
            progress.progress.min(def.required_value),
            def.required_value,
            status
        );
        if let Some(at) = progress.achieved_at {
            println!("      unlocked {}", at.format("%Y-%m-%d"));
        }
    }
    println!();
    Ok(())
}

fn cmd_history(tracker: &Tracker<FileRepository>, today: NaiveDate, days: u32) -> Result<()> {
    let history = tracker.history(today, days)?;

    for day in &history {
        println!(
            "  {}  {:>3} done  {:>4} XP  {}",
            day.date,
            day.completions,
            day.xp,
            "■".repeat(day.completions as usize)
        );
    }
    Ok(())
}

fn cmd_export(tracker: &Tracker<FileRepository>, path: &Path) -> Result<()> {
    let events = tracker.completions()?;
    let count = export_completions_csv(&events, path)?;

    println!("✓ Exported {} completions", count);
    println!("  CSV: {}", path.display());
    Ok(())
}

fn cmd_compact(tracker: &mut Tracker<FileRepository>) -> Result<()> {
    let stats = tracker.compact()?;
    println!(
        "✓ Compacted ledger: {} → {} entries",
        stats.before, stats.after
    );
    Ok(())
}
