//! Command-line front end.
//!
//! State lives in a JSON snapshot file that is loaded at the start of every
//! command and written back after any command that changes it.

use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{ArgAction, Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

use crate::config::{ConfigError, SchedulingConfig};
use crate::models::{
    parse_datetime, NewTask, Priority, ScheduledTask, Task, TaskUpdate, ValidationError,
    DEFAULT_DURATION_MINUTES,
};
use crate::persistence::{self, PersistenceError};
use crate::predictor::DurationPredictor;
use crate::scheduler::{OptimizeOptions, ResolveMode, Scheduler, SchedulerError};
use crate::scoring::ScoringMode;
use crate::store::{Statistics, TaskStore};

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Everything that can stop a command.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to encode output: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "tasksched", about = "Personal task scheduler", version)]
pub struct Cli {
    /// Task snapshot file
    #[arg(long, env = "TASKSCHED_FILE", default_value = "tasks.json", global = true)]
    pub file: PathBuf,

    /// Duration history file
    #[arg(long, env = "TASKSCHED_HISTORY", default_value = "history.bin", global = true)]
    pub history: PathBuf,

    /// First working hour [default: 9]
    #[arg(long, env = "TASKSCHED_WORK_START", global = true)]
    pub work_start: Option<u32>,

    /// Hour at which no new task is started [default: 18]
    #[arg(long, env = "TASKSCHED_WORK_END", global = true)]
    pub work_end: Option<u32>,

    /// Minutes between consecutive tasks [default: 15]
    #[arg(long, env = "TASKSCHED_GAP", global = true)]
    pub gap: Option<u32>,

    /// Increase log verbosity (-v changes, -vv checks, -vvv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a task
    Add {
        /// Task name
        name: String,
        /// Task description
        #[arg(short, long)]
        description: Option<String>,
        /// Estimated duration in minutes [default: predicted from history, else 60]
        #[arg(short = 'm', long)]
        minutes: Option<u32>,
        /// Priority tier: urgent, high, medium, low
        #[arg(short, long, default_value_t = Priority::Medium)]
        priority: Priority,
        /// Deadline, "YYYY-MM-DD HH:MM"
        #[arg(long, value_parser = parse_datetime)]
        deadline: Option<NaiveDateTime>,
        /// Id of a task that must finish first (repeatable)
        #[arg(long = "depends")]
        depends: Vec<String>,
        /// Free-form tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// List tasks
    List {
        /// Only tasks of this tier
        #[arg(long)]
        priority: Option<Priority>,
        /// Only overdue tasks
        #[arg(long, conflicts_with = "upcoming")]
        overdue: bool,
        /// Only tasks due within this many hours
        #[arg(long)]
        upcoming: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change fields of a task
    Update {
        /// Task id
        id: String,
        /// Field change as key=value (repeatable)
        #[arg(long = "set", required = true, value_parser = parse_update)]
        set: Vec<TaskUpdate>,
    },

    /// Mark a task as done
    Complete {
        /// Task id
        id: String,
        /// Actual minutes spent, recorded for future predictions
        #[arg(long)]
        actual: Option<u32>,
    },

    /// Remove a task
    Delete {
        /// Task id
        id: String,
    },

    /// Lay out all open tasks on the calendar
    Optimize {
        /// First day to schedule on [default: today]
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Run the conflict resolver over the result
        #[arg(long)]
        resolve: bool,
        /// Re-check work hours after every overlap push
        #[arg(long, requires = "resolve")]
        settle: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rank open tasks by urgency score
    Rank {
        /// Penalize tasks with many dependencies
        #[arg(long)]
        detailed: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show statistics and overdue tasks
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Copy all tasks to a snapshot file
    Export {
        /// Destination path
        path: PathBuf,
    },

    /// Replace all tasks with the contents of a snapshot file
    Import {
        /// Source path
        path: PathBuf,
    },

    /// Predict a duration from recorded history
    Predict {
        /// Task name
        name: String,
        /// Minutes to use when there is no history
        #[arg(long, default_value_t = DEFAULT_DURATION_MINUTES)]
        default: u32,
    },
}

fn parse_update(s: &str) -> Result<TaskUpdate, ValidationError> {
    let (key, value) = s.split_once('=').ok_or_else(|| ValidationError::InvalidValue {
        field: "set".to_string(),
        value: s.to_string(),
    })?;
    TaskUpdate::parse(key, value)
}

impl Cli {
    pub fn scheduling_config(&self) -> Result<SchedulingConfig, ConfigError> {
        SchedulingConfig::new(self.work_start, self.work_end, self.gap, Some(self.verbose))
    }
}

/// Execute one parsed command, writing human output to `out`.
pub fn run<W: Write>(cli: Cli, out: &mut W) -> Result<(), CliError> {
    let config = cli.scheduling_config()?;
    let mut store = persistence::load_or_default(&cli.file)?;
    let now = Local::now().naive_local();

    let changed = match cli.command {
        Command::Add {
            name,
            description,
            minutes,
            priority,
            deadline,
            depends,
            tags,
        } => {
            let minutes = match minutes {
                Some(m) => m,
                None => DurationPredictor::load(&cli.history)?.predict_or_default(&name),
            };
            let mut new_task = NewTask::new(name)
                .description(description.unwrap_or_default())
                .duration(minutes)
                .priority(priority);
            new_task.deadline = deadline;
            new_task.dependencies = depends;
            new_task.tags = tags;

            let task = store.add(new_task)?;
            writeln!(out, "Added {} ({} min)", task.id, task.duration)?;
            true
        }

        Command::List {
            priority,
            overdue,
            upcoming,
            json,
        } => {
            let mut tasks: Vec<&Task> = if overdue {
                store.overdue_tasks(now)
            } else if let Some(hours) = upcoming {
                store.upcoming_tasks(now, hours)
            } else {
                store.tasks().iter().collect()
            };
            if let Some(tier) = priority {
                tasks.retain(|t| t.priority == tier);
            }
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&tasks)?)?;
            } else if tasks.is_empty() {
                writeln!(out, "No tasks")?;
            } else {
                for task in tasks {
                    write_task(out, task)?;
                }
            }
            false
        }

        Command::Update { id, set } => {
            let task = store.update(&id, set)?;
            writeln!(out, "Updated {}", task.id)?;
            true
        }

        Command::Complete { id, actual } => {
            store.mark_completed(&id)?;
            if let (Some(minutes), Some(task)) = (actual, store.get(&id)) {
                let mut predictor = DurationPredictor::load(&cli.history)?;
                predictor.record(&task.name, minutes)?;
                predictor.save(&cli.history)?;
            }
            writeln!(out, "Completed {}", id)?;
            true
        }

        Command::Delete { id } => {
            let task = store.delete(&id)?;
            writeln!(out, "Deleted {} ({})", task.id, task.name)?;
            true
        }

        Command::Optimize {
            start,
            resolve,
            settle,
            json,
        } => {
            let scheduler = Scheduler::new(config)?;
            let options = OptimizeOptions {
                start_date: start,
                resolve_conflicts: resolve,
                resolve_mode: if settle {
                    ResolveMode::Settle
                } else {
                    ResolveMode::SinglePass
                },
            };
            let scheduled = scheduler.optimize(&mut store, &options)?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&scheduled)?)?;
            } else {
                write_schedule(out, &scheduled)?;
            }
            true
        }

        Command::Rank { detailed, json } => {
            let mode = if detailed {
                ScoringMode::Detailed
            } else {
                ScoringMode::Basic
            };
            let ranked = Scheduler::new(config)?.rank(&store, now, mode);
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&ranked)?)?;
            } else {
                for (id, score) in &ranked {
                    let name = store.get(id).map_or("", |t| t.name.as_str());
                    writeln!(out, "{:.2}  {}  {}", score, id, name)?;
                }
            }
            false
        }

        Command::Stats { json } => {
            let stats = store.statistics(now);
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&stats)?)?;
            } else {
                write_statistics(out, &stats, &store.overdue_tasks(now))?;
            }
            false
        }

        Command::Export { path } => {
            persistence::export_to_path(&store, &path)?;
            writeln!(out, "Exported {} tasks to {}", store.len(), path.display())?;
            false
        }

        Command::Import { path } => {
            let count = persistence::import_from_path(&mut store, &path)?;
            writeln!(out, "Imported {} tasks from {}", count, path.display())?;
            true
        }

        Command::Predict { name, default } => {
            let predictor = DurationPredictor::load(&cli.history)?;
            writeln!(out, "{}", predictor.predict(&name, default))?;
            false
        }
    };

    if changed {
        persistence::export_to_path(&store, &cli.file)?;
    }
    Ok(())
}

fn write_task<W: Write>(out: &mut W, task: &Task) -> io::Result<()> {
    let status = if task.completed { "x" } else { " " };
    writeln!(out, "[{}] {}  {}", status, task.id, task.name)?;
    writeln!(out, "    {} min, {}", task.duration, task.priority)?;
    if let Some(deadline) = task.deadline {
        writeln!(out, "    due {}", deadline.format(DISPLAY_FORMAT))?;
    }
    if let Some(start) = task.start_time {
        writeln!(out, "    scheduled {}", start.format(DISPLAY_FORMAT))?;
    }
    if !task.tags.is_empty() {
        writeln!(out, "    tags: {}", task.tags.join(", "))?;
    }
    if !task.dependencies.is_empty() {
        writeln!(out, "    after: {}", task.dependencies.join(", "))?;
    }
    Ok(())
}

fn write_schedule<W: Write>(out: &mut W, scheduled: &[ScheduledTask]) -> io::Result<()> {
    if scheduled.is_empty() {
        return writeln!(out, "Nothing to schedule");
    }
    let mut current_day: Option<NaiveDate> = None;
    for entry in scheduled {
        let day = entry.start_time.date();
        if current_day != Some(day) {
            writeln!(out, "{}", day.format("%a %Y-%m-%d"))?;
            current_day = Some(day);
        }
        writeln!(
            out,
            "  {} - {}  {} ({} min)",
            entry.start_time.format("%H:%M"),
            entry.end_time.format("%H:%M"),
            entry.name,
            entry.duration
        )?;
    }
    Ok(())
}

fn write_statistics<W: Write>(
    out: &mut W,
    stats: &Statistics,
    overdue: &[&Task],
) -> io::Result<()> {
    writeln!(out, "Total:       {}", stats.total_tasks)?;
    writeln!(out, "Completed:   {}", stats.completed_tasks)?;
    writeln!(out, "In progress: {}", stats.in_progress_tasks)?;
    writeln!(out, "Pending:     {}", stats.pending_tasks)?;
    writeln!(out, "Completion:  {:.1}%", stats.completion_rate)?;
    writeln!(out, "Total time:  {} min", stats.total_duration)?;
    writeln!(out, "Done time:   {} min", stats.completed_duration)?;
    writeln!(out, "Average:     {:.1} min", stats.avg_duration)?;
    if !overdue.is_empty() {
        writeln!(out, "Overdue: {}", overdue.len())?;
        for task in overdue {
            if let Some(deadline) = task.deadline {
                writeln!(out, "  {} (due {})", task.name, deadline.format(DISPLAY_FORMAT))?;
            }
        }
    }
    Ok(())
}
