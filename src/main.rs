mod cli;
mod config;
mod error;
mod logging;
mod planner;

use cli::Command;
use colored::Colorize;
use crate::config::Settings;
use dialoguer::{theme::ColorfulTheme, Confirm};
use error::PlannerError;
use planner::query::Query;
use planner::storage::{JsonFileStorage, MemoryStorage, TaskRepository};
use planner::store::TaskStore;
use planner::task::{Priority, Task};
use std::error::Error;
use tracing::{info, warn};

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().collect();
    let cli = cli::parse(&args)?;

    if let Command::Help = cli.command {
        println!("{}", cli::USAGE);
        return Ok(());
    }

    let settings = Settings::load()?;
    let _log_guard = logging::init(&settings.log_level, &settings.log_path());

    // ==============================
    // 💾 Storage
    // ==============================
    let file_storage = JsonFileStorage::new(
        cli.data.clone().unwrap_or_else(|| settings.data_path()),
    );
    let memory_storage = MemoryStorage::new();

    let (repo, mut store): (&dyn TaskRepository, TaskStore) = if cli.ephemeral {
        info!("Running with in-memory storage");
        (&memory_storage as &dyn TaskRepository, TaskStore::new())
    } else {
        (&file_storage as &dyn TaskRepository, open_store(&file_storage)?)
    };

    match cli.command {
        // ==============================
        // 📋 INTERACTIVE PLANNER
        // ==============================
        Command::Interactive => {
            let query = settings.initial_query()?;
            let outcome = planner::ui::run_planner(&mut store, repo, query, settings.toast_lifetime());

            // Final save happens even if the UI bailed out with an error.
            if let Err(e) = repo.save(store.tasks()) {
                warn!("Final save failed: {}", e);
                eprintln!("⚠️  Warning: Could not save tasks: {}", e);
            }
            outcome?;
        }

        Command::List(list) => {
            let query = list.into_query(&settings)?;
            print_view(&store, &query);
        }

        Command::Stats { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&store.statistics())?);
            } else {
                print_stats(&store);
            }
        }

        Command::Add(new_task) => {
            let task = store.add(new_task)?.clone();
            repo.save(store.tasks())?;
            println!("✅ Task added: {} {}", task.title.bold(), short_id(&task.id).dimmed());
        }

        Command::Done(id) => {
            let id = resolve_id(&store, &id)?;
            let task = store.toggle_complete(&id)?.clone();
            repo.save(store.tasks())?;
            if task.completed {
                println!("☑ Completed: {}", task.title.bold());
            } else {
                println!("☐ Reopened: {}", task.title.bold());
            }
        }

        Command::Remove(id) => {
            let id = resolve_id(&store, &id)?;
            let removed = store.delete(&id)?;
            repo.save(store.tasks())?;
            println!("🗑  Deleted: {}", removed.title);
        }

        Command::Move { from, to } => {
            store.reorder(from, to)?;
            repo.save(store.tasks())?;
            println!("✔ Moved task {} to position {}", from + 1, to + 1);
        }

        Command::Clear { yes } => {
            if store.is_empty() {
                println!("No tasks to clear.");
                return Ok(());
            }

            let confirmed = yes
                || Confirm::with_theme(&ColorfulTheme::default())
                    .with_prompt(format!(
                        "Delete ALL {} tasks? This action cannot be undone.",
                        store.len()
                    ))
                    .default(false)
                    .interact()?;

            if confirmed {
                let removed = store.clear_all();
                repo.save(store.tasks())?;
                println!("🗑  Deleted {} tasks", removed);
            }
        }

        Command::Help => unreachable!("handled before storage is opened"),
    }

    Ok(())
}

/// Loads the saved list. An unreadable file is moved aside instead of being
/// overwritten by the next save.
fn open_store(storage: &JsonFileStorage) -> Result<TaskStore, Box<dyn Error>> {
    match storage.load() {
        Ok(tasks) => Ok(TaskStore::from_tasks(tasks)),
        Err(PlannerError::Json(e)) => {
            warn!(path = %storage.path().display(), "Task file is unreadable: {}", e);
            let moved = storage.quarantine()?;
            eprintln!(
                "⚠️  Warning: {} could not be read ({}). It was moved to {} and a new list was started.",
                storage.path().display(),
                e,
                moved.display()
            );
            Ok(TaskStore::new())
        }
        Err(e) => Err(e.into()),
    }
}

/// Accepts a full id or an unambiguous prefix of one.
fn resolve_id(store: &TaskStore, given: &str) -> Result<String, PlannerError> {
    if store.get(given).is_some() {
        return Ok(given.to_string());
    }

    let matches: Vec<&Task> = store
        .tasks()
        .iter()
        .filter(|t| t.id.starts_with(given))
        .collect();

    match matches.as_slice() {
        [task] if !given.is_empty() => Ok(task.id.clone()),
        [] | [_] => Err(PlannerError::not_found(given)),
        _ => Err(PlannerError::invalid_input(format!(
            "id prefix '{}' matches {} tasks",
            given,
            matches.len()
        ))),
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn print_view(store: &TaskStore, query: &Query) {
    let view = store.query(query);

    println!("\n{}", "=".repeat(80));
    println!("📋 {} ({})", query.filter.heading(), view.len());
    println!("{}", "=".repeat(80));

    if view.is_empty() {
        if !query.search.is_empty() {
            println!("No tasks match \"{}\"", query.search);
        } else {
            println!("No tasks found.");
        }
        return;
    }

    for (row, task) in view.iter().enumerate() {
        let checkbox = if task.completed { "☑" } else { "☐" };
        let title = if task.completed {
            task.title.dimmed().to_string()
        } else {
            task.title.bold().to_string()
        };

        let mut line = format!(
            "{:>3}. {} {} {} {}",
            row + 1,
            checkbox,
            title,
            priority_label(task.priority),
            short_id(&task.id).dimmed()
        );
        if let Some(due) = task.due_date {
            line.push_str(&format!(" 📅 {}", due));
        }
        for tag in &task.tags {
            line.push_str(&format!(" {}", format!("#{}", tag.name).cyan()));
        }
        println!("{}", line);

        if !task.description.is_empty() {
            println!("       {}", task.description.dimmed());
        }
    }

    println!("{}", "─".repeat(80));
}

fn print_stats(store: &TaskStore) {
    let stats = store.statistics();

    println!("\n{}", "=".repeat(80));
    println!("📊 Task Statistics");
    println!("{}", "=".repeat(80));
    println!("Total Tasks:   {}", stats.total);
    println!("Pending:       {}", stats.pending);
    println!("Completed:     {}", stats.completed);
    println!("High Priority: {}", stats.high.to_string().red());
    println!("Medium:        {}", stats.medium.to_string().yellow());
    println!("Low:           {}", stats.low.to_string().green());
    println!("Completion:    {}%", stats.completion_percentage);
    println!("{}", "=".repeat(80));
}

fn priority_label(priority: Priority) -> String {
    let label = format!("[{}]", priority);
    match priority {
        Priority::High => label.red().to_string(),
        Priority::Medium => label.yellow().to_string(),
        Priority::Low => label.green().to_string(),
    }
}
