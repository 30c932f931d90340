//! Command-line parsing for the non-interactive modes.

use crate::config::Settings;
use crate::error::{PlannerError, Result};
use crate::planner::query::{Filter, Query, SortKey};
use crate::planner::task::{parse_due_date, NewTask, Priority, Tag, TAG_COLORS};
use std::path::PathBuf;

pub const USAGE: &str = "\
Usage: taskflow [--data <path>] [--ephemeral] [command]

Commands:
  (none)                      Open the interactive planner
  list [--filter F] [--sort S] [--search TEXT] [--hide-completed]
  stats [--json]              Show task statistics
  add <title> [--desc TEXT] [--due YYYY-MM-DD] [--priority P] [--tag NAME[#rrggbb]]...
  done <id>                   Toggle a task's completion
  rm <id>                     Delete a task
  move <from> <to>            Move a task between positions (1-based, manual order)
  clear [--yes]               Delete all tasks
  help                        Show this message

Filters: all, pending, completed, high, medium, low
Sort keys: date, priority, duedate, title, manual";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListArgs {
    pub filter: Option<Filter>,
    pub sort: Option<SortKey>,
    pub search: Option<String>,
    pub hide_completed: bool,
}

impl ListArgs {
    /// Flags win over the configured defaults, which are only parsed for
    /// the settings no flag covers.
    pub fn into_query(self, settings: &Settings) -> Result<Query> {
        let filter = match self.filter {
            Some(filter) => filter,
            None => settings.default_filter.parse()?,
        };
        let sort = match self.sort {
            Some(sort) => sort,
            None => settings.default_sort.parse()?,
        };

        Ok(Query::new(filter, sort)
            .search(self.search.unwrap_or_default())
            .show_completed(settings.show_completed && !self.hide_completed))
    }
}

#[derive(Debug, Clone)]
pub enum Command {
    Interactive,
    List(ListArgs),
    Stats { json: bool },
    Add(NewTask),
    Done(String),
    Remove(String),
    Move { from: usize, to: usize },
    Clear { yes: bool },
    Help,
}

#[derive(Debug, Clone)]
pub struct Cli {
    pub data: Option<PathBuf>,
    pub ephemeral: bool,
    pub command: Command,
}

/// Parses `std::env::args()`; the first element is the program name.
pub fn parse(args: &[String]) -> Result<Cli> {
    let mut data = None;
    let mut ephemeral = false;
    let mut rest: Vec<&str> = Vec::new();

    let mut iter = args.iter().skip(1).map(String::as_str);
    while let Some(arg) = iter.next() {
        match arg {
            "--data" => data = Some(PathBuf::from(require_value(arg, iter.next())?)),
            "--ephemeral" => ephemeral = true,
            _ => rest.push(arg),
        }
    }

    let command = match rest.split_first() {
        None => Command::Interactive,
        Some((cmd, tail)) => parse_command(cmd, tail)?,
    };

    Ok(Cli {
        data,
        ephemeral,
        command,
    })
}

fn parse_command(cmd: &str, tail: &[&str]) -> Result<Command> {
    match cmd {
        "list" | "ls" => parse_list(tail).map(Command::List),
        "stats" => Ok(Command::Stats {
            json: tail.contains(&"--json"),
        }),
        "add" => parse_add(tail).map(Command::Add),
        "done" | "toggle" => Ok(Command::Done(single_id(cmd, tail)?)),
        "rm" | "delete" => Ok(Command::Remove(single_id(cmd, tail)?)),
        "move" | "mv" => match tail {
            [from, to] => Ok(Command::Move {
                from: parse_position(from)?,
                to: parse_position(to)?,
            }),
            _ => Err(PlannerError::invalid_input("move takes <from> <to>")),
        },
        "clear" => Ok(Command::Clear {
            yes: tail.iter().any(|a| *a == "--yes" || *a == "-y"),
        }),
        "help" | "--help" | "-h" => Ok(Command::Help),
        other => Err(PlannerError::invalid_input(format!("unknown command '{}'", other))),
    }
}

fn parse_list(tail: &[&str]) -> Result<ListArgs> {
    let mut list = ListArgs::default();
    let mut iter = tail.iter().copied();

    while let Some(arg) = iter.next() {
        match arg {
            "--filter" => list.filter = Some(require_value(arg, iter.next())?.parse()?),
            "--sort" => list.sort = Some(require_value(arg, iter.next())?.parse()?),
            "--search" => list.search = Some(require_value(arg, iter.next())?.to_string()),
            "--hide-completed" => list.hide_completed = true,
            other => return Err(PlannerError::invalid_input(format!("unexpected argument '{}'", other))),
        }
    }

    Ok(list)
}

/// Title words are joined with spaces; the store decides whether the
/// resulting title is acceptable.
fn parse_add(tail: &[&str]) -> Result<NewTask> {
    let mut title_words: Vec<&str> = Vec::new();
    let mut new_task = NewTask::default();
    let mut iter = tail.iter().copied();

    while let Some(arg) = iter.next() {
        match arg {
            "--desc" | "--description" => {
                new_task.description = require_value(arg, iter.next())?.to_string();
            }
            "--due" => new_task.due_date = parse_due_date(require_value(arg, iter.next())?)?,
            "--priority" | "-p" => {
                new_task.priority = require_value(arg, iter.next())?.parse::<Priority>()?;
            }
            "--tag" | "-t" => {
                let color = TAG_COLORS[new_task.tags.len() % TAG_COLORS.len()];
                let tag = Tag::parse(require_value(arg, iter.next())?, color)?;
                if !new_task.tags.iter().any(|t| t.name == tag.name) {
                    new_task.tags.push(tag);
                }
            }
            word => title_words.push(word),
        }
    }

    new_task.title = title_words.join(" ");
    Ok(new_task)
}

fn single_id(cmd: &str, tail: &[&str]) -> Result<String> {
    match tail {
        [id] => Ok(id.to_string()),
        _ => Err(PlannerError::invalid_input(format!("{} takes exactly one task id", cmd))),
    }
}

fn parse_position(raw: &str) -> Result<usize> {
    match raw.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(PlannerError::invalid_input(format!("'{}' is not a position (1, 2, ...)", raw))),
    }
}

fn require_value<'a>(flag: &str, value: Option<&'a str>) -> Result<&'a str> {
    value.ok_or_else(|| PlannerError::invalid_input(format!("{} needs a value", flag)))
}
