//! Derived views over the task list: filtering, searching, sorting and
//! aggregate statistics. Nothing here mutates the list.

use super::task::{Priority, Task};
use crate::error::{PlannerError, Result};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// One selector covering both completion status and priority. Choosing a
/// priority replaces a status selection and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    Pending,
    Completed,
    High,
    Medium,
    Low,
}

impl Filter {
    pub const ALL: [Filter; 6] = [
        Filter::All,
        Filter::Pending,
        Filter::Completed,
        Filter::High,
        Filter::Medium,
        Filter::Low,
    ];

    pub fn accepts(self, task: &Task) -> bool {
        match self {
            Filter::All => true,
            Filter::Pending => !task.completed,
            Filter::Completed => task.completed,
            Filter::High => task.priority == Priority::High,
            Filter::Medium => task.priority == Priority::Medium,
            Filter::Low => task.priority == Priority::Low,
        }
    }

    /// The next option, wrapping around. Used by the shell's cycle key.
    pub fn next(self) -> Self {
        let pos = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(pos + 1) % Self::ALL.len()]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Filter::All => "all",
            Filter::Pending => "pending",
            Filter::Completed => "completed",
            Filter::High => "high",
            Filter::Medium => "medium",
            Filter::Low => "low",
        }
    }

    /// Heading shown above the list.
    pub fn heading(self) -> String {
        match self {
            Filter::All => "All Tasks".to_string(),
            Filter::Pending => "Pending Tasks".to_string(),
            Filter::Completed => "Completed Tasks".to_string(),
            Filter::High => "High Priority Tasks".to_string(),
            Filter::Medium => "Medium Priority Tasks".to_string(),
            Filter::Low => "Low Priority Tasks".to_string(),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Filter {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == wanted)
            .ok_or_else(|| PlannerError::invalid_input(format!("unknown filter '{}'", s.trim())))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Newest first by creation time
    #[default]
    Date,
    Priority,
    DueDate,
    Title,
    /// Storage order, as arranged by reorder
    Manual,
}

impl SortKey {
    pub const ALL: [SortKey; 5] = [
        SortKey::Date,
        SortKey::Priority,
        SortKey::DueDate,
        SortKey::Title,
        SortKey::Manual,
    ];

    pub fn compare(self, a: &Task, b: &Task) -> Ordering {
        match self {
            SortKey::Date => b.created_at.cmp(&a.created_at),
            SortKey::Priority => b.priority.severity().cmp(&a.priority.severity()),
            SortKey::DueDate => match (a.due_date, b.due_date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            SortKey::Title => compare_titles(&a.title, &b.title),
            SortKey::Manual => Ordering::Equal,
        }
    }

    pub fn next(self) -> Self {
        let pos = Self::ALL.iter().position(|k| *k == self).unwrap_or(0);
        Self::ALL[(pos + 1) % Self::ALL.len()]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Date => "date",
            SortKey::Priority => "priority",
            SortKey::DueDate => "duedate",
            SortKey::Title => "title",
            SortKey::Manual => "manual",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortKey::Date => "Date Created",
            SortKey::Priority => "Priority",
            SortKey::DueDate => "Due Date",
            SortKey::Title => "Alphabetical",
            SortKey::Manual => "Manual Order",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace(['-', '_'], "").as_str() {
            "date" | "created" => Ok(SortKey::Date),
            "priority" => Ok(SortKey::Priority),
            "duedate" | "due" => Ok(SortKey::DueDate),
            "title" | "alpha" => Ok(SortKey::Title),
            "manual" | "custom" => Ok(SortKey::Manual),
            _ => Err(PlannerError::invalid_input(format!("unknown sort key '{}'", s.trim()))),
        }
    }
}

/// Dictionary-style ordering in three levels: base letters (accents and case
/// ignored), then accents (unaccented first), then case (lowercase first).
fn compare_titles(a: &str, b: &str) -> Ordering {
    base_letters(a)
        .cmp(&base_letters(b))
        .then_with(|| decomposed_lowercase(a).cmp(&decomposed_lowercase(b)))
        .then_with(|| b.cmp(a))
}

fn base_letters(s: &str) -> String {
    s.nfd().filter(|c| !is_combining_mark(*c)).flat_map(char::to_lowercase).collect()
}

fn decomposed_lowercase(s: &str) -> String {
    s.nfd().flat_map(char::to_lowercase).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub filter: Filter,
    pub sort: SortKey,
    pub search: String,
    pub show_completed: bool,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            filter: Filter::All,
            sort: SortKey::Date,
            search: String::new(),
            show_completed: true,
        }
    }
}

impl Query {
    pub fn new(filter: Filter, sort: SortKey) -> Self {
        Self {
            filter,
            sort,
            ..Self::default()
        }
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = text.into();
        self
    }

    pub fn show_completed(mut self, show: bool) -> Self {
        self.show_completed = show;
        self
    }

    /// True when view positions equal storage positions, so the shell can
    /// translate a move in the view directly into a reorder.
    pub fn mirrors_storage(&self) -> bool {
        self.sort == SortKey::Manual
            && self.filter == Filter::All
            && self.search.is_empty()
            && self.show_completed
    }

    /// Builds the derived view over `tasks`.
    pub fn run<'a>(&self, tasks: &'a [Task]) -> View<'a> {
        let needle = self.search.to_lowercase();

        let mut items: Vec<&Task> = tasks
            .iter()
            .filter(|t| self.show_completed || !t.completed)
            .filter(|t| self.filter.accepts(t))
            .filter(|t| needle.is_empty() || t.matches(&needle))
            .collect();

        // sort_by is stable: equal keys keep storage order
        items.sort_by(|a, b| self.sort.compare(a, b));

        View { items }
    }
}

/// A read-only, ordered projection of the task list. Iterate it as many
/// times as needed; it borrows the list, so the list cannot change under it.
#[derive(Debug, Clone)]
pub struct View<'a> {
    items: Vec<&'a Task>,
}

impl<'a> View<'a> {
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &'a Task> + '_ {
        self.items.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&'a Task> {
        self.items.get(index).copied()
    }

    #[cfg(test)]
    pub fn ids(&self) -> Vec<&'a str> {
        self.items.iter().map(|t| t.id.as_str()).collect()
    }
}

impl<'a> IntoIterator for View<'a> {
    type Item = &'a Task;
    type IntoIter = std::vec::IntoIter<&'a Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub completion_percentage: u8,
}

impl Statistics {
    pub fn collect(tasks: &[Task]) -> Self {
        let mut stats = Statistics {
            total: tasks.len(),
            ..Statistics::default()
        };

        for task in tasks {
            if task.completed {
                stats.completed += 1;
            } else {
                stats.pending += 1;
            }
            match task.priority {
                Priority::High => stats.high += 1,
                Priority::Medium => stats.medium += 1,
                Priority::Low => stats.low += 1,
            }
        }

        if stats.total > 0 {
            let pct = (stats.completed as f64 / stats.total as f64 * 100.0).round();
            stats.completion_percentage = pct as u8;
        }

        stats
    }
}
