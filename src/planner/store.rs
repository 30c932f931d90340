//! The task store: the authoritative ordered task list and every operation
//! on it.
//!
//! Each mutating call either succeeds completely or returns an error with
//! the list untouched. Persistence is not the store's job; callers save the
//! snapshot from [`TaskStore::tasks`] after a successful mutation.

use super::id::{IdGenerator, UuidIds};
use super::query::{Query, Statistics, View};
use super::task::{NewTask, Task, TaskPatch};
use crate::error::{PlannerError, Result};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, warn};

pub struct TaskStore {
    tasks: Vec<Task>,
    ids: Box<dyn IdGenerator>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::with_ids(Vec::new(), Box::new(UuidIds))
    }

    /// Builds a store over a previously saved list.
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        Self::with_ids(tasks, Box::new(UuidIds))
    }

    /// Like [`from_tasks`](Self::from_tasks) with a custom id source.
    ///
    /// Loaded records are normalized, and any task whose id repeats an
    /// earlier one gets a fresh id so ids are unique from the start.
    pub fn with_ids(mut tasks: Vec<Task>, ids: Box<dyn IdGenerator>) -> Self {
        let mut store = Self {
            tasks: Vec::with_capacity(tasks.len()),
            ids,
        };

        let mut seen = HashSet::new();
        for task in tasks.iter_mut() {
            task.normalize();
            if !seen.insert(task.id.clone()) {
                let fresh = store.fresh_id(&seen);
                warn!(old = %task.id, new = %fresh, "Duplicate task id in loaded list, reassigning");
                task.id = fresh;
                seen.insert(task.id.clone());
            }
        }

        store.tasks = tasks;
        store
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    /// Creates a task at the front of the list.
    pub fn add(&mut self, new_task: NewTask) -> Result<&Task> {
        if new_task.title.trim().is_empty() {
            return Err(PlannerError::validation("Task title is required"));
        }

        let live: HashSet<String> = self.tasks.iter().map(|t| t.id.clone()).collect();
        let id = self.fresh_id(&live);
        let task = Task::new(id, new_task, now());

        debug!(id = %task.id, title = %task.title, "Adding task");
        self.tasks.insert(0, task);
        Ok(&self.tasks[0])
    }

    /// Merges `patch` into the task with `id`.
    pub fn update(&mut self, id: &str, patch: TaskPatch) -> Result<&Task> {
        let index = self.index_of(id)?;

        if let Some(title) = &patch.title {
            if title.trim().is_empty() {
                return Err(PlannerError::validation("Task title is required"));
            }
        }

        debug!(id, "Updating task");
        let task = &mut self.tasks[index];
        task.apply(patch, now());
        Ok(task)
    }

    pub fn delete(&mut self, id: &str) -> Result<Task> {
        let index = self.index_of(id)?;
        debug!(id, index, "Deleting task");
        Ok(self.tasks.remove(index))
    }

    pub fn toggle_complete(&mut self, id: &str) -> Result<&Task> {
        let index = self.index_of(id)?;
        let task = &mut self.tasks[index];
        task.toggle(now());
        debug!(id, completed = task.completed, "Toggled task");
        Ok(task)
    }

    /// Moves the task at `from` to `to`, shifting the tasks in between by one.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.tasks.len();
        for index in [from, to] {
            if index >= len {
                return Err(PlannerError::Index { index, len });
            }
        }

        if from == to {
            return Ok(());
        }

        let task = self.tasks.remove(from);
        self.tasks.insert(to, task);
        debug!(from, to, "Reordered tasks");
        Ok(())
    }

    /// Removes every task and returns how many were removed.
    pub fn clear_all(&mut self) -> usize {
        let removed = self.tasks.len();
        self.tasks.clear();
        debug!(removed, "Cleared all tasks");
        removed
    }

    pub fn query(&self, query: &Query) -> View<'_> {
        query.run(&self.tasks)
    }

    pub fn statistics(&self) -> Statistics {
        Statistics::collect(&self.tasks)
    }

    fn index_of(&self, id: &str) -> Result<usize> {
        self.position(id).ok_or_else(|| PlannerError::not_found(id))
    }

    fn fresh_id(&mut self, live: &HashSet<String>) -> String {
        loop {
            let id = self.ids.next_id();
            if !live.contains(&id) {
                return id;
            }
        }
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

fn now() -> DateTime<Utc> {
    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::id::SequentialIds;
    use crate::planner::query::{Filter, SortKey};
    use crate::planner::task::{Priority, Tag};
    use chrono::{NaiveDate, TimeZone};

    fn store() -> TaskStore {
        TaskStore::with_ids(Vec::new(), Box::new(SequentialIds::new()))
    }

    fn store_with(titles: &[&str]) -> TaskStore {
        let mut store = store();
        // added in reverse so the list reads in the given order
        for title in titles.iter().rev() {
            store.add(NewTask::new(*title)).unwrap();
        }
        store
    }

    fn titles(store: &TaskStore) -> Vec<String> {
        store.tasks().iter().map(|t| t.title.clone()).collect()
    }

    #[test]
    fn test_add_prepends_fresh_pending_task() {
        let mut store = store_with(&["b", "c"]);
        let before: Vec<String> = store.tasks().iter().map(|t| t.id.clone()).collect();

        let task = store
            .add(
                NewTask::new("a")
                    .description("details")
                    .priority(Priority::High)
                    .tags(vec![Tag::new("work", "#4b6cb7")]),
            )
            .unwrap()
            .clone();

        assert_eq!(store.len(), 3);
        assert_eq!(store.tasks()[0].id, task.id);
        assert!(!before.contains(&task.id));
        assert!(!task.completed);
        assert_eq!(task.completed_at, None);
        assert_eq!(task.created_at, task.updated_at);
        assert_eq!(task.tags, vec![Tag::new("work", "#4b6cb7")]);
        assert_eq!(titles(&store), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_add_rejects_blank_title() {
        let mut store = store();
        let err = store.add(NewTask::new("  ")).unwrap_err();
        assert!(matches!(err, PlannerError::Validation(_)));
        assert!(store.is_empty());

        let mut store = store_with(&["x"]);
        assert!(store.add(NewTask::new("\t\n")).is_err());
        assert_eq!(titles(&store), vec!["x"]);
    }

    #[test]
    fn test_add_skips_ids_already_in_use() {
        let existing = Task::new("1".into(), NewTask::new("loaded"), Utc::now());
        let mut store = TaskStore::with_ids(vec![existing], Box::new(SequentialIds::new()));

        let id = store.add(NewTask::new("new")).unwrap().id.clone();
        assert_eq!(id, "2");
    }

    #[test]
    fn test_duplicate_loaded_ids_are_reassigned() {
        let now = Utc::now();
        let loaded = vec![
            Task::new("7".into(), NewTask::new("first"), now),
            Task::new("7".into(), NewTask::new("second"), now),
        ];
        let store = TaskStore::with_ids(loaded, Box::new(SequentialIds::starting_at(7)));

        assert_eq!(store.tasks()[0].id, "7");
        assert_eq!(store.tasks()[1].id, "8");
    }

    #[test]
    fn test_update_merges_patch() {
        let mut store = store_with(&["draft"]);
        let id = store.tasks()[0].id.clone();
        let created = store.tasks()[0].created_at;
        let due = NaiveDate::from_ymd_opt(2025, 1, 31);

        let task = store
            .update(
                &id,
                TaskPatch {
                    title: Some("final".into()),
                    due_date: Some(due),
                    ..TaskPatch::default()
                },
            )
            .unwrap();

        assert_eq!(task.id, id);
        assert_eq!(task.title, "final");
        assert_eq!(task.due_date, due);
        assert_eq!(task.created_at, created);
        assert!(task.updated_at >= created);
    }

    #[test]
    fn test_update_failures_leave_list_unchanged() {
        let mut store = store_with(&["keep"]);
        let id = store.tasks()[0].id.clone();
        let snapshot = store.tasks().to_vec();

        let err = store.update("missing", TaskPatch::default()).unwrap_err();
        assert!(matches!(err, PlannerError::NotFound(_)));

        let err = store
            .update(
                &id,
                TaskPatch {
                    title: Some(" ".into()),
                    priority: Some(Priority::Low),
                    ..TaskPatch::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, PlannerError::Validation(_)));
        assert_eq!(store.tasks(), snapshot.as_slice());
    }

    #[test]
    fn test_delete_removes_exactly_one() {
        let mut store = store_with(&["a", "b", "c", "d"]);
        let id = store.tasks()[1].id.clone();

        let removed = store.delete(&id).unwrap();
        assert_eq!(removed.title, "b");
        assert_eq!(titles(&store), vec!["a", "c", "d"]);

        assert!(matches!(store.delete(&id), Err(PlannerError::NotFound(_))));
        assert_eq!(titles(&store), vec!["a", "c", "d"]);
    }

    #[test]
    fn test_toggle_twice_restores_state() {
        let mut store = store_with(&["a"]);
        let id = store.tasks()[0].id.clone();
        let original = store.tasks()[0].clone();

        let first = store.toggle_complete(&id).unwrap().clone();
        assert!(first.completed);
        assert!(first.completed_at.is_some());
        assert!(first.updated_at >= original.updated_at);

        let second = store.toggle_complete(&id).unwrap().clone();
        assert_eq!(second.completed, original.completed);
        assert_eq!(second.completed_at, original.completed_at);
        assert!(second.updated_at >= first.updated_at);

        assert!(matches!(store.toggle_complete("nope"), Err(PlannerError::NotFound(_))));
    }

    #[test]
    fn test_update_completed_keeps_completion_invariant() {
        let mut store = store_with(&["a"]);
        let id = store.tasks()[0].id.clone();

        let task = store
            .update(
                &id,
                TaskPatch {
                    completed: Some(true),
                    ..TaskPatch::default()
                },
            )
            .unwrap();
        assert!(task.completed && task.completed_at.is_some());
    }

    #[test]
    fn test_reorder_moves_and_shifts() {
        let mut store = store_with(&["a", "b", "c", "d"]);

        store.reorder(0, 2).unwrap();
        assert_eq!(titles(&store), vec!["b", "c", "a", "d"]);

        store.reorder(3, 0).unwrap();
        assert_eq!(titles(&store), vec!["d", "b", "c", "a"]);

        store.reorder(1, 1).unwrap();
        assert_eq!(titles(&store), vec!["d", "b", "c", "a"]);
    }

    #[test]
    fn test_reorder_round_trip_restores_order() {
        let mut store = store_with(&["a", "b", "c", "d", "e"]);
        let original = titles(&store);

        for (i, j) in [(0, 4), (4, 0), (1, 3), (3, 1), (2, 2)] {
            store.reorder(i, j).unwrap();
            store.reorder(j, i).unwrap();
            assert_eq!(titles(&store), original);
        }
    }

    #[test]
    fn test_reorder_out_of_bounds() {
        let mut store = store_with(&["a", "b", "c"]);

        let err = store.reorder(0, 5).unwrap_err();
        assert!(matches!(err, PlannerError::Index { index: 5, len: 3 }));
        assert!(store.reorder(3, 0).is_err());
        assert_eq!(titles(&store), vec!["a", "b", "c"]);

        assert!(TaskStore::new().reorder(0, 0).is_err());
    }

    #[test]
    fn test_clear_all_then_statistics() {
        let mut store = store_with(&["only"]);
        assert_eq!(store.clear_all(), 1);
        assert!(store.is_empty());

        let stats = store.statistics();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.completed, 0);
        assert_eq!(stats.pending, 0);
        assert_eq!(stats.completion_percentage, 0);
    }

    #[test]
    fn test_statistics_totals_add_up() {
        let mut store = store_with(&["a", "b", "c", "d"]);
        let ids: Vec<String> = store.tasks().iter().map(|t| t.id.clone()).collect();
        store.toggle_complete(&ids[0]).unwrap();
        store.toggle_complete(&ids[2]).unwrap();
        store.toggle_complete(&ids[2]).unwrap();
        store.toggle_complete(&ids[3]).unwrap();

        let stats = store.statistics();
        assert_eq!(stats.completed + stats.pending, stats.total);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.completion_percentage, 50);
        assert_eq!(stats.medium, 4);
    }

    #[test]
    fn test_query_scenario_date_and_priority() {
        let t1 = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap();
        let a = Task::new("A".into(), NewTask::new("A").priority(Priority::High), t1);
        let b = Task::new("B".into(), NewTask::new("B").priority(Priority::Low), t2);
        let store = TaskStore::from_tasks(vec![a, b]);

        let by_date = store.query(&Query::new(Filter::All, SortKey::Date));
        assert_eq!(by_date.ids(), vec!["B", "A"]);

        let by_priority = store.query(&Query::new(Filter::All, SortKey::Priority));
        assert_eq!(by_priority.ids(), vec!["A", "B"]);

        // queries do not reorder storage
        assert_eq!(store.tasks()[0].id, "A");
    }
}
