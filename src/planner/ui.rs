use super::query::{Filter, Query, Statistics, View};
use super::storage::TaskRepository;
use super::store::TaskStore;
use super::task::{format_tags, parse_due_date, parse_tags, NewTask, Priority, Tag, Task, TaskPatch, DATE_FORMAT};
use super::toast::{ToastKind, ToastSlot};
use chrono::Local;
use console::{style, measure_text_width, truncate_str};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, Clear, ClearType,
        EnterAlternateScreen, LeaveAlternateScreen,
        size,
    },
};
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use std::error::Error;
use std::io::{self, Write};
use std::time::{Duration, Instant};
use tracing::{info, warn};

type UiResult<T> = Result<T, Box<dyn Error>>;

// Upper bound on how long the loop blocks when no toast is pending.
const IDLE_POLL: Duration = Duration::from_secs(60);

/// Fields collected by the add/edit form.
struct TaskForm {
    title: String,
    description: String,
    due_date: Option<chrono::NaiveDate>,
    priority: Priority,
    tags: Vec<Tag>,
}

struct Planner<'a> {
    store: &'a mut TaskStore,
    repo: &'a dyn TaskRepository,
    query: Query,
    selected: usize,
    toast: ToastSlot,
}

/// Runs the interactive planner until the user quits. The caller owns the
/// store and does the final save.
pub fn run_planner(
    store: &mut TaskStore,
    repo: &dyn TaskRepository,
    query: Query,
    toast_lifetime: Duration,
) -> UiResult<()> {
    let mut planner = Planner {
        store,
        repo,
        query,
        selected: 0,
        toast: ToastSlot::new(toast_lifetime),
    };

    let mut stdout = io::stdout();

    execute!(stdout, EnterAlternateScreen, cursor::Hide)?;
    enable_raw_mode()?;

    let result = planner.event_loop(&mut stdout);

    disable_raw_mode()?;
    execute!(stdout, cursor::Show, LeaveAlternateScreen)?;
    result
}

impl Planner<'_> {
    fn event_loop(&mut self, stdout: &mut io::Stdout) -> UiResult<()> {
        // Initial render
        self.redraw(stdout)?;

        loop {
            let now = Instant::now();
            if self.toast.expire(now) {
                self.redraw(stdout)?;
            }

            let timeout = self.toast.time_left(now).unwrap_or(IDLE_POLL);
            if !event::poll(timeout)? {
                continue;
            }

            let key = match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => key,
                Event::Resize(_, _) => {
                    self.redraw(stdout)?;
                    continue;
                }
                _ => continue,
            };

            let row_count = self.view().len() + 1;

            match key.code {
                KeyCode::Char('q') => break,
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => break,

                KeyCode::Up | KeyCode::Char('k') => {
                    self.selected = self.selected.saturating_sub(1);
                }

                KeyCode::Down | KeyCode::Char('j') => {
                    if self.selected + 1 < row_count {
                        self.selected += 1;
                    }
                }

                KeyCode::Char(' ') | KeyCode::Enter => match self.selected_id() {
                    Some(id) => self.toggle(&id),
                    None => self.suspended(stdout, |p| p.add())?,
                },

                KeyCode::Char('a') => self.suspended(stdout, |p| p.add())?,

                KeyCode::Char('e') => {
                    if let Some(id) = self.selected_id() {
                        self.suspended(stdout, |p| p.edit(&id))?;
                    }
                }

                KeyCode::Char('d') => {
                    if let Some(id) = self.selected_id() {
                        self.suspended(stdout, |p| p.delete(&id))?;
                    }
                }

                KeyCode::Char('K') => self.move_selected(-1),
                KeyCode::Char('J') => self.move_selected(1),

                KeyCode::Char('f') => {
                    self.query.filter = self.query.filter.next();
                    self.selected = 0;
                    self.toast.info(format!("Showing {}", self.query.filter.heading().to_lowercase()));
                }

                KeyCode::Char('s') => {
                    self.query.sort = self.query.sort.next();
                    self.selected = 0;
                    self.toast.info(format!("Sorted by {}", self.query.sort.label().to_lowercase()));
                }

                KeyCode::Char('/') => self.suspended(stdout, |p| p.search())?,

                KeyCode::Esc => {
                    if !self.query.search.is_empty() {
                        self.query.search.clear();
                        self.selected = 0;
                        self.toast.info("Search cleared");
                    }
                }

                KeyCode::Char('h') => {
                    self.query.show_completed = !self.query.show_completed;
                    self.toast.info(if self.query.show_completed {
                        "Showing all tasks"
                    } else {
                        "Hiding completed tasks"
                    });
                }

                KeyCode::Char('C') => self.suspended(stdout, |p| p.clear_all())?,

                _ => continue,
            }

            self.clamp_selection();
            self.redraw(stdout)?;
        }

        Ok(())
    }

    fn view(&self) -> View<'_> {
        self.store.query(&self.query)
    }

    fn selected_id(&self) -> Option<String> {
        self.view().get(self.selected).map(|t| t.id.clone())
    }

    fn clamp_selection(&mut self) {
        // the extra row is "+ Add New Task"
        let last = self.view().len();
        if self.selected > last {
            self.selected = last;
        }
    }

    /// Saves after a successful mutation. A failed save is reported but the
    /// in-memory list stays as it is.
    fn persist(&mut self) {
        if let Err(e) = self.repo.save(self.store.tasks()) {
            warn!("Failed to save tasks: {}", e);
            self.toast.error(format!("Could not save tasks: {}", e));
        }
    }

    /// Leaves raw mode for dialoguer prompts, then restores it.
    fn suspended(
        &mut self,
        stdout: &mut io::Stdout,
        action: impl FnOnce(&mut Self) -> UiResult<()>,
    ) -> UiResult<()> {
        disable_raw_mode()?;
        execute!(stdout, cursor::MoveTo(0, 0), Clear(ClearType::All), cursor::Show)?;

        let result = action(self);

        enable_raw_mode()?;
        execute!(stdout, cursor::Hide)?;
        result
    }

    fn toggle(&mut self, id: &str) {
        match self.store.toggle_complete(id) {
            Ok(task) => {
                let message = if task.completed {
                    "Task marked as complete"
                } else {
                    "Task marked as pending"
                };
                self.toast.info(message);
                self.persist();
            }
            Err(e) => self.toast.error(e.to_string()),
        }
    }

    fn add(&mut self) -> UiResult<()> {
        println!("📝 Add New Task");
        println!("{}", "=".repeat(80));

        let form = prompt_task_form(None)?;

        let new_task = NewTask::new(form.title)
            .description(form.description)
            .due_date(form.due_date)
            .priority(form.priority)
            .tags(form.tags);

        match self.store.add(new_task) {
            Ok(task) => {
                info!(id = %task.id, "Task added");
                self.toast.success("Task added successfully");
                self.selected = 0;
                self.persist();
            }
            Err(e) => self.toast.error(e.to_string()),
        }
        Ok(())
    }

    fn edit(&mut self, id: &str) -> UiResult<()> {
        let Some(current) = self.store.get(id).cloned() else {
            return Ok(());
        };

        println!("✏️  Edit Task");
        println!("{}", "=".repeat(80));

        let form = prompt_task_form(Some(&current))?;

        let save = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Save changes?")
            .default(true)
            .interact()?;
        if !save {
            self.toast.info("Edit cancelled");
            return Ok(());
        }

        let patch = TaskPatch {
            title: Some(form.title),
            description: Some(form.description),
            due_date: Some(form.due_date),
            priority: Some(form.priority),
            tags: Some(form.tags),
            completed: None,
        };

        match self.store.update(id, patch) {
            Ok(_) => {
                self.toast.success("Task updated successfully");
                self.persist();
            }
            Err(e) => self.toast.error(e.to_string()),
        }
        Ok(())
    }

    fn delete(&mut self, id: &str) -> UiResult<()> {
        let title = self.store.get(id).map(|t| t.title.clone()).unwrap_or_default();

        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Delete \"{}\"?", title))
            .default(false)
            .interact()?;

        if !confirmed {
            return Ok(());
        }

        match self.store.delete(id) {
            Ok(_) => {
                self.toast.show("Task deleted", ToastKind::Error);
                self.persist();
            }
            Err(e) => self.toast.error(e.to_string()),
        }
        Ok(())
    }

    fn clear_all(&mut self) -> UiResult<()> {
        if self.store.is_empty() {
            return Ok(());
        }

        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Delete ALL tasks? This action cannot be undone.")
            .default(false)
            .interact()?;

        if confirmed {
            let removed = self.store.clear_all();
            info!(removed, "All tasks cleared");
            self.toast.show("All tasks deleted", ToastKind::Error);
            self.selected = 0;
            self.persist();
        }
        Ok(())
    }

    fn search(&mut self) -> UiResult<()> {
        let text: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Search tasks")
            .with_initial_text(&self.query.search)
            .allow_empty(true)
            .interact_text()?;

        self.query.search = text;
        self.selected = 0;
        Ok(())
    }

    /// Moves the selected task one row up (`-1`) or down (`1`) in storage.
    fn move_selected(&mut self, delta: isize) {
        if !self.query.mirrors_storage() {
            self.toast.info("Switch to manual order with no filter or search to move tasks");
            return;
        }

        if self.selected >= self.store.len() {
            return;
        }

        let Some(target) = self.selected.checked_add_signed(delta) else {
            return;
        };
        if target >= self.store.len() {
            return;
        }

        match self.store.reorder(self.selected, target) {
            Ok(()) => {
                self.selected = target;
                self.toast.info("Task order updated");
                self.persist();
            }
            Err(e) => self.toast.error(e.to_string()),
        }
    }

    fn redraw(&self, stdout: &mut io::Stdout) -> UiResult<()> {
        execute!(
            stdout,
            cursor::MoveTo(0, 0),
            Clear(ClearType::All)
        )?;

        let (width, height) = size()?;
        let frame = render(
            &self.view(),
            &self.query,
            &self.store.statistics(),
            self.selected,
            self.toast.current().map(|t| (t.kind, t.message.as_str())),
            width as usize,
            height as usize,
        );

        write!(stdout, "{}", frame)?;
        stdout.flush()?;
        Ok(())
    }
}

/// Builds one full screen. Lines end in `\r\n` because the terminal is in
/// raw mode.
fn render(
    view: &View<'_>,
    query: &Query,
    stats: &Statistics,
    selected: usize,
    toast: Option<(ToastKind, &str)>,
    width: usize,
    height: usize,
) -> String {
    if width < 40 || height < 12 {
        return "Terminal too small. Please resize the window.".to_string();
    }

    let mut lines: Vec<String> = Vec::new();

    // HEADER
    lines.push("=".repeat(width));
    lines.push(format!(
        "📋 TaskFlow — {} ({})",
        query.filter.heading(),
        view.len()
    ));
    lines.push(progress_line(stats, width));
    lines.push(format!(
        "Total {} · Pending {} · Completed {} · High priority {}",
        stats.total, stats.pending, stats.completed, stats.high
    ));
    let search = if query.search.is_empty() {
        "-".to_string()
    } else {
        format!("\"{}\"", query.search)
    };
    lines.push(format!(
        "Filter: {} | Sort: {} | Search: {} | Completed: {}",
        query.filter,
        query.sort.label(),
        search,
        if query.show_completed { "shown" } else { "hidden" }
    ));
    lines.push("=".repeat(width));

    let footer_lines = 5;
    let available = height.saturating_sub(lines.len() + footer_lines).max(2);

    if view.is_empty() {
        lines.push(String::new());
        lines.push(format!("  {}", style("No tasks found").bold()));
        lines.push(format!("  {}", empty_hint(query)));
        lines.push(String::new());
    }

    // each task takes two rows; the trailing add row takes one
    let rows_per_page = (available / 2).max(1);
    let total_rows = view.len() + 1;
    let start = selected.saturating_sub(rows_per_page / 2);
    let end = (start + rows_per_page).min(total_rows);

    for index in start..end {
        let pointer = if index == selected { "→ " } else { "  " };
        match view.get(index) {
            Some(task) => {
                lines.push(clip(&task_line(pointer, task), width));
                lines.push(clip(&detail_line(task), width));
            }
            None => lines.push(format!("{}+ Add New Task", pointer)),
        }
    }

    lines.push("─".repeat(width));
    lines.push(match toast {
        Some((kind, message)) => clip(&toast_text(kind, message), width),
        None => String::new(),
    });
    lines.push("💡 ↑/↓: Navigate | Space: Toggle | a: Add | e: Edit | d: Delete | J/K: Move".to_string());
    lines.push("   f: Filter | s: Sort | /: Search | Esc: Clear search | h: Hide done | C: Clear all | q: Quit".to_string());

    lines.join("\r\n")
}

fn progress_line(stats: &Statistics, width: usize) -> String {
    let bar_width = width.saturating_sub(30).clamp(10, 40);
    let filled = bar_width * stats.completion_percentage as usize / 100;
    format!(
        "Completion Progress [{}{}] {}%",
        "█".repeat(filled),
        "░".repeat(bar_width - filled),
        stats.completion_percentage
    )
}

fn empty_hint(query: &Query) -> String {
    if !query.search.is_empty() {
        format!("No tasks match \"{}\" (Esc clears the search)", query.search)
    } else if query.filter != Filter::All {
        format!("No {} tasks", query.filter)
    } else {
        "Add your first task to get started! (press a)".to_string()
    }
}

fn task_line(pointer: &str, task: &Task) -> String {
    let checkbox = if task.completed { "☑" } else { "☐" };
    let title = if task.completed {
        style(task.title.as_str()).dim().to_string()
    } else {
        task.title.clone()
    };

    let mut line = format!("{}{} {} {}", pointer, checkbox, title, priority_badge(task.priority));

    if let Some(due) = task.due_date {
        line.push_str(&format!(" 📅 {}", due.format("%b %-d")));
    }

    for tag in &task.tags {
        line.push_str(&format!(" {}", style(format!("#{}", tag.name)).cyan()));
    }

    line
}

fn detail_line(task: &Task) -> String {
    let created = task.created_at.with_timezone(&Local);
    let mut line = format!("     🕐 {}", created.format("%b %-d, %H:%M"));
    if !task.description.is_empty() {
        let first = task.description.lines().next().unwrap_or_default();
        line.push_str(&format!("  {}", style(first).dim()));
    }
    line
}

fn priority_badge(priority: Priority) -> String {
    let label = format!("[{}]", priority);
    match priority {
        Priority::High => style(label).red().to_string(),
        Priority::Medium => style(label).yellow().to_string(),
        Priority::Low => style(label).green().to_string(),
    }
}

fn toast_text(kind: ToastKind, message: &str) -> String {
    let text = format!("{} {}", kind.icon(), message);
    match kind {
        ToastKind::Success => style(text).green().bold().to_string(),
        ToastKind::Info => style(text).blue().bold().to_string(),
        ToastKind::Error => style(text).red().bold().to_string(),
    }
}

fn clip(line: &str, width: usize) -> String {
    if measure_text_width(line) > width {
        truncate_str(line, width.saturating_sub(1), "…").into_owned()
    } else {
        line.to_string()
    }
}

/// Title, description, due date, priority and tags. A blank title is passed
/// through so the store can reject it.
fn prompt_task_form(current: Option<&Task>) -> UiResult<TaskForm> {
    let theme = ColorfulTheme::default();

    let title: String = Input::with_theme(&theme)
        .with_prompt("Task title *")
        .with_initial_text(current.map(|t| t.title.as_str()).unwrap_or(""))
        .allow_empty(true)
        .interact_text()?;

    let description: String = Input::with_theme(&theme)
        .with_prompt("Description (optional)")
        .with_initial_text(current.map(|t| t.description.as_str()).unwrap_or(""))
        .allow_empty(true)
        .interact_text()?;

    let due_initial = current
        .and_then(|t| t.due_date)
        .map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_default();
    let due_input: String = Input::with_theme(&theme)
        .with_prompt("Due date (YYYY-MM-DD, optional)")
        .with_initial_text(due_initial)
        .allow_empty(true)
        .validate_with(|input: &String| -> Result<(), String> {
            parse_due_date(input).map(|_| ()).map_err(|e| e.to_string())
        })
        .interact_text()?;
    let due_date = parse_due_date(&due_input)?;

    let default_priority = current.map(|t| t.priority).unwrap_or_default();
    let labels: Vec<&str> = Priority::ALL.iter().map(|p| p.as_str()).collect();
    let choice = Select::with_theme(&theme)
        .with_prompt("Priority")
        .items(&labels)
        .default(Priority::ALL.iter().position(|p| *p == default_priority).unwrap_or(1))
        .interact()?;
    let priority = Priority::ALL[choice];

    let current_tags = current.map(|t| t.tags.as_slice()).unwrap_or_default();
    let tags_input: String = Input::with_theme(&theme)
        .with_prompt("Tags (comma-separated, name or name#rrggbb)")
        .with_initial_text(current.map(|t| format_tags(&t.tags)).unwrap_or_default())
        .allow_empty(true)
        .validate_with(move |input: &String| -> Result<(), String> {
            parse_tags(input, current_tags).map(|_| ()).map_err(|e| e.to_string())
        })
        .interact_text()?;
    let tags = parse_tags(&tags_input, current_tags)?;

    Ok(TaskForm {
        title,
        description,
        due_date,
        priority,
        tags,
    })
}
