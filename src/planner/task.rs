use crate::error::{PlannerError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Colors offered when a tag is entered without one.
pub const TAG_COLORS: [&str; 8] = [
    "#4b6cb7", "#ff6b6b", "#51cf66", "#ffa94d", "#7950f2", "#20c997", "#f06595", "#5c7cfa",
];

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    /// Severity used for sorting: higher sorts first.
    pub fn severity(self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "high" | "h" => Ok(Priority::High),
            "medium" | "m" => Ok(Priority::Medium),
            "low" | "l" => Ok(Priority::Low),
            other => Err(PlannerError::invalid_input(format!("unknown priority '{}'", other))),
        }
    }
}

// Stored lists may carry a missing, null or unknown priority; all of them read as medium.
impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw
            .and_then(|s| s.parse().ok())
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub color: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
        }
    }

    /// Parses `name` or `name#rrggbb`. A bare name takes `fallback_color`.
    pub fn parse(input: &str, fallback_color: &str) -> Result<Self> {
        let (name, color) = split_tag(input)?;
        Ok(Tag::new(name, color.unwrap_or_else(|| fallback_color.to_string())))
    }

    pub fn has_hex_color(&self) -> bool {
        self.color.strip_prefix('#').is_some_and(is_hex_digits)
    }
}

fn is_hex_digits(s: &str) -> bool {
    s.len() == 6 && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Only a trailing `#` followed by six hex digits is a color; any other `#`
/// is part of the name. Commas separate tags, so names cannot hold one.
fn split_tag(input: &str) -> Result<(&str, Option<String>)> {
    let input = input.trim();
    let (name, color) = match input.rsplit_once('#') {
        Some((name, hex)) if is_hex_digits(hex) => (name.trim(), Some(format!("#{}", hex))),
        _ => (input, None),
    };

    if name.is_empty() {
        return Err(PlannerError::invalid_input("tag name is empty"));
    }
    if name.contains(',') {
        return Err(PlannerError::invalid_input(format!(
            "tag name '{}' cannot contain a comma",
            name
        )));
    }

    Ok((name, color))
}

/// Parses a comma-separated tag list as typed into the add/edit prompts.
///
/// Blank entries are skipped and a repeated name keeps its first occurrence,
/// so the result always has unique names. A bare name found in `current`
/// keeps that tag's color; other bare names cycle through [`TAG_COLORS`].
pub fn parse_tags(input: &str, current: &[Tag]) -> Result<Vec<Tag>> {
    let mut tags: Vec<Tag> = Vec::new();
    let mut palette = TAG_COLORS.iter().cycle();

    for entry in input.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let fallback = palette.next().copied().unwrap_or(TAG_COLORS[0]);
        let (name, color) = split_tag(entry)?;
        if tags.iter().any(|t| t.name == name) {
            continue;
        }

        let color = color
            .or_else(|| current.iter().find(|t| t.name == name).map(|t| t.color.clone()))
            .unwrap_or_else(|| fallback.to_string());
        tags.push(Tag::new(name, color));
    }

    Ok(tags)
}

/// Inverse of [`parse_tags`], used as the initial text when editing. A color
/// that is not `#rrggbb` is left out and comes back from `current` on parse.
pub fn format_tags(tags: &[Tag]) -> String {
    tags.iter()
        .map(|t| {
            if t.has_hex_color() {
                format!("{}{}", t.name, t.color)
            } else {
                t.name.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn parse_due_date(input: &str) -> Result<Option<NaiveDate>> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(input, DATE_FORMAT)
        .map(Some)
        .map_err(|_| PlannerError::invalid_input(format!("'{}' is not a YYYY-MM-DD date", input)))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub description: String,
    #[serde(default, deserialize_with = "optional_date")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Input for creating a task.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
    pub tags: Vec<Tag>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn due_date(mut self, due_date: Option<NaiveDate>) -> Self {
        self.due_date = due_date;
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = tags;
        self
    }
}

/// Field-wise update. `None` leaves the field as it is; `due_date` uses a
/// nested option so a deadline can be cleared with `Some(None)`.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<Option<NaiveDate>>,
    pub priority: Option<Priority>,
    pub tags: Option<Vec<Tag>>,
    pub completed: Option<bool>,
}

impl Task {
    pub fn new(id: String, new_task: NewTask, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: new_task.title,
            description: new_task.description,
            due_date: new_task.due_date,
            priority: new_task.priority,
            tags: new_task.tags,
            completed: false,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Refreshes `updated_at`, never moving it backwards.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now.max(self.updated_at).max(self.created_at);
    }

    pub fn toggle(&mut self, now: DateTime<Utc>) {
        self.set_completed(!self.completed, now);
    }

    pub fn set_completed(&mut self, completed: bool, now: DateTime<Utc>) {
        if completed != self.completed {
            self.completed = completed;
            self.completed_at = if completed { Some(now) } else { None };
        }
        self.touch(now);
    }

    pub fn apply(&mut self, patch: TaskPatch, now: DateTime<Utc>) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        match patch.completed {
            Some(completed) => self.set_completed(completed, now),
            None => self.touch(now),
        }
    }

    /// Case-insensitive substring match on title, description and tag names.
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
            || self.tags.iter().any(|t| t.name.to_lowercase().contains(needle))
    }

    /// Restores the record invariants on data read from storage: completion
    /// and `completed_at` agree, `updated_at` is not before `created_at`, and
    /// tag names are trimmed, comma-free, non-empty and unique.
    pub fn normalize(&mut self) {
        match (self.completed, self.completed_at) {
            (true, None) => self.completed_at = Some(self.updated_at),
            (false, Some(_)) => self.completed_at = None,
            _ => {}
        }
        if self.updated_at < self.created_at {
            self.updated_at = self.created_at;
        }

        let mut tags: Vec<Tag> = Vec::with_capacity(self.tags.len());
        for mut tag in self.tags.drain(..) {
            tag.name = tag.name.replace(',', " ").trim().to_string();
            if !tag.name.is_empty() && !tags.iter().any(|t| t.name == tag.name) {
                tags.push(tag);
            }
        }
        self.tags = tags;
    }
}

fn nullable_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn optional_date<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<NaiveDate>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => {
            // Older records may hold a full timestamp; keep the calendar date.
            let date_part = raw.trim().get(..10).unwrap_or(raw.trim());
            NaiveDate::parse_from_str(date_part, DATE_FORMAT)
                .map(Some)
                .map_err(serde::de::Error::custom)
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_priority_parse_and_display() {
        assert_eq!("High".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!(" low ".parse::<Priority>().unwrap(), Priority::Low);
        assert!("urgent".parse::<Priority>().is_err());
        assert_eq!(Priority::Medium.to_string(), "medium");
    }

    #[test]
    fn test_toggle_sets_and_clears_completed_at() {
        let mut task = Task::new("1".into(), NewTask::new("Write report"), at(0));

        task.toggle(at(10));
        assert!(task.completed);
        assert_eq!(task.completed_at, Some(at(10)));
        assert_eq!(task.updated_at, at(10));

        task.toggle(at(20));
        assert!(!task.completed);
        assert_eq!(task.completed_at, None);
        assert_eq!(task.updated_at, at(20));
    }

    #[test]
    fn test_touch_never_moves_backwards() {
        let mut task = Task::new("1".into(), NewTask::new("a"), at(100));
        task.touch(at(100) - Duration::seconds(30));
        assert_eq!(task.updated_at, at(100));
    }

    #[test]
    fn test_apply_patch() {
        let mut task = Task::new("1".into(), NewTask::new("old"), at(0));
        let due = NaiveDate::from_ymd_opt(2024, 5, 1);

        task.apply(
            TaskPatch {
                title: Some("new".into()),
                due_date: Some(due),
                priority: Some(Priority::High),
                ..TaskPatch::default()
            },
            at(5),
        );

        assert_eq!(task.title, "new");
        assert_eq!(task.due_date, due);
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.created_at, at(0));
        assert_eq!(task.updated_at, at(5));

        task.apply(
            TaskPatch {
                due_date: Some(None),
                completed: Some(true),
                ..TaskPatch::default()
            },
            at(6),
        );
        assert_eq!(task.due_date, None);
        assert!(task.completed);
        assert_eq!(task.completed_at, Some(at(6)));
    }

    #[test]
    fn test_matches_title_description_and_tags() {
        let task = Task::new(
            "1".into(),
            NewTask::new("Buy Milk")
                .description("from the corner shop")
                .tags(vec![Tag::new("Errands", "#4b6cb7")]),
            at(0),
        );

        assert!(task.matches("milk"));
        assert!(task.matches("corner"));
        assert!(task.matches("errand"));
        assert!(!task.matches("bread"));
    }

    #[test]
    fn test_parse_tags_dedupes_and_assigns_colors() {
        let tags = parse_tags("work, home#ff0000, , work#00ff00, urgent", &[]).unwrap();
        assert_eq!(
            tags,
            vec![
                Tag::new("work", TAG_COLORS[0]),
                Tag::new("home", "#ff0000"),
                Tag::new("urgent", TAG_COLORS[3]),
            ]
        );

        assert!(parse_tags("#123456", &[]).is_err());
        assert_eq!(parse_tags(&format_tags(&tags), &[]).unwrap(), tags);
    }

    #[test]
    fn test_hash_in_name_is_not_a_color() {
        assert_eq!(Tag::parse("C#", "#4b6cb7").unwrap(), Tag::new("C#", "#4b6cb7"));
        assert_eq!(Tag::parse("bad#zzz", "#4b6cb7").unwrap(), Tag::new("bad#zzz", "#4b6cb7"));
        assert_eq!(Tag::parse("C##FF0000", "#4b6cb7").unwrap(), Tag::new("C#", "#FF0000"));
        assert_eq!(Tag::parse("x#12345", "#4b6cb7").unwrap(), Tag::new("x#12345", "#4b6cb7"));
    }

    #[test]
    fn test_comma_in_tag_name_is_rejected() {
        assert!(Tag::parse("a,b", "#4b6cb7").is_err());
        assert_eq!(parse_tags("a,b", &[]).unwrap().len(), 2);
    }

    #[test]
    fn test_edit_text_round_trips_tags() {
        let tags = vec![
            Tag::new("C#", "#4b6cb7"),
            Tag::new("release#1", "#FF6B6B"),
            Tag::new("legacy", "red"),
            Tag::new("notes", "#51cf66"),
        ];

        let text = format_tags(&tags);
        assert_eq!(text, "C##4b6cb7, release#1#FF6B6B, legacy, notes#51cf66");
        assert_eq!(parse_tags(&text, &tags).unwrap(), tags);
    }

    #[test]
    fn test_parse_due_date() {
        assert_eq!(parse_due_date("  ").unwrap(), None);
        assert_eq!(
            parse_due_date("2024-02-29").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
        assert!(parse_due_date("29/02/2024").is_err());
    }

    #[test]
    fn test_deserialize_lenient_record() {
        let json = r#"{
            "id": "1712345678901",
            "title": "Legacy",
            "description": null,
            "dueDate": "",
            "priority": "urgent",
            "createdAt": "2024-04-05T10:00:00.000Z",
            "updatedAt": "2024-04-05T10:00:00.000Z",
            "completedAt": null
        }"#;

        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.description, "");
        assert_eq!(task.due_date, None);
        assert_eq!(task.priority, Priority::Medium);
        assert!(task.tags.is_empty());
        assert!(!task.completed);
    }

    #[test]
    fn test_serialize_uses_record_field_names() {
        let mut task = Task::new(
            "7".into(),
            NewTask::new("Ship").due_date(NaiveDate::from_ymd_opt(2024, 6, 30)),
            at(0),
        );
        task.toggle(at(1));

        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["dueDate"], "2024-06-30");
        assert_eq!(value["priority"], "medium");
        assert!(value["createdAt"].as_str().unwrap().starts_with("2023-11-14T22:13:20"));
        assert!(value["completedAt"].is_string());
    }

    #[test]
    fn test_normalize_repairs_invariants() {
        let mut task = Task::new("1".into(), NewTask::new("a"), at(10));
        task.completed = true;
        task.updated_at = at(5);
        task.normalize();
        assert_eq!(task.updated_at, at(10));
        assert_eq!(task.completed_at, Some(at(10)));

        task.completed = false;
        task.normalize();
        assert_eq!(task.completed_at, None);
    }

    #[test]
    fn test_normalize_cleans_tag_names() {
        let mut task = Task::new(
            "1".into(),
            NewTask::new("a").tags(vec![
                Tag::new("a,b", "#4b6cb7"),
                Tag::new("  ", "#ff6b6b"),
                Tag::new(" a b ", "#51cf66"),
                Tag::new("home", "#ffa94d"),
            ]),
            at(0),
        );
        task.normalize();

        assert_eq!(task.tags, vec![Tag::new("a b", "#4b6cb7"), Tag::new("home", "#ffa94d")]);
        assert_eq!(parse_tags(&format_tags(&task.tags), &task.tags).unwrap(), task.tags);
    }
}
