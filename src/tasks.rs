use serde::{Deserialize, Deserializer};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "NOT_STARTED")]
    NotStarted,
    #[serde(rename = "READY_FOR_VERIFY")]
    ReadyForVerify,
    #[serde(rename = "READY_FOR_CLAIM")]
    ReadyForClaim,
    #[serde(rename = "FINISHED")]
    Finished,
    #[serde(other)]
    Unknown,
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Unknown
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ValidationMode {
    #[serde(rename = "DEFAULT")]
    Automatic,
    #[serde(rename = "KEYWORD")]
    Keyword,
    #[serde(other)]
    Other,
}

impl Default for ValidationMode {
    fn default() -> Self {
        ValidationMode::Other
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDescriptor {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "de_amount")]
    pub reward: String,
    #[serde(default, rename = "validationType")]
    pub validation: ValidationMode,
    #[serde(default)]
    pub status: TaskStatus,
}

/// A node of the task tree. Sections hold tasks directly and may nest
/// further sections to any depth.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSection {
    #[serde(default)]
    pub tasks: Vec<TaskDescriptor>,
    #[serde(default)]
    pub sub_sections: Vec<TaskSection>,
}

/// Pre-order walk: a section's own tasks come before those of its sub-sections.
pub fn flatten(sections: &[TaskSection]) -> Vec<&TaskDescriptor> {
    fn walk<'a>(section: &'a TaskSection, out: &mut Vec<&'a TaskDescriptor>) {
        out.extend(section.tasks.iter());
        for sub in &section.sub_sections {
            walk(sub, out);
        }
    }

    let mut out = Vec::new();
    for section in sections {
        walk(section, &mut out);
    }
    out
}

/// Tasks that can be started and claimed without user input.
pub fn automatic_pending(sections: &[TaskSection]) -> Vec<TaskDescriptor> {
    flatten(sections)
        .into_iter()
        .filter(|task| {
            task.status == TaskStatus::NotStarted && task.validation == ValidationMode::Automatic
        })
        .cloned()
        .collect()
}

/// Keyword-gated tasks, de-duplicated by id. The first occurrence wins.
pub fn keyword_tasks(sections: &[TaskSection]) -> Vec<TaskDescriptor> {
    let mut seen = HashSet::new();
    flatten(sections)
        .into_iter()
        .filter(|task| task.validation == ValidationMode::Keyword)
        .filter(|task| seen.insert(task.id.clone()))
        .cloned()
        .collect()
}

/// A task absent from the account's list has never been started by it.
/// When the id appears more than once, the last occurrence in walk order decides.
pub fn status_of(sections: &[TaskSection], task_id: &str) -> TaskStatus {
    flatten(sections)
        .into_iter()
        .filter(|task| task.id == task_id)
        .last()
        .map_or(TaskStatus::NotStarted, |task| task.status)
}

/// The API sends amounts either as decimal strings or as bare numbers.
fn de_amount<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Option::<Amount>::deserialize(deserializer)? {
        Some(Amount::Text(text)) => text,
        Some(Amount::Number(number)) => number.to_string(),
        None => "0".to_string(),
    })
}
