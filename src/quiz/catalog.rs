//! Task catalog: the exam questions the bot can ask.
//!
//! On disk the catalog is a JSON dump of the `rules` and `tasks` tables, with
//! multi-value columns (`options`, `correct_option`) joined by `%`. Those are
//! split into proper lists while loading, nothing past this module sees the
//! delimiter.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};

use crate::quiz::{Category, QuizError, Rule, Task};

const FIELD_DELIMITER: char = '%';

#[async_trait]
pub trait TaskCatalog: Send + Sync {
    /// All tasks of `category`. Empty when there are none, never an error for that.
    async fn tasks_by_category(&self, category: Category) -> Result<Vec<Task>, QuizError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read the catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse the catalog: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, serde::Deserialize)]
struct CatalogFile {
    #[serde(default)]
    rules: Vec<RuleRecord>,
    tasks: Vec<TaskRecord>,
}

#[derive(Debug, serde::Deserialize)]
struct RuleRecord {
    id: u32,
    rule: String,
}

#[derive(Debug, serde::Deserialize)]
struct TaskRecord {
    id: u32,
    #[serde(rename = "type")]
    task_type: u8,
    question: String,
    options: String,
    correct_option: String,
    #[serde(default)]
    rule_id: Option<u32>,
}

/// Catalog read once at startup and kept in memory.
#[derive(Debug, Default)]
pub struct JsonCatalog {
    tasks: HashMap<Category, Vec<Task>>,
}

impl JsonCatalog {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_reader(reader)?;

        let rules: HashMap<u32, Arc<Rule>> = file
            .rules
            .into_iter()
            .map(|r| {
                (
                    r.id,
                    Arc::new(Rule {
                        id: r.id,
                        text: r.rule,
                    }),
                )
            })
            .collect();

        let mut tasks: HashMap<Category, Vec<Task>> = HashMap::new();
        for record in file.tasks {
            if let Some(task) = record.into_task(&rules) {
                tasks.entry(task.category).or_default().push(task);
            }
        }

        for category in Category::ALL {
            info!(
                "Catalog: {} tasks of type {}",
                tasks.get(&category).map_or(0, Vec::len),
                category
            );
        }
        Ok(Self { tasks })
    }

    pub fn len(&self) -> usize {
        self.tasks.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TaskCatalog for JsonCatalog {
    async fn tasks_by_category(&self, category: Category) -> Result<Vec<Task>, QuizError> {
        Ok(self.tasks.get(&category).cloned().unwrap_or_default())
    }
}

impl TaskRecord {
    fn into_task(self, rules: &HashMap<u32, Arc<Rule>>) -> Option<Task> {
        let Some(category) = Category::from_number(self.task_type) else {
            warn!("Skipping task {}: unknown type {}", self.id, self.task_type);
            return None;
        };

        let rule = self.rule_id.and_then(|rule_id| {
            let rule = rules.get(&rule_id).cloned();
            if rule.is_none() {
                warn!("Task {} refers to a missing rule {}", self.id, rule_id);
            }
            rule
        });

        Some(Task {
            id: self.id,
            category,
            question: self.question,
            option_pool: split_distinct(&self.options),
            correct_answers: split_field(&self.correct_option),
            rule,
        })
    }
}

fn split_field(field: &str) -> Vec<String> {
    if field.is_empty() {
        return Vec::new();
    }
    field.split(FIELD_DELIMITER).map(str::to_string).collect()
}

/// Same as `split_field`, but a repeated option only keeps its first occurrence.
fn split_distinct(field: &str) -> Vec<String> {
    let mut options: Vec<String> = Vec::new();
    for option in split_field(field) {
        if !options.contains(&option) {
            options.push(option);
        }
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "rules": [
            {"id": 1, "rule": "НЕ с глаголами пишется раздельно.\\nИсключения: ненавидеть."}
        ],
        "tasks": [
            {"id": 10, "type": 9, "question": "Q9", "options": "A%B%C%D%E", "correct_option": "B%C", "rule_id": 1},
            {"id": 11, "type": 7, "question": "Q7", "options": "вонзил%вонзив", "correct_option": "вонзил(объяснение)"},
            {"id": 12, "type": 4, "question": "Q4", "options": "x%y%x", "correct_option": "y", "rule_id": 99},
            {"id": 13, "type": 5, "question": "bad", "options": "a", "correct_option": "a"}
        ]
    }"#;

    fn catalog() -> JsonCatalog {
        JsonCatalog::from_reader(SAMPLE.as_bytes()).unwrap()
    }

    #[tokio::test]
    async fn splits_multi_value_fields() {
        let tasks = catalog().tasks_by_category(Category::Task9).await.unwrap();
        assert_eq!(tasks.len(), 1);
        let task = &tasks[0];
        assert_eq!(task.id, 10);
        assert_eq!(task.option_pool, vec!["A", "B", "C", "D", "E"]);
        assert_eq!(task.correct_answers, vec!["B", "C"]);
        let rule = task.rule.as_ref().unwrap();
        assert_eq!(rule.id, 1);
        assert!(rule.text.contains("\\n"));
    }

    #[tokio::test]
    async fn keeps_inline_explanation_for_the_poll_builder() {
        let tasks = catalog().tasks_by_category(Category::Task7).await.unwrap();
        assert_eq!(tasks[0].correct_answers, vec!["вонзил(объяснение)"]);
        assert!(tasks[0].rule.is_none());
    }

    #[tokio::test]
    async fn drops_duplicate_options_and_dangling_rules() {
        let tasks = catalog().tasks_by_category(Category::Task4).await.unwrap();
        assert_eq!(tasks[0].option_pool, vec!["x", "y"]);
        assert!(tasks[0].rule.is_none());
    }

    #[tokio::test]
    async fn unknown_types_are_skipped_and_empty_categories_are_empty() {
        let catalog = catalog();
        assert_eq!(catalog.len(), 3);
        let tasks = catalog.tasks_by_category(Category::Task12).await.unwrap();
        assert!(tasks.is_empty());
    }

    #[test]
    fn broken_json_is_an_error() {
        let err = JsonCatalog::from_reader("{\"tasks\": 1}".as_bytes()).unwrap_err();
        assert!(matches!(err, CatalogError::Json(_)));
        assert!(split_field("").is_empty());
    }
}
