pub mod catalog;
pub mod error;
pub mod poll;

use std::sync::Arc;

pub use error::QuizError;

/// Exam task type. Decides which selection rule the poll builder applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Category {
    Task4,
    Task7,
    Task8,
    Task9,
    Task10,
    Task11,
    Task12,
}

/// How the answer set of a category is assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Several acceptable correct answers, options sub-sampled from a large pool.
    MultiAnswer { sample_size: usize },
    /// Correct answer may carry its own explanation as `answer(explanation)`.
    InlineExplained { sample_size: usize },
    /// One correct answer, the whole pool is shown.
    Fixed,
}

impl Category {
    /// Menu order.
    pub const ALL: [Category; 7] = [
        Category::Task4,
        Category::Task7,
        Category::Task8,
        Category::Task9,
        Category::Task10,
        Category::Task11,
        Category::Task12,
    ];

    pub fn number(self) -> u8 {
        match self {
            Category::Task4 => 4,
            Category::Task7 => 7,
            Category::Task8 => 8,
            Category::Task9 => 9,
            Category::Task10 => 10,
            Category::Task11 => 11,
            Category::Task12 => 12,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.number() == number)
    }

    /// Text of the menu button for this category.
    pub fn label(self) -> &'static str {
        match self {
            Category::Task4 => "4️⃣",
            Category::Task7 => "7️⃣",
            Category::Task8 => "8️⃣",
            Category::Task9 => "9️⃣",
            Category::Task10 => "🔟",
            Category::Task11 => "1️⃣1️⃣",
            Category::Task12 => "1️⃣2️⃣",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label() == label)
    }

    pub fn selection(self) -> Selection {
        match self {
            Category::Task9 | Category::Task10 | Category::Task11 | Category::Task12 => {
                Selection::MultiAnswer { sample_size: 3 }
            }
            Category::Task7 => Selection::InlineExplained { sample_size: 4 },
            Category::Task4 | Category::Task8 => Selection::Fixed,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.number())
    }
}

impl From<Category> for u8 {
    fn from(category: Category) -> u8 {
        category.number()
    }
}

impl TryFrom<u8> for Category {
    type Error = String;

    fn try_from(number: u8) -> Result<Self, Self::Error> {
        Category::from_number(number).ok_or_else(|| format!("unknown task type {}", number))
    }
}

/// Shared explanatory note, referenced by any number of tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub id: u32,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct Task {
    pub id: u32,
    pub category: Category,
    pub question: String,
    pub option_pool: Vec<String>,
    pub correct_answers: Vec<String>,
    pub rule: Option<Arc<Rule>>,
}

/// A ready-to-send quiz poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollContent {
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub explanation: Option<String>,
}

impl PollContent {
    pub fn correct_option(&self) -> &str {
        &self.options[self.correct_index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_map_back_to_their_category() {
        for category in Category::ALL {
            assert_eq!(Category::from_label(category.label()), Some(category));
        }
        let mut labels = Category::ALL.map(|c| c.label()).to_vec();
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), Category::ALL.len());
    }

    #[test]
    fn unknown_labels_and_numbers_are_rejected() {
        assert_eq!(Category::from_label("5️⃣"), None);
        assert_eq!(Category::from_label("4"), None);
        assert_eq!(Category::from_number(5), None);
        assert_eq!(Category::from_number(10), Some(Category::Task10));
    }

    #[test]
    fn category_serializes_as_its_number() {
        assert_eq!(serde_json::to_string(&Category::Task11).unwrap(), "11");
        let parsed: Category = serde_json::from_str("7").unwrap();
        assert_eq!(parsed, Category::Task7);
        assert!(serde_json::from_str::<Category>("6").is_err());
    }

    #[test]
    fn selection_rules_per_category() {
        assert_eq!(
            Category::Task12.selection(),
            Selection::MultiAnswer { sample_size: 3 }
        );
        assert_eq!(
            Category::Task7.selection(),
            Selection::InlineExplained { sample_size: 4 }
        );
        assert_eq!(Category::Task4.selection(), Selection::Fixed);
        assert_eq!(Category::Task8.selection(), Selection::Fixed);
    }
}
