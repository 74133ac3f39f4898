use crate::quiz::Category;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum QuizError {
    #[error("task {task_id} is malformed: {reason}")]
    InvalidTaskData { task_id: u32, reason: String },
    #[error("Нет заданий типа {0}.")]
    NoTasksAvailable(Category),
    #[error("storage error: {0}")]
    Storage(#[source] BoxError),
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),
}

impl QuizError {
    pub fn invalid(task_id: u32, reason: impl Into<String>) -> Self {
        QuizError::InvalidTaskData {
            task_id,
            reason: reason.into(),
        }
    }

    /// Id of the catalog entry that caused the error, if any.
    pub fn task_id(&self) -> Option<u32> {
        match self {
            QuizError::InvalidTaskData { task_id, .. } => Some(*task_id),
            _ => None,
        }
    }
}
