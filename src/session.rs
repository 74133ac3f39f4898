//! Per-user quiz loop: menu -> category -> poll -> answer -> next poll.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, error, info, warn};
use teloxide::dispatching::dialogue::{Dialogue, ErasedStorage};
use teloxide::types::{ChatId, UserId};
use tokio::sync::Mutex;

use crate::quiz::catalog::TaskCatalog;
use crate::quiz::{poll, Category, PollContent, QuizError};

/// What is persisted for every user: the last category they picked, if any.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum State {
    #[default]
    NoPreference,
    AwaitingAnswer {
        category: Category,
    },
}

impl State {
    pub fn category(&self) -> Option<Category> {
        match self {
            State::NoPreference => None,
            State::AwaitingAnswer { category } => Some(*category),
        }
    }
}

#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Makes sure a record exists. Returns true if the user is new.
    async fn register(&self, user: UserId) -> Result<bool, QuizError>;
    async fn preference(&self, user: UserId) -> Result<Option<Category>, QuizError>;
    async fn set_preference(&self, user: UserId, category: Category) -> Result<(), QuizError>;
}

/// Id of a sent poll as reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollHandle(pub String);

#[async_trait]
pub trait Transport: Send + Sync {
    async fn dispatch_poll(&self, user: UserId, poll: &PollContent)
        -> Result<PollHandle, QuizError>;
    async fn present_menu(&self, user: UserId) -> Result<(), QuizError>;
    async fn greet(&self, user: UserId, first_name: &str) -> Result<(), QuizError>;
    /// Operational sink. Never shown to quiz users.
    async fn notify_operator(&self, text: &str) -> Result<(), QuizError>;
}

/// Preferences kept in teloxide's dialogue storage, keyed by the private chat
/// with the user.
///
/// Storage has no compare-and-set, so writes made through this store go one at
/// a time. That keeps `register` from clobbering a category stored between its
/// read and its write. Another process sharing the database is not covered;
/// there last write wins.
#[derive(Clone)]
pub struct DialogueStore {
    storage: Arc<ErasedStorage<State>>,
    writes: Arc<Mutex<()>>,
}

type UserDialogue = Dialogue<State, ErasedStorage<State>>;

impl DialogueStore {
    pub fn new(storage: Arc<ErasedStorage<State>>) -> Self {
        Self {
            storage,
            writes: Arc::new(Mutex::new(())),
        }
    }

    fn dialogue(&self, user: UserId) -> UserDialogue {
        Dialogue::new(self.storage.clone(), ChatId(user.0 as i64))
    }
}

#[async_trait]
impl PreferenceStore for DialogueStore {
    async fn register(&self, user: UserId) -> Result<bool, QuizError> {
        let _write = self.writes.lock().await;
        let dialogue = self.dialogue(user);
        if dialogue.get().await.map_err(QuizError::Storage)?.is_some() {
            return Ok(false);
        }
        dialogue
            .update(State::NoPreference)
            .await
            .map_err(QuizError::Storage)?;
        Ok(true)
    }

    async fn preference(&self, user: UserId) -> Result<Option<Category>, QuizError> {
        let state = self.dialogue(user).get().await.map_err(QuizError::Storage)?;
        Ok(state.and_then(|s| s.category()))
    }

    async fn set_preference(&self, user: UserId, category: Category) -> Result<(), QuizError> {
        let _write = self.writes.lock().await;
        self.dialogue(user)
            .update(State::AwaitingAnswer { category })
            .await
            .map_err(QuizError::Storage)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Start {
        first_name: String,
        username: Option<String>,
    },
    /// `/menu`, `/stop` and `/help` all land here.
    Menu,
    CategorySelected(Category),
    PollAnswered,
}

#[derive(Debug)]
pub enum Transition {
    MenuPresented,
    PollDispatched {
        category: Category,
        handle: PollHandle,
    },
    /// Something failed, the error was reported and the menu shown instead.
    FellBack(QuizError),
}

pub struct SessionController {
    catalog: Arc<dyn TaskCatalog>,
    preferences: Arc<dyn PreferenceStore>,
    transport: Arc<dyn Transport>,
}

impl SessionController {
    pub fn new(
        catalog: Arc<dyn TaskCatalog>,
        preferences: Arc<dyn PreferenceStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            catalog,
            preferences,
            transport,
        }
    }

    /// Runs one intent of one user. Errors never escape: they are reported to
    /// the operator and the user gets the menu back.
    pub async fn handle(&self, user: UserId, intent: Intent) -> Transition {
        debug!("User {}: {:?}", user.0, intent);
        match self.transition(user, intent).await {
            Ok(transition) => transition,
            Err(err) => {
                self.report(user, &err).await;
                if let Err(menu_err) = self.transport.present_menu(user).await {
                    error!("User {}: could not show the menu either: {}", user.0, menu_err);
                }
                Transition::FellBack(err)
            }
        }
    }

    async fn transition(&self, user: UserId, intent: Intent) -> Result<Transition, QuizError> {
        match intent {
            Intent::Start {
                first_name,
                username,
            } => {
                self.transport.greet(user, &first_name).await?;
                self.register(user, username.as_deref()).await?;
                self.show_menu(user).await
            }
            Intent::Menu => self.show_menu(user).await,
            Intent::CategorySelected(category) => {
                self.register(user, None).await?;
                self.preferences.set_preference(user, category).await?;
                self.send_poll(user, category).await
            }
            Intent::PollAnswered => match self.preferences.preference(user).await? {
                Some(category) => self.send_poll(user, category).await,
                None => self.show_menu(user).await,
            },
        }
    }

    async fn show_menu(&self, user: UserId) -> Result<Transition, QuizError> {
        self.transport.present_menu(user).await?;
        Ok(Transition::MenuPresented)
    }

    async fn register(&self, user: UserId, username: Option<&str>) -> Result<(), QuizError> {
        if !self.preferences.register(user).await? {
            return Ok(());
        }
        info!("New user: {}", user.0);
        let text = format!("New user: @{}\n{}", username.unwrap_or("-"), user.0);
        if let Err(err) = self.transport.notify_operator(&text).await {
            warn!("Failed to notify the operator about user {}: {}", user.0, err);
        }
        Ok(())
    }

    async fn send_poll(&self, user: UserId, category: Category) -> Result<Transition, QuizError> {
        let tasks = self.catalog.tasks_by_category(category).await?;
        // The rng is not Send, so it must be gone before the next await
        let content = {
            let mut rng = rand::thread_rng();
            let task = poll::pick_task(category, &tasks, &mut rng)?;
            debug!(
                "User {}: task {} of type {}, rule {:?}",
                user.0,
                task.id,
                category,
                task.rule.as_ref().map(|r| r.id)
            );
            poll::build(category, task, &mut rng)?
        };
        let handle = self.transport.dispatch_poll(user, &content).await?;
        Ok(Transition::PollDispatched { category, handle })
    }

    async fn report(&self, user: UserId, err: &QuizError) {
        error!("Exception while processing update of user {}: {}", user.0, err);
        if let Err(notify_err) = self.transport.notify_operator(&err.to_string()).await {
            warn!("Failed to report to the operator: {}", notify_err);
            return;
        }
        if let Some(task_id) = err.task_id() {
            let text = format!("Task id: {}", task_id);
            if let Err(notify_err) = self.transport.notify_operator(&text).await {
                warn!("Failed to send task {} to the operator: {}", task_id, notify_err);
            }
        }
    }
}
