use async_trait::async_trait;
use log::debug;
use teloxide::{
    prelude::*,
    types::{KeyboardButton, KeyboardMarkup, KeyboardRemove, PollType, User},
    utils::command::BotCommands,
};

use crate::quiz::{Category, PollContent, QuizError};
use crate::session::{Intent, PollHandle, Transport};

const MENU_TEXT: &str = "Выберите тип задания для тренировки\n\nДля остановки используйте /stop";

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Доступные команды:")]
pub enum Command {
    #[command(description = "начать заново")]
    Start,
    #[command(description = "выбрать тип задания")]
    Menu,
    #[command(description = "остановить тренировку")]
    Stop,
    #[command(description = "показать это меню")]
    Help,
}

impl Command {
    pub fn into_intent(self, user: &User) -> Intent {
        match self {
            Command::Start => Intent::Start {
                first_name: user.first_name.clone(),
                username: user.username.clone(),
            },
            Command::Menu | Command::Stop | Command::Help => Intent::Menu,
        }
    }
}

/// Category buttons, three per row.
pub fn menu_keyboard() -> KeyboardMarkup {
    let rows = Category::ALL
        .chunks(3)
        .map(|row| {
            row.iter()
                .map(|c| KeyboardButton::new(c.label()))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    KeyboardMarkup::new(rows)
        .resize_keyboard(true)
        .one_time_keyboard(true)
}

pub struct TelegramTransport {
    bot: Bot,
    operator: Option<ChatId>,
}

impl TelegramTransport {
    pub fn new(bot: Bot, operator: Option<UserId>) -> Self {
        Self {
            bot,
            operator: operator.map(|id| ChatId(id.0 as i64)),
        }
    }
}

fn chat(user: UserId) -> ChatId {
    ChatId(user.0 as i64)
}

fn transport_error(err: teloxide::RequestError) -> QuizError {
    QuizError::Transport(Box::new(err))
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn dispatch_poll(
        &self,
        user: UserId,
        poll: &PollContent,
    ) -> Result<PollHandle, QuizError> {
        let correct_option_id = u8::try_from(poll.correct_index)
            .map_err(|_| QuizError::Transport("too many poll options".into()))?;

        let mut request = self
            .bot
            .send_poll(chat(user), poll.question.clone(), poll.options.clone())
            .type_(PollType::Quiz)
            .correct_option_id(correct_option_id)
            .is_anonymous(false)
            .reply_markup(KeyboardRemove::new());
        if let Some(explanation) = &poll.explanation {
            request = request.explanation(explanation.clone());
        }

        let message = request.await.map_err(transport_error)?;
        let handle = message.poll().map(|p| p.id.clone()).unwrap_or_default();
        debug!(
            "Poll {:?} sent to {}, answer {:?}",
            handle,
            user.0,
            poll.correct_option()
        );
        Ok(PollHandle(handle))
    }

    async fn present_menu(&self, user: UserId) -> Result<(), QuizError> {
        self.bot
            .send_message(chat(user), MENU_TEXT)
            .reply_markup(menu_keyboard())
            .await
            .map_err(transport_error)?;
        Ok(())
    }

    async fn greet(&self, user: UserId, first_name: &str) -> Result<(), QuizError> {
        self.bot
            .send_message(chat(user), format!("Привет, {}", first_name))
            .await
            .map_err(transport_error)?;
        Ok(())
    }

    async fn notify_operator(&self, text: &str) -> Result<(), QuizError> {
        let Some(operator) = self.operator else {
            return Ok(());
        };
        self.bot
            .send_message(operator, text)
            .await
            .map_err(transport_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse() {
        assert_eq!(Command::parse("/start", "bot").unwrap(), Command::Start);
        assert_eq!(Command::parse("/stop", "bot").unwrap(), Command::Stop);
        assert_eq!(Command::parse("/help", "bot").unwrap(), Command::Help);
        assert!(Command::parse("/send_all", "bot").is_err());
    }

    fn user(username: Option<&str>) -> User {
        User {
            id: UserId(1001),
            is_bot: false,
            first_name: "Аня".to_string(),
            last_name: None,
            username: username.map(str::to_string),
            language_code: Some("ru".to_string()),
            is_premium: false,
            added_to_attachment_menu: false,
        }
    }

    #[test]
    fn commands_become_intents() {
        let anya = user(Some("anya"));
        assert_eq!(
            Command::Start.into_intent(&anya),
            Intent::Start {
                first_name: "Аня".to_string(),
                username: Some("anya".to_string()),
            }
        );
        assert_eq!(
            Command::Start.into_intent(&user(None)),
            Intent::Start {
                first_name: "Аня".to_string(),
                username: None,
            }
        );
        // Stopping is the same as asking for the menu
        assert_eq!(Command::Menu.into_intent(&anya), Intent::Menu);
        assert_eq!(Command::Stop.into_intent(&anya), Intent::Menu);
        assert_eq!(Command::Help.into_intent(&anya), Intent::Menu);
    }

    #[test]
    fn menu_has_every_category_once() {
        let keyboard = menu_keyboard();
        let sizes: Vec<usize> = keyboard.keyboard.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![3, 3, 1]);

        let labels: Vec<Category> = keyboard
            .keyboard
            .iter()
            .flatten()
            .map(|b| Category::from_label(&b.text).unwrap())
            .collect();
        assert_eq!(labels, Category::ALL.to_vec());
    }
}
