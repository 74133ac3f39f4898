mod config;
mod quiz;
mod session;
mod telegram;

use std::sync::Arc;

use dotenv::dotenv;
use log::{info, warn};
use quiz::{catalog::JsonCatalog, Category};
use session::{DialogueStore, Intent, SessionController, State};
use teloxide::{
    dispatching::dialogue::{serializer::Json, ErasedStorage, SqliteStorage, Storage},
    prelude::*,
    utils::command::BotCommands,
};
use telegram::{Command, TelegramTransport};

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;
type Controller = Arc<SessionController>;

#[tokio::main]
async fn main() -> HandlerResult {
    // .env is optional, the variables may come from the process environment
    dotenv().ok();

    pretty_env_logger::init();
    info!("Starting quiz bot...");

    let config = config::Config::from_env();
    let bot = Bot::from_env();

    info!("Establishing connection to the database...");
    let storage: Arc<ErasedStorage<State>> =
        SqliteStorage::open(&config.db_path, Json).await?.erase();
    info!("Connection established");

    info!("Loading the task catalog from {}", config.catalog_path.display());
    let catalog = JsonCatalog::open(&config.catalog_path)?;
    if catalog.is_empty() {
        warn!("The task catalog is empty, every poll will fall back to the menu");
    }
    info!("Catalog loaded: {} tasks", catalog.len());

    let controller: Controller = Arc::new(SessionController::new(
        Arc::new(catalog),
        Arc::new(DialogueStore::new(storage)),
        Arc::new(TelegramTransport::new(bot.clone(), config.operator)),
    ));

    if let Err(err) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register bot commands: {}", err);
    }

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(command),
        )
        .branch(
            Update::filter_message()
                .filter_map(|msg: Message| msg.text().and_then(Category::from_label))
                .endpoint(category_choice),
        )
        .branch(Update::filter_poll_answer().endpoint(poll_answer));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![controller])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
    Ok(())
}

async fn command(controller: Controller, msg: Message, cmd: Command) -> HandlerResult {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let intent = cmd.into_intent(user);
    controller.handle(user.id, intent).await;
    Ok(())
}

async fn category_choice(controller: Controller, msg: Message, category: Category) -> HandlerResult {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    controller
        .handle(user.id, Intent::CategorySelected(category))
        .await;
    Ok(())
}

// Answers arrive keyed by the user, not by the poll
async fn poll_answer(controller: Controller, answer: PollAnswer) -> HandlerResult {
    controller.handle(answer.user.id, Intent::PollAnswered).await;
    Ok(())
}
