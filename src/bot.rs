use crate::{
    commands::{self, Command},
    handler::CommentReplier,
    validate::find_youtube_link,
};
use std::sync::Arc;
use teloxide::{prelude::*, types::ChatId};
use tracing::{debug, error, info};

pub const HANDLER_FAILED_NOTICE: &str = "❌ Something went wrong while handling that link.";

/// A YouTube-looking link found in an incoming message.
#[derive(Debug, Clone)]
struct YoutubeLink(String);

struct BotState {
    replier: CommentReplier,
    allowed_chat: Option<ChatId>,
}

impl BotState {
    fn accepts(&self, chat_id: ChatId) -> bool {
        self.allowed_chat.is_none_or(|allowed| allowed == chat_id)
    }
}

/// Long-poll Telegram until ctrl-c, replying to every YouTube link.
pub async fn run(bot: Bot, replier: CommentReplier, allowed_chat: Option<ChatId>) {
    let state = Arc::new(BotState {
        replier,
        allowed_chat,
    });

    let handler = Update::filter_message()
        .filter(|msg: Message, state: Arc<BotState>| {
            let accepted = state.accepts(msg.chat.id);
            if !accepted {
                debug!(chat_id = msg.chat.id.0, "ignoring message from other chat");
            }
            accepted
        })
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(
            dptree::filter_map(|msg: Message| {
                msg.text()
                    .and_then(find_youtube_link)
                    .map(|link| YoutubeLink(link.to_owned()))
            })
            .endpoint(handle_link),
        );

    info!("bot is running");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .default_handler(|_| async {})
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn handle_command(bot: Bot, msg: Message, cmd: Command) -> ResponseResult<()> {
    commands::answer(&bot, &msg, cmd).await
}

async fn handle_link(
    bot: Bot,
    msg: Message,
    link: YoutubeLink,
    state: Arc<BotState>,
) -> ResponseResult<()> {
    let chat_id = msg.chat.id;

    // each link gets its own task so slow API calls never block polling
    tokio::spawn(async move {
        if let Err(err) = state.replier.handle(&bot, chat_id, &link.0).await {
            error!(%err, chat_id = chat_id.0, "handler failed");
            let _ = bot.send_message(chat_id, HANDLER_FAILED_NOTICE).await;
        }
    });

    Ok(())
}
