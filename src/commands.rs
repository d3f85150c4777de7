use teloxide::{prelude::*, utils::command::BotCommands};

const START_TEXT: &str = "Send me a YouTube link and I'll reply to a random comment on that video.";

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    /// Display this text.
    #[command(aliases = ["h", "?"])]
    Help,
    /// Explain what the bot does.
    Start,
}

/// Handle a command from the user.
///
/// # Errors
///
/// Returns a Teloxide error if the message fails to send.
pub async fn answer(bot: &Bot, msg: &Message, cmd: Command) -> ResponseResult<()> {
    match cmd {
        Command::Help => {
            bot.send_message(msg.chat.id, Command::descriptions().to_string())
                .await?
        }
        Command::Start => bot.send_message(msg.chat.id, START_TEXT).await?,
    };

    Ok(())
}
