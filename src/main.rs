use dotenv::dotenv;
use std::sync::Arc;
use teloxide::Bot;
use tracing::info;
use yt_reply_bot::{
    bot,
    config::Config,
    handler::CommentReplier,
    reply::OpenAiWriter,
    telemetry::setup_logger,
    utils::http_client,
    youtube::YouTubeClient,
};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    dotenv().ok();
    color_eyre::install()?;
    setup_logger()?;

    let config = Config::from_env()?;
    let http = http_client()?;

    let tokens = config
        .youtube
        .credentials
        .clone()
        .into_provider(http.clone())
        .await?;
    // fail at startup rather than on the first link
    tokens.access_token().await?;
    info!("youtube api authenticated");

    let youtube = YouTubeClient::with_api_base(http, tokens, config.youtube.api_base.as_str());
    let writer = OpenAiWriter::new(
        &config.openai.api_key,
        config.openai.model.as_str(),
        config.openai.api_base.as_deref(),
    );
    info!(model = writer.model(), "reply writer ready");

    let replier = CommentReplier::new(Arc::new(youtube), Arc::new(writer))
        .with_max_results(config.youtube.max_results);

    let bot = Bot::new(config.telegram_token);
    info!("bot starting");
    bot::run(bot, replier, config.chat_id).await;

    Ok(())
}
