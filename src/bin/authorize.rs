//! One-shot OAuth2 consent flow that writes the token file the bot reads at startup.

use color_eyre::Result;
use dotenv::dotenv;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, stdin};
use tracing::info;
use yt_reply_bot::{
    auth::parse_authorization_code,
    config::oauth_client_from_env,
    error::Error,
    telemetry::setup_logger,
    utils::http_client,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    color_eyre::install()?;
    setup_logger()?;

    let (client, token_path) = oauth_client_from_env()?;
    let url = client.authorization_url()?;

    println!("Authorize this app by visiting this url: {url}");
    print!("Enter the code from that page here: ");
    std::io::stdout().flush()?;

    let mut input = String::new();
    BufReader::new(stdin()).read_line(&mut input).await?;
    let code = parse_authorization_code(&input)
        .ok_or_else(|| Error::auth("no authorization code entered"))?;

    let token = client.exchange_code(&http_client()?, &code).await?;
    token.save(&token_path).await?;

    info!(path = %token_path.display(), "token stored");
    println!("Token stored to {}", token_path.display());
    Ok(())
}
