//! Print the numeric id of a chat so it can be used in the env file.

use tgrelay_core::config::Config;
use tgrelay_telegram::lookup::{lookup, render_summary};

#[tokio::main]
async fn main() -> Result<(), tgrelay_core::Error> {
    let Some(query) = std::env::args().nth(1) else {
        eprintln!("Usage: tgrelay-whois <@handle | t.me link | -100id>");
        return Ok(());
    };

    let token = Config::load_bot_token()?;
    let chat = lookup(&token, &query)
        .await
        .map_err(|e| tgrelay_core::Error::External(format!("lookup failed: {e}")))?;

    println!("{}", render_summary(&chat));
    Ok(())
}
