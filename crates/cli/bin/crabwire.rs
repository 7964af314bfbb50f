use anyhow::Result;
use clap::Parser;
use wcli::{App, Command, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let app = App::parse();
    app.init_tracing();

    match app.command {
        Command::Chat(chat) => chat.run().await?,
        Command::Providers => wcli::list_providers(&Config::load()?),
        Command::Generate => Config::default().save()?,
    }

    Ok(())
}
