//! Chat command

use crate::{Config, tools};
use anyhow::{Result, bail};
use clap::Args;
use provider::HttpTransport;
use session::{Callbacks, ChatSession, StaticRegistry};
use std::{
    io::{BufRead, Write},
    sync::Arc,
};
use wcore::Message;

type Session = ChatSession<HttpTransport, StaticRegistry>;

/// Chat command arguments
#[derive(Debug, Args)]
pub struct ChatCmd {
    /// The provider to use, overriding the configuration
    #[arg(short, long)]
    pub provider: Option<String>,

    /// The model to use, overriding the configuration
    #[arg(short, long)]
    pub model: Option<String>,

    /// Offer the builtin tools to the model
    #[arg(short, long)]
    pub tools: bool,

    /// The message to send (if empty, starts interactive mode)
    pub message: Option<String>,
}

impl ChatCmd {
    /// Run the chat command
    pub async fn run(&self) -> Result<()> {
        let config = Config::load()?;
        let mut conversation = config.conversation.clone();
        if let Some(provider) = &self.provider {
            conversation.provider = provider.as_str().into();
            conversation.model = Default::default();
        }
        if let Some(model) = &self.model {
            conversation.model = model.as_str().into();
        }

        let credentials = config.credentials(&conversation.provider);
        let registry = if self.tools {
            tools::builtin()
        } else {
            StaticRegistry::new()
        };
        let session = ChatSession::from_catalog(
            credentials.clone(),
            conversation,
            Arc::new(HttpTransport::default()),
            Arc::new(registry),
        )?
        .with_callbacks(printing());

        if !session.is_ready() {
            let missing: Vec<_> = session
                .profile()
                .schema
                .iter()
                .filter(|field| credentials.get(**field).trim().is_empty())
                .map(|field| format!("{field:?}").to_lowercase())
                .collect();
            bail!(
                "{} needs credentials for: {}",
                session.profile().name,
                missing.join(", ")
            );
        }

        let session = Arc::new(session);
        let aborter = session.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                aborter.abort();
            }
        });

        self.run_chat(&session).await
    }

    async fn run_chat(&self, session: &Session) -> Result<()> {
        let mut history = Vec::new();
        if let Some(msg) = &self.message {
            Self::send(session, &mut history, msg).await?;
            return Ok(());
        }

        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        loop {
            print!("> ");
            stdout.flush()?;

            let mut input = String::new();
            if stdin.lock().read_line(&mut input)? == 0 {
                break;
            }

            let input = input.trim();
            if input.is_empty() {
                continue;
            }
            if input == "/quit" || input == "/exit" {
                break;
            }
            if input == "/reset" {
                history.clear();
                session.reset();
                continue;
            }

            Self::send(session, &mut history, input).await?;
        }

        Ok(())
    }

    async fn send(session: &Session, history: &mut Vec<Message>, input: &str) -> Result<()> {
        let prompt = Message::user(input);
        let messages = session.conversation().assemble(history, prompt.clone());
        let result = session.chat(messages).await?;
        println!();

        tracing::debug!(
            "usage: {} in, {} out over {} request(s)",
            result.usage.input_tokens,
            result.usage.output_tokens,
            result.requests
        );
        if result.is_ok() {
            history.push(prompt);
            history.push(Message::assistant(result.reply));
        }
        Ok(())
    }
}

fn printing() -> Callbacks {
    Callbacks::default()
        .on_reading(|content, reasoning| {
            let mut stdout = std::io::stdout();
            if !reasoning.is_empty() {
                let _ = write!(stdout, "\x1b[2m{reasoning}\x1b[0m");
            }
            let _ = write!(stdout, "{content}");
            let _ = stdout.flush();
        })
        .on_tool_calls(|name| eprintln!("\n[calling {name}]"))
        .on_error(|error, aborted| {
            if aborted {
                eprintln!("\n[aborted]");
            } else {
                eprintln!("\nerror: {error}");
            }
        })
}
