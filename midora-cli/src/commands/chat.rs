use std::{
    io::{self, Write as _},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::Args;
use midora_client::{ChatEvent, MessageEntry};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::build_context;

#[derive(Args, Debug)]
#[command(about = "List conversations, newest page first")]
pub struct ListArgs {
    /// Path to the configuration file (optional)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Keep fetching until the whole list is loaded
    #[arg(long)]
    pub all: bool,
}

#[derive(Args, Debug)]
#[command(about = "Show a conversation's message history")]
pub struct HistoryArgs {
    /// Conversation identifier to display
    #[arg(long, alias = "conv")]
    pub conversation: Uuid,

    /// Also fetch older pages until the history is complete
    #[arg(long)]
    pub all: bool,

    /// Path to the configuration file (optional)
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
#[command(about = "Send a message and stream the assistant response")]
pub struct SendArgs {
    /// Message text
    #[arg()]
    pub text: String,

    /// Target conversation; a new one is created when omitted
    #[arg(long, alias = "conv")]
    pub conversation: Option<Uuid>,

    /// Model override for this response
    #[arg(long)]
    pub model: Option<Uuid>,

    /// Path to the configuration file (optional)
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

pub async fn list(args: ListArgs) -> Result<()> {
    let ctx = build_context(args.config)?;
    let (events, _rx) = mpsc::unbounded_channel();
    let controller = ctx.controller(events);

    controller
        .load_conversations()
        .await
        .context("failed to load conversations")?;
    if args.all {
        loop {
            let done = {
                let store = ctx.store.lock().unwrap();
                store.conversation_page().is_none_or(|page| !page.has_more())
            };
            if done {
                break;
            }
            controller
                .load_more_conversations()
                .await
                .context("failed to load more conversations")?;
        }
    }

    let store = ctx.store.lock().unwrap();
    let conversations = store.conversations();
    if conversations.is_empty() {
        println!("No conversations yet.");
        return Ok(());
    }
    for conversation in conversations {
        let marker = if conversation.archived { " [archived]" } else { "" };
        println!(
            "- {} {}{} (updated {})",
            conversation.id, conversation.name, marker, conversation.updated_at,
        );
    }
    if let Some(page) = store.conversation_page() {
        if page.has_more() {
            println!("({} more pages available)", page.total_pages - page.page);
        }
    }
    Ok(())
}

pub async fn history(args: HistoryArgs) -> Result<()> {
    let ctx = build_context(args.config)?;
    let (events, _rx) = mpsc::unbounded_channel();
    let controller = ctx.controller(events);

    controller
        .select_conversation(args.conversation)
        .await
        .context("failed to open conversation")?;
    if args.all {
        loop {
            let done = {
                let store = ctx.store.lock().unwrap();
                store
                    .message_page(args.conversation)
                    .is_none_or(|page| !page.has_more())
            };
            if done {
                break;
            }
            controller
                .load_more_messages(args.conversation)
                .await
                .context("failed to load older messages")?;
        }
    }

    let store = ctx.store.lock().unwrap();
    if let Some(conversation) = store.conversation(args.conversation) {
        println!("{} ({})", conversation.name, conversation.id);
    }
    for entry in store.messages(args.conversation) {
        let message = entry.message();
        let pending = matches!(entry, MessageEntry::Pending { .. });
        let marker = if pending { " (pending)" } else { "" };
        println!(
            "[{}] {}{}: {}",
            message.created_at, message.role, marker, message.content
        );
    }
    Ok(())
}

pub async fn send(args: SendArgs) -> Result<()> {
    let ctx = build_context(args.config)?;
    let (events, mut rx) = mpsc::unbounded_channel();
    let controller = ctx.controller(events);

    // Render throttled flushes as they arrive; the controller bounds the
    // update rate, this task only prints the growing suffix.
    let printer = tokio::spawn(async move {
        let mut printed = 0usize;
        while let Some(event) = rx.recv().await {
            match event {
                ChatEvent::StreamStarted { .. } => {}
                ChatEvent::StreamDelta { content, .. } => {
                    print!("{}", &content[printed..]);
                    io::stdout().flush().ok();
                    printed = content.len();
                }
                ChatEvent::StreamCompleted { .. } => {
                    println!();
                    break;
                }
                ChatEvent::StreamFailed { message, .. } => {
                    eprintln!();
                    eprintln!("{message}");
                    break;
                }
            }
        }
    });

    let result = controller
        .send_message(&args.text, args.model, args.conversation)
        .await;
    printer.await.ok();

    let message = result.map_err(|err| anyhow::anyhow!(midora_client::normalize_error(&err)))?;
    println!(
        "[message {} in conversation {}]",
        message.id, message.conversation_id
    );
    Ok(())
}
