use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use midora_client::RealtimeEvent;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::build_context;

#[derive(Args, Debug)]
#[command(about = "Follow realtime events for the signed-in user")]
pub struct FollowArgs {
    /// Conversation to watch; its events are applied to the local store
    #[arg(long, alias = "conv")]
    pub conversation: Option<Uuid>,

    /// Path to the configuration file (optional)
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

pub async fn follow(args: FollowArgs) -> Result<()> {
    let ctx = build_context(args.config)?;
    if !ctx.config.features.realtime {
        bail!("realtime updates are disabled in the configuration");
    }
    if ctx.tokens.is_refresh_expired() {
        bail!("no active session; run `midora session login` first");
    }
    if ctx.tokens.is_access_expired() {
        ctx.auth
            .refresh_access_token()
            .await
            .map_err(|err| anyhow::anyhow!(midora_client::normalize_error(&err)))?;
    }
    ctx.auth.me().await.context("failed to load profile")?;

    if let Some(conversation) = args.conversation {
        ctx.store.lock().unwrap().set_active(Some(conversation));
        println!("Watching conversation {conversation}... (press Ctrl+C to stop)");
    } else {
        println!("Watching the user channel... (press Ctrl+C to stop)");
    }

    let endpoint = ctx
        .realtime_endpoint()
        .map_err(|err| anyhow::anyhow!(midora_client::normalize_error(&err)))?;
    let (events, mut rx) = mpsc::unbounded_channel();
    let notifier = ctx.notifier(events);

    let render = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                RealtimeEvent::Connected => println!("[connected]"),
                RealtimeEvent::MessageApplied {
                    conversation_id,
                    message_id,
                } => println!("[message {message_id} in conversation {conversation_id}]"),
                RealtimeEvent::ServerError { code, message } => {
                    eprintln!("[server error {code}] {message}");
                }
                RealtimeEvent::Terminated { message } => {
                    eprintln!("{message}");
                    break;
                }
            }
        }
    });

    let outcome = notifier.run(endpoint).await;
    render.await.ok();
    outcome.map_err(|err| anyhow::anyhow!(midora_client::normalize_error(&err)))?;
    Ok(())
}
