use std::{
    io::{self, Write},
    path::PathBuf,
};

use anyhow::{Result, bail};
use clap::Args;
use midora_client::Session;
use rpassword::prompt_password;

use super::build_context;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Path to the configuration file (optional)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Route to land on after signing in (must be app-local)
    #[arg(long)]
    pub return_url: Option<String>,
}

#[derive(Args, Debug)]
pub struct MeArgs {
    /// Path to the configuration file (optional)
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RefreshArgs {
    /// Path to the configuration file (optional)
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct LogoutArgs {
    /// Path to the configuration file (optional)
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

pub async fn login(args: LoginArgs) -> Result<()> {
    let ctx = build_context(args.config)?;

    let email = prompt("Email: ")?;
    let password = prompt_password("Password: ")?;
    if password.trim().is_empty() {
        bail!("password must not be empty");
    }

    let destination = ctx
        .auth
        .login(&email, &password, args.return_url.as_deref())
        .await
        .map_err(|err| anyhow::anyhow!(friendly(&ctx, err)))?;

    print_session_summary(&ctx.auth.session());
    println!("next stop: {destination}");
    Ok(())
}

pub async fn me(args: MeArgs) -> Result<()> {
    let ctx = build_context(args.config)?;
    if ctx.tokens.is_access_expired() && ctx.tokens.is_refresh_expired() {
        bail!("no active session; run `midora session login` first");
    }
    if ctx.tokens.is_access_expired() {
        ctx.auth
            .refresh_access_token()
            .await
            .map_err(|err| anyhow::anyhow!(friendly(&ctx, err)))?;
    }

    ctx.auth
        .me()
        .await
        .map_err(|err| anyhow::anyhow!(friendly(&ctx, err)))?;
    print_session_summary(&ctx.auth.session());
    Ok(())
}

pub async fn refresh(args: RefreshArgs) -> Result<()> {
    let ctx = build_context(args.config)?;
    ctx.auth
        .refresh_access_token()
        .await
        .map_err(|err| anyhow::anyhow!(friendly(&ctx, err)))?;
    println!("Token pair rotated.");
    Ok(())
}

pub async fn logout(args: LogoutArgs) -> Result<()> {
    let ctx = build_context(args.config)?;
    ctx.logout().await;
    println!("Signed out; local tokens cleared.");
    Ok(())
}

fn prompt(message: &str) -> Result<String> {
    print!("{message}");
    io::stdout().flush().ok();
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let trimmed = input.trim().to_string();
    if trimmed.is_empty() {
        bail!("input must not be empty");
    }
    Ok(trimmed)
}

fn friendly(ctx: &midora_client::AppContext, err: midora_client::ClientError) -> String {
    ctx.auth
        .session()
        .error
        .unwrap_or_else(|| midora_client::normalize_error(&err).to_string())
}

fn print_session_summary(session: &Session) {
    match &session.user {
        Some(user) => {
            println!("Signed in as {}", user.email);
            if let Some(display) = &user.display_name {
                println!("display name: {display}");
            }
            if let Some(method) = session.auth_method {
                println!("auth method: {method:?}");
            }
        }
        None => println!("No profile loaded."),
    }
}
