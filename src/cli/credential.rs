use crate::cli::{show, CliContext};
use crate::constants;
use crate::models::credential::{Credential, Scope};
use anyhow::{bail, Context, Result};
use clap::Args;
use dialoguer::{Confirm, Input, Password};
use std::io::Read;
use zeroize::Zeroizing;

#[derive(Args, Debug)]
pub struct CredentialInput {
    /// Username (prompted for when omitted)
    #[arg(long)]
    pub username: Option<String>,

    /// Read the password from stdin instead of an interactive prompt
    #[arg(long)]
    pub password_stdin: bool,
}

#[derive(Args, Debug)]
pub struct SetPersonalArgs {
    #[command(flatten)]
    pub input: CredentialInput,
}

#[derive(Args, Debug)]
pub struct SetProjectArgs {
    #[command(flatten)]
    pub input: CredentialInput,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct RemoveProjectArgs {
    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

pub fn run_set_personal(ctx: &CliContext, args: SetPersonalArgs) -> Result<()> {
    println!("Setting personal credentials for host {}", ctx.host);
    let credential = read_credential(ctx, &args.input)?;
    let path = ctx.resolver.set_personal(&ctx.host, &credential)?;
    ctx.audit("set-personal", Scope::Personal);
    println!("Wrote {}", path.display());
    show::print_report(&ctx.resolver.show(&ctx.host));
    Ok(())
}

pub fn run_set_project(ctx: &CliContext, args: SetProjectArgs) -> Result<()> {
    let store = ctx.resolver.project_store();
    confirm_shared_change(
        ctx,
        args.yes,
        &format!(
            "This overwrites the project credentials in {} used by everyone without personal credentials. Continue?",
            store.dir().display()
        ),
    )?;
    let credential = read_credential(ctx, &args.input)?;
    let path = ctx.resolver.set_project(&credential)?;
    ctx.audit("set-project", Scope::Project);
    println!("Wrote {}", path.display());
    show::print_report(&ctx.resolver.show(&ctx.host));
    Ok(())
}

pub fn run_remove_personal(ctx: &CliContext) -> Result<()> {
    if ctx.resolver.remove_personal(&ctx.host)? {
        ctx.audit("remove-personal", Scope::Personal);
        println!("Removed personal credentials for host {}", ctx.host);
    } else {
        println!("No personal credentials for host {}", ctx.host);
    }
    show::print_report(&ctx.resolver.show(&ctx.host));
    Ok(())
}

pub fn run_remove_project(ctx: &CliContext, args: RemoveProjectArgs) -> Result<()> {
    confirm_shared_change(
        ctx,
        args.yes,
        "This deletes the project credentials shared by everyone. Continue?",
    )?;
    if ctx.resolver.remove_project()? {
        ctx.audit("remove-project", Scope::Project);
        println!("Removed project credentials");
    } else {
        println!("No project credentials to remove");
    }
    show::print_report(&ctx.resolver.show(&ctx.host));
    Ok(())
}

fn confirm_shared_change(ctx: &CliContext, yes: bool, prompt: &str) -> Result<()> {
    if yes {
        return Ok(());
    }
    if ctx.non_interactive {
        bail!("--non-interactive requires --yes to change shared project credentials");
    }
    let proceed = Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .context("read confirmation")?;
    if !proceed {
        bail!("cancelled");
    }
    Ok(())
}

fn read_credential(ctx: &CliContext, input: &CredentialInput) -> Result<Credential> {
    if ctx.non_interactive && (input.username.is_none() || !input.password_stdin) {
        bail!("--non-interactive requires --username and --password-stdin");
    }

    let username = match &input.username {
        Some(username) => username.trim().to_string(),
        None => Input::<String>::new()
            .with_prompt("Username")
            .interact_text()
            .context("read username from prompt")?
            .trim()
            .to_string(),
    };
    if username.is_empty() {
        bail!("username cannot be empty");
    }

    let password = read_password(input.password_stdin, &username)?;
    if password.is_empty() {
        bail!("password is empty");
    }
    Ok(Credential {
        username,
        password,
    })
}

fn read_password(from_stdin: bool, username: &str) -> Result<Zeroizing<String>> {
    let password = if from_stdin {
        let mut buf = Zeroizing::new(String::new());
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("read password from stdin")?;
        Zeroizing::new(strip_line_ending(&buf).to_string())
    } else {
        Zeroizing::new(
            Password::new()
                .with_prompt(format!("Password for {}", username))
                .allow_empty_password(false)
                .interact()
                .context("read password from prompt")?,
        )
    };
    if password.len() > constants::MAX_SECRET_SIZE {
        bail!(
            "password exceeds maximum size ({} bytes, max {} bytes)",
            password.len(),
            constants::MAX_SECRET_SIZE
        );
    }
    Ok(password)
}

/// Strip a single trailing newline, as left by `echo` or a heredoc.
fn strip_line_ending(s: &str) -> &str {
    s.strip_suffix("\r\n")
        .or_else(|| s.strip_suffix('\n'))
        .unwrap_or(s)
}
