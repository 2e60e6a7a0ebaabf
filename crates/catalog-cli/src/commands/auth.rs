use std::io::{self, IsTerminal};

use anyhow::anyhow;
use catalog_client::LoginRequest;

use crate::cli::LoginArgs;
use crate::client::{AppContext, CliError, CliResult};
use crate::output::render_profile;

pub(crate) async fn handle_login(ctx: &AppContext, args: LoginArgs) -> CliResult<()> {
    let email = args.email.trim();
    if email.is_empty() {
        return Err(CliError::validation("email must not be empty"));
    }
    let password = resolve_password(args.password)?;

    let profile = ctx
        .console
        .auth()
        .sign_in(&LoginRequest {
            email: email.to_string(),
            password,
        })
        .await?;
    println!(
        "Signed in as {}",
        profile.user.name.as_deref().unwrap_or(&profile.user.email)
    );
    Ok(())
}

pub(crate) fn handle_logout(ctx: &AppContext) {
    ctx.console.sign_out();
    println!("Signed out");
}

pub(crate) async fn handle_whoami(ctx: &AppContext) -> CliResult<()> {
    ctx.require_session()?;
    let profile = ctx.console.auth().refresh_profile().await?;
    render_profile(&profile, ctx.output)
}

pub(crate) fn resolve_password(provided: Option<String>) -> CliResult<String> {
    if let Some(value) = provided {
        if value.is_empty() {
            return Err(CliError::validation("password cannot be empty"));
        }
        return Ok(value);
    }

    if io::stdin().is_terminal() {
        let password = rpassword::prompt_password("Password: ").map_err(|err| {
            CliError::failure(anyhow!("failed to read password from stdin: {err}"))
        })?;
        if password.is_empty() {
            return Err(CliError::validation("password cannot be empty"));
        }
        Ok(password)
    } else {
        Err(CliError::validation(
            "password required; supply via --password or CATALOG_PASSWORD when running non-interactively",
        ))
    }
}
