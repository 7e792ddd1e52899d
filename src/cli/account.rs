use std::error::Error;

use tracing::debug;

use crate::cli::context::CliContext;

pub async fn status(ctx: &CliContext) -> Result<(), Box<dyn Error>> {
    if ctx.auth().probe().await {
        ctx.persist_session()?;
        println!("✅ Logged in to {}", ctx.api_url);
    } else {
        println!("Not logged in to {}", ctx.api_url);
        println!("Run `readmegen login` to sign in.");
    }
    Ok(())
}

/// Completes a browser login. Without `cookie`, reuses whatever session the
/// keyring holds and otherwise prints where to sign in.
pub async fn login(ctx: &CliContext, cookie: Option<&str>) -> Result<(), Box<dyn Error>> {
    if let Some(cookie) = cookie.map(str::trim).filter(|cookie| !cookie.is_empty()) {
        ctx.import_cookies(cookie)?;
    }

    let auth = ctx.auth();
    match auth.complete_login().await {
        Ok(return_to) => {
            ctx.persist_session()?;
            println!("✅ Logged in to {}", ctx.api_url);
            if let Some(path) = return_to {
                println!("Resume where you left off: {path}");
            }
            Ok(())
        }
        Err(err) => {
            debug!(error = %err, "Login check failed");
            println!("Sign in with GitHub at {}", auth.login_url());
            println!(
                "Then run `readmegen login --cookie '<cookie header>'` with the cookies the \
                 browser holds for {}.",
                ctx.api_url
            );
            Err(Box::new(err))
        }
    }
}

pub async fn logout(ctx: &CliContext) -> Result<(), Box<dyn Error>> {
    let result = ctx.auth().logout().await;
    ctx.forget_session()?;
    result?;
    println!("✅ Logged out");
    Ok(())
}

pub async fn withdraw(ctx: &CliContext) -> Result<(), Box<dyn Error>> {
    let result = ctx.auth().withdraw().await;
    ctx.forget_session()?;
    result?;
    println!("✅ Account deleted");
    Ok(())
}
