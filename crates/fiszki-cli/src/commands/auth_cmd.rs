use fiszki_core::auth::SignUpOutcome;

use crate::auth::{auth_client, clear_stored_session, load_stored_session, AuthSession};
use crate::cli::AuthCommands;
use crate::commands::common::CliEnv;
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, env: &CliEnv) -> Result<(), CliError> {
    let profile_name = env.profile_name.as_str();
    let config = env.supabase_config()?;
    let client = auth_client(profile_name, config.as_ref())?;

    match command {
        AuthCommands::Login { email, password } => {
            let client = client.ok_or(CliError::SyncNotConfigured)?;
            let session = client
                .sign_in(&email, &password)
                .await
                .map_err(|error| CliError::Auth(error.to_string()))?;
            println!(
                "Signed in profile '{profile_name}' as {}",
                email_label(&session)
            );
        }
        AuthCommands::Signup { email, password } => {
            let client = client.ok_or(CliError::SyncNotConfigured)?;
            match client
                .sign_up(&email, &password)
                .await
                .map_err(|error| CliError::Auth(error.to_string()))?
            {
                SignUpOutcome::SignedIn(session) => println!(
                    "Created account and signed in profile '{profile_name}' as {}",
                    email_label(&session)
                ),
                SignUpOutcome::ConfirmationRequired => println!(
                    "Account created. Confirm the e-mail sent to {email}, then run `fiszki auth login`."
                ),
            }
        }
        AuthCommands::Status => {
            let session = match &client {
                Some(client) => match client.restore_session().await {
                    Ok(session) => session,
                    Err(error) if error.is_transient() => {
                        tracing::warn!("Could not refresh session: {error}");
                        load_stored_session(profile_name)?
                    }
                    Err(error) => return Err(CliError::Auth(error.to_string())),
                },
                None => load_stored_session(profile_name)?,
            };

            if let Some(session) = session {
                println!(
                    "Profile '{}' is signed in as {} (expires_at={})",
                    profile_name,
                    email_label(&session),
                    session.expires_at
                );
            } else {
                println!("Profile '{profile_name}' is not signed in.");
            }
        }
        AuthCommands::Logout => {
            let stored_session = load_stored_session(profile_name)?;
            match (client, stored_session) {
                (Some(client), Some(session)) => {
                    if let Err(error) = client.sign_out(&session).await {
                        tracing::warn!("Server-side sign-out failed, forgetting session locally: {error}");
                        clear_stored_session(profile_name)?;
                    }
                }
                _ => clear_stored_session(profile_name)?,
            }
            println!("Signed out profile '{profile_name}'");
        }
    }
    Ok(())
}

fn email_label(session: &AuthSession) -> &str {
    session.user.email.as_deref().unwrap_or("(no email)")
}
