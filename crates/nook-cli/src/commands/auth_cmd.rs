use nook_core::AuthOutcome;

use crate::cli::AuthCommands;
use crate::commands::common::AppContext;
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, context: &AppContext) -> Result<(), CliError> {
    let client = context.open_client()?;
    match command {
        AuthCommands::Login { email, password } => {
            match client.login(&email, &password).await {
                AuthOutcome::Success(identity) => {
                    let folders = client.read(|store| store.folders().len());
                    println!("Signed in as {} ({folders} folders)", identity.label());
                    Ok(())
                }
                AuthOutcome::Failure { message } => Err(CliError::AuthFailed(message)),
            }
        }
        AuthCommands::Register {
            email,
            password,
            display_name,
        } => match client
            .register(&email, &password, display_name.as_deref())
            .await
        {
            AuthOutcome::Success(identity) => {
                println!("Registered and signed in as {}", identity.label());
                Ok(())
            }
            AuthOutcome::Failure { message } => Err(CliError::AuthFailed(message)),
        },
        AuthCommands::Status => {
            if let Some(identity) = client.identity() {
                println!("Signed in as {} <{}>", identity.label(), identity.email);
                println!("User ID: {}", identity.id);
            } else {
                println!("Not signed in.");
            }
            Ok(())
        }
        AuthCommands::Logout => {
            let label = client.identity().map(|identity| identity.email);
            client.logout()?;
            match label {
                Some(email) => println!("Signed out {email}"),
                None => println!("Not signed in."),
            }
            Ok(())
        }
    }
}
