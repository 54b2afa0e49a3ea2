use nook_core::sync::SyncState;

use crate::cli::SyncCommands;
use crate::commands::common::AppContext;
use crate::error::CliError;

pub async fn run_sync(command: SyncCommands, context: &AppContext) -> Result<(), CliError> {
    let client = context.open_signed_in_client()?;
    match command {
        SyncCommands::Push => {
            let folders = client.read(|store| store.folders().len());
            match client.push_now().await {
                SyncState::Synced { at } => {
                    println!(
                        "Pushed {folders} folders at {}",
                        at.format("%Y-%m-%d %H:%M:%S UTC")
                    );
                    Ok(())
                }
                SyncState::Unauthorized => Err(CliError::SyncFailed(
                    "the server rejected your session; run `nook auth login` again".to_string(),
                )),
                SyncState::Error { message } => Err(CliError::SyncFailed(message)),
                other => Err(CliError::SyncFailed(format!("push did not run ({other:?})"))),
            }
        }
        SyncCommands::Pull => {
            let folders = client.refresh_profile().await?;
            println!("Pulled {folders} folders");
            Ok(())
        }
    }
}
