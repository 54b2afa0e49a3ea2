use nook_core::view;

use crate::cli::FolderCommands;
use crate::commands::common::{
    finish_mutation, folder_to_list_item, resolve_folder, AppContext, FolderListItem,
};
use crate::error::CliError;

pub async fn run_folders(command: FolderCommands, context: &AppContext) -> Result<(), CliError> {
    let client = context.open_signed_in_client()?;
    match command {
        FolderCommands::List { json } => {
            let items = client.read(|store| {
                let current = view::effective_folder(store, store.selection()).id;
                view::all_folders(store)
                    .iter()
                    .map(|folder| {
                        folder_to_list_item(
                            folder,
                            view::note_count(store, &folder.id),
                            folder.id == current,
                        )
                    })
                    .collect::<Vec<FolderListItem>>()
            });

            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                for item in items {
                    let marker = if item.selected { '>' } else { ' ' };
                    println!("{marker} {:<24} {:>4}  {}", item.name, item.notes, item.id);
                }
            }
            Ok(())
        }
        FolderCommands::Create { name } => {
            let Some(id) = client.create_folder(&name)? else {
                return Err(CliError::refused(format!(
                    "A folder named '{}' already exists or the name is blank",
                    name.trim()
                )));
            };
            finish_mutation(&client).await;
            println!("{id}");
            Ok(())
        }
        FolderCommands::Rename { folder, name } => {
            let id = client.read(|store| resolve_folder(store, &folder))?;
            if !client.rename_folder(&id, &name)? {
                return Err(CliError::refused(format!(
                    "Cannot rename '{folder}' to '{}'",
                    name.trim()
                )));
            }
            finish_mutation(&client).await;
            println!("{id}");
            Ok(())
        }
        FolderCommands::Delete { folder } => {
            let id = client.read(|store| resolve_folder(store, &folder))?;
            if !client.delete_folder(&id)? {
                return Err(CliError::refused(format!("Cannot delete '{folder}'")));
            }
            finish_mutation(&client).await;
            println!("{id}");
            Ok(())
        }
        FolderCommands::Select { folder } => {
            let id = client.read(|store| resolve_folder(store, &folder))?;
            client.select_folder(&id);
            println!("{id}");
            Ok(())
        }
    }
}
