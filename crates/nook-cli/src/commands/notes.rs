use nook_core::store::Selection;
use nook_core::{view, Note, NoteId, NotePatch};

use crate::cli::NoteCommands;
use crate::commands::common::{
    capture_editor_input_with_initial, finish_mutation, format_note_lines, note_to_list_item,
    read_piped_stdin, resolve_folder, resolve_note, resolve_tag, AppContext, Client,
    NoteListItem,
};
use crate::error::CliError;

pub async fn run_notes(command: NoteCommands, context: &AppContext) -> Result<(), CliError> {
    let client = context.open_signed_in_client()?;
    match command {
        NoteCommands::List {
            folder,
            search,
            tag,
            limit,
            json,
        } => run_list(&client, folder.as_deref(), search, tag.as_deref(), limit, json),
        NoteCommands::Show { id } => {
            let note = client.read(|store| -> Result<NoteListItem, CliError> {
                let id = resolve_note(store, &id)?;
                let (_, note) = store
                    .find_note(&id)
                    .ok_or_else(|| CliError::NoteNotFound(id.to_string()))?;
                Ok(note_to_list_item(store, note))
            })?;
            println!("{}", note.title);
            println!("{} | {} | {}", note.id, note.folder, note.updated_at);
            if !note.tags.is_empty() {
                println!("tags: {}", note.tags.join(", "));
            }
            println!();
            println!("{}", note.content);
            Ok(())
        }
        NoteCommands::New {
            folder,
            title,
            content,
        } => {
            if let Some(folder) = folder {
                let id = client.read(|store| resolve_folder(store, &folder))?;
                client.select_folder(&id);
            }
            let content = match content {
                Some(content) => Some(content),
                None => read_piped_stdin()?,
            };
            let Some(id) = client.create_note()? else {
                return Err(CliError::NoFolders);
            };
            client.update_note(
                &id,
                NotePatch {
                    title,
                    content,
                    ..NotePatch::default()
                },
            )?;
            finish_mutation(&client).await;
            println!("{id}");
            Ok(())
        }
        NoteCommands::Edit { id, title, content } => {
            let (id, current) = client.read(|store| {
                let id = resolve_note(store, &id)?;
                let content = store
                    .find_note(&id)
                    .map(|(_, note)| note.content.clone())
                    .unwrap_or_default();
                Ok::<_, CliError>((id, content))
            })?;

            let mut patch = NotePatch {
                title,
                content,
                ..NotePatch::default()
            };
            if patch.is_empty() {
                let Some(edited) = capture_editor_input_with_initial(&current)? else {
                    return Err(CliError::EmptyEditedContent);
                };
                if edited == current {
                    println!("{id}");
                    return Ok(());
                }
                patch = patch.content(edited);
            }

            client.update_note(&id, patch)?;
            finish_mutation(&client).await;
            println!("{id}");
            Ok(())
        }
        NoteCommands::Delete { id } => {
            let id = client.read(|store| resolve_note(store, &id))?;
            client.delete_note(&id)?;
            finish_mutation(&client).await;
            println!("{id}");
            Ok(())
        }
        NoteCommands::Move { id, folder } => {
            let (id, destination) = client.read(|store| {
                Ok::<_, CliError>((resolve_note(store, &id)?, resolve_folder(store, &folder)?))
            })?;
            if !client.move_to_folder(&id, &destination)? {
                return Err(CliError::refused(format!(
                    "Cannot move note {id} to '{folder}'"
                )));
            }
            finish_mutation(&client).await;
            println!("{id}");
            Ok(())
        }
        NoteCommands::Favourite { id } => {
            let id = client.read(|store| resolve_note(store, &id))?;
            client.toggle_favourite(&id)?;
            finish_mutation(&client).await;
            print_flag(&client, &id, "favourite", |note| note.is_favourite);
            Ok(())
        }
        NoteCommands::Pin { id } => {
            let id = client.read(|store| resolve_note(store, &id))?;
            client.toggle_pin(&id)?;
            finish_mutation(&client).await;
            print_flag(&client, &id, "pinned", |note| note.is_pinned);
            Ok(())
        }
        NoteCommands::Tag { id, tag } => {
            let (id, tag_id) = client.read(|store| {
                Ok::<_, CliError>((resolve_note(store, &id)?, resolve_tag(store, &tag)?))
            })?;
            client.toggle_note_tag(&id, &tag_id)?;
            finish_mutation(&client).await;
            print_flag(&client, &id, &format!("tagged {tag}"), |note| {
                note.tags.contains(&tag_id)
            });
            Ok(())
        }
    }
}

fn run_list(
    client: &Client,
    folder: Option<&str>,
    search: Option<String>,
    tag: Option<&str>,
    limit: usize,
    as_json: bool,
) -> Result<(), CliError> {
    let (notes, items, tags) = client.read(|store| -> Result<_, CliError> {
        let mut selection = Selection {
            search_query: search.unwrap_or_default(),
            ..store.selection().clone()
        };
        if let Some(folder) = folder {
            selection.folder = Some(resolve_folder(store, folder)?);
        }
        selection.tag = tag.map(|tag| resolve_tag(store, tag)).transpose()?;

        let notes = view::visible_notes(store, &selection)
            .into_iter()
            .take(limit)
            .collect::<Vec<_>>();
        let items = as_json.then(|| {
            notes
                .iter()
                .map(|note| note_to_list_item(store, note))
                .collect::<Vec<NoteListItem>>()
        });
        Ok((notes, items, store.tags().to_vec()))
    })?;

    if let Some(items) = items {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if notes.is_empty() {
        println!("No notes.");
    } else {
        for line in format_note_lines(&notes, &tags) {
            println!("{line}");
        }
    }
    Ok(())
}

fn print_flag(
    client: &Client,
    id: &NoteId,
    label: &str,
    flag: impl Fn(&Note) -> bool,
) {
    let set = client.read(|store| store.find_note(id).is_some_and(|(_, note)| flag(note)));
    println!("{id} {}{label}", if set { "" } else { "not " });
}
