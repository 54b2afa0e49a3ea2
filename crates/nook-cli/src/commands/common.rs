use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use nook_core::api::HttpRemoteApi;
use nook_core::cache::FileBlobStore;
use nook_core::config::ClientConfig;
use nook_core::store::NoteStore;
use nook_core::sync::SyncState;
use nook_core::{Folder, FolderId, Note, NoteId, NookClient, Tag, TagId};
use serde::Serialize;

use crate::error::CliError;

pub type Client = NookClient<HttpRemoteApi, FileBlobStore>;

/// Resolved configuration for one CLI invocation.
pub struct AppContext {
    pub config: ClientConfig,
    pub data_dir: PathBuf,
}

impl AppContext {
    /// Precedence: command-line flags, then `NOOK_*` variables, then the
    /// config file, then defaults.
    pub fn load(config_path: Option<&Path>, data_dir: Option<PathBuf>) -> Result<Self, CliError> {
        let config = match config_path.map(Path::to_path_buf).or_else(default_config_path) {
            Some(path) => ClientConfig::load(&path)?,
            None => ClientConfig::default(),
        }
        .with_env()?;
        let data_dir = data_dir
            .or_else(|| config.data_dir.clone())
            .or_else(default_data_dir)
            .ok_or(CliError::NoDataDir)?;
        Ok(Self { config, data_dir })
    }

    /// Open the client and restore any persisted session.
    pub fn open_client(&self) -> Result<Client, CliError> {
        let client = NookClient::connect(&self.config, &self.data_dir)?;
        client.start()?;
        Ok(client)
    }

    pub fn open_signed_in_client(&self) -> Result<Client, CliError> {
        let client = self.open_client()?;
        if client.session().is_authenticated() {
            Ok(client)
        } else {
            Err(CliError::NotSignedIn)
        }
    }
}

pub fn default_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("nook"))
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("nook").join("config.json"))
}

/// Send pending changes before the process exits and warn if that failed.
pub async fn finish_mutation(client: &Client) {
    client.flush().await;
    report_sync_state(&client.sync_state());
}

pub fn report_sync_state(state: &SyncState) {
    match state {
        SyncState::Error { message } => eprintln!("Warning: sync failed: {message}"),
        SyncState::Unauthorized => {
            eprintln!("Warning: the server rejected your session; run `nook auth login` again");
        }
        _ => {}
    }
}

#[derive(Debug, Serialize)]
pub struct NoteListItem {
    pub id: String,
    pub title: String,
    pub preview: String,
    pub content: String,
    pub folder: String,
    pub created_at: String,
    pub updated_at: String,
    pub relative_time: String,
    pub is_favourite: bool,
    pub is_pinned: bool,
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct FolderListItem {
    pub id: String,
    pub name: String,
    pub icon: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub notes: usize,
    pub selected: bool,
}

pub fn note_to_list_item(store: &NoteStore, note: &Note) -> NoteListItem {
    let now = Utc::now();
    let folder = store
        .find_note(&note.id)
        .map(|(folder, _)| folder.name.clone())
        .unwrap_or_default();

    NoteListItem {
        id: note.id.to_string(),
        title: note.title.clone(),
        preview: note_preview(note, 80),
        content: note.content.clone(),
        folder,
        created_at: note.created_at.to_rfc3339(),
        updated_at: note.updated_at.to_rfc3339(),
        relative_time: format_relative_time(note.updated_at, now),
        is_favourite: note.is_favourite,
        is_pinned: note.is_pinned,
        tags: tag_names(store.tags(), note),
    }
}

pub fn folder_to_list_item(folder: &Folder, notes: usize, selected: bool) -> FolderListItem {
    FolderListItem {
        id: folder.id.to_string(),
        name: folder.name.clone(),
        icon: folder.icon.clone(),
        kind: if folder.is_virtual() { "virtual" } else { "custom" }.to_string(),
        notes,
        selected,
    }
}

pub fn format_note_lines(notes: &[Note], tags: &[Tag]) -> Vec<String> {
    let now = Utc::now();
    notes
        .iter()
        .map(|note| {
            let short_id = note.id.as_str().chars().take(13).collect::<String>();
            let preview = note_preview(note, 40);
            let relative_time = format_relative_time(note.updated_at, now);
            let flags = format!(
                "{}{}",
                if note.is_favourite { '*' } else { ' ' },
                if note.is_pinned { '^' } else { ' ' }
            );
            let tags = tag_names(tags, note)
                .into_iter()
                .map(|name| format!("#{name}"))
                .collect::<Vec<_>>()
                .join(" ");

            if tags.is_empty() {
                format!("{short_id:<13} {flags} {preview:<40}  {relative_time}")
            } else {
                format!("{short_id:<13} {flags} {preview:<40}  {relative_time:<10}  {tags}")
            }
        })
        .collect()
}

fn tag_names(catalogue: &[Tag], note: &Note) -> Vec<String> {
    note.tags
        .iter()
        .map(|id| {
            catalogue
                .iter()
                .find(|tag| &tag.id == id)
                .map_or_else(|| id.to_string(), |tag| tag.name.clone())
        })
        .collect()
}

pub fn note_preview(note: &Note, max_chars: usize) -> String {
    let source = note.title_preview(usize::MAX);
    let collapsed = source.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return "(empty)".to_string();
    }

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_relative_time(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = (now - at).num_milliseconds().max(0);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

pub fn normalize_note_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyNoteId)
    } else {
        Ok(trimmed.to_string())
    }
}

/// Resolve a note by exact ID or unique ID prefix.
pub fn resolve_note(store: &NoteStore, query: &str) -> Result<NoteId, CliError> {
    let query = normalize_note_identifier(query)?;
    let exact = NoteId::from(query.as_str());
    if store.find_note(&exact).is_some() {
        return Ok(exact);
    }

    let matching_ids = store
        .notes()
        .filter(|note| note.id.as_str().starts_with(&query))
        .map(|note| note.id.clone())
        .collect::<Vec<_>>();

    match matching_ids.as_slice() {
        [] => Err(CliError::NoteNotFound(query)),
        [id] => Ok(id.clone()),
        _ => {
            let options = matching_ids
                .iter()
                .take(3)
                .map(|id| id.as_str().chars().take(13).collect::<String>())
                .collect::<Vec<_>>()
                .join(", ");

            Err(CliError::AmbiguousNoteId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

/// Resolve a folder by ID or case-insensitive name, including favourites.
pub fn resolve_folder(store: &NoteStore, query: &str) -> Result<FolderId, CliError> {
    let query = query.trim();
    let favourites = Folder::favourites();
    if query == favourites.id.as_str() || favourites.has_name(query) {
        return Ok(favourites.id);
    }

    let by_id = FolderId::from(query);
    if store.folder(&by_id).is_some() {
        return Ok(by_id);
    }
    store
        .folders()
        .iter()
        .find(|folder| folder.has_name(query))
        .map(|folder| folder.id.clone())
        .ok_or_else(|| CliError::FolderNotFound(query.to_string()))
}

/// Resolve a tag by ID or case-insensitive name.
pub fn resolve_tag(store: &NoteStore, query: &str) -> Result<TagId, CliError> {
    let query = query.trim();
    store
        .tags()
        .iter()
        .find(|tag| tag.id.as_str() == query || tag.name.eq_ignore_ascii_case(query))
        .map(|tag| tag.id.clone())
        .ok_or_else(|| CliError::TagNotFound(query.to_string()))
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

pub fn capture_editor_input_with_initial(
    initial_content: &str,
) -> Result<Option<String>, CliError> {
    let editor = preferred_editor();
    let temp_file = create_temp_note_file_path();
    std::fs::write(&temp_file, initial_content)?;

    let launch_result = launch_editor(&editor, &temp_file);
    let note_content = std::fs::read_to_string(&temp_file)?;
    let _ = std::fs::remove_file(&temp_file);

    launch_result?;
    Ok(normalize_content(&note_content))
}

pub fn launch_editor(editor: &str, file_path: &Path) -> Result<(), CliError> {
    let mut parts = editor.split_whitespace();
    let Some(program) = parts.next() else {
        return Err(CliError::EditorFailed("empty EDITOR command".into()));
    };

    let status = Command::new(program).args(parts).arg(file_path).status()?;
    if status.success() {
        Ok(())
    } else {
        Err(CliError::EditorFailed(format!(
            "`{editor}` exited with status {status}"
        )))
    }
}

pub fn preferred_editor() -> String {
    env::var("VISUAL")
        .or_else(|_| env::var("EDITOR"))
        .unwrap_or_else(|_| default_editor().to_string())
}

pub const fn default_editor() -> &'static str {
    if cfg!(windows) {
        "notepad"
    } else {
        "vi"
    }
}

fn create_temp_note_file_path() -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    env::temp_dir().join(format!("nook-note-{}-{now}.md", std::process::id()))
}
