use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "nook")]
#[command(about = "Folders, favourites and search for your notes, synced to your account")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding the local cache and session token
    #[arg(long, global = true, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,

    /// Optional path to a JSON config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in, register or sign out
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Manage folders
    #[command(alias = "folder")]
    Folders {
        #[command(subcommand)]
        command: FolderCommands,
    },
    /// Create, edit and organize notes
    #[command(alias = "note")]
    Notes {
        #[command(subcommand)]
        command: NoteCommands,
    },
    /// Show the tag catalogue
    Tags {
        #[command(subcommand)]
        command: TagCommands,
    },
    /// Push or pull the folder tree
    Sync {
        #[command(subcommand)]
        command: SyncCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in with email and password
    Login {
        #[arg(long, value_name = "EMAIL")]
        email: String,
        #[arg(long, value_name = "PASSWORD", env = "NOOK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in
    Register {
        #[arg(long, value_name = "EMAIL")]
        email: String,
        #[arg(long, value_name = "PASSWORD", env = "NOOK_PASSWORD", hide_env_values = true)]
        password: String,
        /// Name shown in the app (defaults to "User")
        #[arg(long, value_name = "NAME")]
        display_name: Option<String>,
    },
    /// Show who is signed in
    Status,
    /// Sign out and clear local data
    Logout,
}

#[derive(Subcommand)]
pub enum FolderCommands {
    /// List folders with note counts
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a folder
    Create {
        name: String,
    },
    /// Rename a folder
    Rename {
        /// Folder ID or name
        folder: String,
        name: String,
    },
    /// Delete a folder and every note in it
    Delete {
        /// Folder ID or name
        folder: String,
    },
    /// Make a folder the current one
    Select {
        /// Folder ID or name
        folder: String,
    },
}

#[derive(Subcommand)]
pub enum NoteCommands {
    /// List notes in a folder, most recently updated first
    List {
        /// Folder ID or name (defaults to the current folder)
        #[arg(long)]
        folder: Option<String>,
        /// Case-insensitive text to look for in title and content
        #[arg(long)]
        search: Option<String>,
        /// Only notes with this tag (ID or name)
        #[arg(long)]
        tag: Option<String>,
        /// Number of notes to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a note
    Show {
        /// Note ID or unique ID prefix
        id: String,
    },
    /// Create a note
    #[command(alias = "add")]
    New {
        /// Folder ID or name (defaults to the current folder)
        #[arg(long)]
        folder: Option<String>,
        #[arg(long)]
        title: Option<String>,
        /// Note content (read from stdin when piped)
        #[arg(long)]
        content: Option<String>,
    },
    /// Edit a note's title or content
    Edit {
        /// Note ID or unique ID prefix
        id: String,
        #[arg(long)]
        title: Option<String>,
        /// New content; opens $EDITOR when neither --title nor --content is given
        #[arg(long)]
        content: Option<String>,
    },
    /// Delete a note permanently
    Delete {
        /// Note ID or unique ID prefix
        id: String,
    },
    /// Move a note to another folder
    Move {
        /// Note ID or unique ID prefix
        id: String,
        /// Destination folder ID or name
        folder: String,
    },
    /// Toggle the favourite flag
    #[command(alias = "fav")]
    Favourite {
        /// Note ID or unique ID prefix
        id: String,
    },
    /// Toggle the pinned flag
    Pin {
        /// Note ID or unique ID prefix
        id: String,
    },
    /// Add or remove a tag
    Tag {
        /// Note ID or unique ID prefix
        id: String,
        /// Tag ID or name
        tag: String,
    },
}

#[derive(Subcommand)]
pub enum TagCommands {
    /// List available tags
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// Push the local folder tree now
    Push,
    /// Replace the local folder tree with the server's copy
    Pull,
}
