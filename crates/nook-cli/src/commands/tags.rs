use crate::cli::TagCommands;
use crate::commands::common::AppContext;
use crate::error::CliError;

pub fn run_tags(command: TagCommands, context: &AppContext) -> Result<(), CliError> {
    let client = context.open_client()?;
    match command {
        TagCommands::List { json } => {
            let tags = client.read(|store| store.tags().to_vec());
            if json {
                println!("{}", serde_json::to_string_pretty(&tags)?);
            } else {
                for tag in tags {
                    println!("{:<8} {:<12} {}", tag.id.as_str(), tag.name, tag.color);
                }
            }
            Ok(())
        }
    }
}
