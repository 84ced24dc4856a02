//! Line commands read from stdin.

use intel_core::{ItemId, RowAction, SourceId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Global filter over the visible table.
    Search(String),
    Filter { column: String, text: String },
    Sort(String),
    /// 1-based page number.
    Page(u32),
    Next,
    Prev,
    Hide(String),
    Show(String),
    Add(String),
    Row { action: RowAction, source_id: SourceId },
    /// Server-side search of the item feed.
    Query(String),
    Summarize(ItemId),
    /// Clears the notice left by a failed mutation.
    Dismiss,
    Reload,
    Back,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command {0:?}; try `help`")]
    Unknown(String),
    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),
    #[error("`{command}` expects a number, got {value:?}")]
    NotANumber { command: &'static str, value: String },
}

pub const HELP: &str = "\
search <text>          filter all columns of the table
filter <column> <text> filter one column (empty text clears)
sort <column>          cycle ascending, descending, unsorted
page <n> | next | prev move between pages
hide <column> | show <column>
add <address>          add a source
refresh|delete|open|open_external <id>  (`external` also works)
query <text>           search items on the server (item view)
summarize <id>         summarize one item (item view)
dismiss                clear the last notice
reload | back | help | quit";

/// Parses one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "search" => Command::Search(rest.to_string()),
        "filter" => {
            let (column, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            Command::Filter {
                column: required("filter", column)?,
                text: text.trim().to_string(),
            }
        }
        "sort" => Command::Sort(required("sort", rest)?),
        "page" => Command::Page(number("page", rest)?),
        "next" => Command::Next,
        "prev" => Command::Prev,
        "hide" => Command::Hide(required("hide", rest)?),
        "show" => Command::Show(required("show", rest)?),
        "add" => Command::Add(required("add", rest)?),
        "query" => Command::Query(rest.to_string()),
        "summarize" => Command::Summarize(number("summarize", rest)?),
        "dismiss" => Command::Dismiss,
        "reload" => Command::Reload,
        "back" => Command::Back,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        "external" => Command::Row {
            action: RowAction::OpenExternal,
            source_id: number("open_external", rest)?,
        },
        other => match RowAction::from_name(other) {
            Some(action) => Command::Row {
                action,
                source_id: number(action.name(), rest)?,
            },
            None => return Err(CommandError::Unknown(other.to_string())),
        },
    };
    Ok(Some(command))
}

fn required(command: &'static str, value: &str) -> Result<String, CommandError> {
    let value = value.trim();
    if value.is_empty() {
        Err(CommandError::MissingArgument(command))
    } else {
        Ok(value.to_string())
    }
}

fn number<T: std::str::FromStr>(command: &'static str, value: &str) -> Result<T, CommandError> {
    let value = required(command, value)?;
    value
        .trim_start_matches('#')
        .parse()
        .map_err(|_| CommandError::NotANumber { command, value })
}
