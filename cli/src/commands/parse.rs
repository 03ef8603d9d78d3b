use clap::Args;
use cmr_core::flow::{ParseOutcome, parse_recipe};
use cmr_core::notice::Notice;
use cmr_core::session::SessionStore;
use cmr_core::store::FileStore;
use serde_json::json;

use crate::clipboard;
use crate::service::HttpRecipeService;
use crate::util::{exit, exit_error, pretty, print_notice, read_text_from_file, report_flow_error};

#[derive(Args)]
pub struct ParseArgs {
    /// Recipe text
    #[arg(long, short = 't', conflicts_with_all = ["file", "paste"])]
    pub text: Option<String>,

    /// Read the recipe from a file (use '-' for stdin)
    #[arg(long, short = 'f', conflicts_with = "paste")]
    pub file: Option<String>,

    /// Read the recipe from the clipboard
    #[arg(long)]
    pub paste: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipeSource {
    Text(String),
    File(String),
    Paste,
    /// Resubmit the text from the last visit to the entry view
    Stored,
}

impl ParseArgs {
    pub fn source(self) -> RecipeSource {
        match (self.text, self.file, self.paste) {
            (Some(text), _, _) => RecipeSource::Text(text),
            (None, Some(path), _) => RecipeSource::File(path),
            (None, None, true) => RecipeSource::Paste,
            (None, None, false) => RecipeSource::Stored,
        }
    }
}

#[derive(Debug)]
pub enum InputError {
    File(String),
    Paste(arboard::Error),
}

/// Resolve the recipe text. Empty input is returned as-is so the flow can
/// report it like any other empty submission.
pub fn read_recipe(
    source: RecipeSource,
    stored: impl FnOnce() -> Option<String>,
    paste: impl FnOnce() -> Result<String, arboard::Error>,
) -> Result<String, InputError> {
    match source {
        RecipeSource::Text(text) => Ok(text),
        RecipeSource::File(path) => read_text_from_file(&path).map_err(InputError::File),
        RecipeSource::Paste => paste().map_err(InputError::Paste),
        RecipeSource::Stored => Ok(stored().unwrap_or_default()),
    }
}

pub async fn run(
    sessions: &mut SessionStore<FileStore>,
    service: &HttpRecipeService,
    args: ParseArgs,
) -> i32 {
    let input = read_recipe(args.source(), || sessions.stored_raw_text(), clipboard::read_text);
    let text = match input {
        Ok(text) => text,
        Err(InputError::File(e)) => exit_error(&e, Some("Provide a readable file or use '-' for stdin")),
        Err(InputError::Paste(err)) => {
            tracing::warn!(error = %err, "Clipboard read failed");
            print_notice(&Notice::paste_failed());
            return exit::USER;
        }
    };

    match parse_recipe(sessions, service, &text).await {
        Ok(ParseOutcome::NoUnitsFound) => {
            print_notice(&Notice::no_units_found());
            exit::OK
        }
        Ok(outcome) => {
            let reused = matches!(outcome, ParseOutcome::Reused(_));
            let Some(session) = outcome.session() else {
                return exit::OK;
            };
            let groups: Vec<_> = session
                .unit_groups
                .iter()
                .map(|group| {
                    json!({
                        "name": group.name,
                        "occurrences": group.units.len(),
                        "targets": group.available_targets,
                    })
                })
                .collect();
            let status = if reused { "reused" } else { "parsed" };
            let output = json!({
                "status": status,
                "groups": groups,
                "next": "cmr show"
            });
            println!("{}", pretty(&output));
            exit::OK
        }
        Err(err) => report_flow_error(&err),
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct ParseCli {
        #[command(flatten)]
        args: ParseArgs,
    }

    fn source_of(argv: &[&str]) -> RecipeSource {
        let argv = std::iter::once("parse").chain(argv.iter().copied());
        ParseCli::try_parse_from(argv).unwrap().args.source()
    }

    fn no_clipboard() -> Result<String, arboard::Error> {
        panic!("clipboard read for a non-paste source")
    }

    #[test]
    fn test_input_source_selection() {
        assert_eq!(source_of(&["-t", "2 cups"]), RecipeSource::Text("2 cups".to_string()));
        assert_eq!(source_of(&["-f", "-"]), RecipeSource::File("-".to_string()));
        assert_eq!(source_of(&["--paste"]), RecipeSource::Paste);
        assert_eq!(source_of(&[]), RecipeSource::Stored);
    }

    #[test]
    fn test_paste_conflicts_with_other_sources() {
        assert!(ParseCli::try_parse_from(["parse", "--paste", "--text", "x"]).is_err());
        assert!(ParseCli::try_parse_from(["parse", "--paste", "--file", "r.txt"]).is_err());
        assert!(ParseCli::try_parse_from(["parse", "--text", "x", "--file", "r.txt"]).is_err());
    }

    #[test]
    fn test_read_recipe_uses_the_clipboard_only_for_paste() {
        let pasted = read_recipe(RecipeSource::Paste, || None, || Ok("1 cup milk".to_string()));
        assert_eq!(pasted.unwrap(), "1 cup milk");

        let stored = read_recipe(RecipeSource::Stored, || Some("draft".to_string()), no_clipboard);
        assert_eq!(stored.unwrap(), "draft");

        let text = read_recipe(RecipeSource::Text("2 cups".to_string()), || None, no_clipboard);
        assert_eq!(text.unwrap(), "2 cups");
    }

    #[test]
    fn test_clipboard_failure_is_an_input_error() {
        let result = read_recipe(RecipeSource::Paste, || None, || {
            Err(arboard::Error::ContentNotAvailable)
        });
        assert!(matches!(result, Err(InputError::Paste(_))));
    }

    #[test]
    fn test_empty_paste_is_left_for_validation() {
        let result = read_recipe(RecipeSource::Paste, || None, || Ok("  ".to_string()));
        assert_eq!(result.unwrap(), "  ");
    }

    #[test]
    fn test_missing_file_is_an_input_error() {
        let result = read_recipe(
            RecipeSource::File("/nonexistent/recipe.txt".to_string()),
            || None,
            no_clipboard,
        );
        assert!(matches!(result, Err(InputError::File(_))));
    }
}
