use clap::Args;
use cmr_core::error::codes;
use cmr_core::flow::{ConvertOutcome, convert_recipe};
use cmr_core::guard::{self, Route};
use cmr_core::model::UnitGroup;
use cmr_core::notice::Notice;
use cmr_core::selection::SelectionState;
use cmr_core::session::SessionStore;
use cmr_core::store::FileStore;
use serde_json::json;

use crate::service::HttpRecipeService;
use crate::util::{exit, exit_error, parse_assignment, pretty, print_notice, report_blocked, report_flow_error};

#[derive(Args, Default)]
pub struct SelectionArgs {
    /// Target for a whole unit group (repeatable: NAME=UNIT)
    #[arg(long = "group", value_name = "NAME=UNIT")]
    pub groups: Vec<String>,

    /// Target for a single occurrence (repeatable: ID=UNIT)
    #[arg(long = "unit", value_name = "ID=UNIT")]
    pub units: Vec<String>,
}

impl SelectionArgs {
    /// Build the selection: group targets first (they cascade), then the
    /// individual ones.
    pub fn apply(&self, groups: &[UnitGroup]) -> SelectionState {
        let mut selection = SelectionState::new(groups);

        for raw in &self.groups {
            let (name, target) = parse_assignment(raw).unwrap_or_else(|e| {
                exit_error(&e, Some("Format: NAME=UNIT, e.g. --group volume=milliliter"))
            });
            if let Err(e) = selection.select_group(&name, Some(&target)) {
                invalid_selection(&e.to_string());
            }
        }

        for raw in &self.units {
            let (id, target) = parse_assignment(raw).unwrap_or_else(|e| {
                exit_error(&e, Some("Format: ID=UNIT, e.g. --unit u1=liter"))
            });
            if let Err(e) = selection.select_occurrence(&id, Some(&target)) {
                invalid_selection(&e.to_string());
            }
        }

        selection
    }
}

fn invalid_selection(message: &str) -> ! {
    let err = json!({
        "error": codes::INVALID_SELECTION,
        "message": message,
        "docs_hint": "Run `cmr show` to list groups, occurrence ids and available units."
    });
    eprintln!("{}", pretty(&err));
    std::process::exit(exit::USER);
}

pub async fn run(
    sessions: &mut SessionStore<FileStore>,
    service: &HttpRecipeService,
    args: SelectionArgs,
) -> i32 {
    if let Some(code) = report_blocked(guard::check(Route::Selection, sessions)) {
        return code;
    }
    let Some(session) = sessions.load() else {
        return report_blocked(guard::check(Route::Selection, sessions)).unwrap_or(exit::USER);
    };

    let selection = args.apply(&session.unit_groups);
    if !selection.can_submit() {
        print_notice(&Notice::nothing_selected());
        return exit::OK;
    }

    match convert_recipe(sessions, service, &selection).await {
        Ok(ConvertOutcome::Converted(final_recipe)) => {
            println!("{}", final_recipe.text);
            exit::OK
        }
        Ok(ConvertOutcome::NothingSelected) => {
            print_notice(&Notice::nothing_selected());
            exit::OK
        }
        Err(err) => report_flow_error(&err),
    }
}
