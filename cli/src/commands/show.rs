use std::io::IsTerminal;

use cmr_core::annotation::{AnnotatedRecipe, Emphasis, HighlightTable, check_annotation_coverage, render_plain};
use cmr_core::guard::{self, Route};
use cmr_core::model::upper_first;
use cmr_core::selection::SelectionState;
use cmr_core::session::SessionStore;
use cmr_core::store::FileStore;

use super::convert::SelectionArgs;
use crate::util::{exit, report_blocked};

/// Selection view: annotated recipe plus the unit tree, previewing any
/// targets passed with --group/--unit.
pub fn run(sessions: &mut SessionStore<FileStore>, args: SelectionArgs, no_color: bool) -> i32 {
    if let Some(code) = report_blocked(guard::check(Route::Selection, sessions)) {
        return code;
    }
    let Some(session) = sessions.load() else {
        return report_blocked(guard::check(Route::Selection, sessions)).unwrap_or(exit::USER);
    };

    let selection = args.apply(&session.unit_groups);
    let annotated = AnnotatedRecipe::parse(session.annotated_html.as_deref().unwrap_or_default());

    let coverage = check_annotation_coverage(&session.unit_groups, &annotated);
    if !coverage.is_complete() {
        tracing::warn!(
            missing = ?coverage.missing,
            duplicated = ?coverage.duplicated,
            "Annotation does not match detected units"
        );
    }

    let mut highlights = HighlightTable::from_groups(&session.unit_groups);
    highlights.sync_from(&selection);

    let emphasis = if no_color || !std::io::stdout().is_terminal() {
        Emphasis::Brackets
    } else {
        Emphasis::Ansi
    };

    println!("{}", render_plain(&annotated, &highlights, emphasis));
    println!();
    print!("{}", render_tree(&selection));
    println!();
    if let Some(line) = highlighted_line(&highlights) {
        println!("{line}");
    }
    if selection.can_submit() {
        println!("Ready: run `cmr convert` with the same --group/--unit flags.");
    } else {
        println!("Pick at least one target with --group NAME=UNIT or --unit ID=UNIT.");
    }
    exit::OK
}

fn render_tree(selection: &SelectionState) -> String {
    let mut out = String::new();
    for group in selection.groups() {
        let targets = group.available_targets.join(", ");
        out.push_str(&format!(
            "{} to: {} [{}]\n",
            upper_first(&group.name),
            selection.group_choice(&group.name).unwrap_or("-"),
            targets
        ));
        for unit in &group.units {
            out.push_str(&format!(
                "  {} ({}) to: {}\n",
                unit.term,
                unit.id,
                selection.occurrence_choice(&unit.id).unwrap_or("-")
            ));
        }
    }
    out
}

fn highlighted_line(highlights: &HighlightTable) -> Option<String> {
    let ids: Vec<_> = highlights.highlighted().collect();
    if ids.is_empty() {
        None
    } else {
        Some(format!("Converting: {}", ids.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use cmr_core::model::{UnitGroup, UnitOccurrence};

    use super::*;

    fn groups() -> Vec<UnitGroup> {
        vec![UnitGroup {
            name: "volume".to_string(),
            category: "volume".to_string(),
            units: vec![UnitOccurrence {
                id: "u1".to_string(),
                value: 2.0,
                unit_text: "cup".to_string(),
                term: "2 cups".to_string(),
                to: None,
                converted_value: None,
            }],
            available_targets: vec!["milliliter".to_string(), "liter".to_string()],
        }]
    }

    #[test]
    fn test_tree_lists_groups_and_occurrences() {
        let mut selection = SelectionState::new(&groups());
        assert_eq!(
            render_tree(&selection),
            "Volume to: - [milliliter, liter]\n  2 cups (u1) to: -\n"
        );

        selection.select_group("volume", Some("liter")).unwrap();
        assert_eq!(
            render_tree(&selection),
            "Volume to: liter [milliliter, liter]\n  2 cups (u1) to: liter\n"
        );
    }

    #[test]
    fn test_highlighted_line_names_selected_occurrences() {
        let groups = groups();
        let mut highlights = HighlightTable::from_groups(&groups);
        assert_eq!(highlighted_line(&highlights), None);

        let args = SelectionArgs {
            groups: vec!["volume=liter".to_string()],
            units: Vec::new(),
        };
        highlights.sync_from(&args.apply(&groups));
        assert_eq!(highlighted_line(&highlights).as_deref(), Some("Converting: u1"));
    }

    #[test]
    fn test_selection_args_apply_groups_before_units() {
        let args = SelectionArgs {
            groups: vec!["volume=liter".to_string()],
            units: vec!["u1=milliliter".to_string()],
        };
        let selection = args.apply(&groups());
        assert_eq!(selection.group_choice("volume"), Some("liter"));
        assert_eq!(selection.occurrence_choice("u1"), Some("milliliter"));
    }
}
