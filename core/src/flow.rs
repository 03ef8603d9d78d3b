//! Parse and convert flows, the two places that call the recipe service.
//!
//! Only one call is in flight per user action, so neither flow deduplicates
//! or cancels requests. Either a whole session (or final recipe) is stored,
//! or nothing is.

use std::future::Future;

use crate::clock::Clock;
use crate::error::{FlowError, ServiceError};
use crate::model::{
    ConvertRequest, ConvertResponse, FinalRecipe, ParseRequest, ParseResponse, RecipeSession,
    validate_unit_groups,
};
use crate::sanitize::sanitize_annotated_html;
use crate::selection::SelectionState;
use crate::session::SessionStore;
use crate::store::KeyValueStore;

pub const EMPTY_RECIPE_MESSAGE: &str = "Please insert your recipe.";

/// External unit detection and conversion service.
pub trait RecipeService {
    /// `POST /recipe/parse`
    fn parse(&self, request: &ParseRequest) -> impl Future<Output = Result<ParseResponse, ServiceError>>;

    /// `POST /recipe/convert`
    fn convert(&self, request: &ConvertRequest) -> impl Future<Output = Result<ConvertResponse, ServiceError>>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// Freshly parsed and stored; continue to the selection view
    Advanced(RecipeSession),
    /// Same text as the live session; nothing was sent
    Reused(RecipeSession),
    /// The service found nothing to convert; stay on the entry view
    NoUnitsFound,
}

impl ParseOutcome {
    pub fn session(&self) -> Option<&RecipeSession> {
        match self {
            ParseOutcome::Advanced(session) | ParseOutcome::Reused(session) => Some(session),
            ParseOutcome::NoUnitsFound => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConvertOutcome {
    Converted(FinalRecipe),
    /// No occurrence had a target; nothing was sent
    NothingSelected,
}

/// Submit recipe text from the entry view.
pub async fn parse_recipe<S, C, R>(
    sessions: &mut SessionStore<S, C>,
    service: &R,
    text: &str,
) -> Result<ParseOutcome, FlowError>
where
    S: KeyValueStore,
    C: Clock,
    R: RecipeService,
{
    if text.trim().is_empty() {
        return Err(FlowError::Validation {
            field: "recipe",
            message: EMPTY_RECIPE_MESSAGE.to_string(),
        });
    }

    if let Some(session) = sessions.load() {
        if session.raw_text == text {
            tracing::debug!("Recipe unchanged, reusing stored annotation");
            return Ok(ParseOutcome::Reused(session));
        }
    }

    sessions.begin_parse(text)?;

    let response = service
        .parse(&ParseRequest {
            recipe: text.to_string(),
        })
        .await
        .inspect_err(|err| tracing::warn!(error = %err, "Parse request failed"))?;

    if response.unit_groups.is_empty() {
        tracing::info!("No units detected in recipe");
        return Ok(ParseOutcome::NoUnitsFound);
    }

    validate_unit_groups(&response.unit_groups).map_err(ServiceError::from)?;

    let session = sessions.save(text, Some(&response.parsed_recipe), response.unit_groups)?;
    Ok(ParseOutcome::Advanced(session))
}

/// Submit the selection view.
pub async fn convert_recipe<S, C, R>(
    sessions: &mut SessionStore<S, C>,
    service: &R,
    selection: &SelectionState,
) -> Result<ConvertOutcome, FlowError>
where
    S: KeyValueStore,
    C: Clock,
    R: RecipeService,
{
    let session = sessions.load().ok_or(FlowError::NoSession)?;

    if !selection.has_occurrence_selection() {
        return Ok(ConvertOutcome::NothingSelected);
    }

    let request = ConvertRequest {
        unit_groups: selection.build_convert_groups(),
        parsed_recipe: sanitize_annotated_html(session.annotated_html.as_deref().unwrap_or_default()),
    };

    let response = service
        .convert(&request)
        .await
        .inspect_err(|err| tracing::warn!(error = %err, "Convert request failed"))?;

    let final_recipe = sessions.replace_with_final_recipe(&response.recipe)?;
    Ok(ConvertOutcome::Converted(final_recipe))
}
