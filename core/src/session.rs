//! Recipe session store: the single access path to persisted recipe state.
//!
//! Expiry is lazy. Nothing runs in the background; every read compares the
//! stored timestamp with the clock and discards stale state on the spot.

use chrono::{DateTime, Duration, Utc};

use crate::clock::{Clock, SystemClock};
use crate::error::StoreError;
use crate::model::{FinalRecipe, RecipeSession, UnitGroup, validate_unit_groups};
use crate::sanitize::sanitize_annotated_html;
use crate::store::{Change, KeyValueStore, keys};

pub const SESSION_TTL_MINUTES: i64 = 30;

pub fn session_ttl() -> Duration {
    Duration::minutes(SESSION_TTL_MINUTES)
}

pub struct SessionStore<S, C = SystemClock> {
    store: S,
    clock: C,
}

impl<S: KeyValueStore> SessionStore<S, SystemClock> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: KeyValueStore, C: Clock> SessionStore<S, C> {
    pub fn with_clock(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Persist a parsed recipe, stamped with the current time. Overwrites any
    /// previous session in one batch.
    pub fn save(
        &mut self,
        raw_text: &str,
        annotated_html: Option<&str>,
        unit_groups: Vec<UnitGroup>,
    ) -> Result<RecipeSession, StoreError> {
        let session = RecipeSession {
            raw_text: raw_text.to_string(),
            annotated_html: annotated_html.map(sanitize_annotated_html),
            unit_groups,
            created_at: self.clock.now(),
        };

        let mut changes = vec![
            Change::set(keys::RECIPE, session.raw_text.as_str()),
            Change::set(keys::UNIT_GROUP, serde_json::to_string(&session.unit_groups)?),
            Change::set(keys::DATE, session.created_at.to_rfc3339()),
        ];
        changes.push(match &session.annotated_html {
            Some(html) => Change::set(keys::PARSED_RECIPE, html.as_str()),
            None => Change::remove(keys::PARSED_RECIPE),
        });
        self.store.apply(changes)?;

        tracing::info!(
            groups = session.unit_groups.len(),
            occurrences = session.occurrence_ids().count(),
            "Saved recipe session"
        );
        Ok(session)
    }

    /// Read the persisted session. Absent, expired and malformed sessions all
    /// read as `None`; the latter two are removed from the store.
    pub fn load(&mut self) -> Option<RecipeSession> {
        let raw_text = self.store.get(keys::RECIPE)?;
        let unit_groups_json = self.store.get(keys::UNIT_GROUP)?;
        let date = self.store.get(keys::DATE)?;

        let Some(created_at) = parse_timestamp(&date) else {
            self.discard_session("malformed timestamp");
            return None;
        };

        if self.is_expired(created_at) {
            self.discard_session("expired");
            return None;
        }

        let unit_groups: Vec<UnitGroup> = match serde_json::from_str(&unit_groups_json) {
            Ok(groups) => groups,
            Err(err) => {
                tracing::warn!(error = %err, "Stored unit groups are not valid JSON");
                self.discard_session("malformed unit groups");
                return None;
            }
        };

        if unit_groups.is_empty() || validate_unit_groups(&unit_groups).is_err() {
            self.discard_session("inconsistent unit groups");
            return None;
        }

        Some(RecipeSession {
            raw_text,
            annotated_html: self
                .store
                .get(keys::PARSED_RECIPE)
                .map(|html| sanitize_annotated_html(&html)),
            unit_groups,
            created_at,
        })
    }

    /// Text last typed on the entry view, kept even when no parse succeeded.
    pub fn stored_raw_text(&self) -> Option<String> {
        self.store.get(keys::RECIPE)
    }

    /// Remember the submitted text and drop any previous annotation before a
    /// new parse call goes out.
    pub fn begin_parse(&mut self, raw_text: &str) -> Result<(), StoreError> {
        self.store.apply(vec![
            Change::set(keys::RECIPE, raw_text),
            Change::remove(keys::PARSED_RECIPE),
            Change::remove(keys::UNIT_GROUP),
            Change::remove(keys::DATE),
        ])
    }

    /// Remove every session field in one batch.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.store
            .apply(keys::SESSION.iter().map(|key| Change::remove(key)).collect())
    }

    /// Remove the working session and any converted result.
    pub fn restart(&mut self) -> Result<(), StoreError> {
        self.store.apply(
            keys::SESSION
                .iter()
                .chain(keys::FINAL.iter())
                .map(|key| Change::remove(key))
                .collect(),
        )
    }

    /// Swap the working session for the converted text in one batch.
    pub fn replace_with_final_recipe(&mut self, text: &str) -> Result<FinalRecipe, StoreError> {
        let final_recipe = FinalRecipe {
            text: text.to_string(),
            created_at: self.clock.now(),
        };

        let mut changes: Vec<Change> = keys::SESSION.iter().map(|key| Change::remove(key)).collect();
        changes.push(Change::set(keys::FINAL_RECIPE, final_recipe.text.as_str()));
        changes.push(Change::set(keys::FINAL_DATE, final_recipe.created_at.to_rfc3339()));
        self.store.apply(changes)?;

        tracing::info!("Stored converted recipe");
        Ok(final_recipe)
    }

    /// Read the converted recipe under the same expiry rule as sessions.
    pub fn load_final_recipe(&mut self) -> Option<FinalRecipe> {
        let text = self.store.get(keys::FINAL_RECIPE)?;
        let created_at = self
            .store
            .get(keys::FINAL_DATE)
            .as_deref()
            .and_then(parse_timestamp);

        match created_at {
            Some(created_at) if !self.is_expired(created_at) => Some(FinalRecipe { text, created_at }),
            _ => {
                tracing::debug!("Discarding stale converted recipe");
                let removal = keys::FINAL.iter().map(|key| Change::remove(key)).collect();
                if let Err(err) = self.store.apply(removal) {
                    tracing::warn!(error = %err, "Failed to remove stale converted recipe");
                }
                None
            }
        }
    }

    fn is_expired(&self, created_at: DateTime<Utc>) -> bool {
        self.clock.now() - created_at > session_ttl()
    }

    fn discard_session(&mut self, reason: &str) {
        tracing::debug!(reason, "Discarding stored recipe session");
        if let Err(err) = self.clear() {
            tracing::warn!(error = %err, "Failed to clear stored recipe session");
        }
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}
