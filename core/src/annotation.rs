//! Annotated recipe text and the occurrence highlight table.
//!
//! The parse service marks every detected occurrence with a
//! `<span id="...">`. Instead of matching attributes while rendering, the
//! link between occurrence ids and spans is kept in explicit tables that can
//! be checked on their own.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::model::UnitGroup;
use crate::sanitize::{decode_entities, sanitize_annotated_html};
use crate::selection::SelectionState;

static SPAN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<span(?: class="([^"]*)")?(?: id="([^"]*)")?>|</span>"#)
        .expect("valid span regex")
});

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    Occurrence {
        id: String,
        class: Option<String>,
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnnotatedRecipe {
    segments: Vec<Segment>,
}

impl AnnotatedRecipe {
    /// Split annotated HTML into plain text and occurrence spans. The input is
    /// sanitized first, so the span grammar below is all that can appear.
    pub fn parse(html: &str) -> Self {
        let clean = sanitize_annotated_html(html);
        let mut segments: Vec<Segment> = Vec::new();
        // Per open span: index of its occurrence segment, if it carries an id
        let mut stack: Vec<Option<usize>> = Vec::new();
        let mut cursor = 0;

        for caps in SPAN_RE.captures_iter(&clean) {
            let Some(whole) = caps.get(0) else { continue };
            push_text(&mut segments, &stack, &clean[cursor..whole.start()]);
            cursor = whole.end();

            if whole.as_str() == "</span>" {
                stack.pop();
                continue;
            }

            match caps.get(2) {
                Some(id) => {
                    segments.push(Segment::Occurrence {
                        id: decode_entities(id.as_str()),
                        class: caps.get(1).map(|c| decode_entities(c.as_str())),
                        text: String::new(),
                    });
                    stack.push(Some(segments.len() - 1));
                }
                None => stack.push(None),
            }
        }
        push_text(&mut segments, &stack, &clean[cursor..]);

        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn span_ids(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Occurrence { id, .. } => Some(id.as_str()),
            Segment::Text(_) => None,
        })
    }

    /// Text with all markup removed.
    pub fn plain_text(&self) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Text(text) | Segment::Occurrence { text, .. } => text.as_str(),
            })
            .collect()
    }
}

fn push_text(segments: &mut Vec<Segment>, stack: &[Option<usize>], raw: &str) {
    if raw.is_empty() {
        return;
    }
    let text = decode_entities(raw);
    if let Some(index) = stack.iter().rev().find_map(|entry| *entry) {
        if let Some(Segment::Occurrence { text: inner, .. }) = segments.get_mut(index) {
            inner.push_str(&text);
        }
        return;
    }
    if let Some(Segment::Text(previous)) = segments.last_mut() {
        previous.push_str(&text);
    } else {
        segments.push(Segment::Text(text));
    }
}

/// Occurrence id → highlighted, for every occurrence of a session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HighlightTable {
    entries: BTreeMap<String, bool>,
}

impl HighlightTable {
    pub fn from_groups(groups: &[UnitGroup]) -> Self {
        let entries = groups
            .iter()
            .flat_map(|group| group.units.iter())
            .map(|unit| (unit.id.clone(), false))
            .collect();
        Self { entries }
    }

    pub fn is_highlighted(&self, id: &str) -> bool {
        self.entries.get(id).copied().unwrap_or(false)
    }

    /// Highlight exactly the occurrences that currently have a target.
    pub fn sync_from(&mut self, selection: &SelectionState) {
        for (id, highlighted) in self.entries.iter_mut() {
            *highlighted = selection.occurrence_choice(id).is_some();
        }
    }

    pub fn highlighted(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, highlighted)| **highlighted)
            .map(|(id, _)| id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CoverageReport {
    /// Occurrences without a span
    pub missing: Vec<String>,
    /// Occurrences addressed by more than one span
    pub duplicated: Vec<String>,
    /// Spans naming no known occurrence
    pub unknown: Vec<String>,
}

impl CoverageReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.duplicated.is_empty()
    }
}

/// Check that every occurrence id has exactly one span in the annotation.
pub fn check_annotation_coverage(groups: &[UnitGroup], annotated: &AnnotatedRecipe) -> CoverageReport {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for id in annotated.span_ids() {
        *counts.entry(id).or_default() += 1;
    }

    let mut report = CoverageReport::default();
    for unit in groups.iter().flat_map(|group| group.units.iter()) {
        match counts.remove(unit.id.as_str()) {
            None => report.missing.push(unit.id.clone()),
            Some(1) => {}
            Some(_) => report.duplicated.push(unit.id.clone()),
        }
    }
    report.unknown = counts.into_keys().map(str::to_string).collect();
    report
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emphasis {
    /// `[2 cups]`
    Brackets,
    /// ANSI bold + underline
    Ansi,
}

/// Render the annotation as terminal text, emphasising highlighted spans.
pub fn render_plain(annotated: &AnnotatedRecipe, table: &HighlightTable, emphasis: Emphasis) -> String {
    let mut out = String::new();
    for segment in annotated.segments() {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Occurrence { id, text, .. } if table.is_highlighted(id) => match emphasis {
                Emphasis::Brackets => {
                    out.push('[');
                    out.push_str(text);
                    out.push(']');
                }
                Emphasis::Ansi => {
                    out.push_str("\x1b[1;4m");
                    out.push_str(text);
                    out.push_str("\x1b[0m");
                }
            },
            Segment::Occurrence { text, .. } => out.push_str(text),
        }
    }
    out
}
