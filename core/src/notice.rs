use std::fmt;

use serde::Serialize;

use crate::error::FlowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Info,
    Success,
    Error,
}

/// User-facing notification; every flow outcome and error ends up as one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub description: String,
}

impl Notice {
    fn new(kind: NoticeKind, title: &str, description: &str) -> Self {
        Self {
            kind,
            title: title.to_string(),
            description: description.to_string(),
        }
    }

    pub fn no_units_found() -> Self {
        Self::new(
            NoticeKind::Info,
            "No units found",
            "No units were found in your recipe!",
        )
    }

    pub fn nothing_selected() -> Self {
        Self::new(
            NoticeKind::Info,
            "No option selected",
            "Please select one of the options to start the conversion!",
        )
    }

    pub fn internal_error() -> Self {
        Self::new(
            NoticeKind::Error,
            "Internal error",
            "An error has occurred. Please try again later",
        )
    }

    pub fn copied() -> Self {
        Self::new(
            NoticeKind::Success,
            "Copy to clipboard",
            "The recipe was copied to your clipboard",
        )
    }

    pub fn copy_failed() -> Self {
        Self::new(
            NoticeKind::Error,
            "Copy to clipboard",
            "Could not copy the recipe to your clipboard",
        )
    }

    pub fn paste_failed() -> Self {
        Self::new(
            NoticeKind::Error,
            "Paste from clipboard",
            "Could not read the recipe from your clipboard",
        )
    }

    pub fn session_missing() -> Self {
        Self::new(
            NoticeKind::Info,
            "Nothing to convert",
            "Submit a recipe first, or submit it again if it is older than 30 minutes",
        )
    }
}

impl From<&FlowError> for Notice {
    fn from(err: &FlowError) -> Self {
        match err {
            FlowError::Validation { message, .. } => Notice::new(NoticeKind::Error, "Invalid recipe", message),
            FlowError::NoSession => Notice::session_missing(),
            FlowError::Service(_) | FlowError::Store(_) => Notice::internal_error(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;

    #[test]
    fn service_failures_become_generic_retry_notice() {
        let err = FlowError::Service(ServiceError::Status {
            status: 502,
            body: Some("upstream".to_string()),
        });
        let notice = Notice::from(&err);
        assert_eq!(notice, Notice::internal_error());
        assert!(!notice.description.contains("upstream"));
    }

    #[test]
    fn validation_keeps_field_message() {
        let err = FlowError::Validation {
            field: "recipe",
            message: "Please insert your recipe.".to_string(),
        };
        let notice = Notice::from(&err);
        assert_eq!(notice.kind, NoticeKind::Error);
        assert_eq!(notice.description, "Please insert your recipe.");
    }

    #[test]
    fn copy_notices_are_distinct() {
        assert_ne!(Notice::copied(), Notice::copy_failed());
        assert_eq!(Notice::copied().kind, NoticeKind::Success);
        assert_eq!(Notice::copy_failed().to_string(), "Copy to clipboard: Could not copy the recipe to your clipboard");
        assert_eq!(Notice::paste_failed().kind, NoticeKind::Error);
    }
}
