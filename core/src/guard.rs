use crate::clock::Clock;
use crate::session::SessionStore;
use crate::store::KeyValueStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Submit recipe text
    Entry,
    /// Choose target units
    Selection,
    /// Converted recipe
    Result,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Entry => "/",
            Route::Selection => "/recipe",
            Route::Result => "/recipe/converted",
        }
    }

    /// Protected routes need stored state before they can be entered.
    pub fn is_protected(self) -> bool {
        !matches!(self, Route::Entry)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allowed,
    /// Sent back to `redirect_to`, remembering where the user was headed.
    Blocked { redirect_to: Route, from: Route },
}

impl GuardDecision {
    pub fn is_allowed(self) -> bool {
        matches!(self, GuardDecision::Allowed)
    }
}

/// Decide whether `route` may be entered right now.
///
/// Re-derived from the session store on every call. The selection view needs
/// a live parsed session, the result view a live converted recipe.
pub fn check<S: KeyValueStore, C: Clock>(route: Route, sessions: &mut SessionStore<S, C>) -> GuardDecision {
    if !route.is_protected() {
        return GuardDecision::Allowed;
    }
    let allowed = match route {
        Route::Entry => true,
        Route::Selection => sessions
            .load()
            .is_some_and(|session| session.annotated_html.is_some()),
        Route::Result => sessions.load_final_recipe().is_some(),
    };

    if allowed {
        GuardDecision::Allowed
    } else {
        tracing::debug!(route = route.path(), "Navigation blocked");
        GuardDecision::Blocked {
            redirect_to: Route::Entry,
            from: route,
        }
    }
}
