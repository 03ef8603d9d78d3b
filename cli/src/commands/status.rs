use cmr_core::annotation::AnnotatedRecipe;
use cmr_core::guard::{self, Route};
use cmr_core::session::SessionStore;
use cmr_core::store::FileStore;
use serde_json::json;

use crate::util::{exit, pretty};

/// Which views the guard lets in right now, plus what is stored.
pub fn run(sessions: &mut SessionStore<FileStore>) -> i32 {
    let routes: Vec<_> = [Route::Entry, Route::Selection, Route::Result]
        .into_iter()
        .map(|route| {
            json!({
                "path": route.path(),
                "protected": route.is_protected(),
                "allowed": guard::check(route, sessions).is_allowed()
            })
        })
        .collect();

    let session = sessions.load();
    let preview = session
        .as_ref()
        .and_then(|s| s.annotated_html.as_deref())
        .map(|html| AnnotatedRecipe::parse(html).plain_text());
    let output = json!({
        "state_file": sessions.store().path().to_string_lossy(),
        "routes": routes,
        "draft": sessions.stored_raw_text().is_some(),
        "session_created_at": session.as_ref().map(|s| s.created_at.to_rfc3339()),
        "occurrences": session.as_ref().map(|s| s.occurrence_ids().count()),
        "recipe": preview,
    });
    println!("{}", pretty(&output));
    exit::OK
}
