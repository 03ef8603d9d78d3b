use cmr_core::session::SessionStore;
use cmr_core::store::FileStore;
use serde_json::json;

use crate::util::{exit, pretty};

pub fn run(sessions: &mut SessionStore<FileStore>) -> i32 {
    match sessions.restart() {
        Ok(()) => {
            let output = json!({
                "status": "restarted",
                "state_file": sessions.store().path().to_string_lossy()
            });
            println!("{}", pretty(&output));
            exit::OK
        }
        Err(err) => {
            let output = json!({
                "error": cmr_core::error::codes::STORAGE_ERROR,
                "message": err.to_string()
            });
            eprintln!("{}", pretty(&output));
            exit::SERVICE
        }
    }
}
