use std::time::Duration;

use cmr_core::guard::{self, Route};
use cmr_core::notice::NoticeKind;
use cmr_core::session::SessionStore;
use cmr_core::store::FileStore;

use crate::clipboard;
use crate::util::{exit, print_notice, report_blocked};

/// Result view. With `copy`, the text is also put on the clipboard and held
/// there for up to `copy_wait` (see [`clipboard::write_text`]).
pub fn run(sessions: &mut SessionStore<FileStore>, copy: bool, copy_wait: Duration) -> i32 {
    if let Some(code) = report_blocked(guard::check(Route::Result, sessions)) {
        return code;
    }
    let Some(final_recipe) = sessions.load_final_recipe() else {
        return report_blocked(guard::check(Route::Result, sessions)).unwrap_or(exit::USER);
    };

    println!("{}", final_recipe.text);

    if !copy {
        return exit::OK;
    }
    let notice = clipboard::copy_notice(&clipboard::write_text(&final_recipe.text, copy_wait));
    print_notice(&notice);
    match notice.kind {
        NoticeKind::Error => exit::USER,
        NoticeKind::Info | NoticeKind::Success => exit::OK,
    }
}
