//! System clipboard access for `cmr result --copy` and `cmr parse --paste`.

use std::time::Duration;

use cmr_core::notice::Notice;

/// Put `text` on the system clipboard.
///
/// On Linux the clipboard contents live in the process that set them, so this
/// blocks serving them until another client takes ownership or `hold` runs
/// out. Paste from another window within that time.
pub fn write_text(text: &str, hold: Duration) -> Result<(), arboard::Error> {
    let mut clipboard = arboard::Clipboard::new()?;

    #[cfg(target_os = "linux")]
    {
        use arboard::SetExtLinux;
        clipboard
            .set()
            .wait_until(std::time::Instant::now() + hold)
            .text(text.to_string())
    }

    #[cfg(not(target_os = "linux"))]
    {
        let _ = hold;
        clipboard.set_text(text.to_string())
    }
}

pub fn read_text() -> Result<String, arboard::Error> {
    arboard::Clipboard::new()?.get_text()
}

pub fn copy_notice(result: &Result<(), arboard::Error>) -> Notice {
    match result {
        Ok(()) => Notice::copied(),
        Err(err) => {
            tracing::warn!(error = %err, "Clipboard write failed");
            Notice::copy_failed()
        }
    }
}
