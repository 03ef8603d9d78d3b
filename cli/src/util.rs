use std::io::Read;
use std::path::PathBuf;

use cmr_core::error::{FlowError, ServiceError};
use cmr_core::guard::GuardDecision;
use cmr_core::notice::{Notice, NoticeKind};
use serde_json::json;

/// Exit codes: 0=success (including informational outcomes), 1=user error,
///             2=service or storage error, 3=connection error, 4=usage error
pub mod exit {
    pub const OK: i32 = 0;
    pub const USER: i32 = 1;
    pub const SERVICE: i32 = 2;
    pub const CONNECTION: i32 = 3;
    pub const USAGE: i32 = 4;
}

pub fn exit_error(message: &str, docs_hint: Option<&str>) -> ! {
    let mut err = json!({
        "error": "cli_error",
        "message": message
    });
    if let Some(hint) = docs_hint {
        err["docs_hint"] = json!(hint);
    }
    eprintln!("{}", pretty(&err));
    std::process::exit(exit::USAGE);
}

pub fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

pub fn state_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("convert-my-recipe")
        .join("state.json")
}

/// Print a notice: informational and success notices on stdout, errors on stderr.
pub fn print_notice(notice: &Notice) {
    let body = json!({ "notice": notice });
    match notice.kind {
        NoticeKind::Error => eprintln!("{}", pretty(&body)),
        NoticeKind::Info | NoticeKind::Success => println!("{}", pretty(&body)),
    }
}

/// Report a flow failure as a notice plus machine code and return the exit code.
pub fn report_flow_error(err: &FlowError) -> i32 {
    let notice = Notice::from(err);
    let body = json!({
        "error": err.code(),
        "notice": notice,
    });
    eprintln!("{}", pretty(&body));
    flow_exit_code(err)
}

pub fn flow_exit_code(err: &FlowError) -> i32 {
    match err {
        FlowError::Validation { .. } | FlowError::NoSession => exit::USER,
        FlowError::Service(ServiceError::Transport(_)) => exit::CONNECTION,
        FlowError::Service(_) | FlowError::Store(_) => exit::SERVICE,
    }
}

/// Report a blocked navigation. Returns `None` when the route may be entered.
pub fn report_blocked(decision: GuardDecision) -> Option<i32> {
    let GuardDecision::Blocked { redirect_to, from } = decision else {
        return None;
    };
    let body = json!({
        "error": "navigation_blocked",
        "from": from.path(),
        "redirect_to": redirect_to.path(),
        "notice": Notice::session_missing(),
        "docs_hint": "Run `cmr parse` with your recipe first."
    });
    eprintln!("{}", pretty(&body));
    Some(exit::USER)
}

/// Parse a repeatable `KEY=VALUE` flag.
pub fn parse_assignment(input: &str) -> Result<(String, String), String> {
    match input.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("Invalid assignment: '{input}'")),
    }
}

/// Read text from a file path or stdin (when path is "-").
pub fn read_text_from_file(path: &str) -> Result<String, String> {
    if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| format!("Failed to read stdin: {e}"))?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path).map_err(|e| format!("Failed to read file '{path}': {e}"))
    }
}

#[cfg(test)]
mod tests {
    use cmr_core::error::StoreError;

    use super::*;

    #[test]
    fn test_assignment_parsing() {
        assert_eq!(
            parse_assignment("volume=milliliter").unwrap(),
            ("volume".to_string(), "milliliter".to_string())
        );
        assert_eq!(
            parse_assignment(" u1 = liter ").unwrap(),
            ("u1".to_string(), "liter".to_string())
        );
        assert_eq!(
            parse_assignment("u1=").unwrap(),
            ("u1".to_string(), String::new())
        );
        assert!(parse_assignment("volume").is_err());
        assert!(parse_assignment("=liter").is_err());
    }

    #[test]
    fn test_flow_exit_codes() {
        let validation = FlowError::Validation {
            field: "recipe",
            message: "Please insert your recipe.".to_string(),
        };
        assert_eq!(flow_exit_code(&validation), exit::USER);
        assert_eq!(
            flow_exit_code(&FlowError::Service(ServiceError::Transport("refused".into()))),
            exit::CONNECTION
        );
        assert_eq!(
            flow_exit_code(&FlowError::Service(ServiceError::Status {
                status: 503,
                body: None
            })),
            exit::SERVICE
        );
        let store = FlowError::Store(StoreError::Io {
            path: PathBuf::from("/nope"),
            source: std::io::Error::other("disk full"),
        });
        assert_eq!(flow_exit_code(&store), exit::SERVICE);
    }

    #[test]
    fn test_state_path_is_namespaced() {
        let path = state_path();
        assert!(path.ends_with("convert-my-recipe/state.json"));
    }
}
