use crate::api::error::ClientError;
use std::fs::OpenOptions;
use std::io::{IsTerminal, Write};

const DEFAULT_LOG_PATH: &str = "/tmp/attache-debug.log";
const DEBUG_LOG_ENV: &str = "ATTACHE_DEBUG_LOG";
const LOG_PATH_ENV: &str = "ATTACHE_LOG_PATH";

pub fn debug_log_enabled() -> bool {
    std::env::var(DEBUG_LOG_ENV)
        .ok()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Request trace line, emitted only when debug logging is enabled.
pub fn emit_debug_request(method: &str, url: &str) {
    if !debug_log_enabled() {
        return;
    }
    emit_log_message(&format!("ATTACHE DEBUG request {method} {url}\n"));
}

/// Poll failures are expected under flaky connectivity; they are recorded
/// for diagnostics and the timer keeps running.
pub fn emit_poll_failure(error: &ClientError) {
    emit_log_message(&format!(
        "ATTACHE POLL fetch_history_failed status={} error={error}\n",
        error.status()
    ));
}

/// A payload that failed to parse degrades to the empty payload for the
/// caller; the raw text lands here so the degradation is observable.
pub fn emit_malformed_payload(payload: &str, reason: &str) {
    emit_log_message(&format!(
        "ATTACHE ERROR malformed_payload reason={reason}\npayload:\n{payload}\n"
    ));
}

fn emit_log_message(message: &str) {
    if let Some(path) = resolve_log_path() {
        if append_log_file(&path, message).is_ok() {
            return;
        }
    }

    eprintln!("{message}");
}

fn resolve_log_path() -> Option<String> {
    std::env::var(LOG_PATH_ENV)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            if std::io::stderr().is_terminal() {
                Some(DEFAULT_LOG_PATH.to_string())
            } else {
                None
            }
        })
}

fn append_log_file(path: &str, message: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(message.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_log_enabled_accepts_true_variants() {
        let _env_lock = crate::test_support::ENV_LOCK.blocking_lock();
        std::env::set_var(DEBUG_LOG_ENV, "1");
        assert!(debug_log_enabled());
        std::env::set_var(DEBUG_LOG_ENV, "TRUE");
        assert!(debug_log_enabled());
        std::env::set_var(DEBUG_LOG_ENV, "0");
        assert!(!debug_log_enabled());
        std::env::remove_var(DEBUG_LOG_ENV);
    }

    #[test]
    fn test_resolve_log_path_prefers_env_override() {
        let _env_lock = crate::test_support::ENV_LOCK.blocking_lock();
        std::env::set_var(LOG_PATH_ENV, "/tmp/test-attache.log");
        assert_eq!(resolve_log_path().as_deref(), Some("/tmp/test-attache.log"));
        std::env::remove_var(LOG_PATH_ENV);
    }
}
