//! Sequential action execution against a live page handle (spec.md §4.1
//! "Action execution").

use std::time::{Duration, Instant};

use tracing::warn;
use webpeel_types::fetch::{DEFAULT_ACTION_TIMEOUT_MS, DEFAULT_WAIT_MS, TOTAL_ACTION_BUDGET_MS};
use webpeel_types::{FetchAction, FetchActionType};

use crate::browser::PageHandle;
use crate::errors::FetchError;

fn action_label(action_type: FetchActionType) -> &'static str {
    match action_type {
        FetchActionType::Click => "click",
        FetchActionType::Wait => "wait",
        FetchActionType::Type => "type",
        FetchActionType::Fill => "fill",
        FetchActionType::Press => "press",
        FetchActionType::Scroll => "scroll",
        FetchActionType::Select => "select",
        FetchActionType::Hover => "hover",
        FetchActionType::WaitForSelector => "waitForSelector",
        FetchActionType::Screenshot => "screenshot",
    }
}

fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// Build the in-page JS for an action. Real DOM interaction types use
/// `document.querySelector`; this mirrors how `PageHandle::evaluate` is the
/// only primitive every engine backend exposes.
fn build_script(action: &FetchAction) -> Option<String> {
    let selector = action.selector.as_deref().unwrap_or("");
    match action.action_type {
        FetchActionType::Click => Some(format!(
            "document.querySelector({sel})?.click()",
            sel = js_string(selector)
        )),
        FetchActionType::Type | FetchActionType::Fill => {
            let value = action.value.clone().unwrap_or_default();
            Some(format!(
                "(() => {{ const el = document.querySelector({sel}); if (el) {{ el.value = {val}; el.dispatchEvent(new Event('input', {{bubbles:true}})); }} }})()",
                sel = js_string(selector),
                val = js_string(&value),
            ))
        }
        FetchActionType::Select => {
            let value = action.value.clone().unwrap_or_default();
            Some(format!(
                "(() => {{ const el = document.querySelector({sel}); if (el) {{ el.value = {val}; el.dispatchEvent(new Event('change', {{bubbles:true}})); }} }})()",
                sel = js_string(selector),
                val = js_string(&value),
            ))
        }
        FetchActionType::Hover => Some(format!(
            "document.querySelector({sel})?.dispatchEvent(new MouseEvent('mouseover', {{bubbles:true}}))",
            sel = js_string(selector)
        )),
        FetchActionType::Scroll => {
            let amount = action.amount.unwrap_or(800);
            let (dx, dy) = match action.direction.as_deref() {
                Some("up") => (0, -(amount as i64)),
                Some("left") => (-(amount as i64), 0),
                Some("right") => (amount as i64, 0),
                Some("bottom") => (0, i64::MAX),
                _ => (0, amount as i64),
            };
            if dy == i64::MAX {
                Some("window.scrollTo(0, document.body.scrollHeight)".to_string())
            } else {
                Some(format!("window.scrollBy({dx}, {dy})"))
            }
        }
        FetchActionType::Press => None,
        FetchActionType::Wait | FetchActionType::WaitForSelector | FetchActionType::Screenshot => None,
    }
}

/// Run `actions` in order against `page`, honoring per-action timeouts and
/// the overall action budget. A failed action is fatal unless it carries its
/// own `timeout`, in which case elapsing without completing is tolerated.
pub async fn run_actions(page: &dyn PageHandle, actions: &[FetchAction]) -> Result<(), FetchError> {
    let budget_deadline = Instant::now() + Duration::from_millis(TOTAL_ACTION_BUDGET_MS);

    for (index, action) in actions.iter().enumerate() {
        if Instant::now() >= budget_deadline {
            warn!(index, "action budget exhausted, stopping action sequence");
            break;
        }

        let per_action_timeout = Duration::from_millis(action.timeout.unwrap_or(DEFAULT_ACTION_TIMEOUT_MS));
        let result = tokio::time::timeout(per_action_timeout, execute_one(page, action)).await;

        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                if action.timeout.is_some() {
                    warn!(index, error = %e, "action failed but has its own timeout override, continuing");
                } else {
                    return Err(FetchError::ActionFailed {
                        index,
                        action_type: action_label(action.action_type).to_string(),
                        message: e.to_string(),
                    });
                }
            }
            Err(_) => {
                if action.timeout.is_none() {
                    return Err(FetchError::ActionFailed {
                        index,
                        action_type: action_label(action.action_type).to_string(),
                        message: "timed out".to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}

async fn execute_one(page: &dyn PageHandle, action: &FetchAction) -> Result<(), FetchError> {
    match action.action_type {
        FetchActionType::Wait => {
            tokio::time::sleep(Duration::from_millis(action.ms.unwrap_or(DEFAULT_WAIT_MS))).await;
            Ok(())
        }
        FetchActionType::WaitForSelector => {
            let selector = action.selector.clone().unwrap_or_default();
            let script = format!(
                "document.querySelector({sel}) !== null",
                sel = js_string(&selector)
            );
            loop {
                if let Ok(serde_json::Value::Bool(true)) = page.evaluate(&script).await {
                    return Ok(());
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
        FetchActionType::Screenshot => {
            page.screenshot().await?;
            Ok(())
        }
        FetchActionType::Press => {
            let key = action.key.clone().unwrap_or_default();
            let script = format!(
                "document.dispatchEvent(new KeyboardEvent('keydown', {{key: {k}}}))",
                k = js_string(&key)
            );
            page.evaluate(&script).await.map(|_| ())
        }
        _ => {
            let Some(script) = build_script(action) else {
                return Ok(());
            };
            page.evaluate(&script).await.map(|_| ())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_script_targets_selector() {
        let action = FetchAction {
            action_type: FetchActionType::Click,
            selector: Some("#submit".to_string()),
            value: None,
            ms: None,
            key: None,
            direction: None,
            amount: None,
            timeout: None,
        };
        let script = build_script(&action).unwrap();
        assert!(script.contains("#submit"));
        assert!(script.contains("click()"));
    }

    #[test]
    fn scroll_bottom_uses_body_scroll_height() {
        let action = FetchAction {
            action_type: FetchActionType::Scroll,
            selector: None,
            value: None,
            ms: None,
            key: None,
            direction: Some("bottom".to_string()),
            amount: None,
            timeout: None,
        };
        let script = build_script(&action).unwrap();
        assert!(script.contains("scrollHeight"));
    }
}
