//! Scheduler configuration from TOML (`[scheduler]` section)

use crate::config::validation::{ConfigIssue, ConfigIssueCode, Severity};
use atelier_application::SchedulerParams;
use atelier_domain::FallbackKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Turn loop settings.
///
/// # Example
///
/// ```toml
/// [scheduler]
/// max_rounds = 30
/// max_reply_retries = 2
/// reply_timeout_secs = 90   # 0 disables the timeout
/// termination_markers = ["TERMINATE", "GOODBYE"]
/// default_fallback = "revert_to_human"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSchedulerConfig {
    pub max_rounds: usize,
    pub max_reply_retries: usize,
    pub reply_timeout_secs: u64,
    pub termination_markers: Vec<String>,
    pub default_fallback: String,
    /// Trailing entries shown to the hand-off condition judge
    pub condition_window: usize,
}

impl Default for FileSchedulerConfig {
    fn default() -> Self {
        let params = SchedulerParams::default();
        Self {
            max_rounds: params.max_rounds,
            max_reply_retries: params.max_reply_retries,
            reply_timeout_secs: params.reply_timeout.map(|t| t.as_secs()).unwrap_or(0),
            termination_markers: params.termination_markers,
            default_fallback: params.default_fallback.as_str().to_string(),
            condition_window: params.condition_window,
        }
    }
}

impl FileSchedulerConfig {
    /// Convert to [`SchedulerParams`], returning validation issues.
    ///
    /// Invalid values fall back to their defaults.
    pub fn to_scheduler_params(&self) -> (SchedulerParams, Vec<ConfigIssue>) {
        let defaults = SchedulerParams::default();
        let mut issues = Vec::new();

        let max_rounds = if self.max_rounds == 0 {
            issues.push(ConfigIssue::constraint(
                "scheduler.max_rounds",
                "scheduler.max_rounds must be at least 1, using the default",
            ));
            defaults.max_rounds
        } else {
            self.max_rounds
        };

        let condition_window = if self.condition_window == 0 {
            issues.push(ConfigIssue::constraint(
                "scheduler.condition_window",
                "scheduler.condition_window must be at least 1, using the default",
            ));
            defaults.condition_window
        } else {
            self.condition_window
        };

        let default_fallback = match self.default_fallback.parse::<FallbackKind>() {
            Ok(kind) => kind,
            Err(_) => {
                issues.push(ConfigIssue {
                    severity: Severity::Warning,
                    code: ConfigIssueCode::InvalidEnumValue {
                        field: "scheduler.default_fallback".to_string(),
                        value: self.default_fallback.clone(),
                        valid_values: [
                            FallbackKind::Terminate,
                            FallbackKind::RevertToHuman,
                            FallbackKind::Stay,
                        ]
                        .iter()
                        .map(|k| k.as_str().to_string())
                        .collect(),
                    },
                    message: format!(
                        "scheduler.default_fallback: unknown value '{}', falling back to '{}'",
                        self.default_fallback, defaults.default_fallback
                    ),
                });
                defaults.default_fallback
            }
        };

        let reply_timeout = (self.reply_timeout_secs > 0)
            .then(|| Duration::from_secs(self.reply_timeout_secs));

        let params = SchedulerParams::default()
            .with_max_rounds(max_rounds)
            .with_max_reply_retries(self.max_reply_retries)
            .with_reply_timeout(reply_timeout)
            .with_termination_markers(self.termination_markers.clone())
            .with_default_fallback(default_fallback)
            .with_condition_window(condition_window);
        (params, issues)
    }
}
