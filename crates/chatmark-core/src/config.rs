//! Session configuration.

use serde::{Deserialize, Serialize};

use crate::files::FILE_LIST_CAP;

/// Answer recorded when the assistant replies without a usable result.
pub const NO_RESULT_ANSWER: &str = "No relevant information found.";

/// What happens to an optimistic correctness edit the store rejects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrectnessPolicy {
    /// Keep the local value; client and store may diverge until the next load.
    #[default]
    Optimistic,
    /// Restore the previous local value unless a newer edit replaced it.
    Rollback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub file_cap: usize,
    pub correctness_policy: CorrectnessPolicy,
    pub no_result_answer: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            file_cap: FILE_LIST_CAP,
            correctness_policy: CorrectnessPolicy::default(),
            no_result_answer: NO_RESULT_ANSWER.to_string(),
        }
    }
}
