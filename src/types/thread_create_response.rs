use serde::{Deserialize, Serialize};

use crate::types::ThreadId;

/// Body returned by `POST /thread/create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadCreateResponse {
    /// The id of the new thread.
    #[serde(rename = "threadId")]
    pub thread_id: ThreadId,
}
