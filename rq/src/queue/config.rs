//! Queue configuration

use serde::{Deserialize, Serialize};

use super::messages::QueueError;

/// Queue configuration, fixed at construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Max operations running at the same time
    #[serde(rename = "concurrency-limit", default = "default_concurrency_limit")]
    pub concurrency_limit: usize,

    /// Extra attempts after a failed one; 0 disables retry
    #[serde(rename = "max-retry-times", default)]
    pub max_retry_times: u32,

    /// Capacity of the actor's command mailbox
    #[serde(rename = "channel-buffer", default = "default_channel_buffer")]
    pub channel_buffer: usize,
}

fn default_concurrency_limit() -> usize {
    5
}

fn default_channel_buffer() -> usize {
    256
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: default_concurrency_limit(),
            max_retry_times: 0,
            channel_buffer: default_channel_buffer(),
        }
    }
}

impl QueueConfig {
    /// Reject configurations the actor cannot run with
    pub fn validate(&self) -> Result<(), QueueError> {
        if self.concurrency_limit == 0 {
            return Err(QueueError::InvalidConfig(
                "concurrency-limit must be at least 1".to_string(),
            ));
        }
        if self.channel_buffer == 0 {
            return Err(QueueError::InvalidConfig("channel-buffer must be at least 1".to_string()));
        }
        Ok(())
    }
}
