use std::time::Duration;

use crate::config::Config;

/// 轮询策略：固定间隔，有总时长上限
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_duration: Duration,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_duration: Duration) -> Self {
        Self {
            interval,
            max_duration,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.poll_interval(), config.max_poll_duration())
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
