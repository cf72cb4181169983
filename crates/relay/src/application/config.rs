use relay_core::SubscriptionTarget;
use std::time::Duration;

/// Configuration for the relay actor
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Target relayed until a client requests an override
    pub default_target: SubscriptionTarget,
    /// Minimum interval between two broadcasts
    pub min_interval: Duration,
    /// Outbound messages buffered per client before it is dropped
    pub client_queue_capacity: usize,
    /// Upper bound on opening an upstream session
    pub connect_timeout: Duration,
    /// Delay before restarting a faulted session
    pub reconnect_delay: Duration,
    /// Restart attempts after an upstream fault (0 disables restarts)
    pub max_reconnect_attempts: u32,
}

impl RelayConfig {
    pub fn new(default_target: SubscriptionTarget) -> Self {
        RelayConfig {
            default_target,
            min_interval: Duration::from_millis(500),
            client_queue_capacity: 64,
            connect_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(5),
            max_reconnect_attempts: 0,
        }
    }

    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    pub fn with_client_queue_capacity(mut self, capacity: usize) -> Self {
        self.client_queue_capacity = capacity.max(1);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_reconnect(mut self, delay: Duration, max_attempts: u32) -> Self {
        self.reconnect_delay = delay;
        self.max_reconnect_attempts = max_attempts;
        self
    }
}
