use std::time::Duration;

pub const DEFAULT_CURRENCY: &str = "usd";
pub const DEFAULT_CHANNEL: &str = "ecom";
pub const DEFAULT_CHARGE_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RESULT_CAPACITY: usize = 64;

/// Settings shared by every payment attempt in a workflow context.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowConfig {
    /// ISO currency code sent with each charge.
    pub currency: String,
    /// Capture channel tag for token-based web capture.
    pub channel: String,
    /// Upper bound on a single charge call.
    pub charge_timeout: Duration,
    /// Buffered results per subscriber before it starts lagging.
    pub result_capacity: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            currency: DEFAULT_CURRENCY.to_string(),
            channel: DEFAULT_CHANNEL.to_string(),
            charge_timeout: DEFAULT_CHARGE_TIMEOUT,
            result_capacity: DEFAULT_RESULT_CAPACITY,
        }
    }
}

impl WorkflowConfig {
    pub fn with_charge_timeout(mut self, timeout: Duration) -> Self {
        self.charge_timeout = timeout;
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into().to_lowercase();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkflowConfig::default();
        assert_eq!(config.currency, "usd");
        assert_eq!(config.channel, "ecom");
        assert_eq!(config.charge_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_currency_is_normalized() {
        let config = WorkflowConfig::default().with_currency("EUR");
        assert_eq!(config.currency, "eur");
    }
}
