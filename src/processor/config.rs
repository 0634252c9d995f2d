//! Processor construction parameters

use crate::processor::error::{ConfigError, ConfigResult};

/// Default per-queue capacity when none is configured.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Construction-time tuning knobs for a processor.
///
/// A value of `0` for `worker_threads` or `bucket_count` selects the number
/// of concurrent threads supported by the platform.
///
/// # Example
///
/// ```
/// use qmux::processor::{Processor, ProcessorConfig};
///
/// let config = ProcessorConfig {
///     worker_threads: 2,
///     queue_capacity: 64,
///     ..ProcessorConfig::default()
/// };
/// let processor: Processor<String, String> =
///     Processor::with_config(config).expect("valid configuration");
/// ```
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Upper bound on worker threads; the pool is sized down to the number
    /// of subscribed consumers on start.
    pub worker_threads: usize,
    /// Capacity of every per-key queue. Must be greater than zero.
    pub queue_capacity: usize,
    /// Bucket count of the queue registry. Fixed for the processor's
    /// lifetime.
    pub bucket_count: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            bucket_count: 0,
        }
    }
}

impl ProcessorConfig {
    /// Reject parameter combinations the processor cannot honor.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(ProcessorConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_queue_capacity_is_rejected() {
        let config = ProcessorConfig {
            queue_capacity: 0,
            ..ProcessorConfig::default()
        };

        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroQueueCapacity)
        ));
    }

    #[test]
    fn zero_thread_and_bucket_counts_are_valid_auto_values() {
        let config = ProcessorConfig {
            worker_threads: 0,
            bucket_count: 0,
            ..ProcessorConfig::default()
        };

        assert!(config.validate().is_ok());
    }
}
