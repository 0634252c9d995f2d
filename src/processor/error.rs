//! Processor Error Types

/// Construction parameters rejected by the processor.
///
/// Operational failures (full queue, missing key, duplicate subscription)
/// are normal flow signals reported through return values, not errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("queue capacity must be greater than zero")]
    ZeroQueueCapacity,
}

/// Result type for processor configuration.
pub type ConfigResult<T> = Result<T, ConfigError>;
