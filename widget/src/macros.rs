//! Custom macros for reducing code repetition in the widget

/// Validate an enum-like string value
///
/// Expands to a `Result` expression, so use it as the tail of a function
/// returning `anyhow::Result<()>`.
///
/// # Example
/// ```ignore
/// fn validate_log_level(level: &str) -> anyhow::Result<()> {
///     validate_enum!(level, "trace", "debug", "info", "warn", "error")
/// }
/// ```
#[macro_export]
macro_rules! validate_enum {
    ($value:expr, $($variant:expr),+) => {
        match $value {
            $($variant)|+ => Ok(()),
            _ => anyhow::bail!("Invalid value: {} (expected one of: {})", $value, [$($variant),+].join(", ")),
        }
    };
}
