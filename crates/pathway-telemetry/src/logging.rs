//! Structured logging helpers.
//!
//! Every pathway event carries the same fields so JSON logs can be filtered
//! by pathway:
//! - `command`: CLI command or service operation
//! - `pathway`: `from->to` key
//! - additional context fields

/// Log an event with a command label.
#[macro_export]
macro_rules! log_event {
    (info, $command:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::info!(
            command = $command,
            $($($field)*,)?
            $msg
        )
    };

    (warn, $command:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::warn!(
            command = $command,
            $($($field)*,)?
            $msg
        )
    };

    (error, $command:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::error!(
            command = $command,
            $($($field)*,)?
            $msg
        )
    };

    (debug, $command:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::debug!(
            command = $command,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a pathway-related event with standard fields.
#[macro_export]
macro_rules! log_pathway_event {
    ($level:ident, $command:expr, $msg:expr, $pathway:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            command = $command,
            pathway = %$pathway,
            $($($field)*,)?
            $msg
        )
    };
}
