/// Records a message through a [`Logger`](crate::Logger) at the given level.
///
/// Arguments are converted with [`ToValue`](crate::value::ToValue), and only
/// once the level has passed both [`STATIC_MAX_LEVEL`] and the logger's
/// memory level. A disabled call evaluates none of its arguments.
///
/// ```rust
/// use blocklog::{config, level::Level, log, NoopFlusher};
///
/// let registry = config().flusher(NoopFlusher).build();
/// let logger = registry.root();
/// logger.add_format("conn", "connected to ${0:s} in ${1:n}ms").unwrap();
///
/// log!(logger, Level::Info, "conn", "db-1", 12);
/// ```
///
/// [`STATIC_MAX_LEVEL`]: crate::level::STATIC_MAX_LEVEL
#[macro_export]
macro_rules! log {
    ($logger:expr, $lvl:expr, $format:expr $(, $arg:expr)* $(,)?) => {{
        let level: $crate::level::Level = $lvl;
        if level.is_enabled_under($crate::level::STATIC_MAX_LEVEL) {
            let logger: &$crate::Logger = &$logger;
            if logger.is_enabled(level) {
                logger.log(
                    level,
                    $format,
                    &[$($crate::value::ToValue::to_value(&$arg)),*],
                );
            }
        }
    }};
}

/// Records a message at [`Level::Fatal`](crate::level::Level::Fatal), see
/// [`log!`].
#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($rest:tt)+) => {
        $crate::log!($logger, $crate::level::Level::Fatal, $($rest)+)
    };
}

/// Records a message at [`Level::Error`](crate::level::Level::Error), see
/// [`log!`].
#[macro_export]
macro_rules! error {
    ($logger:expr, $($rest:tt)+) => {
        $crate::log!($logger, $crate::level::Level::Error, $($rest)+)
    };
}

/// Records a message at [`Level::Warn`](crate::level::Level::Warn), see
/// [`log!`].
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($rest:tt)+) => {
        $crate::log!($logger, $crate::level::Level::Warn, $($rest)+)
    };
}

/// Records a message at [`Level::Info`](crate::level::Level::Info), see
/// [`log!`].
#[macro_export]
macro_rules! info {
    ($logger:expr, $($rest:tt)+) => {
        $crate::log!($logger, $crate::level::Level::Info, $($rest)+)
    };
}

/// Records a message at [`Level::Debug`](crate::level::Level::Debug), see
/// [`log!`].
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($rest:tt)+) => {
        $crate::log!($logger, $crate::level::Level::Debug, $($rest)+)
    };
}

/// Records a message at [`Level::Trace`](crate::level::Level::Trace), see
/// [`log!`].
#[macro_export]
macro_rules! trace {
    ($logger:expr, $($rest:tt)+) => {
        $crate::log!($logger, $crate::level::Level::Trace, $($rest)+)
    };
}
