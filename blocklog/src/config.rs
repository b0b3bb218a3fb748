//! Builder for a [`LoggerRegistry`](crate::LoggerRegistry).
//!
//! ```rust
//! use blocklog::{config, level::Level, StringFlusher};
//!
//! let registry = config()
//!     .app_name("billing")
//!     .write_level(Level::Error)
//!     .flusher(StringFlusher::new())
//!     .drain_threshold(256)
//!     .build();
//!
//! assert!(registry.root().is_enabled(Level::Info));
//! ```

use blocklog_flush::Flush;

use crate::{
    context::{Clock, SystemClock},
    emit::{BufferedWriter, Layout, Writer, DEFAULT_DRAIN_THRESHOLD},
    level::Level,
    LoggerRegistry,
};

/// Environment variable overriding the memory level in [`Config::from_env`].
pub const MEMORY_LEVEL_ENV: &str = "BLOCKLOG_MEMORY_LEVEL";
/// Environment variable overriding the write level in [`Config::from_env`].
pub const WRITE_LEVEL_ENV: &str = "BLOCKLOG_WRITE_LEVEL";

pub(crate) enum Output {
    Stdout,
    Flusher(Box<dyn Flush>),
    Writer(Box<dyn Writer>),
}

/// Settings a [`LoggerRegistry`] is built from.
///
/// Created through [`config()`]; every setter consumes and returns the
/// builder.
pub struct Config {
    pub(crate) app_name: String,
    pub(crate) ip_addr: String,
    pub(crate) memory_level: Level,
    pub(crate) write_level: Level,
    pub(crate) output: Output,
    pub(crate) drain_threshold: usize,
    pub(crate) clock: Box<dyn Clock>,
    pub(crate) layout: Layout,
}

impl Config {
    /// Name of the application, also the name of the root logger.
    pub fn app_name(self, app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            ..self
        }
    }

    /// Address reported by `#ip_addr`.
    pub fn ip_addr(self, ip_addr: impl Into<String>) -> Self {
        Self {
            ip_addr: ip_addr.into(),
            ..self
        }
    }

    /// Default level messages are recorded in memory at.
    pub fn memory_level(self, memory_level: Level) -> Self {
        Self {
            memory_level,
            ..self
        }
    }

    /// Level messages must pass to be rendered on flush.
    pub fn write_level(self, write_level: Level) -> Self {
        Self {
            write_level,
            ..self
        }
    }

    /// Renders into `writer`, replacing any flusher set before.
    pub fn writer(self, writer: impl Writer + 'static) -> Self {
        Self {
            output: Output::Writer(Box::new(writer)),
            ..self
        }
    }

    /// Renders into a [`BufferedWriter`] that hands its text to `flusher`.
    pub fn flusher(self, flusher: impl Flush + 'static) -> Self {
        Self {
            output: Output::Flusher(Box::new(flusher)),
            ..self
        }
    }

    /// Bytes the default writer buffers before draining. Ignored when a
    /// custom [`writer`](Config::writer) is set.
    pub fn drain_threshold(self, drain_threshold: usize) -> Self {
        Self {
            drain_threshold,
            ..self
        }
    }

    pub fn clock(self, clock: impl Clock + 'static) -> Self {
        Self {
            clock: Box::new(clock),
            ..self
        }
    }

    pub fn layout(self, layout: Layout) -> Self {
        Self { layout, ..self }
    }

    /// Applies level overrides from [`MEMORY_LEVEL_ENV`] and
    /// [`WRITE_LEVEL_ENV`]. Unset variables are ignored, unparseable ones
    /// keep the current value.
    pub fn from_env(self) -> Self {
        let memory_level = env_level(MEMORY_LEVEL_ENV).unwrap_or(self.memory_level);
        let write_level = env_level(WRITE_LEVEL_ENV).unwrap_or(self.write_level);
        Self {
            memory_level,
            write_level,
            ..self
        }
    }

    /// Memory level actually used: never narrower than the write level.
    pub fn effective_memory_level(&self) -> Level {
        self.memory_level.union(self.write_level)
    }

    pub fn build(self) -> LoggerRegistry {
        LoggerRegistry::new(self)
    }

    pub(crate) fn make_writer(output: Output, drain_threshold: usize) -> Box<dyn Writer> {
        match output {
            Output::Stdout => Box::new(BufferedWriter::with_threshold(
                blocklog_flush::stdout_flusher::StdoutFlusher,
                drain_threshold,
            )),
            Output::Flusher(flusher) => {
                Box::new(BufferedWriter::with_threshold(flusher, drain_threshold))
            }
            Output::Writer(writer) => writer,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            app_name: String::from("app"),
            ip_addr: String::from("127.0.0.1"),
            memory_level: Level::Info,
            write_level: Level::Warn,
            output: Output::Stdout,
            drain_threshold: DEFAULT_DRAIN_THRESHOLD,
            clock: Box::new(SystemClock::new()),
            layout: Layout::default(),
        }
    }
}

/// Returns the default [`Config`], to be customized further.
pub fn config() -> Config {
    Config::default()
}

fn env_level(var: &str) -> Option<Level> {
    let raw = std::env::var(var).ok()?;
    match raw.parse::<Level>() {
        Ok(level) => Some(level),
        Err(e) => {
            tracing::warn!(var, error = %e, "ignoring level override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = config();
        assert_eq!(c.memory_level, Level::Info);
        assert_eq!(c.write_level, Level::Warn);
        assert_eq!(c.drain_threshold, DEFAULT_DRAIN_THRESHOLD);
        assert!(matches!(c.output, Output::Stdout));
    }

    #[test]
    fn memory_level_covers_write_level() {
        let c = config()
            .memory_level(Level::Error)
            .write_level(Level::Debug);
        assert_eq!(c.effective_memory_level(), Level::Debug);

        let c = config().memory_level(Level::Trace).write_level(Level::Warn);
        assert_eq!(c.effective_memory_level(), Level::Trace);
    }

    #[test]
    fn env_overrides() {
        std::env::set_var(MEMORY_LEVEL_ENV, "debug");
        std::env::set_var(WRITE_LEVEL_ENV, "loud");
        let c = config().write_level(Level::Error).from_env();
        std::env::remove_var(MEMORY_LEVEL_ENV);
        std::env::remove_var(WRITE_LEVEL_ENV);

        assert_eq!(c.memory_level, Level::Debug);
        // unparseable, keeps the builder value
        assert_eq!(c.write_level, Level::Error);
    }

    #[test]
    fn later_output_wins() {
        let c = config()
            .writer(BufferedWriter::default())
            .flusher(blocklog_flush::noop_flusher::NoopFlusher);
        assert!(matches!(c.output, Output::Flusher(_)));
    }
}
