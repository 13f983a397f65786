use log::Level;
use std::fmt;

/// Destination for the diagnostics emitted while counting.
///
/// The walker and the file counter receive a sink when they are built, so
/// turning logging on or off never touches global state.
pub trait LogSink: Send + Sync {
    fn log(&self, level: Level, args: fmt::Arguments<'_>);
}

/// Drops every message. Default for [`crate::walker::Walker`].
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl LogSink for NoopSink {
    fn log(&self, _level: Level, _args: fmt::Arguments<'_>) {}
}

/// Forwards messages to the `log` facade, so whatever logger the binary
/// installed (e.g. `simplelog`) receives them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFacade;

pub const LOG_TARGET: &str = "loctree";

impl LogSink for LogFacade {
    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        log::log!(target: LOG_TARGET, level, "{args}");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::LogSink;
    use log::Level;
    use std::fmt;
    use std::sync::Mutex;

    /// Keeps every message in memory so tests can assert on what was logged.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub(crate) records: Mutex<Vec<(Level, String)>>,
    }

    impl RecordingSink {
        pub(crate) fn contains(&self, level: Level, needle: &str) -> bool {
            self.records
                .lock()
                .unwrap()
                .iter()
                .any(|(l, msg)| *l == level && msg.contains(needle))
        }
    }

    impl LogSink for RecordingSink {
        fn log(&self, level: Level, args: fmt::Arguments<'_>) {
            self.records.lock().unwrap().push((level, args.to_string()));
        }
    }

    #[test]
    fn recording_sink_keeps_messages() {
        let sink = RecordingSink::default();
        sink.log(Level::Error, format_args!("cannot stat {}", "/nope"));
        assert!(sink.contains(Level::Error, "/nope"));
        assert!(!sink.contains(Level::Info, "/nope"));
    }

    #[test]
    fn noop_sink_accepts_anything() {
        super::NoopSink.log(Level::Trace, format_args!("{}", 42));
    }
}
