use crossbeam::channel::{Receiver, Sender, unbounded};
use log::{Level, LevelFilter, Metadata, Record};

/// A single captured log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    pub level: Level,
    pub target: String,
    pub message: String,
}

/// A `log::Log` implementation that forwards records over a channel.
pub struct ChannelLogger {
    sender: Sender<LogMessage>,
    max_level: LevelFilter,
}

impl log::Log for ChannelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            // A dropped receiver just means nobody is listening anymore.
            let _ = self.sender.try_send(LogMessage {
                level: record.metadata().level(),
                target: record.target().to_string(),
                message: format!("{}", record.args()),
            });
        }
    }

    fn flush(&self) {}
}

impl ChannelLogger {
    pub fn new(sender: Sender<LogMessage>) -> Self {
        Self {
            sender,
            max_level: LevelFilter::Info,
        }
    }

    pub fn with_receiver() -> (Self, Receiver<LogMessage>) {
        let (sender, receiver) = unbounded();
        (Self::new(sender), receiver)
    }

    /// Change the most verbose level this logger forwards.
    pub fn with_max_level(mut self, max_level: LevelFilter) -> Self {
        self.max_level = max_level;
        self
    }

    #[inline]
    pub fn max_level(&self) -> LevelFilter {
        self.max_level
    }

    /// Install this logger as the process-wide `log` sink.
    ///
    /// Fails if another logger was installed first.
    pub fn install(self) -> Result<(), log::SetLoggerError> {
        let max_level = self.max_level;
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(max_level);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use log::{Level, LevelFilter, Log, Record};

    use super::ChannelLogger;

    #[test]
    fn forwards_enabled_records() {
        // Given
        let (logger, receiver) = ChannelLogger::with_receiver();

        // When
        logger.log(
            &Record::builder()
                .args(format_args!("created archetype a3"))
                .level(Level::Info)
                .target("strata::ecs::archetype")
                .build(),
        );

        // Then
        let message = receiver.try_recv().unwrap();
        assert_eq!(message.level, Level::Info);
        assert_eq!(message.target, "strata::ecs::archetype");
        assert_eq!(message.message, "created archetype a3");
    }

    #[test]
    fn filters_records_above_max_level() {
        // Given
        let (logger, receiver) = ChannelLogger::with_receiver();
        let logger = logger.with_max_level(LevelFilter::Warn);

        // When
        logger.log(
            &Record::builder()
                .args(format_args!("noisy"))
                .level(Level::Debug)
                .build(),
        );
        logger.log(
            &Record::builder()
                .args(format_args!("clamped chunk size"))
                .level(Level::Warn)
                .build(),
        );

        // Then
        assert_eq!(receiver.len(), 1);
        assert_eq!(receiver.try_recv().unwrap().message, "clamped chunk size");
    }

    #[test]
    fn dropped_receiver_does_not_panic() {
        // Given
        let (logger, receiver) = ChannelLogger::with_receiver();
        drop(receiver);

        // When / Then
        logger.log(
            &Record::builder()
                .args(format_args!("nobody listening"))
                .level(Level::Error)
                .build(),
        );
    }
}
