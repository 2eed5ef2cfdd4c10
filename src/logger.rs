use std::fs::{File, create_dir_all};
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
#[cfg(test)]
use std::sync::{Arc, Mutex};

/// Report event types that determine which receivers should log the message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogEvent {
    /// Resolved price/rating tables per sales house
    Merge,
    /// Per channel split and sales house breakdown
    Allocation,
    /// Campaign totals
    Summary,
}

/// Trait for log receivers that can receive log messages
pub trait LogReceiver {
    /// Check if this receiver should handle the given log event
    fn should_log(&self, event: LogEvent) -> bool;

    /// Write a string to this receiver
    fn write(&mut self, s: &str) -> io::Result<()>;

    /// Flush this receiver
    fn flush(&mut self) -> io::Result<()>;
}

/// Console log receiver (writes to stdout)
pub struct ConsoleReceiver {
    enabled_events: Vec<LogEvent>,
}

impl ConsoleReceiver {
    /// Create a new console receiver
    /// Returns a boxed receiver ready to be added to a logger
    pub fn new(enabled_events: Vec<LogEvent>) -> Box<dyn LogReceiver> {
        Box::new(Self { enabled_events })
    }
}

impl LogReceiver for ConsoleReceiver {
    fn should_log(&self, event: LogEvent) -> bool {
        self.enabled_events.contains(&event)
    }

    fn write(&mut self, s: &str) -> io::Result<()> {
        print!("{}", s);
        io::stdout().flush()
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()
    }
}

/// File log receiver (writes to a file)
pub struct FileReceiver {
    file: File,
    enabled_events: Vec<LogEvent>,
}

impl FileReceiver {
    /// Create a new file receiver that writes to the specified path
    /// The file will be created (truncated if it exists) and parent directories will be created if needed
    /// Returns a boxed receiver ready to be added to a logger
    pub fn new(path: &Path, enabled_events: Vec<LogEvent>) -> io::Result<Box<dyn LogReceiver>> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        Ok(Box::new(Self { file, enabled_events }))
    }
}

impl LogReceiver for FileReceiver {
    fn should_log(&self, event: LogEvent) -> bool {
        self.enabled_events.contains(&event)
    }

    fn write(&mut self, s: &str) -> io::Result<()> {
        write!(self.file, "{}", s)?;
        self.file.flush()
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// In-memory receiver, the text stays readable through the shared buffer
#[cfg(test)]
pub struct BufferReceiver {
    buffer: Arc<Mutex<String>>,
    enabled_events: Vec<LogEvent>,
}

#[cfg(test)]
impl BufferReceiver {
    /// Returns the boxed receiver and a handle to the buffer it appends to
    pub fn new(enabled_events: Vec<LogEvent>) -> (Box<dyn LogReceiver>, Arc<Mutex<String>>) {
        let buffer = Arc::new(Mutex::new(String::new()));
        let receiver = Box::new(Self { buffer: Arc::clone(&buffer), enabled_events });
        (receiver, buffer)
    }
}

#[cfg(test)]
impl LogReceiver for BufferReceiver {
    fn should_log(&self, event: LogEvent) -> bool {
        self.enabled_events.contains(&event)
    }

    fn write(&mut self, s: &str) -> io::Result<()> {
        let mut buffer = self
            .buffer
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log buffer poisoned"))?;
        buffer.push_str(s);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Unique identifier for a receiver
pub type ReceiverId = usize;

/// Global counter for generating unique receiver IDs
static RECEIVER_ID_COUNTER: AtomicUsize = AtomicUsize::new(1);

/// Main logger that manages multiple receivers
pub struct Logger {
    receivers: Vec<(ReceiverId, Box<dyn LogReceiver>)>,
}

impl Logger {
    /// Create a new logger with no receivers
    pub fn new() -> Self {
        Self {
            receivers: Vec::new(),
        }
    }

    /// Add a receiver to the logger and return its unique ID
    pub fn add_receiver(&mut self, receiver: Box<dyn LogReceiver>) -> ReceiverId {
        let id = RECEIVER_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.receivers.push((id, receiver));
        id
    }

    /// Remove a receiver by its ID
    #[cfg(test)]
    pub fn remove_receiver(&mut self, id: ReceiverId) {
        self.receivers.retain(|(receiver_id, _)| *receiver_id != id);
    }

    /// Write a message with a specific log event type
    pub fn log(&mut self, event: LogEvent, message: &str) -> io::Result<()> {
        for (_, receiver) in &mut self.receivers {
            if receiver.should_log(event) {
                receiver.write(message)?;
            }
        }
        Ok(())
    }

    /// Write a message with newline
    pub fn logln(&mut self, event: LogEvent, message: &str) -> io::Result<()> {
        self.log(event, &format!("{}\n", message))
    }

    /// Write a message with newline to the specified event and all upward events
    /// Hierarchy: Merge -> Allocation -> Summary
    /// Each receiver receives the message only once, even if it listens to multiple events
    fn log_with_prefix(&mut self, event: LogEvent, prefix: &str, message: &str) -> io::Result<()> {
        let events: &[LogEvent] = match event {
            LogEvent::Merge => &[LogEvent::Merge, LogEvent::Allocation, LogEvent::Summary],
            LogEvent::Allocation => &[LogEvent::Allocation, LogEvent::Summary],
            LogEvent::Summary => &[LogEvent::Summary],
        };

        let formatted_message = format!("{} {}\n", prefix, message);
        for (_, receiver) in &mut self.receivers {
            let should_receive = events.iter().any(|&evt| receiver.should_log(evt));
            if should_receive {
                receiver.write(&formatted_message)?;
            }
        }
        Ok(())
    }

    /// Write a message prefixed with "WARNING" to the specified event and all upward events
    pub fn warnln(&mut self, event: LogEvent, message: &str) -> io::Result<()> {
        self.log_with_prefix(event, "WARNING", message)
    }

    /// Flush all receivers
    pub fn flush(&mut self) -> io::Result<()> {
        for (_, receiver) in &mut self.receivers {
            receiver.flush()?;
        }
        Ok(())
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}


/// Macro to log a formatted string (like println! but for logger)
/// Evaluates to the `io::Result` of the write
#[macro_export]
macro_rules! logln {
    ($logger:expr, $event:expr, $($arg:tt)*) => {
        $logger.logln($event, &format!($($arg)*))
    };
}

/// Macro to log a formatted string with newline to the specified event and all upward events
/// Automatically prepends "WARNING" to the message
#[macro_export]
macro_rules! warnln {
    ($logger:expr, $event:expr, $($arg:tt)*) => {
        $logger.warnln($event, &format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receiver_gets_only_enabled_events() {
        let mut logger = Logger::new();
        let (receiver, buffer) = BufferReceiver::new(vec![LogEvent::Summary]);
        logger.add_receiver(receiver);

        logln!(&mut logger, LogEvent::Merge, "merge line").unwrap();
        logln!(&mut logger, LogEvent::Summary, "summary line").unwrap();

        let text = buffer.lock().unwrap().clone();
        assert_eq!(text, "summary line\n");
    }

    #[test]
    fn test_warning_reaches_upward_events_once() {
        let mut logger = Logger::new();
        let (receiver, buffer) = BufferReceiver::new(vec![LogEvent::Allocation, LogEvent::Summary]);
        let id = logger.add_receiver(receiver);

        warnln!(&mut logger, LogEvent::Merge, "excluded {}", 2).unwrap();
        assert_eq!(buffer.lock().unwrap().as_str(), "WARNING excluded 2\n");

        logger.remove_receiver(id);
        logln!(&mut logger, LogEvent::Summary, "dropped").unwrap();
        assert_eq!(buffer.lock().unwrap().as_str(), "WARNING excluded 2\n");
    }

    #[test]
    fn test_file_receiver_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log").join("report.log");
        let mut logger = Logger::new();
        logger.add_receiver(FileReceiver::new(&path, vec![LogEvent::Summary]).unwrap());
        logln!(&mut logger, LogEvent::Summary, "total {}", 1).unwrap();
        logger.flush().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "total 1\n");
    }

    struct BrokenReceiver;

    impl LogReceiver for BrokenReceiver {
        fn should_log(&self, _event: LogEvent) -> bool {
            true
        }

        fn write(&mut self, _s: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_errors_reach_the_caller() {
        let mut logger = Logger::new();
        logger.add_receiver(Box::new(BrokenReceiver));
        assert!(logln!(&mut logger, LogEvent::Summary, "total {}", 1).is_err());
        assert!(warnln!(&mut logger, LogEvent::Merge, "excluded").is_err());
    }
}
