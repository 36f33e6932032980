pub mod command_poller;
pub mod notifier;
pub mod report;
pub mod threshold_monitor;

pub use command_poller::{handle_message, run_command_poller, CommandContext};
pub use notifier::{format_alert, AlertSink, LogSink, NotifyError};
pub use threshold_monitor::{run_threshold_monitor, LatchPolicy, PassSummary, ThresholdMonitor};
