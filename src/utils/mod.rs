pub mod logging;

pub use logging::{init_logging, log_system_info, LogOptions};
