mod telemetry;

pub use telemetry::{env_filter, init as init_telemetry, OperationTimer};

/// Convenience macro for timing the rest of the enclosing scope
#[macro_export]
macro_rules! track_operation {
    ($name:expr) => {
        let _timer = $crate::monitoring::OperationTimer::new($name);
    };
}
