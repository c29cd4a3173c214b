// Worker constants (no magic values)
use std::time::Duration;

/// Sleep duration when no tasks are available (100ms)
pub const IDLE_SLEEP_DURATION: Duration = Duration::from_millis(100);

/// Sleep duration after a queue error before polling again (1s)
pub const ERROR_RECOVERY_SLEEP_DURATION: Duration = Duration::from_secs(1);

/// Default outer cadence of the dispatch loop (60s)
pub const DEFAULT_DISPATCH_TICK: Duration = Duration::from_secs(60);
