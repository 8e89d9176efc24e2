use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::EnvFilter;

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Install the global stderr subscriber. Only the first call in a process
/// does anything; repeat calls are no-ops and return false.
pub fn init() -> bool {
    if INSTALLED.swap(true, Ordering::SeqCst) {
        return false;
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_one_shot() {
        // no other test in this binary installs the subscriber, so the first
        // call wins and every later one backs off
        assert!(init());
        assert!(!init());
    }
}
