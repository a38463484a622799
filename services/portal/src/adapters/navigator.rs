//! services/portal/src/adapters/navigator.rs
//!
//! A `Navigator` for the command-line client: a "reload" is recorded and
//! logged, and the process reads the next location when it renders.

use std::sync::Mutex;

use mentorship_core::ports::Navigator;
use tracing::info;

#[derive(Debug, Default)]
pub struct TracingNavigator {
    visits: Mutex<Vec<String>>,
}

impl TracingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_location(&self) -> Option<String> {
        self.visits.lock().ok()?.last().cloned()
    }

    pub fn visits(&self) -> Vec<String> {
        self.visits
            .lock()
            .map(|v| v.clone())
            .unwrap_or_default()
    }
}

impl Navigator for TracingNavigator {
    fn hard_navigate(&self, location: &str) {
        info!("Navigating to {}", location);
        if let Ok(mut visits) = self.visits.lock() {
            visits.push(location.to_string());
        }
    }
}
