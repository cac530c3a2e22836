use log::{debug, info, warn};

/// Thin logging facade that tags every record with the emitting component.
#[derive(Debug, Clone)]
pub struct LogManager {
    component: &'static str,
}

impl LogManager {
    pub fn new(component: &'static str) -> Self {
        Self { component }
    }

    pub fn record(&self, message: &str) {
        info!("[{}] {}", self.component, message);
    }

    pub fn detail(&self, message: &str) {
        debug!("[{}] {}", self.component, message);
    }

    pub fn warn(&self, message: &str) {
        warn!("[{}] {}", self.component, message);
    }

    pub fn component(&self) -> &'static str {
        self.component
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new("ilogcore")
    }
}
