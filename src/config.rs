use crate::domain::OperatingZone;

/// Runtime settings for [`crate::application::LaundryService`].
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Zone in which "today" is evaluated
    pub zone: OperatingZone,
    /// How many stale commits a student update tolerates before giving up
    pub max_accept_attempts: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            zone: OperatingZone::kolkata(),
            max_accept_attempts: 3,
        }
    }
}

impl ServiceConfig {
    pub fn with_zone(mut self, zone: OperatingZone) -> Self {
        self.zone = zone;
        self
    }

    pub fn with_max_accept_attempts(mut self, attempts: u32) -> Self {
        self.max_accept_attempts = attempts.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ServiceConfig::default();
        assert_eq!(c.zone, OperatingZone::kolkata());
        assert_eq!(c.max_accept_attempts, 3);
    }

    #[test]
    fn attempts_never_drop_below_one() {
        let c = ServiceConfig::default().with_max_accept_attempts(0);
        assert_eq!(c.max_accept_attempts, 1);
    }
}
