use chrono::Duration;
use tracing::warn;

/// Tunables for the lifecycle engines. Defaults match the product rules;
/// the sweeper binary overrides them from `RISHTA_*` environment variables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Pending requests older than this expire on sweep.
    pub request_ttl: Duration,
    /// Chat rooms close this long after creation regardless of activity.
    pub room_ttl: Duration,
    /// Send attempts allowed per sender per room in a rolling hour.
    pub hourly_message_limit: u32,
    /// Send attempts allowed per sender per room in a rolling 24 hours.
    pub daily_message_limit: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            request_ttl: Duration::days(30),
            room_ttl: Duration::days(7),
            hourly_message_limit: 1,
            daily_message_limit: 3,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(days) = env_u32("RISHTA_REQUEST_TTL_DAYS") {
            config.request_ttl = Duration::days(days as i64);
        }
        if let Some(days) = env_u32("RISHTA_ROOM_TTL_DAYS") {
            config.room_ttl = Duration::days(days as i64);
        }
        if let Some(limit) = env_u32("RISHTA_HOURLY_MESSAGE_LIMIT") {
            config.hourly_message_limit = limit;
        }
        if let Some(limit) = env_u32("RISHTA_DAILY_MESSAGE_LIMIT") {
            config.daily_message_limit = limit;
        }
        config
    }
}

fn env_u32(key: &str) -> Option<u32> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring unparseable {}='{}', keeping the default", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_env_value_keeps_the_default() {
        // set_var is unsafe in edition 2024; the key is unique to this test.
        unsafe { std::env::set_var("RISHTA_HOURLY_MESSAGE_LIMIT", "often") };
        let config = EngineConfig::from_env();
        assert_eq!(
            config.hourly_message_limit,
            EngineConfig::default().hourly_message_limit
        );
        unsafe { std::env::remove_var("RISHTA_HOURLY_MESSAGE_LIMIT") };
    }
}
