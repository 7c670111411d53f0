pub mod time {
    use chrono::{DateTime, SecondsFormat, Utc};

    /// Seconds since the Unix epoch
    pub fn now() -> u64 {
        u64::try_from(Utc::now().timestamp()).unwrap_or_default()
    }

    /// RFC 3339 form of an epoch second, e.g. `2024-05-01T09:30:00Z`
    pub fn format_timestamp(timestamp: u64) -> String {
        i64::try_from(timestamp)
            .ok()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .unwrap_or_default()
            .to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// Compact uptime used in the periodic stats log line
    pub fn format_duration(seconds: u64) -> String {
        let (hours, minutes, secs) = (seconds / 3600, seconds % 3600 / 60, seconds % 60);
        match (hours, minutes) {
            (0, 0) => format!("{}s", secs),
            (0, _) => format!("{}m {}s", minutes, secs),
            _ => format!("{}h {}m {}s", hours, minutes, secs),
        }
    }
}
