/// Renders elapsed seconds compactly, e.g. `45s`, `2m5s`, `1h0m5s`.
///
/// Seconds are always shown. Once an hour component is present the minute
/// component is too, even when it is zero.
pub fn format_duration(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::format_duration;

    #[test]
    fn seconds_only() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(45), "45s");
        assert_eq!(format_duration(59), "59s");
    }

    #[test]
    fn minutes_and_seconds() {
        assert_eq!(format_duration(60), "1m0s");
        assert_eq!(format_duration(125), "2m5s");
    }

    #[test]
    fn hours_keep_minute_placeholder() {
        assert_eq!(format_duration(3725), "1h2m5s");
        assert_eq!(format_duration(3605), "1h0m5s");
        assert_eq!(format_duration(3600), "1h0m0s");
        assert_eq!(format_duration(3660), "1h1m0s");
        assert_eq!(format_duration(8 * 3600), "8h0m0s");
    }
}
