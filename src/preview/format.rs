//! Small presentation helpers for post tiles.

use chrono::{DateTime, Datelike, Timelike, Utc};
use url::Url;

/// Longest edge of a post tile image, in pixels.
pub const TILE_EDGE: f64 = 150.0;

const UNITS: [&str; 9] = ["Bytes", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Human-readable byte size with 1024-based units and up to two
/// decimals, trailing zeros trimmed.
pub fn format_bytes(bytes: i64) -> String {
    if bytes <= 0 {
        return "0 Bytes".to_string();
    }
    let exp = ((bytes as f64).ln() / 1024f64.ln()).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exp as i32);
    let mut rendered = format!("{value:.2}");
    while rendered.ends_with('0') {
        rendered.pop();
    }
    if rendered.ends_with('.') {
        rendered.pop();
    }
    format!("{rendered} {}", UNITS[exp])
}

/// Coarse relative rendering of a timestamp: the largest nonzero unit
/// wins, anything under a minute collapses to one phrase.
pub fn time_ago(time: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let interval = now - time;
    if interval.num_seconds() < 60 {
        return "less than a minute ago".to_string();
    }
    // Calendar-style breakdown: project the interval onto the epoch and
    // read the components back.
    let marker = DateTime::<Utc>::UNIX_EPOCH + interval;
    let ranks = [
        (i64::from(marker.year()) - 1970, "year"),
        (i64::from(marker.month0()), "month"),
        (i64::from(marker.day()) - 1, "day"),
        (i64::from(marker.hour()), "hour"),
        (i64::from(marker.minute()), "minute"),
    ];
    match ranks.iter().copied().find(|(value, _)| *value > 0) {
        Some((1, unit)) => format!("1 {unit} ago"),
        Some((value, unit)) => format!("{value} {unit}s ago"),
        None => "\u{221e} ago".to_string(),
    }
}

/// Factor fitting an image inside the tile box without upscaling.
pub fn scale_to_fit(width: u32, height: u32) -> f64 {
    if width == 0 || height == 0 {
        return 1.0;
    }
    (TILE_EDGE / f64::from(width))
        .min(TILE_EDGE / f64::from(height))
        .min(1.0)
}

/// Registrable-ish domain of a post source, or `NON-WEB` for anything
/// that is not an absolute http(s) URL.
pub fn source_domain(source: &str) -> String {
    if !source.starts_with("http://") && !source.starts_with("https://") {
        return "NON-WEB".to_string();
    }
    let host = match Url::parse(source).ok().and_then(|u| u.host_str().map(String::from)) {
        Some(host) => host,
        None => return "NON-WEB".to_string(),
    };
    let labels: Vec<&str> = host.split('.').collect();
    labels[labels.len().saturating_sub(2)..].join(".")
}

/// Whether a post's tags mark it as carrying audio.
pub fn has_sound(tag_string: &str) -> bool {
    tag_string.contains("video_with_sound") || tag_string.contains("flash_with_sound")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_bytes_units_and_trimming() {
        assert_eq!(format_bytes(0), "0 Bytes");
        assert_eq!(format_bytes(512), "512 Bytes");
        assert_eq!(format_bytes(2048), "2 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1_572_864), "1.5 MB");
        assert_eq!(format_bytes(1_288_490), "1.23 MB");
    }

    #[test]
    fn test_time_ago_ranks() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let at = |y, mo, d, h, mi| Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap();
        assert_eq!(time_ago(at(2024, 6, 15, 11, 59), now), "less than a minute ago");
        assert_eq!(time_ago(at(2024, 6, 15, 11, 55), now), "5 minutes ago");
        assert_eq!(time_ago(at(2024, 6, 15, 9, 0), now), "3 hours ago");
        assert_eq!(time_ago(at(2024, 6, 13, 12, 0), now), "2 days ago");
        assert_eq!(time_ago(at(2024, 3, 15, 12, 0), now), "3 months ago");
        assert_eq!(time_ago(at(2022, 6, 15, 12, 0), now), "2 years ago");
        assert_eq!(time_ago(at(2023, 6, 15, 12, 0), now), "1 year ago");
    }

    #[test]
    fn test_scale_fits_largest_edge() {
        assert_eq!(scale_to_fit(300, 150), 0.5);
        assert_eq!(scale_to_fit(100, 100), 1.0);
        assert_eq!(scale_to_fit(150, 600), 0.25);
    }

    #[test]
    fn test_source_domain() {
        assert_eq!(source_domain("https://www.artsite.example/works/1"), "artsite.example");
        assert_eq!(source_domain("http://blog.jp"), "blog.jp");
        assert_eq!(source_domain("file:///tmp/x.png"), "NON-WEB");
        assert_eq!(source_domain(""), "NON-WEB");
    }

    #[test]
    fn test_has_sound() {
        assert!(has_sound("1girl video_with_sound"));
        assert!(has_sound("flash_with_sound"));
        assert!(!has_sound("1girl sound_effects"));
    }
}
