/// Format seconds as `MM:SS`. Minutes are not wrapped at the hour.
///
/// Negative and non-finite values render as `00:00`.
pub fn format_elapsed(secs: f64) -> String {
    let total = whole_seconds(secs);
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Format the time left as `-MM:SS`.
pub fn format_remaining(secs: f64) -> String {
    format!("-{}", format_elapsed(secs))
}

fn whole_seconds(secs: f64) -> u64 {
    if secs.is_finite() && secs > 0.0 {
        secs.floor() as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_elapsed(0.0), "00:00");
        assert_eq!(format_elapsed(0.99), "00:00");
        assert_eq!(format_elapsed(65.4), "01:05");
        assert_eq!(format_elapsed(3_725.0), "62:05");
    }

    #[test]
    fn invalid_values_are_zero() {
        assert_eq!(format_elapsed(-3.0), "00:00");
        assert_eq!(format_elapsed(f64::NAN), "00:00");
        assert_eq!(format_elapsed(f64::INFINITY), "00:00");
    }

    #[test]
    fn remaining_has_leading_minus() {
        assert_eq!(format_remaining(12.0), "-00:12");
        assert_eq!(format_remaining(0.0), "-00:00");
    }
}
