pub fn now_ts() -> f64 {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    now.as_secs_f64()
}

/// Keep only the last `limit` items, in their original order.
pub fn tail<T>(mut items: Vec<T>, limit: usize) -> Vec<T> {
    if items.len() > limit {
        items.drain(..items.len() - limit);
    }
    items
}

/// Lenient numeric field parse: surrounding whitespace is ignored and a blank
/// field reads as zero. Non-finite results are the caller's to reject.
pub fn parse_number(field: &str) -> Option<f64> {
    let s = field.trim();
    if s.is_empty() {
        return Some(0.0);
    }
    s.parse::<f64>().ok()
}

/// Round to `digits` decimals with ties going away from zero, so `{:.N}`
/// formatting afterwards never lands on banker's rounding.
pub fn round_half_away(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_keeps_most_recent_in_order() {
        let v: Vec<i32> = (0..10).collect();
        assert_eq!(tail(v, 3), vec![7, 8, 9]);
    }

    #[test]
    fn tail_returns_everything_when_limit_is_large() {
        let v: Vec<i32> = (0..10).collect();
        assert_eq!(tail(v.clone(), 10), v);
        assert_eq!(tail(v.clone(), 50), v);
    }

    #[test]
    fn tail_with_zero_limit_is_empty() {
        assert!(tail(vec![1, 2, 3], 0).is_empty());
    }

    #[test]
    fn ties_round_away_from_zero() {
        assert_eq!(round_half_away(200.625, 2), 200.63);
        assert_eq!(round_half_away(0.125, 2), 0.13);
        assert_eq!(round_half_away(-0.125, 2), -0.13);
        assert_eq!(round_half_away(10250.5, 0), 10251.0);
        assert_eq!(round_half_away(1.256, 2), 1.26);
    }

    #[test]
    fn parse_number_variants() {
        assert_eq!(parse_number(" 105 "), Some(105.0));
        assert_eq!(parse_number("1e3"), Some(1000.0));
        assert_eq!(parse_number(""), Some(0.0));
        assert_eq!(parse_number("xyz"), None);
        assert!(parse_number("inf").is_some_and(|v| !v.is_finite()));
    }
}
