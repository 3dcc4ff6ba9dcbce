//! Assertion utilities for testing.

/// Default epsilon for floating-point comparisons
pub const DEFAULT_EPSILON: f64 = 1e-9;

/// Assert that two floating-point values are approximately equal
pub fn assert_approx_eq(actual: f64, expected: f64, epsilon: Option<f64>) {
    let epsilon = epsilon.unwrap_or(DEFAULT_EPSILON);
    let diff = (actual - expected).abs();

    assert!(
        diff <= epsilon,
        "Values not approximately equal: actual = {}, expected = {}, diff = {}, epsilon = {}",
        actual,
        expected,
        diff,
        epsilon
    );
}

/// Assert that a string is a `#rrggbb` color
pub fn assert_hex_color(value: &str) {
    assert!(
        value.len() == 7
            && value.starts_with('#')
            && value[1..].chars().all(|c| c.is_ascii_hexdigit()),
        "Not a #rrggbb color: {}",
        value
    );
}

/// Assert that an error body carries a message and a request id
pub fn assert_error_body(body: &serde_json::Value) {
    assert!(
        body["error"].as_str().map(|s| !s.is_empty()).unwrap_or(false),
        "Missing error message: {}",
        body
    );
    assert_eq!(
        body["request_id"].as_str().map(str::len),
        Some(36),
        "Missing request id: {}",
        body
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_approx_eq() {
        assert_approx_eq(1.0, 1.0, None);
        assert_approx_eq(0.1 + 0.2, 0.3, None);
        assert_approx_eq(1.0, 1.001, Some(0.01));
    }

    #[test]
    fn test_assert_hex_color() {
        assert_hex_color("#440154");
        assert_hex_color("#FDE725");
    }

    #[test]
    #[should_panic]
    fn test_assert_hex_color_rejects_rgb() {
        assert_hex_color("rgb(1,2,3)");
    }
}
