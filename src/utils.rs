/// Turns an arbitrary pipeline name into a Python / SQL identifier.
///
/// Lowercases, maps every non-alphanumeric run to a single `_`, trims
/// underscores at both ends and prefixes names that start with a digit.
pub fn sanitize_identifier(name: &str) -> String {
    let lowered = name.trim().to_lowercase();

    let mut result = String::with_capacity(lowered.len());
    let mut last_was_underscore = false;
    for c in lowered.chars() {
        if c.is_ascii_alphanumeric() {
            result.push(c);
            last_was_underscore = false;
        } else if !last_was_underscore {
            result.push('_');
            last_was_underscore = true;
        }
    }

    let result = result.trim_matches('_');

    if result.is_empty() {
        "pipeline".to_owned()
    } else if result.starts_with(|c: char| c.is_ascii_digit()) {
        format!("pipeline_{result}")
    } else {
        result.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_identifier() {
        assert_eq!(sanitize_identifier("Customer Orders-Daily"), "customer_orders_daily");
        assert_eq!(sanitize_identifier("  __sales  "), "sales");
        assert_eq!(sanitize_identifier("2024 load"), "pipeline_2024_load");
        assert_eq!(sanitize_identifier("***"), "pipeline");
        assert_eq!(sanitize_identifier("a..b"), "a_b");
    }
}
