use chrono::Local;

/// Generate a sortable identifier with an optional date component.
///
/// With `date_part` the format is `{prefix}-{YYYYMMDD}-{HHMMSS}`, otherwise
/// `{prefix}-{YYYYMMDDHHMMSS}`. Not guaranteed unique within the same second;
/// the store rejects collisions at creation time.
pub fn generate_id(prefix: &str, date_part: bool) -> String {
    let now = Local::now();
    if date_part {
        format!("{}-{}", prefix, now.format("%Y%m%d-%H%M%S"))
    } else {
        format!("{}-{}", prefix, now.format("%Y%m%d%H%M%S"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dated_form_has_three_segments() {
        let id = generate_id("inv", true);
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "inv");
        assert_eq!(parts[1].len(), 8);
        assert_eq!(parts[2].len(), 6);
    }

    #[test]
    fn compact_form_has_two_segments() {
        let id = generate_id("payment", false);
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1].len(), 14);
    }
}
