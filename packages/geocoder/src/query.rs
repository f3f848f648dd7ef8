//! Building geocoding queries from listing columns.

/// Joins the non-empty address parts into a single free-text query.
///
/// Parts are trimmed and joined with `", "` in the order given (address
/// first, then locality). Returns `None` when every part is empty, in which
/// case the listing cannot be geocoded.
#[must_use]
pub fn build_query<'a>(parts: impl IntoIterator<Item = Option<&'a str>>) -> Option<String> {
    let parts: Vec<&str> = parts
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_address_and_city() {
        assert_eq!(
            build_query([Some("12th Main, Indiranagar"), Some("Bangalore")]).as_deref(),
            Some("12th Main, Indiranagar, Bangalore")
        );
    }

    #[test]
    fn skips_missing_and_blank_parts() {
        assert_eq!(
            build_query([Some("Whitefield"), Some("  ")]).as_deref(),
            Some("Whitefield")
        );
        assert_eq!(
            build_query([None, Some("Pune")]).as_deref(),
            Some("Pune")
        );
    }

    #[test]
    fn nothing_to_geocode() {
        assert!(build_query([None, Some("")]).is_none());
        assert!(build_query(std::iter::empty()).is_none());
    }
}
