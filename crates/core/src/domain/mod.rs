pub mod grant;
pub mod group;
pub mod lead;
pub mod lead_log;
pub mod queue;
pub mod schedule;
pub mod worker;

/// Canonical form used to compare tags coming from storage, operators and the
/// legacy CamelCase vocabulary (`NoContesta`, `no_contesta` and `no-contesta`
/// all normalize to `nocontesta`).
pub(crate) fn normalize_tag(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|ch| !matches!(ch, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::normalize_tag;

    #[test]
    fn normalize_tag_ignores_case_and_separators() {
        assert_eq!(normalize_tag("NoContesta"), "nocontesta");
        assert_eq!(normalize_tag(" no_contesta "), "nocontesta");
        assert_eq!(normalize_tag("no-contesta"), "nocontesta");
    }
}
