/// Normalize a distribution name per PEP 503: lowercase, with every run of
/// `-`, `_`, and `.` collapsed into a single `-`.
pub fn normalize_dist_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut pending_separator = false;
    for ch in name.trim().chars() {
        if matches!(ch, '-' | '_' | '.') {
            pending_separator = true;
            continue;
        }
        if pending_separator && !normalized.is_empty() {
            normalized.push('-');
        }
        pending_separator = false;
        normalized.push(ch.to_ascii_lowercase());
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separators_collapse_to_single_dash() {
        assert_eq!(normalize_dist_name("My_Package.Name"), "my-package-name");
        assert_eq!(
            normalize_dist_name("My_Package.Name"),
            normalize_dist_name("my-package-name")
        );
        assert_eq!(normalize_dist_name("zope..interface"), "zope-interface");
        assert_eq!(normalize_dist_name("Foo-_-Bar"), "foo-bar");
    }

    #[test]
    fn leading_and_trailing_separators_are_dropped() {
        assert_eq!(normalize_dist_name("  _demo_ "), "demo");
        assert_eq!(normalize_dist_name("requests"), "requests");
    }
}
