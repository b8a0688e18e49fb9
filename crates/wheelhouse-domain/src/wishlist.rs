/// Wishlist written when none exists yet.
pub const DEFAULT_WISHLIST: &str = "pandas\nrequests\n";

/// Parse newline-delimited package names, ignoring blank lines and `#` comments.
pub fn parse_wishlist(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ToOwned::to_owned)
        .collect()
}
