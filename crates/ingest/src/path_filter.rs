//! Excludes static-asset and bot/scanner paths from analytics.

use beacon_core::config::FilterConfig;

/// Returns `true` if `path` should be dropped: it ends with a configured
/// extension, or starts with a configured prefix (case-insensitive). An
/// empty configured list never excludes anything.
pub fn should_exclude_path(path: &str, filter: &FilterConfig) -> bool {
    let path_lower = path.to_lowercase();

    if !filter.excluded_extensions.is_empty()
        && filter.excluded_extensions.iter().any(|ext| path_lower.ends_with(ext.as_str()))
    {
        return true;
    }

    if !filter.excluded_paths.is_empty()
        && filter
            .excluded_paths
            .iter()
            .any(|prefix| path_lower.starts_with(prefix.to_lowercase().as_str()))
    {
        return true;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(extensions: &[&str], paths: &[&str]) -> FilterConfig {
        FilterConfig {
            excluded_extensions: extensions.iter().map(|s| s.to_string()).collect(),
            excluded_paths: paths.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn excludes_by_extension_case_insensitively() {
        let f = filter(&[".css", ".js"], &[]);
        assert!(should_exclude_path("/app.CSS", &f));
        assert!(should_exclude_path("/bundle.js", &f));
        assert!(!should_exclude_path("/index.html", &f));
    }

    #[test]
    fn excludes_by_path_prefix_case_insensitively() {
        let f = filter(&[], &["/wp-admin", "/.env"]);
        assert!(should_exclude_path("/WP-Admin/login", &f));
        assert!(!should_exclude_path("/home", &f));
    }

    #[test]
    fn empty_config_excludes_nothing() {
        let f = filter(&[], &[]);
        assert!(!should_exclude_path("/anything.css", &f));
    }
}
