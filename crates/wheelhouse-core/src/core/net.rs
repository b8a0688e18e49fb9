use crate::config::EnvSnapshot;

const PROXY_KEYS: &[&str] = &[
    "HTTP_PROXY",
    "http_proxy",
    "HTTPS_PROXY",
    "https_proxy",
    "ALL_PROXY",
    "all_proxy",
    "NO_PROXY",
    "no_proxy",
];

/// Decide whether HTTP clients should honor standard proxy environment variables.
///
/// Behavior:
/// - `WHEELHOUSE_KEEP_PROXIES=1/true/yes/on` forces proxies on.
/// - `WHEELHOUSE_KEEP_PROXIES=0/false/no/off` forces proxies off.
/// - If unset, proxies are enabled only when at least one proxy env var is set.
pub(crate) fn keep_proxies(snapshot: &EnvSnapshot) -> bool {
    match snapshot.var("WHEELHOUSE_KEEP_PROXIES") {
        Some(raw) => {
            let value = raw.trim().to_ascii_lowercase();
            !matches!(value.as_str(), "0" | "false" | "no" | "off")
        }
        None => PROXY_KEYS.iter().any(|key| snapshot.var(key).is_some()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    struct EnvGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: Option<&str>) -> Self {
            let previous = env::var(key).ok();
            match value {
                Some(value) => env::set_var(key, value),
                None => env::remove_var(key),
            }
            Self { key, previous }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.previous {
                Some(value) => env::set_var(self.key, value),
                None => env::remove_var(self.key),
            }
        }
    }

    #[test]
    fn explicit_setting_wins_over_proxy_vars() {
        let snapshot = EnvSnapshot::testing(&[
            ("WHEELHOUSE_KEEP_PROXIES", "off"),
            ("HTTPS_PROXY", "http://proxy.example"),
        ]);
        assert!(!keep_proxies(&snapshot));

        let snapshot = EnvSnapshot::testing(&[("WHEELHOUSE_KEEP_PROXIES", "yes")]);
        assert!(keep_proxies(&snapshot));
    }

    #[test]
    fn blank_proxy_vars_do_not_count() {
        let snapshot = EnvSnapshot::testing(&[("HTTP_PROXY", "  "), ("no_proxy", "")]);
        assert!(!keep_proxies(&snapshot));
    }

    #[test]
    #[serial]
    fn captured_environment_enables_proxies_when_one_is_set() {
        let _keep = EnvGuard::set("WHEELHOUSE_KEEP_PROXIES", None);
        let mut guards = Vec::new();
        for key in PROXY_KEYS {
            guards.push(EnvGuard::set(key, None));
        }
        assert!(!keep_proxies(&EnvSnapshot::capture()));

        let _https = EnvGuard::set("HTTPS_PROXY", Some("http://proxy.example"));
        assert!(keep_proxies(&EnvSnapshot::capture()));
    }
}
