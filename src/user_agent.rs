//! User-Agent string shared by listing and download requests.

/// Default User-Agent (identifies the tool and its version).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("yadloader/{version} (public-share-mirror)")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_contains_crate_version() {
        let ua = default_user_agent();
        assert_eq!(
            env!("CARGO_PKG_VERSION"),
            ua.strip_prefix("yadloader/")
                .and_then(|s| s.split(' ').next())
                .unwrap(),
            "UA must contain crate version"
        );
        assert!(ua.contains("public-share-mirror"), "UA must describe the tool: {ua}");
    }
}
