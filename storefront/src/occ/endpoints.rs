//! OCC endpoint URLs

use crate::config::OccConfig;
use crate::error::OccError;
use reqwest::Url;

/// Builds `{base_url}{prefix}{site}/{segments..}` URLs
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OccEndpoints {
    base: String,
    site: String,
}

impl OccEndpoints {
    /// Endpoints for the configured site
    #[must_use]
    pub fn new(config: &OccConfig) -> Self {
        let base_url = config.base_url.trim_end_matches('/');
        let prefix = config.prefix.trim_matches('/');
        let base = if prefix.is_empty() {
            format!("{base_url}/")
        } else {
            format!("{base_url}/{prefix}/")
        };

        Self {
            base,
            site: config.base_site.clone(),
        }
    }

    /// Use another site
    pub fn set_site(&mut self, site: impl Into<String>) {
        self.site = site.into();
    }

    /// The site requests are addressed to
    #[must_use]
    pub fn site(&self) -> &str {
        &self.site
    }

    /// URL of the path `segments` below the site, with query parameters
    ///
    /// Every segment is percent-encoded on its own, so ids holding `/`, `?`
    /// or `#` stay inside their segment.
    ///
    /// # Errors
    ///
    /// Returns [`OccError::InvalidUrl`] when the base is not a valid URL.
    pub fn url(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url, OccError> {
        let invalid = |message: String| OccError::InvalidUrl {
            url: self.base.clone(),
            message,
        };

        let mut url = Url::parse(&self.base).map_err(|error| invalid(error.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("base URL cannot hold a path".to_string()))?
            .pop_if_empty()
            .push(&self.site)
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        Ok(url)
    }

    /// `users/{user}/carts`
    pub(crate) fn carts(user_id: &str) -> [&str; 3] {
        ["users", user_id, "carts"]
    }

    /// `users/{user}/carts/{cart}/{rest..}`
    pub(crate) fn cart<'a>(user_id: &'a str, cart_id: &'a str, rest: &[&'a str]) -> Vec<&'a str> {
        let mut segments = vec!["users", user_id, "carts", cart_id];
        segments.extend_from_slice(rest);
        segments
    }
}
