use crate::config::LinksConfig;

/// Rewrites the platform's tracking hostname to its canonical form
///
/// # Normalization Rules
///
/// 1. Scan the text left to right for the earliest occurrence of either host
/// 2. An existing canonical host is copied through untouched
/// 3. A tracking host is replaced by the canonical host
/// 4. Everything else is copied verbatim
///
/// Because canonical occurrences are consumed before they can be rewritten
/// again, `normalize(normalize(x)) == normalize(x)` as long as neither host
/// contains the other and neither ends with the start of the other. Config
/// validation rejects pairs that break either rule.
///
/// # Examples
///
/// ```
/// use mirrorbot::content::LinkNormalizer;
///
/// let normalizer = LinkNormalizer::new("www.reddit.com", "np.reddit.com");
/// let once = normalizer.normalize("https://www.reddit.com/r/rust/comments/abc");
/// assert_eq!(once, "https://np.reddit.com/r/rust/comments/abc");
/// assert_eq!(normalizer.normalize(&once), once);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkNormalizer {
    tracking_host: String,
    canonical_host: String,
}

impl LinkNormalizer {
    pub fn new(tracking_host: impl Into<String>, canonical_host: impl Into<String>) -> Self {
        Self {
            tracking_host: tracking_host.into(),
            canonical_host: canonical_host.into(),
        }
    }

    pub fn from_config(config: &LinksConfig) -> Self {
        Self::new(&config.tracking_host, &config.canonical_host)
    }

    pub fn tracking_host(&self) -> &str {
        &self.tracking_host
    }

    pub fn canonical_host(&self) -> &str {
        &self.canonical_host
    }

    /// Returns `text` with every tracking host rewritten
    pub fn normalize(&self, text: &str) -> String {
        if self.tracking_host.is_empty() || !text.contains(self.tracking_host.as_str()) {
            return text.to_string();
        }

        let mut normalized = String::with_capacity(text.len());
        let mut rest = text;

        loop {
            let tracking = rest.find(self.tracking_host.as_str());
            let canonical = if self.canonical_host.is_empty() {
                None
            } else {
                rest.find(self.canonical_host.as_str())
            };

            match (tracking, canonical) {
                (None, _) => {
                    normalized.push_str(rest);
                    break;
                }
                // An existing canonical host wins ties and earlier positions
                (Some(t), Some(c)) if c <= t => {
                    let end = c + self.canonical_host.len();
                    normalized.push_str(&rest[..end]);
                    rest = &rest[end..];
                }
                (Some(t), _) => {
                    normalized.push_str(&rest[..t]);
                    normalized.push_str(&self.canonical_host);
                    rest = &rest[t + self.tracking_host.len()..];
                }
            }
        }

        normalized
    }
}

impl Default for LinkNormalizer {
    fn default() -> Self {
        Self::from_config(&LinksConfig::default())
    }
}
