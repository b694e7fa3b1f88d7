use regex::Regex;

/// Decides whether raw page content is worth an extraction call
///
/// Content is usable when at least one marker pattern matches it. Pages that
/// failed to render (bot walls, error pages, empty result sets) usually carry
/// none of the listing markers.
#[derive(Debug)]
pub struct ContentGate {
    markers: Vec<Regex>,
}

impl Default for ContentGate {
    fn default() -> Self {
        Self::new(&["producto", "item"]).expect("Default marker patterns should be valid")
    }
}

impl ContentGate {
    /// Create a gate from regex marker patterns
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, regex::Error> {
        let mut markers = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            markers.push(Regex::new(pattern.as_ref())?);
        }
        Ok(Self { markers })
    }

    /// Whether the content contains any of the domain markers
    pub fn is_usable(&self, raw_content: &str) -> bool {
        if raw_content.trim().is_empty() {
            return false;
        }
        self.markers.iter().any(|m| m.is_match(raw_content))
    }
}
