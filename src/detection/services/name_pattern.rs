use crate::shared::Result;

/// Maximum length of a single pattern
const MAX_PATTERN_LENGTH: usize = 255;

/// NamePattern - wildcard matcher for image and process names
///
/// `*` matches zero or more characters. Patterns are case-sensitive and
/// anchored at both ends: `nginx*` matches `nginx:1.25` but not
/// `docker.io/nginx:1.25`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePattern {
    original: String,
    matcher: PatternMatcher,
}

/// Pattern matcher types for efficient matching
#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternMatcher {
    /// Exact match: "nginx:1.25"
    Exact(String),
    /// Leading wildcard: "*:latest"
    EndsWith(String),
    /// Trailing wildcard: "docker.io/*"
    StartsWith(String),
    /// Surrounding wildcards: "*nginx*"
    Contains(String),
    /// General case: first part anchored at the start, last at the end
    Segments {
        first: String,
        middle: Vec<String>,
        last: String,
    },
}

impl NamePattern {
    /// Validates and compiles a pattern string
    ///
    /// # Errors
    /// - Empty pattern, or pattern made only of wildcards
    /// - Pattern longer than 255 characters
    /// - Characters other than alphanumerics and `-_./:@*`
    pub fn new(pattern: &str) -> Result<Self> {
        validate_pattern(pattern)?;
        Ok(Self {
            original: pattern.to_string(),
            matcher: compile_pattern(pattern),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.original
    }

    pub fn matches(&self, name: &str) -> bool {
        match &self.matcher {
            PatternMatcher::Exact(s) => name == s,
            PatternMatcher::EndsWith(suffix) => name.ends_with(suffix.as_str()),
            PatternMatcher::StartsWith(prefix) => name.starts_with(prefix.as_str()),
            PatternMatcher::Contains(middle) => name.contains(middle.as_str()),
            PatternMatcher::Segments {
                first,
                middle,
                last,
            } => {
                if name.len() < first.len() + last.len()
                    || !name.starts_with(first.as_str())
                    || !name.ends_with(last.as_str())
                {
                    return false;
                }
                // Middle parts must appear in order between the anchors
                let window = &name[first.len()..name.len() - last.len()];
                let mut pos = 0;
                for part in middle {
                    match window[pos..].find(part.as_str()) {
                        Some(found) => pos += found + part.len(),
                        None => return false,
                    }
                }
                true
            }
        }
    }
}

fn validate_pattern(pattern: &str) -> Result<()> {
    if pattern.is_empty() {
        anyhow::bail!("Name pattern cannot be empty");
    }

    if pattern.len() > MAX_PATTERN_LENGTH {
        anyhow::bail!(
            "Name pattern is too long: '{}' ({} chars). Maximum: {} chars",
            pattern,
            pattern.len(),
            MAX_PATTERN_LENGTH
        );
    }

    if let Some(ch) = pattern.chars().find(|c| !is_valid_pattern_char(*c)) {
        anyhow::bail!(
            "Name pattern contains invalid character '{}' in pattern '{}'. \
             Only alphanumerics, '-', '_', '.', '/', ':', '@' and '*' are allowed.",
            ch,
            pattern
        );
    }

    if pattern.chars().all(|c| c == '*') {
        anyhow::bail!("Name pattern cannot contain only wildcards: '{}'", pattern);
    }

    Ok(())
}

fn is_valid_pattern_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '@' | '*')
}

fn compile_pattern(pattern: &str) -> PatternMatcher {
    if !pattern.contains('*') {
        return PatternMatcher::Exact(pattern.to_string());
    }

    let parts: Vec<&str> = pattern.split('*').collect();
    let inner: Vec<String> = parts[1..parts.len() - 1]
        .iter()
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect();
    let first = parts[0];
    let last = parts[parts.len() - 1];

    match (first.is_empty(), last.is_empty(), inner.len()) {
        (true, false, 0) => PatternMatcher::EndsWith(last.to_string()),
        (false, true, 0) => PatternMatcher::StartsWith(first.to_string()),
        (true, true, 1) => PatternMatcher::Contains(inner[0].clone()),
        _ => PatternMatcher::Segments {
            first: first.to_string(),
            middle: inner,
            last: last.to_string(),
        },
    }
}
