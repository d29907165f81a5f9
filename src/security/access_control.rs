//! Target/origin access policy.
//!
//! # Responsibilities
//! - Compile the blacklist and whitelist patterns once at startup
//! - Decide whether a (target, origin) pair may be proxied
//!
//! # Design Decisions
//! - Patterns are unanchored regex searches; a list matches when any entry does
//! - Immutable after construction (thread-safe without locks)
//! - A missing value always matches, so requests without an Origin header
//!   pass the whitelist whatever it contains

use regex::Regex;

use crate::config::PolicyConfig;

/// An ordered list of compiled patterns.
#[derive(Debug, Clone, Default)]
pub struct PatternList {
    patterns: Vec<Regex>,
}

impl PatternList {
    /// Compile every pattern, failing on the first invalid one.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, regex::Error> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Returns true if `value` is listed.
    ///
    /// `None` is always listed.
    pub fn is_listed(&self, value: Option<&str>) -> bool {
        match value {
            Some(v) => self.patterns.iter().any(|p| p.is_match(v)),
            None => true,
        }
    }
}

/// Compiled blacklist/whitelist pair consulted for every proxied request.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    blacklist_urls: PatternList,
    whitelist_origins: PatternList,
}

impl AccessPolicy {
    pub fn new(blacklist_urls: PatternList, whitelist_origins: PatternList) -> Self {
        Self {
            blacklist_urls,
            whitelist_origins,
        }
    }

    pub fn from_config(config: &PolicyConfig) -> Result<Self, regex::Error> {
        Ok(Self::new(
            PatternList::new(&config.blacklist_urls)?,
            PatternList::new(&config.whitelist_origins)?,
        ))
    }

    /// A target is allowed when it is not blacklisted and the origin is
    /// whitelisted (or absent).
    pub fn allows(&self, target: &str, origin: Option<&str>) -> bool {
        !self.blacklist_urls.is_listed(Some(target)) && self.whitelist_origins.is_listed(origin)
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::from_config(&PolicyConfig::default())
            .unwrap_or_else(|_| Self::new(PatternList::default(), PatternList::default()))
    }
}
