//! Name filters applied to item slots.
//!
//! Masks use SQL `LIKE` wildcards (`%` any run, `_` one character) and their
//! glob equivalents (`*`, `?`). Matching is case-insensitive and anchored at
//! both ends.

use regex::Regex;

use crate::error::{NavigatorError, Result};

/// One compiled name mask.
#[derive(Debug, Clone)]
struct NameMask {
    source: String,
    pattern: Regex,
}

impl NameMask {
    fn compile(mask: &str) -> Result<Self> {
        let mut regex = String::with_capacity(mask.len() * 2 + 6);
        regex.push_str("(?i)^");
        let mut literal = [0u8; 4];
        for c in mask.chars() {
            match c {
                '%' | '*' => regex.push_str(".*"),
                '_' | '?' => regex.push('.'),
                c => regex.push_str(&regex::escape(c.encode_utf8(&mut literal))),
            }
        }
        regex.push('$');

        let pattern = Regex::new(&regex).map_err(|source| NavigatorError::InvalidFilterMask {
            mask: mask.to_string(),
            source,
        })?;
        Ok(Self {
            source: mask.to_string(),
            pattern,
        })
    }

    fn is_match(&self, name: &str) -> bool {
        self.pattern.is_match(name)
    }
}

/// Include/exclude name filter for the children of one item slot.
///
/// A name passes when it matches at least one include mask (or there are no
/// include masks) and matches no exclude mask. A disabled filter passes
/// everything.
#[derive(Debug, Clone)]
pub struct ObjectFilter {
    include: Vec<NameMask>,
    exclude: Vec<NameMask>,
    enabled: bool,
}

impl Default for ObjectFilter {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
            enabled: true,
        }
    }
}

impl ObjectFilter {
    /// Create an empty, enabled filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a filter from include and exclude masks.
    pub fn from_masks<I, E, S, T>(include: I, exclude: E) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        E: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let include = include
            .into_iter()
            .map(|mask| NameMask::compile(mask.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let exclude = exclude
            .into_iter()
            .map(|mask| NameMask::compile(mask.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            include,
            exclude,
            enabled: true,
        })
    }

    /// Add an include mask.
    pub fn add_include(&mut self, mask: &str) -> Result<()> {
        self.include.push(NameMask::compile(mask)?);
        Ok(())
    }

    /// Add an exclude mask.
    pub fn add_exclude(&mut self, mask: &str) -> Result<()> {
        self.exclude.push(NameMask::compile(mask)?);
        Ok(())
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the filter has no effect.
    pub fn is_empty(&self) -> bool {
        !self.enabled || (self.include.is_empty() && self.exclude.is_empty())
    }

    /// Include masks as written.
    pub fn include_masks(&self) -> impl Iterator<Item = &str> {
        self.include.iter().map(|mask| mask.source.as_str())
    }

    /// Exclude masks as written.
    pub fn exclude_masks(&self) -> impl Iterator<Item = &str> {
        self.exclude.iter().map(|mask| mask.source.as_str())
    }

    /// Whether `name` passes the filter.
    pub fn matches(&self, name: &str) -> bool {
        if !self.enabled {
            return true;
        }
        if !self.include.is_empty() && !self.include.iter().any(|mask| mask.is_match(name)) {
            return false;
        }
        !self.exclude.iter().any(|mask| mask.is_match(name))
    }
}
