//! Normalized query request shared by every source.

use serde::{Deserialize, Serialize};

/// A normalized `(text, start year, end year)` search request.
///
/// Years are not clamped here. Each source accepts whatever range it is given
/// and may simply return nothing when the range falls outside its coverage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Search text (or URL, for the archive index)
    pub text: String,

    /// First year of the range, inclusive
    pub start_year: i32,

    /// Last year of the range, inclusive
    pub end_year: i32,
}

impl QueryRequest {
    /// Create a new query request
    pub fn new(text: impl Into<String>, start_year: i32, end_year: i32) -> Self {
        Self {
            text: text.into(),
            start_year,
            end_year,
        }
    }

    /// Copy of this request with a different year range
    pub fn with_years(&self, start_year: i32, end_year: i32) -> Self {
        Self {
            text: self.text.clone(),
            start_year,
            end_year,
        }
    }

    /// Check the request invariants (non-empty text, ordered years)
    pub fn validate(&self) -> Result<(), String> {
        if self.text.trim().is_empty() {
            return Err("query text must not be empty".to_string());
        }
        if self.start_year > self.end_year {
            return Err(format!(
                "start year {} is after end year {}",
                self.start_year, self.end_year
            ));
        }
        Ok(())
    }

    /// Range label in `START-END` form
    pub fn date_range(&self) -> String {
        format!("{}-{}", self.start_year, self.end_year)
    }
}

/// Historical window a source's data actually spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coverage {
    pub first_year: i32,
    /// `None` means the source is still being updated
    pub last_year: Option<i32>,
}

impl Coverage {
    pub const fn new(first_year: i32, last_year: Option<i32>) -> Self {
        Self {
            first_year,
            last_year,
        }
    }

    /// Clamp a year range into this window.
    ///
    /// Returns `None` when the range and the window do not overlap.
    pub fn clamp(&self, start_year: i32, end_year: i32) -> Option<(i32, i32)> {
        let start = start_year.max(self.first_year);
        let end = match self.last_year {
            Some(last) => end_year.min(last),
            None => end_year,
        };
        (start <= end).then_some((start, end))
    }

    /// Whether a single year falls inside the window
    pub fn contains(&self, year: i32) -> bool {
        year >= self.first_year && self.last_year.map_or(true, |last| year <= last)
    }
}

impl std::fmt::Display for Coverage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.last_year {
            Some(last) => write!(f, "{}-{}", self.first_year, last),
            None => write!(f, "{}-present", self.first_year),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(QueryRequest::new("civil war", 1860, 1865).validate().is_ok());
        assert!(QueryRequest::new("civil war", 1865, 1860).validate().is_err());
        assert!(QueryRequest::new("   ", 1860, 1865).validate().is_err());
    }

    #[test]
    fn test_date_range() {
        let request = QueryRequest::new("9/11", 2001, 2002);
        assert_eq!(request.date_range(), "2001-2002");
    }

    #[test]
    fn test_coverage_clamp() {
        let newspapers = Coverage::new(1690, Some(1963));
        assert_eq!(newspapers.clamp(1900, 1990), Some((1900, 1963)));
        assert_eq!(newspapers.clamp(1600, 1700), Some((1690, 1700)));
        assert_eq!(newspapers.clamp(1970, 1980), None);

        let open = Coverage::new(1999, None);
        assert_eq!(open.clamp(1990, 2012), Some((1999, 2012)));
    }

    #[test]
    fn test_coverage_display() {
        assert_eq!(Coverage::new(1690, Some(1963)).to_string(), "1690-1963");
        assert_eq!(Coverage::new(1999, None).to_string(), "1999-present");
        assert!(Coverage::new(1999, None).contains(2024));
        assert!(!Coverage::new(1690, Some(1963)).contains(1964));
    }
}
