// src/exec/progress_pattern.rs

//! Progress extraction from command output.

use regex::Regex;

/// Regex whose first capture group holds a progress number.
///
/// With `percent = true` the captured number is read as `0..=100`, otherwise
/// as a fraction `0..=1`. Out-of-range values are clamped by
/// [`JobProgress`](crate::job::JobProgress).
#[derive(Debug, Clone)]
pub struct ProgressPattern {
    regex: Regex,
    percent: bool,
}

impl ProgressPattern {
    pub fn new(pattern: &str, percent: bool) -> Result<Self, regex::Error> {
        let regex = Regex::new(pattern)?;
        Ok(Self { regex, percent })
    }

    /// Whether the pattern has at least one capture group.
    pub fn has_capture_group(&self) -> bool {
        self.regex.captures_len() > 1
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Progress fraction carried by `line`, if it matches.
    pub fn parse_line(&self, line: &str) -> Option<f64> {
        let caps = self.regex.captures(line)?;
        let value: f64 = caps.get(1)?.as_str().trim().parse().ok()?;
        if self.percent {
            Some(value / 100.0)
        } else {
            Some(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_percentages() {
        let p = ProgressPattern::new(r"^progress: (\d+(?:\.\d+)?)%$", true).unwrap();
        assert_eq!(p.parse_line("progress: 50%"), Some(0.5));
        assert_eq!(p.parse_line("progress: 12.5%"), Some(0.125));
        assert_eq!(p.parse_line("building foo"), None);
    }

    #[test]
    fn parses_fractions() {
        let p = ProgressPattern::new(r"done=([0-9.]+)", false).unwrap();
        assert_eq!(p.parse_line("step 3 done=0.75"), Some(0.75));
    }

    #[test]
    fn unparsable_capture_is_ignored() {
        let p = ProgressPattern::new(r"^p=(\S+)$", false).unwrap();
        assert_eq!(p.parse_line("p=abc"), None);
    }

    #[test]
    fn detects_missing_capture_group() {
        let p = ProgressPattern::new(r"^progress", true).unwrap();
        assert!(!p.has_capture_group());
        assert_eq!(p.parse_line("progress: 3%"), None);
    }
}
