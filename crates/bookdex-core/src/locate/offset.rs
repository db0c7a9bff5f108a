/// Accumulates printed-page-number observations across a whole document and
/// resolves them to a single printed-to-physical offset.
///
/// Printed numbers are noisy: headers, footnotes and OCR artifacts all
/// produce spurious digit runs. Taking the mode over every page's deltas is
/// robust to those outliers in a way a mean is not, and sampling all pages
/// rather than only index pages maximizes the sample size.
#[derive(Debug, Default)]
pub struct OffsetEstimator {
    deltas: Vec<i64>,
}

impl OffsetEstimator {
    pub fn new() -> OffsetEstimator {
        OffsetEstimator::default()
    }

    /// Record the deltas a page contributes: one for a leading printed
    /// number, one for a trailing printed number. A page may contribute
    /// zero, one, or two deltas.
    pub fn observe(&mut self, physical_page: usize, text: &str) {
        if let Some(printed) = leading_number(text) {
            self.deltas.push(physical_page as i64 - printed as i64);
        }
        if let Some(printed) = trailing_number(text) {
            self.deltas.push(physical_page as i64 - printed as i64);
        }
    }

    pub fn sample_count(&self) -> usize {
        self.deltas.len()
    }

    /// Resolve to the most frequent delta, ties broken by the value seen
    /// first. Returns `(0, true)` when nothing was observed: the zero
    /// offset is a degraded default, not a measurement.
    pub fn resolve(&self) -> (i64, bool) {
        if self.deltas.is_empty() {
            return (0, true);
        }

        let mut best = self.deltas[0];
        let mut best_count = 0;
        let mut counted: Vec<i64> = Vec::new();

        for &candidate in &self.deltas {
            if counted.contains(&candidate) {
                continue;
            }
            counted.push(candidate);
            let count = self.deltas.iter().filter(|&&d| d == candidate).count();
            if count > best_count {
                best = candidate;
                best_count = count;
            }
        }

        (best, false)
    }
}

/// Digit run at the very start of the text, parsed as a printed page number.
fn leading_number(text: &str) -> Option<u32> {
    let run: String = text.chars().take_while(|c| c.is_ascii_digit()).collect();
    if run.is_empty() {
        return None;
    }
    run.parse().ok()
}

/// Digit run at the very end of the text, trailing whitespace tolerated.
fn trailing_number(text: &str) -> Option<u32> {
    let trimmed = text.trim_end();
    let run: String = trimmed
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if run.is_empty() {
        return None;
    }
    run.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_number() {
        assert_eq!(leading_number("14\nCats, 1"), Some(14));
        assert_eq!(leading_number("Cats, 1"), None);
        assert_eq!(leading_number(""), None);
    }

    #[test]
    fn test_trailing_number() {
        assert_eq!(trailing_number("Cats, 1\n27"), Some(27));
        assert_eq!(trailing_number("Cats, 1\n27\n  "), Some(27));
        assert_eq!(trailing_number("Cats"), None);
    }

    #[test]
    fn test_oversized_digit_run_ignored() {
        assert_eq!(leading_number("99999999999999999999 words"), None);
    }

    #[test]
    fn test_delta_is_physical_minus_printed() {
        let mut est = OffsetEstimator::new();
        est.observe(5, "3\nsome text");
        let (offset, degraded) = est.resolve();
        assert_eq!(offset, 2);
        assert!(!degraded);
    }

    #[test]
    fn test_mode_resolution() {
        let mut est = OffsetEstimator::new();
        est.observe(3, "1"); // delta 2
        est.observe(4, "2"); // delta 2
        est.observe(5, "3"); // delta 2
        est.observe(6, "3"); // delta 3
        let (offset, _) = est.resolve();
        assert_eq!(offset, 2);
    }

    #[test]
    fn test_tie_broken_by_first_encountered() {
        let mut est = OffsetEstimator::new();
        est.observe(4, "1"); // delta 3
        est.observe(5, "3"); // delta 2
        est.observe(6, "3"); // delta 3
        est.observe(7, "5"); // delta 2
        let (offset, _) = est.resolve();
        assert_eq!(offset, 3);
    }

    #[test]
    fn test_no_observations_degraded() {
        let est = OffsetEstimator::new();
        let (offset, degraded) = est.resolve();
        assert_eq!(offset, 0);
        assert!(degraded);
    }

    #[test]
    fn test_page_contributes_two_deltas() {
        let mut est = OffsetEstimator::new();
        est.observe(10, "8\nbody text\n8");
        assert_eq!(est.sample_count(), 2);
    }
}
