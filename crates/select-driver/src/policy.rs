use std::time::Duration;

/// Timing knobs for one selection sequence. Budgets bound the
/// observed-condition waits; the gaps are fixed pauses the host page needs
/// between committed changes.
#[derive(Clone, Debug)]
pub struct SelectPolicy {
    /// Interval between condition probes.
    pub poll_interval: Duration,
    /// Budget for a popup to appear after clicking a toggle.
    pub popup_budget: Duration,
    /// Budget for a popup to appear after typing into a text input; larger
    /// because the page processes the input first.
    pub popup_budget_typed: Duration,
    /// Budget for the option list to settle after a search-box write.
    pub filter_budget: Duration,
    /// Pause after clearing a search box before typing the next value.
    pub clear_gap: Duration,
    /// Pause between consecutive reviewer selections.
    pub reviewer_gap: Duration,
    /// Pause between consecutive label selections.
    pub label_gap: Duration,
}

impl Default for SelectPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
            popup_budget: Duration::from_millis(1000),
            popup_budget_typed: Duration::from_millis(1500),
            filter_budget: Duration::from_millis(1000),
            clear_gap: Duration::from_millis(500),
            reviewer_gap: Duration::from_millis(1500),
            label_gap: Duration::from_millis(1000),
        }
    }
}

impl SelectPolicy {
    /// All-zero timings; probes still run once. For tests.
    pub fn immediate() -> Self {
        Self {
            poll_interval: Duration::ZERO,
            popup_budget: Duration::ZERO,
            popup_budget_typed: Duration::ZERO,
            filter_budget: Duration::ZERO,
            clear_gap: Duration::ZERO,
            reviewer_gap: Duration::ZERO,
            label_gap: Duration::ZERO,
        }
    }
}
