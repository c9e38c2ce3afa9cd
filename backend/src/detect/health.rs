use std::collections::BTreeSet;

/// Coarse two-outcome heuristic over the observed labels. Fixed, not
/// configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    AppearsNormal,
    NeedsManualCheck,
}

impl HealthStatus {
    pub fn suffix(&self) -> &'static str {
        match self {
            HealthStatus::AppearsNormal => " | Health Status: Appears Normal",
            HealthStatus::NeedsManualCheck => " | Health Status: Needs Manual Check",
        }
    }
}

/// No status for an empty label set; otherwise dog-or-cat presence decides.
pub fn assess(labels: &BTreeSet<String>) -> Option<HealthStatus> {
    if labels.is_empty() {
        return None;
    }
    if labels.contains("dog") || labels.contains("cat") {
        Some(HealthStatus::AppearsNormal)
    } else {
        Some(HealthStatus::NeedsManualCheck)
    }
}
