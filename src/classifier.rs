// Ship health: reduce each device's latest corrosion status to one classification.
// Highest severity wins: any High is Critical, whatever the other devices report.

use crate::models::{CorrosionStatus, DeviceStatusSet, HealthLevel, OverallClassification};

pub fn classify(statuses: &DeviceStatusSet) -> OverallClassification {
    let level = match statuses.present().max() {
        None => HealthLevel::Unknown,
        Some(CorrosionStatus::High) => HealthLevel::Critical,
        Some(CorrosionStatus::Medium) => HealthLevel::Warning,
        Some(CorrosionStatus::Low) => HealthLevel::Good,
    };
    OverallClassification::new(level)
}

/// Classify raw stored labels, one per device slot (`device1`..). Unknown labels count as absent.
pub fn classify_labels<I, S>(labels: I) -> OverallClassification
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    let set = DeviceStatusSet::from_labels(
        labels
            .into_iter()
            .enumerate()
            .map(|(i, label)| (format!("device{}", i + 1), label)),
    );
    classify(&set)
}
