// Corrosion status labels, per-device status sets and ship health classification

use serde::{Deserialize, Serialize};

/// Max devices attached to one ship.
pub const MAX_DEVICES: usize = 4;

/// Corrosion status label reported by a device. Variant order is severity order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CorrosionStatus {
    Low,
    Medium,
    High,
}

impl CorrosionStatus {
    /// Normalize a stored label (case-insensitive, surrounding whitespace ignored).
    /// Anything outside Low/Medium/High is treated as absent.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Some(CorrosionStatus::Low),
            "medium" => Some(CorrosionStatus::Medium),
            "high" => Some(CorrosionStatus::High),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CorrosionStatus::Low => "Low",
            CorrosionStatus::Medium => "Medium",
            CorrosionStatus::High => "High",
        }
    }

    /// Badge color for a single device.
    pub fn color(self) -> StatusColor {
        match self {
            CorrosionStatus::Low => StatusColor::Green,
            CorrosionStatus::Medium => StatusColor::Yellow,
            CorrosionStatus::High => StatusColor::Red,
        }
    }
}

impl std::fmt::Display for CorrosionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display color tag; serializes to lowercase JSON (e.g. "red").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusColor {
    Gray,
    Green,
    Yellow,
    Red,
}

/// Ship-level health derived from its devices' latest statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthLevel {
    Unknown,
    Good,
    Warning,
    Critical,
}

impl HealthLevel {
    pub fn color(self) -> StatusColor {
        match self {
            HealthLevel::Unknown => StatusColor::Gray,
            HealthLevel::Good => StatusColor::Green,
            HealthLevel::Warning => StatusColor::Yellow,
            HealthLevel::Critical => StatusColor::Red,
        }
    }

    /// Operator guidance shown next to the health badge.
    pub fn advisory(self) -> &'static str {
        match self {
            HealthLevel::Unknown => "No recent device status is available for this ship.",
            HealthLevel::Good => {
                "All sensors are reporting normal corrosion levels. Hull integrity is good and no immediate action is required."
            }
            HealthLevel::Warning => {
                "Some sensors are reporting elevated corrosion levels. Schedule maintenance soon to prevent further deterioration."
            }
            HealthLevel::Critical => {
                "Critical corrosion detected! Immediate action required to prevent hull damage. Contact maintenance team immediately."
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallClassification {
    pub level: HealthLevel,
    pub color: StatusColor,
}

impl OverallClassification {
    pub fn new(level: HealthLevel) -> Self {
        Self {
            level,
            color: level.color(),
        }
    }

    pub fn advisory(&self) -> &'static str {
        self.level.advisory()
    }
}

/// Latest known status of one device; `None` when the device has no usable label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    pub device: String,
    pub status: Option<CorrosionStatus>,
}

/// Latest status per device for one ship, in slot order. Holds at most MAX_DEVICES devices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DeviceStatusSet {
    devices: Vec<DeviceStatus>,
}

impl DeviceStatusSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a device's status, replacing any previous entry for the same device.
    /// Returns false (and changes nothing) when the set is full and the device is new.
    pub fn insert(&mut self, device: impl Into<String>, status: Option<CorrosionStatus>) -> bool {
        let device = device.into();
        if let Some(existing) = self.devices.iter_mut().find(|d| d.device == device) {
            existing.status = status;
            return true;
        }
        if self.devices.len() >= MAX_DEVICES {
            return false;
        }
        self.devices.push(DeviceStatus { device, status });
        true
    }

    /// Build from raw stored labels; unknown labels become absent statuses.
    /// Devices past the first MAX_DEVICES are dropped (logged at debug).
    pub fn from_labels<I, D, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = (D, Option<S>)>,
        D: Into<String>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for (device, label) in labels {
            let device = device.into();
            let status = label.as_ref().and_then(|l| CorrosionStatus::parse(l.as_ref()));
            if !set.insert(device.clone(), status) {
                tracing::debug!(
                    device = %device,
                    max = MAX_DEVICES,
                    "device status dropped: set is full"
                );
            }
        }
        set
    }

    pub fn devices(&self) -> &[DeviceStatus] {
        &self.devices
    }

    pub fn get(&self, device: &str) -> Option<CorrosionStatus> {
        self.devices
            .iter()
            .find(|d| d.device == device)
            .and_then(|d| d.status)
    }

    /// Statuses of devices that reported a known label.
    pub fn present(&self) -> impl Iterator<Item = CorrosionStatus> + '_ {
        self.devices.iter().filter_map(|d| d.status)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
