// Ship registration models

use serde::{Deserialize, Serialize};

/// Operational status of a ship; anything stored other than "Active" reads as Inactive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShipStatus {
    Active,
    #[default]
    Inactive,
}

impl ShipStatus {
    pub fn from_stored(s: &str) -> Self {
        if s == "Active" {
            ShipStatus::Active
        } else {
            ShipStatus::Inactive
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ShipStatus::Active => "Active",
            ShipStatus::Inactive => "Inactive",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ship {
    /// IMO number; primary key.
    pub imo: String,
    pub ship_name: String,
    pub year_built: i32,
    pub owner: String,
    pub owner_contact: String,
    pub location_from: String,
    pub location_to: String,
    pub coordinate_x: f64,
    pub coordinate_y: f64,
    pub status: ShipStatus,
    pub user_id: Option<i64>,
}

impl Ship {
    pub fn route(&self) -> String {
        format!("{} → {}", self.location_from, self.location_to)
    }
}

/// Registration payload for POST /api/ships.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewShip {
    pub imo: String,
    pub ship_name: String,
    pub year_built: i32,
    pub owner: String,
    pub owner_contact: String,
    pub location_from: String,
    pub location_to: String,
    pub coordinate_x: f64,
    pub coordinate_y: f64,
    #[serde(default)]
    pub status: Option<ShipStatus>,
    #[serde(default)]
    pub user_id: Option<i64>,
}

impl NewShip {
    /// Reject blank required text fields; the error names the first one found.
    pub fn validate(&self) -> Result<(), String> {
        let required = [
            ("imo", &self.imo),
            ("shipName", &self.ship_name),
            ("owner", &self.owner),
            ("ownerContact", &self.owner_contact),
            ("locationFrom", &self.location_from),
            ("locationTo", &self.location_to),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(format!("Missing field: {}", field));
            }
        }
        if self.year_built <= 0 {
            return Err(format!("Invalid yearBuilt: {}", self.year_built));
        }
        Ok(())
    }
}
