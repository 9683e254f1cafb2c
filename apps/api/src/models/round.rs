use chrono::{DateTime, Utc};
use serde::{de::IgnoredAny, Deserialize, Serialize};

use super::{check_latitude, check_longitude, require_non_blank, Patch};
use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// The geographic footprint of a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundArea {
    pub center: GeoPoint,
    /// Metres.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
}

impl RoundArea {
    fn validate(&self) -> Result<(), AppError> {
        check_latitude(self.center.latitude)?;
        check_longitude(self.center.longitude)?;
        if let Some(radius) = self.radius {
            if radius.is_nan() || radius < 0.0 {
                return Err(AppError::validation("area radius must not be negative"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// 0 = Sunday .. 6 = Saturday.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_week: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<RoundArea>,
    /// Member customer ids.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customers: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/rounds`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewRound {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_week: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<RoundArea>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customers: Option<Vec<String>>,
    /// Server-assigned; accepted and ignored.
    #[serde(default, skip_serializing)]
    pub id: Option<IgnoredAny>,
    #[serde(default, skip_serializing)]
    pub created_at: Option<IgnoredAny>,
    #[serde(default, skip_serializing)]
    pub updated_at: Option<IgnoredAny>,
}

impl NewRound {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        require_non_blank("name", &self.name)?;
        if let Some(day) = self.day_of_week {
            check_day_of_week(day)?;
        }
        if let Some(area) = &self.area {
            area.validate()?;
        }
        Ok(())
    }

    pub fn into_record(self, id: String, now: DateTime<Utc>) -> Round {
        Round {
            id,
            name: self.name,
            description: self.description,
            color: self.color,
            day_of_week: self.day_of_week,
            area: self.area,
            customers: self.customers,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Body of `PUT /api/rounds/:id`. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RoundPatch {
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub name: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub description: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub color: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub day_of_week: Patch<u8>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub area: Patch<RoundArea>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub customers: Patch<Vec<String>>,
    #[serde(default, skip_serializing)]
    pub id: Option<IgnoredAny>,
    #[serde(default, skip_serializing)]
    pub created_at: Option<IgnoredAny>,
    #[serde(default, skip_serializing)]
    pub updated_at: Option<IgnoredAny>,
}

impl RoundPatch {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(name) = self.name.value() {
            require_non_blank("name", name)?;
        }
        if let Some(&day) = self.day_of_week.value() {
            check_day_of_week(day)?;
        }
        if let Some(area) = self.area.value() {
            area.validate()?;
        }
        Ok(())
    }
}

impl Round {
    /// Merges `patch` over this record. Does not touch `updated_at`.
    pub fn apply(&mut self, patch: RoundPatch) -> Result<(), AppError> {
        patch.validate()?;
        // `name` is the only required field, so nothing below can fail after it.
        patch.name.apply_required("name", &mut self.name)?;
        patch.description.apply(&mut self.description);
        patch.color.apply(&mut self.color);
        patch.day_of_week.apply(&mut self.day_of_week);
        patch.area.apply(&mut self.area);
        patch.customers.apply(&mut self.customers);
        Ok(())
    }
}

fn check_day_of_week(day: u8) -> Result<(), AppError> {
    if day > 6 {
        return Err(AppError::validation(
            "dayOfWeek must be between 0 (Sunday) and 6 (Saturday)",
        ));
    }
    Ok(())
}
