use chrono::{DateTime, Utc};
use serde::{de::IgnoredAny, Deserialize, Serialize};

use super::{check_latitude, check_longitude, require_non_blank, Patch};
use crate::errors::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub address: String,
    /// 0 until the address has been geocoded.
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Set when the geocoder matched the address above the confidence threshold.
    #[serde(default)]
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/customers`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewCustomer {
    pub name: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    /// Server-assigned; accepted and ignored.
    #[serde(default, skip_serializing)]
    pub id: Option<IgnoredAny>,
    #[serde(default, skip_serializing)]
    pub created_at: Option<IgnoredAny>,
    #[serde(default, skip_serializing)]
    pub updated_at: Option<IgnoredAny>,
}

impl NewCustomer {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        require_non_blank("name", &self.name)?;
        require_non_blank("address", &self.address)?;
        if let Some(lat) = self.latitude {
            check_latitude(lat)?;
        }
        if let Some(lng) = self.longitude {
            check_longitude(lng)?;
        }
        Ok(())
    }

    pub fn into_record(self, id: String, now: DateTime<Utc>) -> Customer {
        Customer {
            id,
            name: self.name,
            address: self.address,
            latitude: self.latitude.unwrap_or(0.0),
            longitude: self.longitude.unwrap_or(0.0),
            email: self.email,
            phone: self.phone,
            notes: self.notes,
            verified: self.verified.unwrap_or(false),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Body of `PUT /api/customers/:id`. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CustomerPatch {
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub name: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub address: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub latitude: Patch<f64>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub longitude: Patch<f64>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub email: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub phone: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub notes: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub verified: Patch<bool>,
    #[serde(default, skip_serializing)]
    pub id: Option<IgnoredAny>,
    #[serde(default, skip_serializing)]
    pub created_at: Option<IgnoredAny>,
    #[serde(default, skip_serializing)]
    pub updated_at: Option<IgnoredAny>,
}

impl CustomerPatch {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(name) = self.name.value() {
            require_non_blank("name", name)?;
        }
        if let Some(address) = self.address.value() {
            require_non_blank("address", address)?;
        }
        if let Some(&lat) = self.latitude.value() {
            check_latitude(lat)?;
        }
        if let Some(&lng) = self.longitude.value() {
            check_longitude(lng)?;
        }
        Ok(())
    }
}

impl Customer {
    /// Merges `patch` over this record. Does not touch `updated_at`.
    /// On error the record is left unchanged.
    pub fn apply(&mut self, patch: CustomerPatch) -> Result<(), AppError> {
        patch.validate()?;
        let mut next = self.clone();
        patch.name.apply_required("name", &mut next.name)?;
        patch.address.apply_required("address", &mut next.address)?;
        patch.latitude.apply_required("latitude", &mut next.latitude)?;
        patch.longitude.apply_required("longitude", &mut next.longitude)?;
        patch.verified.apply_required("verified", &mut next.verified)?;
        patch.email.apply(&mut next.email);
        patch.phone.apply(&mut next.phone);
        patch.notes.apply(&mut next.notes);
        *self = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer() -> Customer {
        NewCustomer {
            email: Some("ada@example.com".into()),
            notes: Some("Side gate".into()),
            ..NewCustomer::new("Ada", "1 High St, Worthing")
        }
        .into_record("c-1".into(), Utc::now())
    }

    #[test]
    fn test_defaults_on_create() {
        let c = NewCustomer::new("Ada", "1 High St").into_record("x".into(), Utc::now());
        assert_eq!(c.latitude, 0.0);
        assert_eq!(c.longitude, 0.0);
        assert!(!c.verified);
        assert_eq!(c.created_at, c.updated_at);
    }

    #[test]
    fn test_create_ignores_client_id_and_timestamps() {
        let body = r#"{"id":"evil","name":"Ada","address":"1 High St","createdAt":"1999-01-01T00:00:00Z"}"#;
        let input: NewCustomer = serde_json::from_str(body).unwrap();
        let c = input.into_record("server-id".into(), Utc::now());
        assert_eq!(c.id, "server-id");
    }

    #[test]
    fn test_create_rejects_unknown_fields() {
        let body = r#"{"name":"Ada","address":"1 High St","favouriteColour":"blue"}"#;
        assert!(serde_json::from_str::<NewCustomer>(body).is_err());
    }

    #[test]
    fn test_create_requires_name_and_address() {
        assert!(serde_json::from_str::<NewCustomer>(r#"{"name":"Ada"}"#).is_err());
        assert!(NewCustomer::new("  ", "1 High St").validate().is_err());
        assert!(NewCustomer::new("Ada", "").validate().is_err());
    }

    #[test]
    fn test_patch_keeps_absent_fields() {
        let mut c = customer();
        let patch: CustomerPatch = serde_json::from_str(r#"{"phone":"01903 000000"}"#).unwrap();
        c.apply(patch).unwrap();
        assert_eq!(c.phone.as_deref(), Some("01903 000000"));
        assert_eq!(c.email.as_deref(), Some("ada@example.com"));
        assert_eq!(c.name, "Ada");
    }

    #[test]
    fn test_patch_accepts_falsy_values() {
        let mut c = customer();
        c.latitude = 50.8;
        c.verified = true;
        let patch: CustomerPatch =
            serde_json::from_str(r#"{"latitude":0,"verified":false,"notes":""}"#).unwrap();
        c.apply(patch).unwrap();
        assert_eq!(c.latitude, 0.0);
        assert!(!c.verified);
        assert_eq!(c.notes.as_deref(), Some(""));
    }

    #[test]
    fn test_patch_null_clears_optional_but_not_required() {
        let mut c = customer();
        let patch: CustomerPatch = serde_json::from_str(r#"{"email":null}"#).unwrap();
        c.apply(patch).unwrap();
        assert_eq!(c.email, None);

        let patch: CustomerPatch = serde_json::from_str(r#"{"name":null}"#).unwrap();
        assert!(c.apply(patch).is_err());
        assert_eq!(c.name, "Ada");
    }

    #[test]
    fn test_patch_rejects_out_of_range_coordinates() {
        let mut c = customer();
        let patch: CustomerPatch = serde_json::from_str(r#"{"latitude":123.0}"#).unwrap();
        assert!(c.apply(patch).is_err());
        assert_eq!(c.latitude, 0.0);
    }
}
