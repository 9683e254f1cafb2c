use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::AppError;

/// One field of a partial update.
///
/// Distinguishes a key that was left out of the request (`Absent`) from one
/// sent as `null` (`Null`). Any other value, including `0`, `false` and `""`,
/// is `Value`. Declare fields with
/// `#[serde(default, skip_serializing_if = "Patch::is_absent")]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Patch<T> {
    #[default]
    Absent,
    Null,
    Value(T),
}

impl<T> Patch<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Patch::Absent)
    }

    /// The new value, if one was sent.
    pub fn value(&self) -> Option<&T> {
        match self {
            Patch::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Applies the patch to an optional field: `null` clears it.
    pub fn apply(self, target: &mut Option<T>) {
        match self {
            Patch::Absent => {}
            Patch::Null => *target = None,
            Patch::Value(v) => *target = Some(v),
        }
    }

    /// Applies the patch to a required field: `null` is rejected.
    pub fn apply_required(self, field: &str, target: &mut T) -> Result<(), AppError> {
        match self {
            Patch::Absent => Ok(()),
            Patch::Null => Err(AppError::validation(format!("{field} cannot be null"))),
            Patch::Value(v) => {
                *target = v;
                Ok(())
            }
        }
    }
}

impl<T> From<T> for Patch<T> {
    fn from(value: T) -> Self {
        Patch::Value(value)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Only reached when the key is present; absent keys use `Default`.
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(v) => Patch::Value(v),
            None => Patch::Null,
        })
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Patch::Value(v) => v.serialize(serializer),
            _ => serializer.serialize_none(),
        }
    }
}
