//! Pet record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A pet record as stored in the remote document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    pub id: String,
    pub name: String,
    pub age: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub breed: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// uid of the owning identity.
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a new pet. Ownership and timestamps are assigned by
/// the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetDraft {
    pub name: String,
    pub age: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub breed: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Partial update for an existing pet. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Pet {
    /// Apply a partial update in place, bumping `updated_at`.
    pub fn apply(&mut self, update: PetUpdate, now: DateTime<Utc>) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(age) = update.age {
            self.age = age;
        }
        if let Some(category) = update.category {
            self.category = Some(category);
        }
        if let Some(breed) = update.breed {
            self.breed = Some(breed);
        }
        if let Some(photo_url) = update.photo_url {
            self.photo_url = Some(photo_url);
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pet() -> Pet {
        Pet {
            id: "p1".to_string(),
            name: "Rex".to_string(),
            age: "3".to_string(),
            category: Some("dog".to_string()),
            breed: None,
            photo_url: None,
            description: Some("Good boy".to_string()),
            owner_id: "u1".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_apply_only_touches_present_fields() {
        let mut pet = sample_pet();
        let created = pet.created_at;
        let now = Utc::now();
        pet.apply(
            PetUpdate {
                name: Some("Max".to_string()),
                ..Default::default()
            },
            now,
        );
        assert_eq!(pet.name, "Max");
        assert_eq!(pet.age, "3");
        assert_eq!(pet.category.as_deref(), Some("dog"));
        assert_eq!(pet.created_at, created);
        assert_eq!(pet.updated_at, now);
    }

    #[test]
    fn test_update_skips_absent_fields_on_the_wire() {
        let update = PetUpdate {
            age: Some("4".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 1);
        assert_eq!(json["age"], "4");
    }
}
