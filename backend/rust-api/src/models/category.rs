use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::Validate;

use super::user::bson_datetime_as_chrono;

pub const CATEGORIES_COLLECTION: &str = "categories";

/// Category model stored in MongoDB "categories" collection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Unique (index ensured at start-up)
    pub name: String,

    pub description: String,

    pub language: Language,

    #[serde(with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "bson_datetime_as_chrono")]
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Eng,
    Fr,
}

impl Language {
    pub const ALLOWED: [&'static str; 2] = ["eng", "fr"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Eng => "eng",
            Language::Fr => "fr",
        }
    }
}

impl FromStr for Language {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "eng" => Ok(Language::Eng),
            "fr" => Ok(Language::Fr),
            _ => Err(()),
        }
    }
}

/// Category as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub language: Language,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        CategoryResponse {
            id: category.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: category.name,
            description: category.description,
            language: category.language,
            created_at: category.created_at,
            updated_at: category.updated_at,
        }
    }
}

/// Fields that passed request validation, checked against the schema
/// constraints right before insert.
#[derive(Debug, Clone, Validate)]
pub struct NewCategory {
    #[validate(length(min = 1, message = "Category name is required"))]
    pub name: String,

    #[validate(length(min = 1, message = "Category description is required"))]
    pub description: String,

    pub language: Language,
}

impl NewCategory {
    pub fn into_category(self) -> Category {
        let now = Utc::now();
        Category {
            id: None,
            name: self.name,
            description: self.description,
            language: self.language,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update; `None` means the field was absent from the request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub language: Option<Language>,
}

impl CategoryPatch {
    /// Applies the fields that differ from `category` and returns their
    /// stored names. Timestamps are left alone.
    pub fn apply_to(&self, category: &mut Category) -> Vec<&'static str> {
        let mut changed = Vec::new();

        if let Some(name) = &self.name {
            if *name != category.name {
                category.name = name.clone();
                changed.push("name");
            }
        }

        if let Some(description) = &self.description {
            if *description != category.description {
                category.description = description.clone();
                changed.push("description");
            }
        }

        if let Some(language) = self.language {
            if language != category.language {
                category.language = language;
                changed.push("language");
            }
        }

        changed
    }
}
