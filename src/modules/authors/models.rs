use bookreview_db::Collection;
use bookreview_http::error::AppError;
use bson::oid::ObjectId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::catalog::Entity;
use crate::validation::{lenient_date, FieldErrors};

const INVALID_AUTHOR: &str = "Invalid author";

/// Stored author record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub country: String,
    #[serde(default)]
    pub description: String,
}

impl Entity for Author {
    const COLLECTION: Collection = Collection::Authors;

    fn id(&self) -> ObjectId {
        self.id
    }
}

/// Request body for creating or updating an author.
/// Create requires `name`, `date_of_birth` and `country`; update applies
/// whichever fields are present.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AuthorPayload {
    #[schema(example = "A. Doe")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_date")]
    #[schema(value_type = Option<String>, format = Date, example = "1970-01-01")]
    pub date_of_birth: Option<NaiveDate>,
    #[schema(example = "US")]
    pub country: Option<String>,
    pub description: Option<String>,
}

/// Fields of an author being changed; unset fields are left untouched.
#[derive(Debug, Default, Serialize)]
pub struct AuthorChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AuthorPayload {
    pub fn into_author(self) -> Result<Author, AppError> {
        let mut errors = FieldErrors::new();
        let name = errors.required_text("name", self.name);
        let date_of_birth = errors.required("date_of_birth", self.date_of_birth);
        let country = errors.required_text("country", self.country);

        match (name, date_of_birth, country) {
            (Some(name), Some(date_of_birth), Some(country)) if errors.is_empty() => Ok(Author {
                id: ObjectId::new(),
                name,
                date_of_birth,
                country,
                description: self.description.unwrap_or_default(),
            }),
            _ => Err(errors.into_error(INVALID_AUTHOR)),
        }
    }

    pub fn into_changes(self) -> Result<AuthorChanges, AppError> {
        let mut errors = FieldErrors::new();
        let changes = AuthorChanges {
            name: self.name.and_then(|name| errors.text("name", name)),
            date_of_birth: self.date_of_birth,
            country: self.country.and_then(|country| errors.text("country", country)),
            description: self.description,
        };
        errors.finish(INVALID_AUTHOR)?;
        Ok(changes)
    }
}

/// Author as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AuthorView {
    /// Unique identifier for the author
    pub id: String,
    pub name: String,
    #[schema(value_type = String, format = Date)]
    pub date_of_birth: NaiveDate,
    pub country: String,
    pub description: String,
}

impl From<Author> for AuthorView {
    fn from(author: Author) -> Self {
        Self {
            id: author.id.to_hex(),
            name: author.name,
            date_of_birth: author.date_of_birth,
            country: author.country,
            description: author.description,
        }
    }
}
