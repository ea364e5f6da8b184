use bookreview_db::Collection;
use bookreview_http::error::AppError;
use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::catalog::Entity;
use crate::validation::FieldErrors;

pub(crate) const INVALID_REVIEW: &str = "Invalid review";

pub const MIN_SCORE: i64 = 1;
pub const MAX_SCORE: i64 = 5;

/// Stored review record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub book: ObjectId,
    pub score: i32,
    #[serde(default)]
    pub up_votes: i64,
}

impl Entity for Review {
    const COLLECTION: Collection = Collection::Reviews;

    fn id(&self) -> ObjectId {
        self.id
    }
}

/// Request body for creating or updating a review
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ReviewPayload {
    /// Id of an existing book
    pub book: Option<String>,
    /// 1 to 5
    #[schema(minimum = 1, maximum = 5, example = 4)]
    pub score: Option<i64>,
    #[schema(minimum = 0)]
    pub up_votes: Option<i64>,
}

#[derive(Debug, Default, Serialize)]
pub struct ReviewChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book: Option<ObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub up_votes: Option<i64>,
}

fn checked_score(errors: &mut FieldErrors, value: i64) -> Option<i32> {
    errors
        .within("score", value, MIN_SCORE, MAX_SCORE)
        .and_then(|score| i32::try_from(score).ok())
}

impl ReviewPayload {
    pub fn into_review(self) -> Result<Review, AppError> {
        let mut errors = FieldErrors::new();
        let book = errors
            .required("book", self.book)
            .and_then(|raw| errors.reference("book", &raw));
        let score = errors
            .required("score", self.score)
            .and_then(|value| checked_score(&mut errors, value));
        let up_votes = match self.up_votes {
            Some(value) => errors.at_least("up_votes", value, 0),
            None => Some(0),
        };

        match (book, score, up_votes) {
            (Some(book), Some(score), Some(up_votes)) if errors.is_empty() => Ok(Review {
                id: ObjectId::new(),
                book,
                score,
                up_votes,
            }),
            _ => Err(errors.into_error(INVALID_REVIEW)),
        }
    }

    pub fn into_changes(self) -> Result<ReviewChanges, AppError> {
        let mut errors = FieldErrors::new();
        let changes = ReviewChanges {
            book: self.book.and_then(|raw| errors.reference("book", &raw)),
            score: self.score.and_then(|value| checked_score(&mut errors, value)),
            up_votes: self
                .up_votes
                .and_then(|value| errors.at_least("up_votes", value, 0)),
        };
        errors.finish(INVALID_REVIEW)?;
        Ok(changes)
    }
}

/// Review as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ReviewView {
    pub id: String,
    /// Id of the reviewed book
    pub book: String,
    pub score: i32,
    pub up_votes: i64,
}

impl From<Review> for ReviewView {
    fn from(review: Review) -> Self {
        Self {
            id: review.id.to_hex(),
            book: review.book.to_hex(),
            score: review.score,
            up_votes: review.up_votes,
        }
    }
}
