use bookreview_db::Collection;
use bookreview_http::error::AppError;
use bson::oid::ObjectId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::catalog::Entity;
use crate::modules::authors::models::AuthorView;
use crate::modules::reviews::models::ReviewView;
use crate::validation::{lenient_date, FieldErrors};

pub(crate) const INVALID_BOOK: &str = "Invalid book";

/// Stored book record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub summary: String,
    pub publication_date: NaiveDate,
    /// Id of the author; may dangle once the author is deleted
    pub author: ObjectId,
    #[serde(default)]
    pub total_sales: i64,
}

impl Entity for Book {
    const COLLECTION: Collection = Collection::Books;

    fn id(&self) -> ObjectId {
        self.id
    }
}

/// Request body for creating or updating a book
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct BookPayload {
    #[schema(example = "T")]
    pub name: Option<String>,
    #[schema(example = "S")]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "lenient_date")]
    #[schema(value_type = Option<String>, format = Date, example = "2020-01-01")]
    pub publication_date: Option<NaiveDate>,
    /// Id of an existing author
    #[schema(example = "65f1c0ffee0000000000beef")]
    pub author: Option<String>,
    pub total_sales: Option<i64>,
}

/// Fields of a book being changed
#[derive(Debug, Default, Serialize)]
pub struct BookChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<ObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_sales: Option<i64>,
}

impl BookPayload {
    /// Validate a create request. The author id is only checked for shape
    /// here; the handler checks that it resolves.
    pub fn into_book(self) -> Result<Book, AppError> {
        let mut errors = FieldErrors::new();
        let name = errors.required_text("name", self.name);
        let summary = errors.required_text("summary", self.summary);
        let publication_date = errors.required("publication_date", self.publication_date);
        let author = errors
            .required("author", self.author)
            .and_then(|raw| errors.reference("author", &raw));
        let total_sales = match self.total_sales {
            Some(value) => errors.at_least("total_sales", value, 0),
            None => Some(0),
        };

        match (name, summary, publication_date, author, total_sales) {
            (Some(name), Some(summary), Some(publication_date), Some(author), Some(total_sales))
                if errors.is_empty() =>
            {
                Ok(Book {
                    id: ObjectId::new(),
                    name,
                    summary,
                    publication_date,
                    author,
                    total_sales,
                })
            }
            _ => Err(errors.into_error(INVALID_BOOK)),
        }
    }

    pub fn into_changes(self) -> Result<BookChanges, AppError> {
        let mut errors = FieldErrors::new();
        let changes = BookChanges {
            name: self.name.and_then(|name| errors.text("name", name)),
            summary: self.summary.and_then(|summary| errors.text("summary", summary)),
            publication_date: self.publication_date,
            author: self
                .author
                .and_then(|raw| errors.reference("author", &raw)),
            total_sales: self
                .total_sales
                .and_then(|value| errors.at_least("total_sales", value, 0)),
        };
        errors.finish(INVALID_BOOK)?;
        Ok(changes)
    }
}

/// Book as returned by the API, with its author embedded
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BookView {
    pub id: String,
    pub name: String,
    pub summary: String,
    #[schema(value_type = String, format = Date)]
    pub publication_date: NaiveDate,
    /// The author, or null when the referenced author no longer exists
    pub author: Option<AuthorView>,
    pub total_sales: i64,
}

impl BookView {
    pub fn new(book: Book, author: Option<AuthorView>) -> Self {
        Self {
            id: book.id.to_hex(),
            name: book.name,
            summary: book.summary,
            publication_date: book.publication_date,
            author,
            total_sales: book.total_sales,
        }
    }
}

/// Query of `GET /search`
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Words to look for in book names and summaries
    pub q: Option<String>,
}

/// Query of `GET /top-sales`
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TopSalesQuery {
    /// Number of books to return, 1 to 100 (default 5)
    pub limit: Option<i64>,
}

impl TopSalesQuery {
    pub const DEFAULT_LIMIT: i64 = 5;

    pub fn limit(&self) -> i64 {
        clamp_limit(self.limit, Self::DEFAULT_LIMIT)
    }
}

/// Query of `GET /top-rated`
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TopRatedQuery {
    /// Number of books to return, 1 to 100 (default 10)
    pub limit: Option<i64>,
}

impl TopRatedQuery {
    pub const DEFAULT_LIMIT: i64 = 10;

    pub fn limit(&self) -> i64 {
        clamp_limit(self.limit, Self::DEFAULT_LIMIT)
    }
}

pub const MAX_LIMIT: i64 = 100;

fn clamp_limit(limit: Option<i64>, default: i64) -> i64 {
    limit.unwrap_or(default).clamp(1, MAX_LIMIT)
}

/// Entry of `GET /top-sales`: the book plus sales context
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TopSellingBook {
    #[serde(flatten)]
    pub book: BookView,
    /// Sum of every sales figure of every book by the same author
    pub author_total_sales: i64,
    /// Whether the book is among the five best sellers of its publication
    /// year, counting that year's figures only
    pub in_top5_pub_year: bool,
}

/// Entry of `GET /top-rated`
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RatedBook {
    pub book: BookView,
    /// Mean review score
    pub avg_score: f64,
    /// Highest score, most up-voted on ties
    pub best: ReviewView,
    /// Lowest score, least up-voted on ties
    pub worst: ReviewView,
}
