use bookreview_db::Collection;
use bookreview_http::error::AppError;
use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::catalog::Entity;
use crate::validation::{FieldErrors, OUT_OF_RANGE};

pub(crate) const INVALID_SALE: &str = "Invalid sale";

/// Stored yearly sales figure of one book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub book: ObjectId,
    pub year: i32,
    pub sales: i64,
}

impl Entity for Sale {
    const COLLECTION: Collection = Collection::Sales;

    fn id(&self) -> ObjectId {
        self.id
    }
}

/// Request body for creating or updating a sale
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SalePayload {
    /// Id of an existing book
    pub book: Option<String>,
    #[schema(example = 2024)]
    pub year: Option<i64>,
    #[schema(minimum = 0, example = 15000)]
    pub sales: Option<i64>,
}

#[derive(Debug, Default, Serialize)]
pub struct SaleChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book: Option<ObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sales: Option<i64>,
}

fn checked_year(errors: &mut FieldErrors, value: i64) -> Option<i32> {
    let year = i32::try_from(value).ok();
    if year.is_none() {
        errors.push("year", OUT_OF_RANGE);
    }
    year
}

impl SalePayload {
    pub fn into_sale(self) -> Result<Sale, AppError> {
        let mut errors = FieldErrors::new();
        let book = errors
            .required("book", self.book)
            .and_then(|raw| errors.reference("book", &raw));
        let year = errors
            .required("year", self.year)
            .and_then(|value| checked_year(&mut errors, value));
        let sales = errors
            .required("sales", self.sales)
            .and_then(|value| errors.at_least("sales", value, 0));

        match (book, year, sales) {
            (Some(book), Some(year), Some(sales)) if errors.is_empty() => Ok(Sale {
                id: ObjectId::new(),
                book,
                year,
                sales,
            }),
            _ => Err(errors.into_error(INVALID_SALE)),
        }
    }

    pub fn into_changes(self) -> Result<SaleChanges, AppError> {
        let mut errors = FieldErrors::new();
        let changes = SaleChanges {
            book: self.book.and_then(|raw| errors.reference("book", &raw)),
            year: self.year.and_then(|value| checked_year(&mut errors, value)),
            sales: self
                .sales
                .and_then(|value| errors.at_least("sales", value, 0)),
        };
        errors.finish(INVALID_SALE)?;
        Ok(changes)
    }
}

/// Sale as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SaleView {
    pub id: String,
    /// Id of the book sold
    pub book: String,
    pub year: i32,
    pub sales: i64,
}

impl From<Sale> for SaleView {
    fn from(sale: Sale) -> Self {
        Self {
            id: sale.id.to_hex(),
            book: sale.book.to_hex(),
            year: sale.year,
            sales: sale.sales,
        }
    }
}
