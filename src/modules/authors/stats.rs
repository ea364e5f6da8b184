//! Publishing figures per author.

use std::collections::HashMap;

use bookreview_db::{Filter, FindOptions, StoreResult};
use bson::{oid::ObjectId, Bson};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::catalog::{Catalog, Entity};

/// Column the statistics are ordered by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StatsSort {
    #[default]
    Name,
    Country,
    Books,
    Score,
    Sales,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Query of `GET /stats`
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuthorStatsQuery {
    /// Keep authors whose name contains this text, ignoring case
    pub name: Option<String>,
    /// Keep authors whose country contains this text, ignoring case
    pub country: Option<String>,
    /// Defaults to `name`
    #[param(inline)]
    pub sort: Option<StatsSort>,
    /// Defaults to `asc`
    #[param(inline)]
    pub order: Option<SortOrder>,
}

impl AuthorStatsQuery {
    fn filter(&self) -> Filter {
        let clauses = [("name", &self.name), ("country", &self.country)]
            .into_iter()
            .filter_map(|(field, value)| {
                let text = value.as_deref().map(str::trim).filter(|text| !text.is_empty())?;
                Some(Filter::contains(field, text))
            })
            .collect();
        Filter::Every(clauses)
    }
}

/// One row of the author statistics table
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AuthorStats {
    pub id: String,
    pub name: String,
    pub country: String,
    pub books_published: u64,
    /// Mean score of every review of the author's books, rounded to two
    /// decimals; 0 without reviews
    pub avg_score: f64,
    /// Sum of the yearly sales figures of the author's books
    pub total_sales: i64,
}

#[derive(Debug, Default)]
struct Tally {
    books: u64,
    score_sum: i64,
    reviews: i64,
    sales: i64,
}

impl Tally {
    fn average_score(&self) -> f64 {
        if self.reviews == 0 {
            return 0.0;
        }
        let average = self.score_sum as f64 / self.reviews as f64;
        (average * 100.0).round() / 100.0
    }
}

/// Compute the statistics of the authors matching `query`, sorted as asked.
pub async fn collect_stats(
    catalog: &Catalog,
    query: &AuthorStatsQuery,
) -> StoreResult<Vec<AuthorStats>> {
    let authors = catalog
        .authors
        .find(query.filter(), FindOptions::default())
        .await?;
    if authors.is_empty() {
        return Ok(Vec::new());
    }

    let author_ids = authors
        .iter()
        .map(|author| Bson::ObjectId(author.id()))
        .collect();
    let books = catalog
        .books
        .find(Filter::any_of("author", author_ids), FindOptions::default())
        .await?;
    let book_authors: HashMap<ObjectId, ObjectId> = books
        .iter()
        .map(|book| (book.id(), book.author))
        .collect();

    let mut tallies: HashMap<ObjectId, Tally> = HashMap::new();
    for book in &books {
        tallies.entry(book.author).or_default().books += 1;
    }

    if !book_authors.is_empty() {
        let book_ids: Vec<Bson> = book_authors.keys().copied().map(Bson::ObjectId).collect();
        let reviews = catalog
            .reviews
            .find(Filter::any_of("book", book_ids.clone()), FindOptions::default())
            .await?;
        for review in reviews {
            if let Some(author) = book_authors.get(&review.book) {
                let tally = tallies.entry(*author).or_default();
                tally.score_sum += i64::from(review.score);
                tally.reviews += 1;
            }
        }

        let sales = catalog
            .sales
            .find(Filter::any_of("book", book_ids), FindOptions::default())
            .await?;
        for sale in sales {
            if let Some(author) = book_authors.get(&sale.book) {
                let tally = tallies.entry(*author).or_default();
                tally.sales = tally.sales.saturating_add(sale.sales);
            }
        }
    }

    let mut stats: Vec<AuthorStats> = authors
        .into_iter()
        .map(|author| {
            let tally = tallies.remove(&author.id()).unwrap_or_default();
            AuthorStats {
                id: author.id.to_hex(),
                name: author.name,
                country: author.country,
                books_published: tally.books,
                avg_score: tally.average_score(),
                total_sales: tally.sales,
            }
        })
        .collect();
    sort_stats(
        &mut stats,
        query.sort.unwrap_or_default(),
        query.order.unwrap_or_default(),
    );
    Ok(stats)
}

/// Stable sort; rows that compare equal keep their store order either way.
fn sort_stats(stats: &mut [AuthorStats], sort: StatsSort, order: SortOrder) {
    stats.sort_by(|a, b| {
        let ordering = match sort {
            StatsSort::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            StatsSort::Country => a.country.to_lowercase().cmp(&b.country.to_lowercase()),
            StatsSort::Books => a.books_published.cmp(&b.books_published),
            StatsSort::Score => a.avg_score.total_cmp(&b.avg_score),
            StatsSort::Sales => a.total_sales.cmp(&b.total_sales),
        };
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}
