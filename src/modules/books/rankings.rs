//! Book rankings derived from reviews and yearly sales figures.

use std::collections::{hash_map::Entry, HashMap, HashSet};

use bookreview_db::{Filter, FindOptions, StoreResult};
use bson::{oid::ObjectId, Bson};
use chrono::Datelike;

use super::models::Book;
use crate::catalog::{Catalog, Entity};
use crate::modules::reviews::models::Review;

/// How many books lead the sales of a publication year.
pub const YEAR_LEADERS: usize = 5;

/// A reviewed book with its mean score and extreme reviews.
#[derive(Debug, Clone, PartialEq)]
pub struct Rated {
    pub book: Book,
    pub avg_score: f64,
    pub best: Review,
    pub worst: Review,
}

struct ReviewSummary {
    score_sum: i64,
    count: i64,
    best: Review,
    worst: Review,
}

impl ReviewSummary {
    fn new(review: Review) -> Self {
        Self {
            score_sum: i64::from(review.score),
            count: 1,
            best: review.clone(),
            worst: review,
        }
    }

    /// Ties on score go to the most up-voted review for best, the least for
    /// worst; remaining ties keep the first review seen.
    fn add(&mut self, review: Review) {
        self.score_sum += i64::from(review.score);
        self.count += 1;
        let rank = (review.score, review.up_votes);
        if rank > (self.best.score, self.best.up_votes) {
            self.best = review.clone();
        }
        if rank < (self.worst.score, self.worst.up_votes) {
            self.worst = review;
        }
    }

    fn average(&self) -> f64 {
        self.score_sum as f64 / self.count as f64
    }
}

/// Reviewed books by mean score, highest first; equal means by book id.
/// Reviews of deleted books are ignored.
pub async fn top_rated(catalog: &Catalog, limit: i64) -> StoreResult<Vec<Rated>> {
    let mut summaries: HashMap<ObjectId, ReviewSummary> = HashMap::new();
    for review in catalog.reviews.list().await? {
        match summaries.entry(review.book) {
            Entry::Occupied(mut summary) => summary.get_mut().add(review),
            Entry::Vacant(slot) => {
                slot.insert(ReviewSummary::new(review));
            }
        }
    }

    let ids: Vec<ObjectId> = summaries.keys().copied().collect();
    let mut books: HashMap<ObjectId, Book> = catalog
        .books
        .find_many(&ids)
        .await?
        .into_iter()
        .map(|book| (book.id(), book))
        .collect();

    let mut ranked: Vec<Rated> = summaries
        .into_iter()
        .filter_map(|(id, summary)| {
            let book = books.remove(&id)?;
            Some(Rated {
                avg_score: summary.average(),
                book,
                best: summary.best,
                worst: summary.worst,
            })
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.avg_score
            .total_cmp(&a.avg_score)
            .then_with(|| a.book.id.cmp(&b.book.id))
    });
    ranked.truncate(usize::try_from(limit).unwrap_or(0));
    Ok(ranked)
}

/// Sales figures around a set of books: what their authors sold in total,
/// and which books led the sales of each of their publication years.
#[derive(Debug, Default)]
pub struct SalesContext {
    author_totals: HashMap<ObjectId, i64>,
    year_leaders: HashMap<i32, Vec<ObjectId>>,
}

impl SalesContext {
    pub async fn load(catalog: &Catalog, books: &[Book]) -> StoreResult<Self> {
        if books.is_empty() {
            return Ok(Self::default());
        }
        Ok(Self {
            author_totals: author_totals(catalog, books).await?,
            year_leaders: year_leaders(catalog, books).await?,
        })
    }

    /// Sum of every sales figure of every book by `author`.
    pub fn author_total(&self, author: ObjectId) -> i64 {
        self.author_totals.get(&author).copied().unwrap_or(0)
    }

    /// Whether the book is among the [`YEAR_LEADERS`] best sellers of the
    /// year it was published, counting only that year's figures.
    pub fn leads_publication_year(&self, book: &Book) -> bool {
        self.year_leaders
            .get(&book.publication_date.year())
            .is_some_and(|leaders| leaders.contains(&book.id))
    }
}

async fn author_totals(catalog: &Catalog, books: &[Book]) -> StoreResult<HashMap<ObjectId, i64>> {
    let authors: Vec<Bson> = books
        .iter()
        .map(|book| book.author)
        .collect::<HashSet<_>>()
        .into_iter()
        .map(Bson::ObjectId)
        .collect();
    let book_authors: HashMap<ObjectId, ObjectId> = catalog
        .books
        .find(Filter::any_of("author", authors), FindOptions::default())
        .await?
        .into_iter()
        .map(|book| (book.id(), book.author))
        .collect();

    let book_ids = book_authors.keys().copied().map(Bson::ObjectId).collect();
    let mut totals = HashMap::new();
    for sale in catalog
        .sales
        .find(Filter::any_of("book", book_ids), FindOptions::default())
        .await?
    {
        if let Some(author) = book_authors.get(&sale.book) {
            let total: &mut i64 = totals.entry(*author).or_default();
            *total = total.saturating_add(sale.sales);
        }
    }
    Ok(totals)
}

async fn year_leaders(catalog: &Catalog, books: &[Book]) -> StoreResult<HashMap<i32, Vec<ObjectId>>> {
    let years: Vec<Bson> = books
        .iter()
        .map(|book| book.publication_date.year())
        .collect::<HashSet<_>>()
        .into_iter()
        .map(Bson::Int32)
        .collect();

    let mut per_book: HashMap<(i32, ObjectId), i64> = HashMap::new();
    for sale in catalog
        .sales
        .find(Filter::any_of("year", years), FindOptions::default())
        .await?
    {
        let total = per_book.entry((sale.year, sale.book)).or_default();
        *total = total.saturating_add(sale.sales);
    }

    let mut ranked: Vec<((i32, ObjectId), i64)> = per_book.into_iter().collect();
    ranked.sort_by(|((a_year, a_book), a_total), ((b_year, b_book), b_total)| {
        a_year
            .cmp(b_year)
            .then_with(|| b_total.cmp(a_total))
            .then_with(|| a_book.cmp(b_book))
    });

    let mut leaders: HashMap<i32, Vec<ObjectId>> = HashMap::new();
    for ((year, book), _) in ranked {
        let slot = leaders.entry(year).or_default();
        if slot.len() < YEAR_LEADERS {
            slot.push(book);
        }
    }
    Ok(leaders)
}
