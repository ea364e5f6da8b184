//! Fake catalog data for local development and demos.
//!
//! A run wipes the four collections and writes authors first, then each book
//! followed by its reviews and sales. Writes are sequential and not atomic: a
//! failure part way leaves whatever was written so far.

pub mod corpus;

use anyhow::Context;
use bson::oid::ObjectId;
use chrono::{Datelike, Duration, NaiveDate};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::catalog::Catalog;
use crate::modules::authors::models::Author;
use crate::modules::books::models::Book;
use crate::modules::reviews::models::{Review, MAX_SCORE, MIN_SCORE};
use crate::modules::sales::models::Sale;

const BIRTH_YEARS: (i32, i32) = (1950, 1995);
const PUBLICATION_WINDOW_DAYS: i64 = 30 * 365;
const REVIEWS_PER_BOOK: (usize, usize) = (1, 10);
const MAX_UP_VOTES: i64 = 5000;
const SALES_YEARS: i32 = 5;
const YEARLY_SALES: (i64, i64) = (1_000, 100_000);

/// How much data a run writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedPlan {
    pub authors: usize,
    pub books: usize,
}

impl Default for SeedPlan {
    fn default() -> Self {
        Self {
            authors: 50,
            books: 300,
        }
    }
}

/// Counts of what a run wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub authors: usize,
    pub books: usize,
    pub reviews: usize,
    pub sales: usize,
}

/// Replace the catalog contents with generated data.
///
/// `today` anchors publication dates and the sales years.
pub async fn run<R>(
    catalog: &Catalog,
    plan: SeedPlan,
    rng: &mut R,
    today: NaiveDate,
) -> anyhow::Result<SeedReport>
where
    R: Rng + Send,
{
    anyhow::ensure!(
        plan.authors > 0 || plan.books == 0,
        "cannot seed {} books without any authors",
        plan.books
    );

    clear(catalog).await?;

    let authors: Vec<Author> = (0..plan.authors)
        .map(|_| fake_author(rng))
        .collect::<anyhow::Result<_>>()?;
    catalog
        .authors
        .insert_many(&authors)
        .await
        .context("failed to insert authors")?;
    tracing::info!(count = authors.len(), "seeded authors");

    let author_ids: Vec<ObjectId> = authors.iter().map(|author| author.id).collect();
    let mut report = SeedReport {
        authors: authors.len(),
        ..SeedReport::default()
    };

    for index in 0..plan.books {
        let author = author_ids
            .choose(rng)
            .copied()
            .context("no author to attach the book to")?;
        let (book, reviews, sales) = fake_book(rng, author, today);

        catalog
            .books
            .insert(&book)
            .await
            .with_context(|| format!("failed to insert book {}", index + 1))?;
        catalog
            .reviews
            .insert_many(&reviews)
            .await
            .with_context(|| format!("failed to insert reviews of book {}", book.id))?;
        catalog
            .sales
            .insert_many(&sales)
            .await
            .with_context(|| format!("failed to insert sales of book {}", book.id))?;

        report.books += 1;
        report.reviews += reviews.len();
        report.sales += sales.len();

        if report.books % 50 == 0 {
            tracing::info!(books = report.books, total = plan.books, "seeding books");
        }
    }

    tracing::info!(
        authors = report.authors,
        books = report.books,
        reviews = report.reviews,
        sales = report.sales,
        "seeding complete"
    );
    Ok(report)
}

async fn clear(catalog: &Catalog) -> anyhow::Result<()> {
    let removed = [
        ("authors", catalog.authors.clear().await),
        ("books", catalog.books.clear().await),
        ("reviews", catalog.reviews.clear().await),
        ("sales", catalog.sales.clear().await),
    ];
    for (collection, result) in removed {
        let removed =
            result.with_context(|| format!("failed to clear collection '{collection}'"))?;
        tracing::info!(collection, removed, "collection cleared");
    }
    Ok(())
}

fn fake_author<R: Rng + ?Sized>(rng: &mut R) -> anyhow::Result<Author> {
    let (first, last) = BIRTH_YEARS;
    let start = NaiveDate::from_ymd_opt(first, 1, 1).context("invalid birth year range")?;
    let end = NaiveDate::from_ymd_opt(last, 12, 31).context("invalid birth year range")?;
    let offset = rng.gen_range(0..=(end - start).num_days());

    Ok(Author {
        id: ObjectId::new(),
        name: corpus::full_name(rng),
        date_of_birth: start + Duration::days(offset),
        country: corpus::country(rng),
        description: corpus::sentence(rng),
    })
}

/// A book with its reviews and its last five years of sales
fn fake_book<R: Rng + ?Sized>(
    rng: &mut R,
    author: ObjectId,
    today: NaiveDate,
) -> (Book, Vec<Review>, Vec<Sale>) {
    let id = ObjectId::new();

    let sales: Vec<Sale> = (0..SALES_YEARS)
        .map(|years_ago| Sale {
            id: ObjectId::new(),
            book: id,
            year: today.year() - years_ago,
            sales: rng.gen_range(YEARLY_SALES.0..=YEARLY_SALES.1),
        })
        .collect();

    let review_count = rng.gen_range(REVIEWS_PER_BOOK.0..=REVIEWS_PER_BOOK.1);
    let reviews: Vec<Review> = (0..review_count)
        .map(|_| Review {
            id: ObjectId::new(),
            book: id,
            score: rng.gen_range(MIN_SCORE as i32..=MAX_SCORE as i32),
            up_votes: rng.gen_range(0..=MAX_UP_VOTES),
        })
        .collect();

    let book = Book {
        id,
        name: corpus::words(rng, 3),
        summary: corpus::paragraph(rng),
        publication_date: today - Duration::days(rng.gen_range(0..=PUBLICATION_WINDOW_DAYS)),
        author,
        total_sales: sales.iter().map(|sale| sale.sales).sum(),
    };

    (book, reviews, sales)
}
