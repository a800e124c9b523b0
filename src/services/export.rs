//! CSV and PDF export service
//!
//! Both formats are produced in memory and handed to the HTTP layer as raw
//! bytes; handlers attach the download headers.

use printpdf::{BuiltinFont, Mm, PdfDocument};
use serde::Serialize;

use crate::{
    error::{AppError, AppResult},
    models::{book::Book, member::Member, transaction::TransactionDetails},
    repository::Repository,
};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const TOP_MARGIN_MM: f32 = 270.0;
const BOTTOM_MARGIN_MM: f32 = 20.0;
const LINE_HEIGHT_MM: f32 = 6.0;

#[derive(Serialize)]
struct BookRecord<'a> {
    title: &'a str,
    author: &'a str,
    isbn: &'a str,
    category: Option<&'a str>,
    publisher: Option<&'a str>,
    publication_year: Option<i16>,
    total_copies: i32,
    available_copies: i32,
}

#[derive(Serialize)]
struct MemberRecord<'a> {
    name: &'a str,
    email: &'a str,
    phone: &'a str,
    address: Option<&'a str>,
    joined_date: String,
    is_active: bool,
}

#[derive(Serialize)]
struct TransactionRecord<'a> {
    book_title: &'a str,
    book_isbn: &'a str,
    member_name: &'a str,
    borrow_date: String,
    due_date: String,
    returned_date: Option<String>,
    overdue: bool,
}

/// Serialize books to CSV bytes
pub fn books_to_csv(books: &[Book]) -> AppResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for book in books {
        writer
            .serialize(BookRecord {
                title: &book.title,
                author: &book.author,
                isbn: &book.isbn,
                category: book.category.as_deref(),
                publisher: book.publisher.as_deref(),
                publication_year: book.publication_year,
                total_copies: book.total_copies,
                available_copies: book.available_copies,
            })
            .map_err(|e| AppError::Internal(format!("CSV serialization failed: {}", e)))?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV writer failed: {}", e)))
}

/// Serialize members to CSV bytes
pub fn members_to_csv(members: &[Member]) -> AppResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for member in members {
        writer
            .serialize(MemberRecord {
                name: &member.name,
                email: &member.email,
                phone: &member.phone,
                address: member.address.as_deref(),
                joined_date: member.joined_date.format("%Y-%m-%d").to_string(),
                is_active: member.is_active,
            })
            .map_err(|e| AppError::Internal(format!("CSV serialization failed: {}", e)))?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV writer failed: {}", e)))
}

/// Serialize transactions to CSV bytes
pub fn transactions_to_csv(transactions: &[TransactionDetails]) -> AppResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for t in transactions {
        writer
            .serialize(TransactionRecord {
                book_title: &t.book_title,
                book_isbn: &t.book_isbn,
                member_name: &t.member_name,
                borrow_date: t.borrow_date.format("%Y-%m-%d").to_string(),
                due_date: t.due_date.format("%Y-%m-%d").to_string(),
                returned_date: t.returned_date.map(|d| d.format("%Y-%m-%d").to_string()),
                overdue: t.is_overdue,
            })
            .map_err(|e| AppError::Internal(format!("CSV serialization failed: {}", e)))?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV writer failed: {}", e)))
}

/// Render a simple tabular PDF: a title line, a header row, then one line per
/// record, paginating as needed.
fn render_pdf_table(
    title: &str,
    headers: &[&str],
    column_x_mm: &[f32],
    rows: &[Vec<String>],
) -> AppResult<Vec<u8>> {
    let (doc, first_page, first_layer) =
        PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");

    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| AppError::Internal(format!("PDF font failed: {}", e)))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| AppError::Internal(format!("PDF font failed: {}", e)))?;

    let mut layer = doc.get_page(first_page).get_layer(first_layer);
    layer.use_text(title, 14.0, Mm(15.0), Mm(282.0), &bold);

    let mut y = TOP_MARGIN_MM;
    for (header, x) in headers.iter().zip(column_x_mm) {
        layer.use_text(*header, 10.0, Mm(*x), Mm(y), &bold);
    }
    y -= LINE_HEIGHT_MM;

    for row in rows {
        if y < BOTTOM_MARGIN_MM {
            let (page, page_layer) =
                doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            layer = doc.get_page(page).get_layer(page_layer);
            y = TOP_MARGIN_MM;
        }
        for (cell, x) in row.iter().zip(column_x_mm) {
            layer.use_text(cell.as_str(), 9.0, Mm(*x), Mm(y), &font);
        }
        y -= LINE_HEIGHT_MM;
    }

    doc.save_to_bytes()
        .map_err(|e| AppError::Internal(format!("PDF generation failed: {}", e)))
}

/// Render the book catalog as a PDF
pub fn books_to_pdf(books: &[Book]) -> AppResult<Vec<u8>> {
    let rows: Vec<Vec<String>> = books
        .iter()
        .map(|b| {
            vec![
                b.title.clone(),
                b.author.clone(),
                b.isbn.clone(),
                format!("{}/{}", b.available_copies, b.total_copies),
            ]
        })
        .collect();

    render_pdf_table(
        "Library Catalog",
        &["Title", "Author", "ISBN", "Available"],
        &[15.0, 85.0, 135.0, 180.0],
        &rows,
    )
}

/// Render the transaction history as a PDF
pub fn transactions_to_pdf(transactions: &[TransactionDetails]) -> AppResult<Vec<u8>> {
    let rows: Vec<Vec<String>> = transactions
        .iter()
        .map(|t| {
            vec![
                t.book_title.clone(),
                t.member_name.clone(),
                t.borrow_date.format("%Y-%m-%d").to_string(),
                t.due_date.format("%Y-%m-%d").to_string(),
                t.returned_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| {
                        if t.is_overdue { "OVERDUE".to_string() } else { "out".to_string() }
                    }),
            ]
        })
        .collect();

    render_pdf_table(
        "Transaction History",
        &["Book", "Member", "Borrowed", "Due", "Returned"],
        &[15.0, 75.0, 120.0, 145.0, 170.0],
        &rows,
    )
}

#[derive(Clone)]
pub struct ExportService {
    repository: Repository,
}

impl ExportService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn books_csv(&self) -> AppResult<Vec<u8>> {
        let books = self.repository.books.list_all().await?;
        books_to_csv(&books)
    }

    pub async fn members_csv(&self) -> AppResult<Vec<u8>> {
        let members = self.repository.members.list_all().await?;
        members_to_csv(&members)
    }

    pub async fn transactions_csv(&self) -> AppResult<Vec<u8>> {
        let transactions = self.repository.transactions.list_all().await?;
        transactions_to_csv(&transactions)
    }

    pub async fn books_pdf(&self) -> AppResult<Vec<u8>> {
        let books = self.repository.books.list_all().await?;
        books_to_pdf(&books)
    }

    pub async fn transactions_pdf(&self) -> AppResult<Vec<u8>> {
        let transactions = self.repository.transactions.list_all().await?;
        transactions_to_pdf(&transactions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn sample_book(id: i32, title: &str) -> Book {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        Book {
            id,
            title: title.to_string(),
            author: "Jane Doe".to_string(),
            isbn: format!("978000000000{}", id),
            category: Some("Fiction".to_string()),
            publisher: None,
            publication_year: Some(2001),
            total_copies: 3,
            available_copies: 2,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn books_csv_has_header_plus_one_line_per_record() {
        let books = vec![sample_book(1, "Dune"), sample_book(2, "Emma")];
        let bytes = books_to_csv(&books).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), books.len() + 1);
        assert!(lines[0].starts_with("title,author,isbn"));
        assert!(lines[1].contains("Dune"));
    }

    #[test]
    fn csv_escapes_embedded_commas() {
        let mut book = sample_book(1, "Dune, Messiah");
        book.category = None;
        let text = String::from_utf8(books_to_csv(&[book]).unwrap()).unwrap();
        assert!(text.contains("\"Dune, Messiah\""));
    }

    #[test]
    fn members_csv_formats_joined_date() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let member = Member {
            id: 1,
            name: "Alan Smithee".to_string(),
            email: "alan@example.com".to_string(),
            phone: "555-0100".to_string(),
            address: None,
            joined_date: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let text = String::from_utf8(members_to_csv(&[member]).unwrap()).unwrap();
        assert!(text.contains("2023-06-01"));
    }

    #[test]
    fn books_pdf_is_nonempty_and_has_magic() {
        let books: Vec<Book> = (1..=5).map(|i| sample_book(i, "Title")).collect();
        let bytes = books_to_pdf(&books).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn transactions_pdf_paginates_long_lists() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let transactions: Vec<TransactionDetails> = (0..120)
            .map(|i| TransactionDetails {
                id: i,
                book_id: 1,
                book_title: "A Book".to_string(),
                book_isbn: "9780000000001".to_string(),
                member_id: 1,
                member_name: "Someone".to_string(),
                borrow_date: now,
                due_date: now,
                returned_date: None,
                is_overdue: false,
                notes: None,
            })
            .collect();

        // 120 rows cannot fit on one A4 page at 6mm per line
        let bytes = transactions_to_pdf(&transactions).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        let text = String::from_utf8_lossy(&bytes);
        // the page tree's /Count carries the page total
        assert!(text.contains("/Count 3"));
    }
}
