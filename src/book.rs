//! Book metadata types.

use serde::{Deserialize, Serialize};

/// Placeholder written into result cells when a value is unknown.
pub const NOT_FOUND: &str = "Not found";

/// Book metadata extracted from one retailer page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Normalized ISBN that was searched.
    pub isbn: String,
    /// Book title.
    pub title: String,
    /// Author(s), as printed by the retailer.
    pub author: String,
    /// Publisher name.
    pub publisher: String,
    /// Name of the site the metadata came from.
    pub source_site: String,
    /// Page the metadata was read from.
    pub source_url: String,
}

impl Book {
    /// Creates a new book with the given title.
    pub fn new(isbn: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            isbn: isbn.into(),
            title: title.into(),
            author: String::new(),
            publisher: String::new(),
            source_site: String::new(),
            source_url: String::new(),
        }
    }

    /// Sets the author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Sets the publisher.
    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = publisher.into();
        self
    }

    /// Sets the source site name.
    pub fn with_site(mut self, site: impl Into<String>) -> Self {
        self.source_site = site.into();
        self
    }

    /// Sets the source URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = url.into();
        self
    }

    /// Multi-line human readable summary.
    pub fn describe(&self) -> String {
        format!(
            "ISBN: {}\nTitle: {}\nAuthor: {}\nPublisher: {}\nSource: {}",
            self.isbn,
            or_placeholder(&self.title),
            or_placeholder(&self.author),
            or_placeholder(&self.publisher),
            or_placeholder(&self.source_url),
        )
    }
}

/// What a single site scraper reports for one ISBN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The site lists the book.
    Found(Book),
    /// The site does not list the book. This is an expected outcome.
    NotFound,
}

impl Lookup {
    /// Returns the book if found.
    pub fn into_book(self) -> Option<Book> {
        match self {
            Self::Found(book) => Some(book),
            Self::NotFound => None,
        }
    }

    /// Whether the site listed the book.
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

pub(crate) fn or_placeholder(value: &str) -> &str {
    if value.trim().is_empty() {
        NOT_FOUND
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_builder() {
        let book = Book::new("9780134190440", "Example Book")
            .with_author("A. Writer")
            .with_publisher("Example Press")
            .with_site("Babil")
            .with_url("https://www.babil.com/example");
        assert_eq!(book.title, "Example Book");
        assert_eq!(book.author, "A. Writer");
        assert_eq!(book.publisher, "Example Press");
        assert_eq!(book.source_site, "Babil");
        assert_eq!(book.source_url, "https://www.babil.com/example");
    }

    #[test]
    fn test_describe_fills_placeholders() {
        let book = Book::new("9780134190440", "Example Book");
        let text = book.describe();
        assert!(text.contains("Title: Example Book"));
        assert!(text.contains("Author: Not found"));
        assert!(text.contains("Publisher: Not found"));
    }

    #[test]
    fn test_lookup_into_book() {
        let found = Lookup::Found(Book::new("0134190440", "T"));
        assert!(found.is_found());
        assert_eq!(found.into_book().unwrap().title, "T");
        assert!(Lookup::NotFound.into_book().is_none());
    }

    #[test]
    fn test_book_serialization() {
        let book = Book::new("0134190440", "T").with_site("D&R");
        let json = serde_json::to_string(&book).unwrap();
        assert!(json.contains("\"source_site\":\"D&R\""));
        let back: Book = serde_json::from_str(&json).unwrap();
        assert_eq!(back, book);
    }
}
