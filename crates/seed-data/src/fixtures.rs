//! The fixed seed batch.

use bookstore::models::Book;

/// Number of books in [`seed_books`].
pub const SEED_BOOK_COUNT: usize = 10;

/// The ten sample books, in insertion order.
pub fn seed_books() -> Vec<Book> {
    vec![
        Book::new(
            "Rich Dad Poor Dad",
            "Robert Kiyosaki",
            "Finance",
            1997,
            12.99,
            true,
            207,
            "Warner Books",
        ),
        Book::new(
            "Atomic Habits",
            "James Clear",
            "Self-help",
            2018,
            15.99,
            true,
            320,
            "Penguin Random House",
        ),
        Book::new(
            "Think and Grow Rich",
            "Napoleon Hill",
            "Finance",
            1937,
            10.99,
            true,
            238,
            "The Ralston Society",
        ),
        Book::new(
            "The Alchemist",
            "Paulo Coelho",
            "Fiction",
            1988,
            13.5,
            true,
            208,
            "HarperTorch",
        ),
        Book::new(
            "My Life in Crime",
            "John Kiriamiti",
            "Biography",
            1980,
            9.99,
            false,
            256,
            "East African Publishing House",
        ),
        Book::new(
            "My Life with a Criminal",
            "Wambui Waiyaki Otieno",
            "Biography",
            1999,
            11.99,
            true,
            240,
            "East African Educational Publishers",
        ),
        Book::new(
            "The Hating Game",
            "Sally Thorne",
            "Romance",
            2016,
            14.99,
            true,
            384,
            "William Morrow Paperbacks",
        ),
        Book::new(
            "It Ends with Us",
            "Colleen Hoover",
            "Romance",
            2016,
            13.99,
            false,
            376,
            "Atria Books",
        ),
        Book::new(
            "The River Between",
            "Ngũgĩ wa Thiong’o",
            "Fiction",
            1965,
            9.5,
            true,
            160,
            "Heinemann",
        ),
        Book::new(
            "To Kill a Mockingbird",
            "Harper Lee",
            "Fiction",
            1960,
            12.99,
            true,
            281,
            "J.B. Lippincott & Co.",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_batch_is_complete() {
        let books = seed_books();
        assert_eq!(books.len(), SEED_BOOK_COUNT);

        for book in &books {
            assert!(book.id.is_none(), "{} carries an id", book.title);
            assert!(!book.title.is_empty());
            assert!(!book.author.is_empty());
            assert!(!book.genre.is_empty());
            assert!(!book.publisher.is_empty());
            assert!(book.price > 0.0);
            assert!(book.pages > 0);
        }
    }

    #[test]
    fn test_titles_are_unique() {
        let titles: std::collections::HashSet<_> =
            seed_books().into_iter().map(|b| b.title).collect();
        assert_eq!(titles.len(), SEED_BOOK_COUNT);
    }
}
