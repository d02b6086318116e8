pub mod enriched;
pub mod movie;
pub mod rating;

pub use enriched::EnrichedMovie;
pub use movie::{split_genres, Movie, NO_GENRES};
pub use rating::Rating;
