pub mod recommendations;
pub mod similarity;

pub use recommendations::Recommender;
pub use similarity::{TextVectorizer, TfidfVectorizer};
