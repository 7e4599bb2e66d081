pub mod stopwords;
pub mod yake;

pub use yake::Yake;

/// A key phrase and its relevance. Lower scores are more relevant.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyword {
    pub phrase: String,
    pub score: f64,
}

/// Pulls ranked key phrases out of a piece of text.
///
/// Implementations return keywords most relevant first; callers take the order as given.
pub trait KeywordExtractor {
    fn extract(&self, text: &str) -> Vec<Keyword>;
}
