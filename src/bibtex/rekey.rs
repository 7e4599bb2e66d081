use std::collections::HashMap;

use biblatex::Entry;

use crate::bibtex::title_text;
use crate::keywords::KeywordExtractor;

/// Turns the arbitrary keys ORCID hands out into unique ones built from title keywords.
///
/// A key is extended one keyword at a time (`smith` → `smith_Deep_Learning` →
/// `smith_Deep_Learning_Neural_Networks` ...) until it has not been handed out before. When the
/// keywords run out the last candidate gets a counter suffix instead (`smith_2`). The set of
/// keys handed out lives as long as the rewriter, so rewriting is not idempotent across runs:
/// feeding an already rewritten key back in makes it longer again.
pub struct KeyRewriter<E> {
    extractor: E,
    seen: HashMap<String, usize>,
}

impl<E: KeywordExtractor> KeyRewriter<E> {
    pub fn new(extractor: E) -> Self {
        KeyRewriter {
            extractor,
            seen: HashMap::new(),
        }
    }

    /// Rekey all entries in place, in order. Earlier entries win the shorter keys.
    pub fn rewrite(&mut self, entries: &mut [Entry]) -> anyhow::Result<()> {
        for entry in entries.iter_mut() {
            let title = title_text(entry)?;
            let key = self.rekey(&entry.key, &title);
            tracing::debug!(from = %entry.key, to = %key, "rekeyed entry");
            println!("{key}");
            entry.key = key;
        }
        Ok(())
    }

    pub fn rekey(&mut self, original: &str, title: &str) -> String {
        let cleaned: String = title
            .chars()
            .filter(|c| c.is_alphabetic() || c.is_whitespace())
            .collect();
        let mut keywords = self.extractor.extract(&cleaned).into_iter();

        let mut candidate = original.to_string();
        loop {
            if let Some(keyword) = keywords.next() {
                tracing::trace!(phrase = %keyword.phrase, score = keyword.score, "keyword");
                candidate.push('_');
                candidate.push_str(&title_case(&keyword.phrase.replace(' ', "_")));
                if self.claim(&candidate) {
                    return candidate;
                }
                continue;
            }

            let count = self.seen.entry(candidate.clone()).or_insert(0);
            *count += 1;
            let forced = format!("{candidate}_{count}");
            if self.claim(&forced) {
                return forced;
            }
        }
    }

    fn claim(&mut self, key: &str) -> bool {
        if self.seen.contains_key(key) {
            return false;
        }
        self.seen.insert(key.to_string(), 1);
        true
    }
}

/// Uppercase the first letter of every word and lowercase the rest; anything that is not a
/// letter starts a new word.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if in_word {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        in_word = c.is_alphabetic();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bibtex::load;
    use crate::keywords::{Keyword, Yake};
    use std::collections::HashSet;

    /// Hands back the same phrases whatever the title.
    struct Fixed(&'static [&'static str]);

    impl KeywordExtractor for Fixed {
        fn extract(&self, _text: &str) -> Vec<Keyword> {
            self.0
                .iter()
                .enumerate()
                .map(|(i, p)| Keyword {
                    phrase: p.to_string(),
                    score: i as f64,
                })
                .collect()
        }
    }

    #[test]
    fn title_case_matches_words() {
        assert_eq!(title_case("deep_learning"), "Deep_Learning");
        assert_eq!(title_case("DNA repair"), "Dna Repair");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn first_keyword_wins_when_free() {
        let mut r = KeyRewriter::new(Yake::default());
        assert_eq!(
            r.rekey("smith2020", "Deep Learning Methods!"),
            "smith2020_Deep_Learning_Methods"
        );
    }

    #[test]
    fn collisions_append_the_next_keyword() {
        let mut r = KeyRewriter::new(Fixed(&["deep learning", "methods"]));
        assert_eq!(r.rekey("a", ""), "a_Deep_Learning");
        assert_eq!(r.rekey("a", ""), "a_Deep_Learning_Methods");
        assert_eq!(r.rekey("a", ""), "a_Deep_Learning_Methods_2");
        assert_eq!(r.rekey("b", ""), "b_Deep_Learning");
    }

    #[test]
    fn keyword_suffixes_accumulate() {
        let mut r = KeyRewriter::new(Yake::default());
        let first = r.rekey("smith", "Deep Learning Methods");
        let second = r.rekey("smith", "Deep Learning Methods");
        assert_eq!(first, "smith_Deep_Learning_Methods");
        assert!(second.starts_with("smith_Deep_Learning_Methods_"), "{second}");
        assert_ne!(first, second);
    }

    #[test]
    fn no_keywords_falls_back_to_counter() {
        let mut r = KeyRewriter::new(Yake::default());
        assert_eq!(r.rekey("x", "2020"), "x_1");
        assert_eq!(r.rekey("x", "of the"), "x_2");
        assert_eq!(r.rekey("y", ""), "y_1");
    }

    #[test]
    fn counter_skips_keys_already_taken() {
        let mut r = KeyRewriter::new(Yake::default());
        r.claim("x_1");
        assert_eq!(r.rekey("x", "2020"), "x_2");
    }

    #[test]
    fn exhausted_keywords_fall_back_to_counter() {
        let mut r = KeyRewriter::new(Yake::default());
        let mut keys = HashSet::new();
        for _ in 0..12 {
            assert!(keys.insert(r.rekey("smith", "Learning")));
        }
        assert!(keys.contains("smith_Learning"));
        assert!(keys.contains("smith_Learning_2"));
        assert!(keys.contains("smith_Learning_12"));
    }

    #[test]
    fn rewriting_again_is_not_idempotent() {
        let mut first = KeyRewriter::new(Yake::default());
        let key = first.rekey("smith", "Deep Learning Methods");

        let mut second = KeyRewriter::new(Yake::default());
        let again = second.rekey(&key, "Deep Learning Methods");
        assert_ne!(again, key);
        assert!(again.starts_with(&key) && again.len() > key.len());
    }

    #[test]
    fn rewrite_gives_unique_nonempty_keys() {
        proptest::proptest!(|(titles in proptest::collection::vec("[A-Za-z][A-Za-z ]{0,23}", 1..12))| {
            let text: String = titles
                .iter()
                .map(|t| format!("@misc{{dup, title = {{{t}}}}}\n"))
                .collect();
            let mut entries = load(&text).unwrap();
            KeyRewriter::new(Yake::default()).rewrite(&mut entries).unwrap();
            let keys: HashSet<&str> = entries.iter().map(|e| e.key.as_str()).collect();
            proptest::prop_assert_eq!(keys.len(), entries.len());
            proptest::prop_assert!(entries.iter().all(|e| !e.key.is_empty()));
        })
    }

    #[test]
    fn rewrite_fails_on_missing_title() {
        let mut entries = load("@misc{a, title = {Fine}}\n@misc{b, year = {2000}}").unwrap();
        let err = KeyRewriter::new(Yake::default()).rewrite(&mut entries).unwrap_err();
        assert!(err.to_string().contains("entry b has no title"), "{err}");
    }
}
