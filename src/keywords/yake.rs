//! Unsupervised single-document keyword extraction in the style of YAKE!
//! (Campos et al., "YAKE! Keyword extraction from single documents using multiple local
//! features", Information Sciences 509, 2020).
//!
//! Every word gets a score from five local statistics (casing, position, frequency, how many
//! different words surround it, and how many sentences it appears in). Candidate phrases of up to
//! `max_ngram` words are scored from their words, then near-duplicates are dropped. Lower is
//! better.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::keywords::{Keyword, KeywordExtractor, stopwords};

static SENTENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+(?:\s+|$)|\n+").unwrap());
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+(?:['’.,-]\w+)*|[^\w\s]+").unwrap());

#[derive(Debug, Clone)]
pub struct Yake {
    pub max_ngram: usize,
    pub window: usize,
    pub dedup_threshold: f64,
    pub top: usize,
    stopwords: &'static HashSet<&'static str>,
}

impl Default for Yake {
    fn default() -> Self {
        Yake {
            max_ngram: 3,
            window: 1,
            dedup_threshold: 0.9,
            top: 20,
            stopwords: &stopwords::ENGLISH,
        }
    }
}

impl KeywordExtractor for Yake {
    fn extract(&self, text: &str) -> Vec<Keyword> {
        let doc = Document::build(self, text);
        let mut scored: Vec<(usize, f64)> = doc
            .candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| doc.is_valid(c))
            .map(|(i, c)| (i, doc.score(c)))
            .filter(|(_, s)| s.is_finite())
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));

        let mut kept: Vec<Keyword> = Vec::new();
        for (i, score) in scored {
            if kept.len() >= self.top {
                break;
            }
            let phrase = &doc.candidates[i].phrase;
            if kept
                .iter()
                .any(|k| similarity(&k.phrase, phrase) > self.dedup_threshold)
            {
                continue;
            }
            kept.push(Keyword {
                phrase: phrase.clone(),
                score,
            });
        }
        kept
    }
}

/// Per-word statistics. Words are folded to lowercase and a trailing plural `s` is dropped.
#[derive(Debug, Default)]
struct Term {
    tf: f64,
    /// Occurrences written as an acronym (all caps).
    tf_acronym: f64,
    /// Occurrences capitalised somewhere other than the start of a sentence.
    tf_proper: f64,
    /// Distinct sentence indices, ascending.
    sentences: Vec<usize>,
    stopword: bool,
    h: f64,
}

#[derive(Debug)]
struct Candidate {
    phrase: String,
    terms: Vec<usize>,
    tf: f64,
    /// At least one occurrence consists only of plain words (no numbers, no odd tokens).
    clean: bool,
}

#[derive(Debug, Clone, Copy)]
struct Token<'t> {
    tag: Tag,
    term: usize,
    text: &'t str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Number,
    Unusual,
    Acronym,
    Proper,
    Plain,
}

impl Tag {
    fn of(word: &str, position: usize) -> Tag {
        if word.replace(',', "").parse::<f64>().is_ok() {
            return Tag::Number;
        }
        let digits = word.chars().filter(|c| c.is_numeric()).count();
        let alpha = word.chars().filter(|c| c.is_alphabetic()).count();
        let punct = word.chars().filter(|c| is_punct(*c)).count();
        if (digits > 0 && alpha > 0) || (digits == 0 && alpha == 0) || punct > 1 {
            return Tag::Unusual;
        }
        if word.chars().all(char::is_uppercase) {
            return Tag::Acronym;
        }
        let mut chars = word.chars();
        if let Some(first) = chars.next()
            && first.is_uppercase()
            && !chars.any(char::is_uppercase)
            && position != 0
        {
            return Tag::Proper;
        }
        Tag::Plain
    }

    fn discarded(self) -> bool {
        matches!(self, Tag::Number | Tag::Unusual)
    }
}

fn is_punct(c: char) -> bool {
    !c.is_alphanumeric() && !c.is_whitespace()
}

struct Document {
    terms: Vec<Term>,
    candidates: Vec<Candidate>,
    /// Co-occurrence counts, left word to right word.
    edges: HashMap<(usize, usize), f64>,
}

impl Document {
    fn build(cfg: &Yake, text: &str) -> Document {
        let mut doc = Document {
            terms: Vec::new(),
            candidates: Vec::new(),
            edges: HashMap::new(),
        };
        let mut term_index: HashMap<String, usize> = HashMap::new();
        let mut cand_index: HashMap<String, usize> = HashMap::new();

        let sentences: Vec<&str> = SENTENCE_RE
            .split(text)
            .filter(|s| !s.trim().is_empty())
            .collect();

        for (sentence_id, sentence) in sentences.iter().enumerate() {
            let mut block: Vec<Token<'_>> = Vec::new();
            for (position, word) in TOKEN_RE
                .find_iter(sentence)
                .map(|m| m.as_str())
                .enumerate()
            {
                if word.chars().all(is_punct) {
                    block.clear();
                    continue;
                }

                let tag = Tag::of(word, position);
                let term = doc.term_for(cfg, &mut term_index, word);
                doc.terms[term].record(tag, sentence_id);

                if !tag.discarded() {
                    for left in &block[block.len().saturating_sub(cfg.window)..] {
                        if !left.tag.discarded() {
                            *doc.edges.entry((left.term, term)).or_default() += 1.0;
                        }
                    }
                }

                let token = Token {
                    tag,
                    term,
                    text: word,
                };
                let mut phrase = vec![token];
                doc.add_candidate(&mut cand_index, &phrase);
                let reach = block.len().saturating_sub(cfg.max_ngram.saturating_sub(1));
                for left in block[reach..].iter().rev() {
                    phrase.insert(0, *left);
                    doc.add_candidate(&mut cand_index, &phrase);
                }
                block.push(token);
            }
        }

        doc.score_terms(sentences.len());
        doc
    }

    fn term_for(&mut self, cfg: &Yake, index: &mut HashMap<String, usize>, word: &str) -> usize {
        let lower = word.to_lowercase();
        let mut key = lower.clone();
        if key.ends_with('s') && key.chars().count() > 3 {
            key.pop();
        }
        if let Some(&i) = index.get(&key) {
            return i;
        }
        let simple_len = key.chars().filter(|c| !is_punct(*c)).count();
        let stopword = cfg.stopwords.contains(lower.as_str())
            || cfg.stopwords.contains(key.as_str())
            || simple_len < 3;
        self.terms.push(Term {
            stopword,
            ..Term::default()
        });
        index.insert(key, self.terms.len() - 1);
        self.terms.len() - 1
    }

    fn add_candidate(&mut self, index: &mut HashMap<String, usize>, phrase: &[Token<'_>]) {
        let text = phrase
            .iter()
            .map(|t| t.text.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");
        let clean = phrase.iter().all(|t| !t.tag.discarded());
        if let Some(&i) = index.get(&text) {
            let c = &mut self.candidates[i];
            c.tf += 1.0;
            c.clean |= clean;
            return;
        }
        index.insert(text.clone(), self.candidates.len());
        self.candidates.push(Candidate {
            phrase: text,
            terms: phrase.iter().map(|t| t.term).collect(),
            tf: 1.0,
            clean,
        });
    }

    fn score_terms(&mut self, sentence_count: usize) {
        let valid: Vec<f64> = self
            .terms
            .iter()
            .filter(|t| !t.stopword)
            .map(|t| t.tf)
            .collect();
        let (mean, std) = mean_std(&valid);
        let max_tf = self.terms.iter().map(|t| t.tf).fold(0.0, f64::max);

        let n = self.terms.len();
        let (mut in_count, mut in_weight) = (vec![0.0; n], vec![0.0; n]);
        let (mut out_count, mut out_weight) = (vec![0.0; n], vec![0.0; n]);
        for (&(left, right), &w) in &self.edges {
            out_count[left] += 1.0;
            out_weight[left] += w;
            in_count[right] += 1.0;
            in_weight[right] += w;
        }

        for (i, term) in self.terms.iter_mut().enumerate() {
            let left = ratio(in_count[i], in_weight[i]);
            let right = ratio(out_count[i], out_weight[i]);
            let relatedness =
                (0.5 + left * (term.tf / max_tf)) + (0.5 + right * (term.tf / max_tf));
            let frequency = ratio(term.tf, mean + std);
            let spread = term.sentences.len() as f64 / sentence_count.max(1) as f64;
            let casing = term.tf_acronym.max(term.tf_proper) / (1.0 + term.tf.ln());
            let position = (3.0 + median(&term.sentences)).ln().ln();
            term.h = (position * relatedness)
                / (casing + frequency / relatedness + spread / relatedness);
        }
    }

    fn is_valid(&self, c: &Candidate) -> bool {
        let (Some(&first), Some(&last)) = (c.terms.first(), c.terms.last()) else {
            return false;
        };
        c.clean && !self.terms[first].stopword && !self.terms[last].stopword
    }

    fn score(&self, c: &Candidate) -> f64 {
        let mut product = 1.0;
        let mut sum = 0.0;
        for (i, &t) in c.terms.iter().enumerate() {
            let term = &self.terms[t];
            if !term.stopword {
                sum += term.h;
                product *= term.h;
                continue;
            }
            // A stopword inside a phrase counts for how strongly it binds to its neighbours.
            let before = i
                .checked_sub(1)
                .map(|j| c.terms[j])
                .and_then(|p| self.edges.get(&(p, t)).map(|w| w / self.terms[p].tf))
                .unwrap_or(0.0);
            let after = c
                .terms
                .get(i + 1)
                .and_then(|&n| self.edges.get(&(t, n)).map(|w| w / self.terms[n].tf))
                .unwrap_or(0.0);
            let bond = before * after;
            product *= 1.0 + (1.0 - bond);
            sum -= 1.0 - bond;
        }
        product / ((sum + 1.0) * c.tf)
    }
}

impl Term {
    fn record(&mut self, tag: Tag, sentence: usize) {
        self.tf += 1.0;
        match tag {
            Tag::Acronym => self.tf_acronym += 1.0,
            Tag::Proper => self.tf_proper += 1.0,
            _ => {}
        }
        if self.sentences.last() != Some(&sentence) {
            self.sentences.push(sentence);
        }
    }
}

fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 { 0.0 } else { num / den }
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

fn median(sorted: &[usize]) -> f64 {
    match sorted.len() {
        0 => 0.0,
        n if n % 2 == 1 => sorted[n / 2] as f64,
        n => (sorted[n / 2 - 1] + sorted[n / 2]) as f64 / 2.0,
    }
}

/// `1 - levenshtein / max_len`, on characters.
fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            cur[j + 1] = substitution.min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    1.0 - prev[b.len()] as f64 / longest as f64
}
