//! Authorship comparison consumed by the matcher's scoring.
//!
//! The matcher only sees [`Equality`] through the [`AuthorshipComparator`]
//! seam; [`AuthorComparator`] is the default implementation.

use serde::{Deserialize, Serialize};

use crate::constants::authorship::{
    ET_AL, MIN_COMMON_PREFIX, MIN_SURNAME_SIMILARITY, YEAR_TOLERANCE,
};
use crate::data::{Authorship, Name};
use crate::normalizer::normalize_compare;

/// Three-valued comparison outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Equality {
    /// Same authorship.
    Equal,
    /// Conflicting authorship.
    Different,
    /// Not enough information to decide.
    Unknown,
}

impl Equality {
    /// Combines two partial results: any `Different` wins, then any `Equal`.
    pub fn and(self, other: Equality) -> Equality {
        match (self, other) {
            (Equality::Different, _) | (_, Equality::Different) => Equality::Different,
            (Equality::Equal, _) | (_, Equality::Equal) => Equality::Equal,
            _ => Equality::Unknown,
        }
    }
}

/// Compares the authorships of two names.
pub trait AuthorshipComparator: Send + Sync {
    /// `Unknown` when there is not enough authorship on either side to decide.
    fn compare(&self, query: &Name, candidate: &Name) -> Equality;
}

/// Default comparator: years first, then author surnames with tolerance for
/// abbreviations and small spelling differences.
#[derive(Clone, Debug)]
pub struct AuthorComparator {
    /// Shared surname prefix length accepted as the same author.
    pub min_common_prefix: usize,
    /// Jaro-Winkler similarity above which surnames are the same author.
    pub min_similarity: f64,
    /// Largest year difference still considered equal.
    pub year_tolerance: i32,
}

impl Default for AuthorComparator {
    fn default() -> Self {
        Self {
            min_common_prefix: MIN_COMMON_PREFIX,
            min_similarity: MIN_SURNAME_SIMILARITY,
            year_tolerance: YEAR_TOLERANCE,
        }
    }
}

impl AuthorshipComparator for AuthorComparator {
    fn compare(&self, query: &Name, candidate: &Name) -> Equality {
        let (comb1, bas1) = authorship_blocks(query);
        let (comb2, bas2) = authorship_blocks(candidate);

        let recomb = self.compare_authorship(&comb1, &comb2);
        if recomb != Equality::Unknown {
            return recomb;
        }
        let basionym = self.compare_authorship(&bas1, &bas2);
        if basionym != Equality::Unknown {
            return basionym;
        }
        // Missing brackets are common: try the query's only block against the other bracket.
        let across = if comb1.is_empty() {
            self.compare_authorship(&bas1, &comb2)
        } else if bas1.is_empty() {
            self.compare_authorship(&comb1, &bas2)
        } else {
            Equality::Unknown
        };
        if across == Equality::Equal {
            Equality::Equal
        } else {
            Equality::Unknown
        }
    }
}

impl AuthorComparator {
    /// Compares a single authorship block. A year mismatch decides on its own;
    /// otherwise the author teams refine the year result.
    pub fn compare_authorship(&self, a: &Authorship, b: &Authorship) -> Equality {
        let years = self.compare_years(a.year.as_deref(), b.year.as_deref());
        if years == Equality::Different {
            return years;
        }
        years.and(self.compare_teams(&a.authors, &b.authors))
    }

    fn compare_years(&self, a: Option<&str>, b: Option<&str>) -> Equality {
        match (a.and_then(parse_year), b.and_then(parse_year)) {
            (Some(y1), Some(y2)) if (y1 - y2).abs() <= self.year_tolerance => Equality::Equal,
            (Some(_), Some(_)) => Equality::Different,
            _ => Equality::Unknown,
        }
    }

    /// A single matching pair of authors makes two teams equal.
    pub fn compare_teams(&self, a: &[String], b: &[String]) -> Equality {
        let team1 = parse_team(a);
        let team2 = parse_team(b);
        if team1.is_empty() || team2.is_empty() {
            return Equality::Unknown;
        }
        if team1 == team2 {
            return Equality::Equal;
        }
        let any_equal = team1
            .iter()
            .any(|a1| team2.iter().any(|a2| self.same_author(a1, a2)));
        if any_equal {
            Equality::Equal
        } else {
            Equality::Different
        }
    }

    fn same_author(&self, a1: &ParsedAuthor, a2: &ParsedAuthor) -> bool {
        if a1.full == a2.full {
            return true;
        }
        let common = common_prefix(&a1.surname, &a2.surname);
        if a1.surname == a2.surname
            || surname_similarity(&a1.surname, &a2.surname) > self.min_similarity
            || common.len() >= self.min_common_prefix
        {
            // Relatives often share a surname and differ by initial only.
            return !a1.initials_differ(a2);
        }
        // Abbreviated surname: one surname is the start of the other.
        if !a1.initials_differ(a2)
            && !common.is_empty()
            && (a1.surname == common || a2.surname == common)
        {
            return true;
        }
        let full_common = common_prefix(&a1.full, &a2.full);
        full_common.chars().filter(|c| !c.is_whitespace()).count() > self.min_common_prefix
    }
}

/// Structured blocks of a name, falling back to the serialized authorship text
/// when the name carries no structured authorship at all.
fn authorship_blocks(name: &Name) -> (Authorship, Authorship) {
    if !name.combination_authorship.is_empty() || !name.basionym_authorship.is_empty() {
        return (
            name.combination_authorship.clone(),
            name.basionym_authorship.clone(),
        );
    }
    match name.authorship.as_deref() {
        Some(text) => parse_authorship_text(text),
        None => (Authorship::default(), Authorship::default()),
    }
}

/// Splits `(basionym) combination` text into its two blocks.
fn parse_authorship_text(text: &str) -> (Authorship, Authorship) {
    let text = text.trim();
    if let Some(open) = text.find('(')
        && let Some(len) = text[open..].find(')')
    {
        let basionym = &text[open + 1..open + len];
        let combination = format!("{} {}", &text[..open], &text[open + len + 1..]);
        return (parse_block(&combination), parse_block(basionym));
    }
    (parse_block(text), Authorship::default())
}

fn parse_block(block: &str) -> Authorship {
    let (ex_part, main) = match block.find(" ex ") {
        Some(pos) => (Some(&block[..pos]), &block[pos + 4..]),
        None => (None, block),
    };
    let mut authorship = Authorship::default();
    for piece in main.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if piece.chars().any(|c| c.is_ascii_digit()) && !piece.chars().any(char::is_alphabetic) {
            authorship.year = Some(piece.to_string());
        } else {
            authorship.authors.push(piece.to_string());
        }
    }
    if let Some(ex) = ex_part.map(str::trim).filter(|ex| !ex.is_empty()) {
        authorship.ex_authors.push(ex.to_string());
    }
    authorship
}

fn parse_year(value: &str) -> Option<i32> {
    let digits: String = value
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

const NAME_PARTICLES: &[&str] = &[
    "von", "van", "v", "de", "der", "den", "du", "da", "di", "la", "le", "et",
];

#[derive(Debug, PartialEq, Eq)]
struct ParsedAuthor {
    full: String,
    surname: String,
    initials: String,
}

impl ParsedAuthor {
    fn parse(raw: &str) -> Option<Self> {
        let cleaned: String = raw
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
            .collect();
        let tokens: Vec<&str> = cleaned
            .split_whitespace()
            .filter(|token| !NAME_PARTICLES.contains(token))
            .collect();
        let (surname, rest) = tokens.split_last()?;
        if rest.is_empty() && *surname == ET_AL {
            return None;
        }
        Some(Self {
            full: tokens.join(" "),
            surname: (*surname).to_string(),
            initials: rest.iter().filter_map(|token| token.chars().next()).collect(),
        })
    }

    fn initials_differ(&self, other: &ParsedAuthor) -> bool {
        match (self.initials.chars().next(), other.initials.chars().next()) {
            (Some(a), Some(b)) => a != b,
            _ => false,
        }
    }
}

fn parse_team(authors: &[String]) -> Vec<ParsedAuthor> {
    authors
        .iter()
        .flat_map(|entry| {
            normalize_compare(entry)
                .replace(" et ", "&")
                .replace(" and ", "&")
                .split(['&', ',', ';'])
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .filter_map(|raw| ParsedAuthor::parse(&raw))
        .collect()
}

fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let len = a
        .char_indices()
        .zip(b.chars())
        .take_while(|((_, c1), c2)| c1 == c2)
        .last()
        .map(|((idx, c), _)| idx + c.len_utf8())
        .unwrap_or(0);
    &a[..len]
}

/// Jaro-Winkler with a penalty for very short surname pairs.
fn surname_similarity(a: &str, b: &str) -> f64 {
    let mut similarity = strsim::jaro_winkler(a, b);
    let total = a.len() + b.len();
    if total < 10 {
        similarity -= (10 - total) as f64 * 0.05;
    }
    similarity
}
