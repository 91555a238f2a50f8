use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::normalizer::normalize_key;
use crate::vocab::{MatchType, NameType, NomCode, NomStatus, Origin, Rank};

pub use crate::types::{
    AuthorName, AuthorshipText, DatasetKey, IndexId, NormalizedKey, ScientificNameText, YearText,
};

/// One authorship block: the author team, optional ex-authors, and year.
#[derive(
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    bitcode::Encode,
    bitcode::Decode,
)]
pub struct Authorship {
    /// Authors in citation order.
    #[serde(default)]
    pub authors: Vec<AuthorName>,
    /// Authors cited with `ex` before the validating authors.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ex_authors: Vec<AuthorName>,
    /// Publication year as given upstream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<YearText>,
}

impl Authorship {
    /// Authorship with the given authors and no year.
    pub fn new<I, S>(authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<AuthorName>,
    {
        Self {
            authors: authors.into_iter().map(Into::into).collect(),
            ex_authors: Vec::new(),
            year: None,
        }
    }

    /// Sets the publication year.
    pub fn with_year(mut self, year: impl Into<YearText>) -> Self {
        self.year = Some(year.into());
        self
    }

    /// Returns `true` when neither authors nor a year are present.
    pub fn is_empty(&self) -> bool {
        self.authors.is_empty() && self.ex_authors.is_empty() && self.year.is_none()
    }

    /// Renders the block as it would be cited: `Pall. ex L. & Mill., 1768`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if !self.ex_authors.is_empty() {
            out.push_str(&join_team(&self.ex_authors));
            out.push_str(" ex ");
        }
        out.push_str(&join_team(&self.authors));
        if let Some(year) = self.year.as_deref().filter(|y| !y.trim().is_empty()) {
            if !out.is_empty() {
                out.push_str(", ");
            }
            out.push_str(year.trim());
        }
        out
    }
}

fn join_team(authors: &[AuthorName]) -> String {
    match authors {
        [] => String::new(),
        [single] => single.clone(),
        [init @ .., last] => format!("{} & {}", init.join(", "), last),
    }
}

/// Structured scientific name as produced by the upstream name parser.
///
/// Only `scientific_name` feeds the lookup key; the authorship fields are read
/// by the authorship comparator and for full-name equality.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, bitcode::Encode, bitcode::Decode)]
pub struct Name {
    /// Canonical name without authorship.
    pub scientific_name: ScientificNameText,
    /// Serialized authorship as received; derived from the structured blocks when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorship: Option<AuthorshipText>,
    /// Parsed name parts, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genus: Option<String>,
    /// Subgenus or section epithet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infrageneric_epithet: Option<String>,
    /// Second word of a binomial.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific_epithet: Option<String>,
    /// Third word of a trinomial.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infraspecific_epithet: Option<String>,
    /// Authors of the current combination.
    #[serde(default)]
    pub combination_authorship: Authorship,
    /// Authors of the basionym, cited in brackets.
    #[serde(default)]
    pub basionym_authorship: Authorship,
    /// Rank the name was published at.
    pub rank: Rank,
    /// `None` is unconstrained and matches any code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<NomCode>,
    /// Gates insertion; see [`NameType::is_indexable`].
    pub name_type: NameType,
    /// Where the record came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
    /// Nomenclatural status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nom_status: Option<NomStatus>,
    /// Link to the publication of the name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_in_id: Option<String>,
    /// Page within the publication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_in_page: Option<String>,
}

impl Name {
    /// Scientific name of the given rank, typed `SCIENTIFIC`, with epithets
    /// split from the whitespace tokens of `scientific_name`.
    pub fn new(scientific_name: impl Into<ScientificNameText>, rank: Rank) -> Self {
        let scientific_name = scientific_name.into();
        let (genus, specific_epithet, infraspecific_epithet) = split_epithets(&scientific_name);
        Self {
            scientific_name,
            authorship: None,
            genus,
            infrageneric_epithet: None,
            specific_epithet,
            infraspecific_epithet,
            combination_authorship: Authorship::default(),
            basionym_authorship: Authorship::default(),
            rank,
            code: None,
            name_type: NameType::Scientific,
            origin: None,
            nom_status: None,
            published_in_id: None,
            published_in_page: None,
        }
    }

    /// Sets the serialized authorship text.
    pub fn with_authorship(mut self, authorship: impl Into<AuthorshipText>) -> Self {
        let authorship = authorship.into();
        self.authorship = (!authorship.trim().is_empty()).then_some(authorship);
        self
    }

    /// Sets the combination authorship block.
    pub fn with_combination_authorship(mut self, authorship: Authorship) -> Self {
        self.combination_authorship = authorship;
        self
    }

    /// Sets the basionym authorship block.
    pub fn with_basionym_authorship(mut self, authorship: Authorship) -> Self {
        self.basionym_authorship = authorship;
        self
    }

    /// Restricts the name to one nomenclatural code.
    pub fn with_code(mut self, code: NomCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Sets the name type.
    pub fn with_type(mut self, name_type: NameType) -> Self {
        self.name_type = name_type;
        self
    }

    /// Complete authorship: the serialized text if present, otherwise
    /// `(basionym) combination` rendered from the structured blocks.
    pub fn authorship_complete(&self) -> String {
        if let Some(text) = self.authorship.as_deref()
            && !text.trim().is_empty()
        {
            return text.trim().to_string();
        }
        let mut out = String::new();
        if !self.basionym_authorship.is_empty() {
            out.push('(');
            out.push_str(&self.basionym_authorship.render());
            out.push(')');
        }
        if !self.combination_authorship.is_empty() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(&self.combination_authorship.render());
        }
        out
    }

    /// Returns `true` when any authorship, structured or serialized, is present.
    pub fn has_authorship(&self) -> bool {
        !self.authorship_complete().is_empty()
    }

    /// Full name with authorship, as compared for exact matches.
    pub fn label(&self) -> String {
        let authorship = self.authorship_complete();
        if authorship.is_empty() {
            self.scientific_name.trim().to_string()
        } else {
            format!("{} {}", self.scientific_name.trim(), authorship)
        }
    }
}

fn split_epithets(scientific_name: &str) -> (Option<String>, Option<String>, Option<String>) {
    let mut tokens = scientific_name.split_whitespace();
    let genus = tokens.next().map(str::to_string);
    let specific = tokens.next().map(str::to_string);
    let infraspecific = tokens.last().map(str::to_string);
    (genus, specific, infraspecific)
}

/// A name that carries a stable identity inside the index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexName {
    /// Identity assigned by the id generator; immutable once set.
    pub id: IndexId,
    /// Dataset owning the record in the store of record.
    pub dataset_key: DatasetKey,
    /// Creation time in the store of record, used by incremental loads.
    pub created: DateTime<Utc>,
    /// The stored name.
    #[serde(flatten)]
    pub name: Name,
}

impl IndexName {
    /// Wraps `name` under `id`, created now.
    pub fn new(id: impl Into<IndexId>, dataset_key: DatasetKey, name: Name) -> Self {
        Self {
            id: id.into(),
            dataset_key,
            created: Utc::now(),
            name,
        }
    }

    /// Lookup key of the candidate group this record belongs to.
    pub fn key(&self) -> NormalizedKey {
        normalize_key(&self.name.scientific_name)
    }
}

/// Outcome of a single match call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameMatch {
    /// How the query related to the chosen record.
    #[serde(rename = "type")]
    pub match_type: MatchType,
    /// The chosen record; empty for `NONE` and `AMBIGUOUS`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<IndexName>,
    /// Tied candidates for `AMBIGUOUS`, otherwise diagnostics for verbose calls.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<IndexName>,
}

impl NameMatch {
    /// `NONE` with nothing attached.
    pub fn no_match() -> Self {
        Self {
            match_type: MatchType::None,
            name: None,
            alternatives: Vec::new(),
        }
    }

    /// One chosen record.
    pub fn single(match_type: MatchType, name: IndexName) -> Self {
        Self {
            match_type,
            name: Some(name),
            alternatives: Vec::new(),
        }
    }

    /// `AMBIGUOUS` over the tied candidates.
    pub fn ambiguous(alternatives: Vec<IndexName>) -> Self {
        Self {
            match_type: MatchType::Ambiguous,
            name: None,
            alternatives,
        }
    }

    /// Returns `true` when a single record was chosen.
    pub fn has_match(&self) -> bool {
        self.name.is_some()
    }

    /// Id of the chosen record.
    pub fn id(&self) -> Option<&str> {
        self.name.as_ref().map(|name| name.id.as_str())
    }
}
