//! Lookup keys and comparison forms for scientific names.
//!
//! `normalize_key` groups spelling variants of one name under a single key:
//! diacritics and ligatures fold to ASCII, hybrid and rank markers disappear,
//! and epithets lose doubled letters, common orthographic variants and their
//! Latin gender endings. Collisions are intended; homonyms and variants end
//! up in the same candidate group and are told apart by scoring.
//!
//! `normalize_compare` is the weaker form used for equality checks during
//! scoring: ASCII folding, lowercase and whitespace only.
//!
//! Every function here is total and idempotent.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::types::NormalizedKey;

const HYBRID_SIGN: char = '×';

const RANK_MARKERS: &[&str] = &[
    "var.",
    "subvar.",
    "subsp.",
    "ssp.",
    "nothosubsp.",
    "nothovar.",
    "f.",
    "fo.",
    "forma",
    "subf.",
    "cv.",
    "agg.",
    "sect.",
    "subsect.",
    "subg.",
    "ser.",
];

// Longest endings first so `ii` wins over `i`.
const STEM_ENDINGS: &[&str] = &["ii", "ei", "i", "ae", "is", "os", "on", "um", "us", "e", "a"];

/// Grouping key: [`normalize`] lowercased.
///
/// ```
/// use names_index::normalizer::normalize_key;
///
/// assert_eq!(normalize_key("Abies  albus"), normalize_key("abies alba"));
/// assert_eq!(normalize_key("Carex ×cayouettei"), "carex caioueta");
/// ```
pub fn normalize_key(scientific_name: &str) -> NormalizedKey {
    normalize(scientific_name).to_ascii_lowercase()
}

/// Case-preserving normalized name. The genus keeps its spelling; every
/// later epithet is folded and stemmed.
pub fn normalize(scientific_name: &str) -> String {
    normalize_tokens(scientific_name, false)
}

/// Like [`normalize`] but the genus is folded and stemmed as well.
pub fn normalize_all(scientific_name: &str) -> String {
    normalize_tokens(scientific_name, true)
}

/// ASCII-folded, lowercase, whitespace-collapsed form for equality checks.
pub fn normalize_compare(value: &str) -> String {
    collapse_whitespace(&fold_ascii(value)).to_ascii_lowercase()
}

fn normalize_tokens(scientific_name: &str, include_genus: bool) -> String {
    let folded = fold_ascii(&scientific_name.replace(HYBRID_SIGN, " "));
    let mut out: Vec<String> = Vec::new();
    for raw in folded.split_whitespace() {
        let raw = raw.split('/').next().unwrap_or_default();
        let token = strip_punctuation(raw);
        if token.is_empty() || token.eq_ignore_ascii_case("x") || is_rank_marker(&token) {
            continue;
        }
        if out.is_empty() {
            let genus = strip_glued_hybrid_marker(&token);
            if include_genus {
                out.push(normalize_epithet(genus));
            } else {
                out.push(genus.to_string());
            }
        } else {
            out.push(normalize_epithet(&token));
        }
    }
    out.retain(|token| !token.is_empty());
    out.join(" ")
}

/// Ligatures and letters without a decomposition first, then NFD with
/// combining marks removed. Anything still outside ASCII is dropped.
fn fold_ascii(value: &str) -> String {
    let mut replaced = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            'æ' => replaced.push_str("ae"),
            'Æ' => replaced.push_str("Ae"),
            'œ' => replaced.push_str("oe"),
            'Œ' => replaced.push_str("Oe"),
            'ß' => replaced.push_str("ss"),
            'þ' => replaced.push_str("th"),
            'Þ' => replaced.push_str("Th"),
            'ø' => replaced.push('o'),
            'Ø' => replaced.push('O'),
            'ł' => replaced.push('l'),
            'Ł' => replaced.push('L'),
            'đ' => replaced.push('d'),
            'Đ' => replaced.push('D'),
            'ı' => replaced.push('i'),
            other => replaced.push(other),
        }
    }
    replaced
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(char::is_ascii)
        .collect()
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Matches a punctuation-stripped token, so `var.`, `var` and `(var.)` all count.
fn is_rank_marker(token: &str) -> bool {
    RANK_MARKERS
        .iter()
        .any(|marker| marker.trim_end_matches('.').eq_ignore_ascii_case(token))
}

fn strip_punctuation(token: &str) -> String {
    token
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect()
}

/// `xAbies` is a hybrid genus written with a glued marker.
fn strip_glued_hybrid_marker(token: &str) -> &str {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some('x' | 'X'), Some(second)) if second.is_ascii_uppercase() => &token[1..],
        _ => token,
    }
}

fn normalize_epithet(token: &str) -> String {
    let mut epithet = collapse_repeated(&token.to_ascii_lowercase());
    epithet = epithet
        .replace('y', "i")
        .replace("ij", "i")
        .replace("rh", "r")
        .replace("gh", "g");
    collapse_repeated(&stem_epithet(&epithet))
}

/// Replaces the Latin gender ending of an epithet with `a`; `-trix` becomes `-tor`.
pub fn stem_epithet(epithet: &str) -> String {
    if let Some(stem) = epithet.strip_suffix("trix") {
        return format!("{stem}tor");
    }
    for ending in STEM_ENDINGS {
        if let Some(stem) = epithet.strip_suffix(ending)
            && !stem.is_empty()
        {
            return format!("{stem}a");
        }
    }
    epithet.to_string()
}

fn collapse_repeated(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut previous = None;
    for c in value.chars() {
        if previous != Some(c) || !c.is_ascii_alphabetic() {
            out.push(c);
        }
        previous = Some(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_folds_spelling_variants() {
        assert_eq!(normalize("Abyes  albus"), "Abyes alba");
        assert_eq!(normalize(" \txAbies × ållbbus\t"), "Abies alba");
        assert_eq!(normalize("Carex ×cayouettei"), "Carex caioueta");
        assert_eq!(normalize("Platanus x hispanica"), "Platanus hispanica");
        assert_eq!(normalize("Eragrostis brownii/brownei"), "Eragrostis browna");
        assert_eq!(normalize("Theridion uhlighi"), "Theridion uhliga");
        assert_eq!(normalize("Macrozamia platyrhachis"), "Macrozamia platiracha");
        assert_eq!(normalize("Abies albijeta"), "Abies albieta");
    }

    #[test]
    fn rank_markers_and_punctuation_are_dropped() {
        assert_eq!(
            normalize("Abies alba var. acutifolia"),
            normalize("Abies alba acutifolius")
        );
        assert_eq!(normalize("Poa annua subsp. annua"), "Poa anua anua");
        assert_eq!(normalize("Abies \"alba\","), "Abies alba");
    }

    #[test]
    fn stem_epithet_replaces_gender_endings() {
        for (input, expected) in [
            ("albus", "alba"),
            ("album", "alba"),
            ("albon", "alba"),
            ("muliebris", "muliebra"),
            ("muliebre", "muliebra"),
            ("periculum", "pericula"),
            ("periculi", "pericula"),
            ("viatrix", "viator"),
            ("viatoris", "viatora"),
            ("alaus", "alaa"),
        ] {
            assert_eq!(stem_epithet(input), expected, "stemming {input}");
        }
        assert_eq!(stem_epithet("a"), "a");
    }

    #[test]
    fn key_is_case_and_whitespace_insensitive() {
        assert_eq!(normalize_key("Abies  alba"), normalize_key("abies alba"));
        assert_eq!(normalize_key("ABIES ALBA"), "abies alba");
        assert_eq!(normalize_key("Abies alba"), normalize_key("Abies albus"));
    }

    #[test]
    fn key_is_total_and_idempotent() {
        assert_eq!(normalize_key(""), "");
        assert_eq!(normalize_key("  \t "), "");
        assert_eq!(normalize_key("×"), "");
        for raw in [
            "Abies alba",
            " \txAbies × ållbbus\t",
            "Carex ×cayouettei",
            "Eragrostis brownii/brownei",
            "Macrozamia platyrhachis",
            "Cæsalpinia pulcherrima",
            "Genus alaus",
            "Xanthium strumarium",
            "Abies (x) alba",
            "Abies x. alba",
            "Abies x, alba",
            "x. Abies alba",
            "X Abies alba",
            "Poa annua (var.) minor",
            "Poa annua var minor",
        ] {
            let once = normalize_key(raw);
            assert_eq!(normalize_key(&once), once, "idempotence of {raw:?}");
            let all = normalize_all(raw);
            assert_eq!(normalize_all(&all), all, "idempotence of {raw:?}");
        }
    }

    #[test]
    fn punctuated_hybrid_and_rank_markers_are_dropped() {
        assert_eq!(normalize_key("Abies (x) alba"), "abies alba");
        assert_eq!(normalize_key("Abies x, alba"), "abies alba");
        assert_eq!(normalize_key("x. Abies alba"), "abies alba");
        assert_eq!(normalize_key("Poa annua (var.) minor"), "poa anua minor");
        assert_eq!(normalize_key("Poa annua var minor"), "poa anua minor");
    }

    #[test]
    fn normalize_all_stems_the_genus() {
        assert_eq!(normalize_all("Abyes albus"), "abies alba");
        assert_eq!(normalize_all("Genus albus"), "gena alba");
        assert_eq!(normalize("Abyes albus"), "Abyes alba");
    }

    #[test]
    fn glued_marker_needs_capitalized_genus() {
        assert_eq!(normalize("Xanthium strumarium"), "Xanthium strumaria");
        assert_eq!(normalize("xAbies alba"), "Abies alba");
    }

    #[test]
    fn compare_form_folds_without_stemming() {
        assert_eq!(normalize_compare("Abies  Alba  MILL."), "abies alba mill.");
        assert_eq!(normalize_compare("Müller ß"), "muller ss");
        assert_eq!(normalize_compare("Œder"), "oeder");
        let once = normalize_compare(" Ørsted, 1843 ");
        assert_eq!(once, "orsted, 1843");
        assert_eq!(normalize_compare(&once), once);
    }
}
