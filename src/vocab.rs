//! Closed vocabularies shared by index names and matches.
//!
//! Every vocabulary serializes as SCREAMING_SNAKE_CASE, matching the labels
//! used by the store of record, and round-trips through `as_str`/`FromStr`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! vocabulary {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $label:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Clone,
            Copy,
            Debug,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            Serialize,
            Deserialize,
            bitcode::Encode,
            bitcode::Decode,
        )]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $(
                #[doc = concat!("`", $label, "`.")]
                $(#[$vmeta])*
                $variant,
            )+
        }

        impl $name {
            /// Every value in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            /// Canonical upper-case label.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVocabulary;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                let wanted = value.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|candidate| candidate.as_str().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| UnknownVocabulary {
                        vocabulary: stringify!($name),
                        value: value.to_string(),
                    })
            }
        }
    };
}

/// Returned when a label does not belong to a vocabulary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownVocabulary {
    /// Vocabulary that was parsed.
    pub vocabulary: &'static str,
    /// Offending input.
    pub value: String,
}

impl fmt::Display for UnknownVocabulary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} value '{}'", self.vocabulary, self.value)
    }
}

impl std::error::Error for UnknownVocabulary {}

vocabulary! {
    /// Taxonomic rank, ordered from highest to lowest with the non-comparable
    /// ranks (`Other`, `Unranked`) last.
    Rank {
        Domain => "DOMAIN",
        Superkingdom => "SUPERKINGDOM",
        Kingdom => "KINGDOM",
        Subkingdom => "SUBKINGDOM",
        Superphylum => "SUPERPHYLUM",
        Phylum => "PHYLUM",
        Subphylum => "SUBPHYLUM",
        Superclass => "SUPERCLASS",
        Class => "CLASS",
        Subclass => "SUBCLASS",
        Infraclass => "INFRACLASS",
        Superorder => "SUPERORDER",
        Order => "ORDER",
        Suborder => "SUBORDER",
        Infraorder => "INFRAORDER",
        Superfamily => "SUPERFAMILY",
        Family => "FAMILY",
        Subfamily => "SUBFAMILY",
        Tribe => "TRIBE",
        Subtribe => "SUBTRIBE",
        /// Any rank above genus whose exact level is unknown.
        SupragenericName => "SUPRAGENERIC_NAME",
        Genus => "GENUS",
        Subgenus => "SUBGENUS",
        Section => "SECTION",
        Subsection => "SUBSECTION",
        Series => "SERIES",
        Subseries => "SUBSERIES",
        /// Any rank between genus and species whose exact level is unknown.
        InfragenericName => "INFRAGENERIC_NAME",
        SpeciesAggregate => "SPECIES_AGGREGATE",
        Species => "SPECIES",
        /// Any rank below species whose exact level is unknown.
        InfraspecificName => "INFRASPECIFIC_NAME",
        Subspecies => "SUBSPECIES",
        /// Any rank below subspecies whose exact level is unknown.
        InfrasubspecificName => "INFRASUBSPECIFIC_NAME",
        Variety => "VARIETY",
        Subvariety => "SUBVARIETY",
        Form => "FORM",
        Subform => "SUBFORM",
        Cultivar => "CULTIVAR",
        Strain => "STRAIN",
        Other => "OTHER",
        Unranked => "UNRANKED",
    }
}

impl Rank {
    /// Ranks above genus.
    pub fn is_suprageneric(&self) -> bool {
        *self < Rank::Genus
    }

    /// Ranks strictly between genus and species aggregate.
    pub fn is_infrageneric_strictly(&self) -> bool {
        *self > Rank::Genus && *self < Rank::SpeciesAggregate
    }

    /// Ranks below species.
    pub fn is_infraspecific(&self) -> bool {
        *self > Rank::Species && *self < Rank::Other
    }

    /// `Unranked` carries no comparable level. `Other` is read as `Unranked`,
    /// the rank it is normalized to on the way into the store of record.
    pub fn is_uncomparable(&self) -> bool {
        matches!(self, Rank::Unranked | Rank::Other)
    }

    /// Returns `true` when two ranks do not contradict each other.
    ///
    /// Suprageneric ranks are mutually compatible; aggregate and generic
    /// placeholder ranks accept the concrete ranks they stand for. Everything
    /// else requires equality.
    pub fn is_compatible_with(&self, other: Rank) -> bool {
        if self.is_uncomparable() || other.is_uncomparable() {
            return true;
        }
        if self.is_suprageneric() && other.is_suprageneric() {
            return true;
        }
        placeholder_match(*self, other)
            .or_else(|| placeholder_match(other, *self))
            .unwrap_or(*self == other)
    }
}

/// `Some` when `r1` is a placeholder rank that decides compatibility on its own.
fn placeholder_match(r1: Rank, r2: Rank) -> Option<bool> {
    match r1 {
        Rank::SpeciesAggregate => Some(matches!(r2, Rank::Species | Rank::SpeciesAggregate)),
        Rank::InfraspecificName => Some(r2.is_infraspecific()),
        Rank::InfrasubspecificName => Some(r2.is_infraspecific() && r2 != Rank::Subspecies),
        Rank::InfragenericName => Some(r2.is_infrageneric_strictly()),
        _ => None,
    }
}

vocabulary! {
    /// Nomenclatural code a name is governed by.
    NomCode {
        Bacterial => "BACTERIAL",
        Botanical => "BOTANICAL",
        Cultivars => "CULTIVARS",
        Phytosociological => "PHYTOSOCIOLOGICAL",
        Virus => "VIRUS",
        Zoological => "ZOOLOGICAL",
    }
}

vocabulary! {
    /// Kind of name as classified by the name parser.
    NameType {
        Scientific => "SCIENTIFIC",
        Virus => "VIRUS",
        HybridFormula => "HYBRID_FORMULA",
        Informal => "INFORMAL",
        Otu => "OTU",
        Placeholder => "PLACEHOLDER",
        NoName => "NO_NAME",
    }
}

impl NameType {
    /// Types that may receive an index identity.
    pub fn is_indexable(&self) -> bool {
        crate::constants::index::INDEX_NAME_TYPES.contains(self)
    }
}

vocabulary! {
    /// How a name record came into existence.
    Origin {
        Source => "SOURCE",
        Implicit => "IMPLICIT",
        Autonym => "AUTONYM",
        /// Created automatically when a match missed and inserts were allowed.
        NameMatching => "NAME_MATCHING",
        Other => "OTHER",
    }
}

vocabulary! {
    /// Nomenclatural status of a name.
    NomStatus {
        Established => "ESTABLISHED",
        Acceptable => "ACCEPTABLE",
        Unacceptable => "UNACCEPTABLE",
        Conserved => "CONSERVED",
        Rejected => "REJECTED",
        Doubtful => "DOUBTFUL",
        Manuscript => "MANUSCRIPT",
        Chresonym => "CHRESONYM",
    }
}

vocabulary! {
    /// Outcome of a single match call.
    MatchType {
        None => "NONE",
        Exact => "EXACT",
        Variant => "VARIANT",
        Ambiguous => "AMBIGUOUS",
        Inserted => "INSERTED",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_groups_follow_declaration_order() {
        assert!(Rank::Family.is_suprageneric());
        assert!(Rank::SupragenericName.is_suprageneric());
        assert!(!Rank::Genus.is_suprageneric());
        assert!(Rank::Subgenus.is_infrageneric_strictly());
        assert!(Rank::InfragenericName.is_infrageneric_strictly());
        assert!(!Rank::SpeciesAggregate.is_infrageneric_strictly());
        assert!(Rank::Variety.is_infraspecific());
        assert!(Rank::Strain.is_infraspecific());
        assert!(!Rank::Species.is_infraspecific());
        assert!(!Rank::Unranked.is_infraspecific());
    }

    #[test]
    fn suprageneric_ranks_are_mutually_compatible() {
        assert!(Rank::Family.is_compatible_with(Rank::Order));
        assert!(Rank::SupragenericName.is_compatible_with(Rank::Tribe));
        assert!(!Rank::Family.is_compatible_with(Rank::Genus));
    }

    #[test]
    fn placeholder_ranks_are_checked_both_ways() {
        assert!(Rank::SpeciesAggregate.is_compatible_with(Rank::Species));
        assert!(Rank::Species.is_compatible_with(Rank::SpeciesAggregate));
        assert!(!Rank::SpeciesAggregate.is_compatible_with(Rank::Subspecies));

        assert!(Rank::InfraspecificName.is_compatible_with(Rank::Subspecies));
        assert!(Rank::Form.is_compatible_with(Rank::InfraspecificName));

        assert!(Rank::InfrasubspecificName.is_compatible_with(Rank::Variety));
        assert!(!Rank::Subspecies.is_compatible_with(Rank::InfrasubspecificName));

        assert!(Rank::InfragenericName.is_compatible_with(Rank::Section));
        assert!(!Rank::InfragenericName.is_compatible_with(Rank::Genus));
    }

    #[test]
    fn concrete_ranks_require_equality() {
        assert!(Rank::Species.is_compatible_with(Rank::Species));
        assert!(!Rank::Genus.is_compatible_with(Rank::Species));
        assert!(!Rank::Variety.is_compatible_with(Rank::Form));
        assert!(Rank::Unranked.is_compatible_with(Rank::Genus));
    }

    #[test]
    fn other_rank_is_read_as_unranked() {
        for rank in [Rank::Species, Rank::Genus, Rank::Family, Rank::Unranked] {
            assert_eq!(
                Rank::Other.is_compatible_with(rank),
                Rank::Unranked.is_compatible_with(rank),
                "{rank}"
            );
            assert!(rank.is_compatible_with(Rank::Other), "{rank}");
        }
        assert!(!Rank::Other.is_infraspecific());
        assert!(!Rank::Other.is_suprageneric());
    }

    #[test]
    fn labels_parse_case_insensitively() {
        assert_eq!("species".parse::<Rank>().unwrap(), Rank::Species);
        assert_eq!(
            "HYBRID_FORMULA".parse::<NameType>().unwrap(),
            NameType::HybridFormula
        );
        assert_eq!(NomCode::Zoological.to_string(), "ZOOLOGICAL");
        let err = "phylumish".parse::<Rank>().unwrap_err();
        assert_eq!(err.vocabulary, "Rank");
        assert!(err.to_string().contains("phylumish"));
    }

    #[test]
    fn serde_labels_match_as_str() {
        for rank in Rank::ALL {
            let json = serde_json::to_string(rank).unwrap();
            assert_eq!(json, format!("\"{}\"", rank.as_str()));
        }
        let parsed: MatchType = serde_json::from_str("\"AMBIGUOUS\"").unwrap();
        assert_eq!(parsed, MatchType::Ambiguous);
    }

    #[test]
    fn only_parsed_name_types_are_indexable() {
        assert!(NameType::Scientific.is_indexable());
        assert!(NameType::Otu.is_indexable());
        assert!(!NameType::Informal.is_indexable());
        assert!(!NameType::Placeholder.is_indexable());
        assert!(!NameType::NoName.is_indexable());
    }
}
