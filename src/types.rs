/// Stable identity of an index name, assigned once by the id generator.
/// Examples: `NI1`, `NI20931`
pub type IndexId = String;
/// Key of the dataset owning a set of names in the store of record.
/// Example: `1` (the names index dataset)
pub type DatasetKey = i64;
/// Normalized lookup key shared by every member of a candidate group.
/// Examples: `abies alba`, `carex caioueta`
pub type NormalizedKey = String;
/// Scientific name without authorship, as given by the name parser.
/// Examples: `Abies alba`, `Carex ×cayouettei`
pub type ScientificNameText = String;
/// Serialized authorship text, combination plus basionym authors and years.
/// Examples: `Mill.`, `(L.) H.Karst., 1881`
pub type AuthorshipText = String;
/// Single author name as it appears in an authorship team.
/// Examples: `Mill.`, `H.Karst.`
pub type AuthorName = String;
/// Publication year text as given upstream.
/// Examples: `1768`, `1881`
pub type YearText = String;
