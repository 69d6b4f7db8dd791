//! Row, family, column and cell types, and the row/family assembler.
//!
//! ```text
//!   Row(key)
//!    └── Family(name)              ordered by name
//!         └── Column(qualifier)    strictly ascending by qualifier bytes
//!              └── Cell(value, ts) newest first; reads use the first cell
//! ```
//!
//! Writes travel as a [`RowMutation`]: a row key plus a flat list of
//! [`SetCell`]s. [`Row::from_mutation`] and [`Row::to_mutation`] convert
//! between the two shapes.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

// ============================================================================
// TimestampMicros
// ============================================================================

/// Cell timestamp in microseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimestampMicros(pub i64);

impl TimestampMicros {
    pub fn now() -> Self {
        let micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_micros()).unwrap_or(i64::MAX))
            .unwrap_or(0);
        TimestampMicros(micros)
    }

    pub fn as_micros(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for TimestampMicros {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Cell / Column / Family
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub value: Vec<u8>,
    pub timestamp: TimestampMicros,
}

impl Cell {
    pub fn new(value: Vec<u8>, timestamp: TimestampMicros) -> Self {
        Cell { value, timestamp }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub qualifier: Vec<u8>,
    pub cells: Vec<Cell>,
}

impl Column {
    pub fn new(qualifier: impl Into<Vec<u8>>, cells: Vec<Cell>) -> Self {
        Column {
            qualifier: qualifier.into(),
            cells,
        }
    }

    /// A column holding a single cell.
    pub fn single(
        qualifier: impl Into<Vec<u8>>,
        value: Vec<u8>,
        timestamp: TimestampMicros,
    ) -> Self {
        Column::new(qualifier, vec![Cell::new(value, timestamp)])
    }

    /// The cell the read path uses. Later cells are never consulted.
    pub fn first_cell(&self) -> Option<&Cell> {
        self.cells.first()
    }

    /// Qualifier as text, replacing invalid UTF-8.
    pub fn qualifier_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.qualifier)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Family {
    pub name: String,
    pub columns: Vec<Column>,
}

impl Family {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Family {
            name: name.into(),
            columns,
        }
    }

    /// Build a family from flattened `(qualifier, value)` entries.
    ///
    /// Every entry becomes one cell stamped with `timestamp`; columns are
    /// sorted by qualifier bytes. This is where the sortedness invariant the
    /// index relies on is established.
    pub fn assemble(
        name: impl Into<String>,
        timestamp: TimestampMicros,
        entries: Vec<(String, Vec<u8>)>,
    ) -> Self {
        let mut columns: Vec<Column> = entries
            .into_iter()
            .map(|(qualifier, value)| Column::single(qualifier.into_bytes(), value, timestamp))
            .collect();
        columns.sort_by(|a, b| a.qualifier.cmp(&b.qualifier));
        Family::new(name, columns)
    }

    pub fn is_sorted(&self) -> bool {
        self.columns
            .windows(2)
            .all(|pair| pair[0].qualifier < pair[1].qualifier)
    }
}

// ============================================================================
// Writes
// ============================================================================

/// One per-qualifier write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCell {
    pub family: String,
    pub qualifier: Vec<u8>,
    pub value: Vec<u8>,
    pub timestamp: TimestampMicros,
}

/// Storage write request for one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowMutation {
    pub row_key: Vec<u8>,
    pub mutations: Vec<SetCell>,
}

impl RowMutation {
    pub fn new(row_key: impl Into<Vec<u8>>) -> Self {
        RowMutation {
            row_key: row_key.into(),
            mutations: Vec::new(),
        }
    }

    /// Build a write request from flattened `(qualifier, value)` entries
    /// sharing one family and timestamp.
    pub fn from_entries(
        row_key: impl Into<Vec<u8>>,
        family: &str,
        timestamp: TimestampMicros,
        entries: Vec<(String, Vec<u8>)>,
    ) -> Self {
        let mutations = entries
            .into_iter()
            .map(|(qualifier, value)| SetCell {
                family: family.to_string(),
                qualifier: qualifier.into_bytes(),
                value,
                timestamp,
            })
            .collect();
        RowMutation {
            row_key: row_key.into(),
            mutations,
        }
    }

    pub fn set_cell(
        &mut self,
        family: impl Into<String>,
        qualifier: impl Into<Vec<u8>>,
        value: Vec<u8>,
        timestamp: TimestampMicros,
    ) -> &mut Self {
        self.mutations.push(SetCell {
            family: family.into(),
            qualifier: qualifier.into(),
            value,
            timestamp,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }
}

// ============================================================================
// Row
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub key: Vec<u8>,
    families: Vec<Family>,
}

impl Row {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Row {
            key: key.into(),
            families: Vec::new(),
        }
    }

    /// Build a row from families. A later family with a repeated name
    /// replaces the earlier one.
    pub fn with_families(key: impl Into<Vec<u8>>, families: Vec<Family>) -> Self {
        let mut row = Row::new(key);
        for family in families {
            row.insert_family(family);
        }
        row
    }

    pub fn insert_family(&mut self, family: Family) {
        match self
            .families
            .binary_search_by(|f| f.name.as_str().cmp(family.name.as_str()))
        {
            Ok(pos) => self.families[pos] = family,
            Err(pos) => self.families.insert(pos, family),
        }
    }

    pub fn families(&self) -> &[Family] {
        &self.families
    }

    pub fn family(&self, name: &str) -> Option<&Family> {
        self.families
            .binary_search_by(|f| f.name.as_str().cmp(name))
            .ok()
            .map(|pos| &self.families[pos])
    }

    /// Column list of the named family; empty when the family is absent.
    pub fn columns(&self, family: &str) -> &[Column] {
        self.family(family)
            .map(|f| f.columns.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.families.iter().all(|f| f.columns.is_empty())
    }

    /// Group writes by family, then by qualifier.
    ///
    /// Repeated writes to one qualifier become cells of the same column,
    /// newest timestamp first; among equal timestamps the later write comes
    /// first.
    pub fn from_writes(key: impl Into<Vec<u8>>, writes: impl IntoIterator<Item = SetCell>) -> Self {
        let mut grouped: BTreeMap<String, BTreeMap<Vec<u8>, Vec<Cell>>> = BTreeMap::new();
        for write in writes {
            grouped
                .entry(write.family)
                .or_default()
                .entry(write.qualifier)
                .or_default()
                .push(Cell::new(write.value, write.timestamp));
        }

        let families = grouped
            .into_iter()
            .map(|(name, columns)| {
                let columns = columns
                    .into_iter()
                    .map(|(qualifier, mut cells)| {
                        cells.reverse();
                        cells.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
                        Column::new(qualifier, cells)
                    })
                    .collect();
                Family::new(name, columns)
            })
            .collect();

        Row {
            key: key.into(),
            families,
        }
    }

    pub fn from_mutation(mutation: &RowMutation) -> Self {
        Row::from_writes(mutation.row_key.clone(), mutation.mutations.iter().cloned())
    }

    /// Every cell as a write, grouped by family then qualifier.
    pub fn writes(&self) -> Vec<SetCell> {
        self.families
            .iter()
            .flat_map(|family| {
                family.columns.iter().flat_map(move |column| {
                    column.cells.iter().map(move |cell| SetCell {
                        family: family.name.clone(),
                        qualifier: column.qualifier.clone(),
                        value: cell.value.clone(),
                        timestamp: cell.timestamp,
                    })
                })
            })
            .collect()
    }

    pub fn to_mutation(&self) -> RowMutation {
        RowMutation {
            row_key: self.key.clone(),
            mutations: self.writes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(micros: i64) -> TimestampMicros {
        TimestampMicros(micros)
    }

    #[test]
    fn test_assemble_sorts_by_qualifier_bytes() {
        let family = Family::assemble(
            "cf",
            ts(10),
            vec![
                ("y.z".to_string(), vec![3]),
                ("x".to_string(), vec![1]),
                ("a.b".to_string(), vec![2]),
                ("a".to_string(), vec![0]),
            ],
        );

        let qualifiers: Vec<_> = family
            .columns
            .iter()
            .map(|c| c.qualifier_lossy().into_owned())
            .collect();
        assert_eq!(qualifiers, vec!["a", "a.b", "x", "y.z"]);
        assert!(family.is_sorted());
        assert!(family
            .columns
            .iter()
            .all(|c| c.cells.len() == 1 && c.cells[0].timestamp == ts(10)));
    }

    #[test]
    fn test_missing_family_reads_empty() {
        let row = Row::new("r1");
        assert!(row.columns("profile").is_empty());
        assert!(row.family("profile").is_none());
    }

    #[test]
    fn test_from_entries_shares_family_and_timestamp() {
        let mutation = RowMutation::from_entries(
            "r1",
            "cf",
            ts(5),
            vec![("b".to_string(), vec![2]), ("a".to_string(), vec![1])],
        );
        assert_eq!(mutation.len(), 2);
        assert!(mutation
            .mutations
            .iter()
            .all(|m| m.family == "cf" && m.timestamp == ts(5)));
        // Entry order is kept; sorting happens when grouping into a row.
        assert_eq!(mutation.mutations[0].qualifier, b"b".to_vec());
    }

    #[test]
    fn test_writes_and_row_are_inverse() {
        let mut mutation = RowMutation::new("r1");
        mutation
            .set_cell("b", "q2", vec![2], ts(1))
            .set_cell("a", "q1", vec![1], ts(1))
            .set_cell("b", "q1", vec![3], ts(1));

        let row = Row::from_mutation(&mutation);
        assert_eq!(row.families().len(), 2);
        assert_eq!(row.families()[0].name, "a");
        assert!(row.families().iter().all(Family::is_sorted));

        let writes = row.writes();
        let families: Vec<_> = writes
            .iter()
            .map(|w| (w.family.as_str(), w.qualifier.as_slice()))
            .collect();
        assert_eq!(
            families,
            vec![("a", &b"q1"[..]), ("b", &b"q1"[..]), ("b", &b"q2"[..])]
        );

        let rebuilt = Row::from_mutation(&row.to_mutation());
        assert_eq!(rebuilt, row);
    }

    #[test]
    fn test_duplicate_qualifier_orders_newest_first() {
        let mut mutation = RowMutation::new("r1");
        mutation
            .set_cell("cf", "q", vec![1], ts(1))
            .set_cell("cf", "q", vec![2], ts(3))
            .set_cell("cf", "q", vec![3], ts(3));

        let row = Row::from_mutation(&mutation);
        let column = &row.columns("cf")[0];
        assert_eq!(column.cells.len(), 3);
        // Later write wins the tie at ts 3.
        assert_eq!(column.first_cell().unwrap().value, vec![3]);
        assert_eq!(column.cells[1].value, vec![2]);
        assert_eq!(column.cells[2].value, vec![1]);
    }

    #[test]
    fn test_insert_family_replaces_same_name() {
        let mut row = Row::new("r1");
        row.insert_family(Family::new("cf", vec![Column::single("a", vec![1], ts(1))]));
        row.insert_family(Family::new("cf", vec![]));
        assert_eq!(row.families().len(), 1);
        assert!(row.is_empty());
    }
}
