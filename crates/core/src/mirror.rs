//! Declarative descriptors for the mirrored tables.
//!
//! The four tables below are owned by the sync engine: their whole content is
//! deleted and reloaded from the remote source on every cycle. Each table is
//! described by a [`TableSpec`] (column allow-list, primary key, parent links,
//! preserved local columns) so the orchestrator, the remote reader and the
//! local writer all run one uniform loop instead of branching per entity.

use std::fmt;

use chrono::NaiveDate;
use serde::{Serialize, Serializer};

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// A table mirrored from the remote operational database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MirrorTable {
    Houses,
    Contacts,
    Sells,
    Deals,
}

impl MirrorTable {
    /// Parents before children. Rows are written in this order so every
    /// foreign key already resolves when its child row is inserted.
    pub const WRITE_ORDER: [MirrorTable; 4] = [
        MirrorTable::Houses,
        MirrorTable::Contacts,
        MirrorTable::Sells,
        MirrorTable::Deals,
    ];

    /// Children before parents: the reverse of [`Self::WRITE_ORDER`].
    pub const CLEAR_ORDER: [MirrorTable; 4] = [
        MirrorTable::Deals,
        MirrorTable::Sells,
        MirrorTable::Contacts,
        MirrorTable::Houses,
    ];

    /// Table name, identical in the remote source and the local store.
    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// The descriptor for this table.
    pub fn spec(self) -> &'static TableSpec {
        match self {
            MirrorTable::Houses => &HOUSES,
            MirrorTable::Contacts => &CONTACTS,
            MirrorTable::Sells => &SELLS,
            MirrorTable::Deals => &DEALS,
        }
    }
}

impl fmt::Display for MirrorTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for MirrorTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

/// Storage class of a mirrored column. Drives both the remote cast and the
/// local bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Real,
    Text,
    Date,
}

/// One transferred column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn col(name: &'static str, kind: ColumnKind) -> Column {
    Column { name, kind }
}

/// A foreign key from a mirrored table to another mirrored table.
///
/// The remote reader uses these to drop rows whose parent is missing at the
/// source, so orphans never reach the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentLink {
    /// Column in the child table holding the parent's key.
    pub column: &'static str,
    pub parent: MirrorTable,
    /// `true`: the child is dropped when the column is NULL or unresolved.
    /// `false`: NULL is allowed, but a non-NULL value must resolve.
    pub required: bool,
}

/// Sync descriptor of one mirrored table.
#[derive(Debug)]
pub struct TableSpec {
    pub table: MirrorTable,
    pub name: &'static str,
    /// Primary key column. Also the pagination order.
    pub key: &'static str,
    /// Columns read from the source and written locally, in row order.
    pub columns: &'static [Column],
    pub parents: &'static [ParentLink],
    /// Local-only columns that must survive a reload of the same key.
    pub preserved_columns: &'static [&'static str],
    /// Per-table override of the configured chunk size.
    pub chunk_size: Option<u64>,
}

impl TableSpec {
    /// Comma-separated column list in row order.
    pub fn column_list(&self) -> String {
        self.columns
            .iter()
            .map(|c| c.name)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Chunk size to use for this table given the configured default.
    pub fn effective_chunk_size(&self, default: u64) -> u64 {
        self.chunk_size.unwrap_or(default).max(1)
    }
}

use ColumnKind::{Date, Integer, Real, Text};

/// Warranty end dates are entered locally and never read from the source.
pub const HOUSE_WARRANTY_COLUMNS: &[&str] =
    &["warranty_house_end_date", "warranty_apartments_end_date"];

static HOUSES: TableSpec = TableSpec {
    table: MirrorTable::Houses,
    name: "estate_houses",
    key: "house_id",
    columns: &[
        col("house_id", Integer),
        col("complex_name", Text),
        col("name", Text),
    ],
    parents: &[],
    preserved_columns: HOUSE_WARRANTY_COLUMNS,
    chunk_size: None,
};

static CONTACTS: TableSpec = TableSpec {
    table: MirrorTable::Contacts,
    name: "estate_deals_contacts",
    key: "id",
    columns: &[
        col("id", Integer),
        col("contacts_buy_name", Text),
        col("contacts_buy_phones", Text),
    ],
    parents: &[],
    preserved_columns: &[],
    chunk_size: None,
};

// Sells are read flat: related deals are never joined in, so each sell is
// exactly one row regardless of how many deals reference it.
static SELLS: TableSpec = TableSpec {
    table: MirrorTable::Sells,
    name: "estate_sells",
    key: "estate_sell_id",
    columns: &[
        col("estate_sell_id", Integer),
        col("estate_sell_category", Text),
        col("house_id", Integer),
        col("estate_rooms", Integer),
        col("geo_house_entrance", Text),
        col("estate_floor", Integer),
        col("estate_riser", Text),
        col("geo_flatnum", Text),
    ],
    parents: &[ParentLink {
        column: "house_id",
        parent: MirrorTable::Houses,
        required: false,
    }],
    preserved_columns: &[],
    chunk_size: None,
};

static DEALS: TableSpec = TableSpec {
    table: MirrorTable::Deals,
    name: "estate_deals",
    key: "id",
    columns: &[
        col("id", Integer),
        col("estate_sell_id", Integer),
        col("deal_status_name", Text),
        col("agreement_number", Text),
        col("agreement_date", Date),
        col("deal_sum", Real),
        col("deal_area", Real),
        col("contacts_buy_id", Integer),
        col("finances_income_reserved", Real),
    ],
    parents: &[
        ParentLink {
            column: "estate_sell_id",
            parent: MirrorTable::Sells,
            required: true,
        },
        ParentLink {
            column: "contacts_buy_id",
            parent: MirrorTable::Contacts,
            required: true,
        },
    ],
    preserved_columns: &[],
    chunk_size: None,
};

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// A single transferred cell.
#[derive(Debug, Clone, PartialEq)]
pub enum MirrorValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Date(NaiveDate),
}

impl MirrorValue {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            MirrorValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, MirrorValue::Null)
    }

    /// Whether this value may be stored in a column of `kind`.
    pub fn fits(&self, kind: ColumnKind) -> bool {
        matches!(
            (self, kind),
            (MirrorValue::Null, _)
                | (MirrorValue::Integer(_), ColumnKind::Integer)
                | (MirrorValue::Real(_), ColumnKind::Real)
                | (MirrorValue::Text(_), ColumnKind::Text)
                | (MirrorValue::Date(_), ColumnKind::Date)
        )
    }
}

/// One row, ordered like [`TableSpec::columns`].
pub type MirrorRow = Vec<MirrorValue>;

/// Check a row against a table's column list.
pub fn check_row(spec: &TableSpec, row: &[MirrorValue]) -> Result<(), String> {
    if row.len() != spec.columns.len() {
        return Err(format!(
            "{}: expected {} columns, got {}",
            spec.name,
            spec.columns.len(),
            row.len()
        ));
    }
    for (value, column) in row.iter().zip(spec.columns) {
        if !value.fits(column.kind) {
            return Err(format!(
                "{}.{}: value {value:?} does not fit {:?}",
                spec.name, column.name, column.kind
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_order_is_reverse_of_write_order() {
        let mut reversed = MirrorTable::WRITE_ORDER;
        reversed.reverse();
        assert_eq!(reversed, MirrorTable::CLEAR_ORDER);
    }

    #[test]
    fn parents_precede_children_in_write_order() {
        let position = |t: MirrorTable| {
            MirrorTable::WRITE_ORDER
                .iter()
                .position(|w| *w == t)
                .unwrap()
        };
        for table in MirrorTable::WRITE_ORDER {
            for link in table.spec().parents {
                assert!(
                    position(link.parent) < position(table),
                    "{} must be written before {}",
                    link.parent,
                    table
                );
            }
        }
    }

    #[test]
    fn house_columns_exclude_warranty_dates() {
        let spec = MirrorTable::Houses.spec();
        for preserved in spec.preserved_columns {
            assert!(spec.columns.iter().all(|c| c.name != *preserved));
        }
        assert_eq!(spec.column_list(), "house_id, complex_name, name");
    }

    #[test]
    fn key_is_first_column_of_every_table() {
        for table in MirrorTable::WRITE_ORDER {
            let spec = table.spec();
            assert_eq!(spec.columns[0].name, spec.key);
            assert_eq!(spec.table, table);
        }
    }

    #[test]
    fn parent_link_columns_are_transferred() {
        for table in MirrorTable::WRITE_ORDER {
            let spec = table.spec();
            for link in spec.parents {
                assert!(spec.columns.iter().any(|c| c.name == link.column));
            }
        }
    }

    #[test]
    fn chunk_size_never_zero() {
        let spec = MirrorTable::Deals.spec();
        assert_eq!(spec.effective_chunk_size(0), 1);
        assert_eq!(spec.effective_chunk_size(500), 500);
    }

    #[test]
    fn check_row_rejects_wrong_arity() {
        let spec = MirrorTable::Contacts.spec();
        let row = vec![MirrorValue::Integer(1)];
        assert!(check_row(spec, &row).is_err());
    }

    #[test]
    fn check_row_rejects_wrong_kind() {
        let spec = MirrorTable::Contacts.spec();
        let row = vec![
            MirrorValue::Text("1".into()),
            MirrorValue::Null,
            MirrorValue::Null,
        ];
        let err = check_row(spec, &row).unwrap_err();
        assert!(err.contains("estate_deals_contacts.id"));
    }

    #[test]
    fn check_row_accepts_nulls() {
        let spec = MirrorTable::Contacts.spec();
        let row = vec![
            MirrorValue::Integer(7),
            MirrorValue::Null,
            MirrorValue::Text("+998 90 000 00 00".into()),
        ];
        assert!(check_row(spec, &row).is_ok());
    }
}
