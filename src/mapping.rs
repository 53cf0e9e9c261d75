use std::collections::BTreeMap;
use std::sync::{Mutex, OnceLock};

use anyhow::bail;

use crate::error::{CatalogError, Result};
use crate::naming::{table_name_for, to_storage_name, TableRegistry};
use crate::query::{SqlParam, ValueClass};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub column: Option<&'static str>,
    pub class: ValueClass,
    pub key: bool,
    pub insertable: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnMeta {
    pub field: &'static str,
    pub name: String,
    pub class: ValueClass,
    pub is_key: bool,
    pub insertable: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableMeta {
    pub entity: &'static str,
    pub name: String,
    pub columns: Vec<ColumnMeta>,
    key: usize,
}

impl TableMeta {
    /// The key is the field flagged `#[key]`, or failing that the field named
    /// `swiftCode`/`swift_code` (case-insensitive). A field named `id` is a
    /// surrogate and never appears in insert column lists.
    pub fn derive(
        entity: &'static str,
        table_override: Option<&'static str>,
        fields: &[FieldDef],
    ) -> Result<Self> {
        Self::try_derive(entity, table_override, fields).map_err(CatalogError::Configuration)
    }

    fn try_derive(
        entity: &'static str,
        table_override: Option<&'static str>,
        fields: &[FieldDef],
    ) -> std::result::Result<Self, String> {
        let flagged: Vec<usize> = fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.key)
            .map(|(i, _)| i)
            .collect();
        let key = match flagged.as_slice() {
            [idx] => *idx,
            [] => fields
                .iter()
                .position(|f| is_conventional_key(f.name))
                .ok_or_else(|| format!("{} has no swiftCode key field", entity))?,
            _ => return Err(format!("{} declares more than one #[key] field", entity)),
        };

        let columns = fields
            .iter()
            .enumerate()
            .map(|(i, f)| ColumnMeta {
                field: f.name,
                name: f
                    .column
                    .map(str::to_string)
                    .unwrap_or_else(|| to_storage_name(f.name)),
                class: f.class,
                is_key: i == key,
                insertable: f.insertable && !f.name.eq_ignore_ascii_case("id"),
            })
            .collect();

        Ok(Self {
            entity,
            name: table_override
                .map(str::to_string)
                .unwrap_or_else(|| table_name_for(entity)),
            columns,
            key,
        })
    }

    /// Per-type cache used by the derive. The resolved table is claimed in the
    /// process-wide registry, so a second entity type landing on the same
    /// table fails here.
    pub fn cached(
        cell: &'static OnceLock<std::result::Result<TableMeta, String>>,
        entity: &'static str,
        table_override: Option<&'static str>,
        fields: &[FieldDef],
    ) -> Result<&'static TableMeta> {
        cell.get_or_init(|| {
            let meta = Self::try_derive(entity, table_override, fields)?;
            claim_table(entity, &meta.name)?;
            Ok(meta)
        })
        .as_ref()
        .map_err(|msg| CatalogError::Configuration(msg.clone()))
    }

    pub fn key(&self) -> &ColumnMeta {
        &self.columns[self.key]
    }

    pub fn key_index(&self) -> usize {
        self.key
    }

    pub fn column(&self, name: &str) -> Option<&ColumnMeta> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_for_field(&self, field: &str) -> Option<&ColumnMeta> {
        self.columns.iter().find(|c| c.field == field)
    }

    pub fn insert_columns(&self) -> impl Iterator<Item = &ColumnMeta> {
        self.columns.iter().filter(|c| c.insertable)
    }
}

fn claim_table(entity: &'static str, table: &str) -> std::result::Result<(), String> {
    static REGISTRY: OnceLock<Mutex<TableRegistry>> = OnceLock::new();
    let mut registry = REGISTRY
        .get_or_init(|| Mutex::new(TableRegistry::new()))
        .lock()
        .map_err(|_| "table registry lock poisoned".to_string())?;
    registry.register(entity, table).map_err(|err| match err {
        CatalogError::Configuration(msg) => msg,
        other => other.to_string(),
    })
}

fn is_conventional_key(field: &str) -> bool {
    field.replace('_', "").eq_ignore_ascii_case("swiftcode")
}

pub trait Entity: Sized + Send + Sync + 'static {
    const NAME: &'static str;

    fn fields() -> &'static [FieldDef];

    fn table() -> Result<&'static TableMeta>;

    fn values(&self) -> Vec<SqlParam>;
}

pub trait FromRowNamed: Sized {
    fn from_row_ms(row: &tiberius::Row) -> anyhow::Result<Self>;
    fn from_row_pg(row: &tokio_postgres::Row) -> anyhow::Result<Self>;
    fn from_record(record: &Record) -> anyhow::Result<Self>;
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    values: BTreeMap<String, SqlParam>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entity<T: Entity>(entity: &T) -> Result<Self> {
        let meta = T::table()?;
        let mut record = Self::new();
        for (column, value) in meta.columns.iter().zip(entity.values()) {
            record.set(column.name.clone(), value);
        }
        Ok(record)
    }

    pub fn set(&mut self, column: impl Into<String>, value: SqlParam) {
        self.values.insert(column.into(), value);
    }

    pub fn value(&self, column: &str) -> Option<&SqlParam> {
        self.values.get(column)
    }

    pub fn get<V: FromParam>(&self, column: &str) -> anyhow::Result<V> {
        V::from_param(column, self.values.get(column))
    }
}

pub trait FromParam: Sized {
    fn from_param(column: &str, value: Option<&SqlParam>) -> anyhow::Result<Self>;
}

macro_rules! from_param {
    ($ty:ty, $variant:ident) => {
        impl FromParam for $ty {
            fn from_param(column: &str, value: Option<&SqlParam>) -> anyhow::Result<Self> {
                match value {
                    Some(SqlParam::$variant(v)) => Ok(v.clone()),
                    None | Some(SqlParam::Null) => bail!("column {} is null", column),
                    Some(other) => bail!(
                        "column {} holds {:?}, expected {}",
                        column,
                        other,
                        stringify!($ty)
                    ),
                }
            }
        }
    };
}

from_param!(String, Text);
from_param!(bool, Bool);
from_param!(i32, I32);
from_param!(i64, I64);
from_param!(chrono::NaiveDate, Date);
from_param!(chrono::NaiveDateTime, DateTime);

impl<V: FromParam> FromParam for Option<V> {
    fn from_param(column: &str, value: Option<&SqlParam>) -> anyhow::Result<Self> {
        match value {
            None | Some(SqlParam::Null) => Ok(None),
            Some(_) => V::from_param(column, value).map(Some),
        }
    }
}
