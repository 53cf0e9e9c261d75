#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use swift_catalog::{
    Entity, FromRowNamed, Headquarters, PlaceholderStyle, Record, SqlExecutor, SqlParam,
    SqlStatement, StatementKind, TableMeta,
};

struct Table {
    meta: &'static TableMeta,
    rows: Vec<Record>,
}

impl Table {
    fn key_of<'r>(&self, record: &'r Record) -> Option<&'r SqlParam> {
        record.value(&self.meta.key().name)
    }
}

#[derive(Default)]
struct State {
    tables: HashMap<String, Table>,
    log: Vec<SqlStatement>,
    canned: VecDeque<Vec<Record>>,
    drop_after_insert: bool,
    zero_affected: bool,
}

/// In-memory storage that interprets statements by their kind and bound
/// parameters. Every statement it sees is logged.
pub struct MemoryExecutor {
    style: PlaceholderStyle,
    state: Mutex<State>,
}

impl MemoryExecutor {
    pub fn new() -> Self {
        Self::with_style(PlaceholderStyle::Dollar)
    }

    pub fn with_style(style: PlaceholderStyle) -> Self {
        Self {
            style,
            state: Mutex::new(State::default()),
        }
    }

    pub fn register<T: Entity>(&self) -> &Self {
        let meta = T::table().expect("entity metadata");
        self.state.lock().unwrap().tables.insert(
            meta.name.clone(),
            Table {
                meta,
                rows: Vec::new(),
            },
        );
        self
    }

    pub fn seed<T: Entity>(&self, items: &[T]) {
        let meta = T::table().expect("entity metadata");
        let mut state = self.state.lock().unwrap();
        let table = state.tables.get_mut(&meta.name).expect("registered table");
        for item in items {
            table
                .rows
                .push(Record::from_entity(item).expect("record from entity"));
        }
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .tables
            .get(table)
            .map_or(0, |t| t.rows.len())
    }

    pub fn statements(&self) -> Vec<SqlStatement> {
        self.state.lock().unwrap().log.clone()
    }

    pub fn kinds(&self) -> Vec<StatementKind> {
        self.statements().into_iter().map(|s| s.kind).collect()
    }

    pub fn clear_log(&self) {
        self.state.lock().unwrap().log.clear();
    }

    /// Rows returned by the next query instead of the table contents.
    pub fn push_canned(&self, rows: Vec<Record>) {
        self.state.lock().unwrap().canned.push_back(rows);
    }

    /// Inserts report success but keep nothing, as if another writer removed
    /// the rows straight away.
    pub fn drop_rows_after_insert(&self, on: bool) {
        self.state.lock().unwrap().drop_after_insert = on;
    }

    /// Writes report zero affected rows and change nothing.
    pub fn report_zero_affected(&self, on: bool) {
        self.state.lock().unwrap().zero_affected = on;
    }
}

fn placeholder_index(token: &str) -> Option<usize> {
    let digits = token
        .trim_start_matches('$')
        .trim_start_matches("@P")
        .trim_end_matches(')');
    digits.parse::<usize>().ok().map(|n| n - 1)
}

/// `(column = $n)` filters of a free-form select, joined by AND.
fn equality_filters(statement: &SqlStatement) -> Result<Vec<(String, SqlParam)>> {
    let clause = match statement.sql.split_once(" WHERE ") {
        Some((_, rest)) => rest,
        None => return Ok(Vec::new()),
    };
    let clause = clause.split(" ORDER BY ").next().unwrap_or(clause);
    let clause = clause.split(" LIMIT ").next().unwrap_or(clause);
    clause
        .split(" AND ")
        .map(|part| {
            let part = part.trim().trim_start_matches('(').trim_end_matches(')');
            let (column, placeholder) = part
                .split_once(" = ")
                .ok_or_else(|| anyhow!("unsupported filter: {}", part))?;
            let idx = placeholder_index(placeholder.trim())
                .ok_or_else(|| anyhow!("unsupported operand: {}", placeholder))?;
            let value = statement
                .params
                .get(idx)
                .cloned()
                .ok_or_else(|| anyhow!("missing param {}", idx + 1))?;
            Ok((column.trim().to_string(), value))
        })
        .collect()
}

#[async_trait]
impl SqlExecutor for MemoryExecutor {
    fn placeholder_style(&self) -> PlaceholderStyle {
        self.style
    }

    async fn execute(&self, statement: &SqlStatement) -> Result<u64> {
        let mut state = self.state.lock().unwrap();
        state.log.push(statement.clone());
        if state.zero_affected {
            return Ok(0);
        }
        let drop_after_insert = state.drop_after_insert;
        let table = state
            .tables
            .get_mut(&statement.table)
            .ok_or_else(|| anyhow!("no such table {}", statement.table))?;

        match &statement.kind {
            StatementKind::Insert { rows } => {
                let width = statement.columns.len();
                if statement.params.len() != width * rows {
                    bail!("insert carries {} params for {} rows", statement.params.len(), rows);
                }
                let mut fresh = Vec::new();
                for chunk in statement.params.chunks(width) {
                    let mut record = Record::new();
                    for column in &table.meta.columns {
                        record.set(column.name.clone(), SqlParam::Null);
                    }
                    for (column, value) in statement.columns.iter().zip(chunk) {
                        record.set(column.clone(), value.clone());
                    }
                    let key = table.key_of(&record).cloned();
                    let taken = table
                        .rows
                        .iter()
                        .chain(fresh.iter())
                        .any(|r| table.key_of(r) == key.as_ref());
                    if taken {
                        bail!("duplicate key {:?} in {}", key, statement.table);
                    }
                    fresh.push(record);
                }
                let inserted = fresh.len() as u64;
                if !drop_after_insert {
                    table.rows.extend(fresh);
                }
                Ok(inserted)
            }
            StatementKind::Update => {
                let width = statement.columns.len();
                let key = statement
                    .params
                    .get(width)
                    .cloned()
                    .ok_or_else(|| anyhow!("update without key param"))?;
                let key_column = table.meta.key().name.clone();
                match table
                    .rows
                    .iter_mut()
                    .find(|r| r.value(&key_column) == Some(&key))
                {
                    Some(row) => {
                        for (column, value) in statement.columns.iter().zip(&statement.params) {
                            row.set(column.clone(), value.clone());
                        }
                        Ok(1)
                    }
                    None => Ok(0),
                }
            }
            StatementKind::DeleteByKey | StatementKind::DeleteByKeys => {
                let key_column = table.meta.key().name.clone();
                let before = table.rows.len();
                table
                    .rows
                    .retain(|r| !statement.params.iter().any(|k| r.value(&key_column) == Some(k)));
                Ok((before - table.rows.len()) as u64)
            }
            StatementKind::DeleteAll => {
                let deleted = table.rows.len() as u64;
                table.rows.clear();
                Ok(deleted)
            }
            other => bail!("{:?} is not a write", other),
        }
    }

    async fn query<T>(&self, statement: &SqlStatement) -> Result<Vec<T>>
    where
        T: FromRowNamed + Send + 'static,
    {
        let records = {
            let mut state = self.state.lock().unwrap();
            state.log.push(statement.clone());
            match state.canned.pop_front() {
                Some(canned) => canned,
                None => {
                    let table = state
                        .tables
                        .get(&statement.table)
                        .ok_or_else(|| anyhow!("no such table {}", statement.table))?;
                    let key_column = table.meta.key().name.clone();
                    match &statement.kind {
                        StatementKind::SelectByKey | StatementKind::SelectByKeys => table
                            .rows
                            .iter()
                            .filter(|r| {
                                statement.params.iter().any(|k| r.value(&key_column) == Some(k))
                            })
                            .cloned()
                            .collect(),
                        StatementKind::SelectAll => table.rows.clone(),
                        StatementKind::SelectLast { limit } => {
                            let mut rows = table.rows.clone();
                            rows.sort_by(|a, b| {
                                let ka = a.value(&key_column).and_then(SqlParam::as_text);
                                let kb = b.value(&key_column).and_then(SqlParam::as_text);
                                kb.cmp(&ka)
                            });
                            rows.truncate(*limit as usize);
                            rows
                        }
                        StatementKind::Select => {
                            let filters = equality_filters(statement)?;
                            table
                                .rows
                                .iter()
                                .filter(|r| {
                                    filters.iter().all(|(c, v)| r.value(c) == Some(v))
                                })
                                .cloned()
                                .collect()
                        }
                        other => bail!("{:?} is not a query", other),
                    }
                }
            }
        };
        records.iter().map(T::from_record).collect()
    }
}

pub fn headquarters(code: &str, country: &str, bank: &str) -> Headquarters {
    Headquarters {
        country_iso2: Some(country.to_string()),
        swift_code: code.to_string(),
        swift_prefix: code.get(..8).map(str::to_string),
        code_type: Some("BIC11".to_string()),
        bank_name: Some(bank.to_string()),
        address: Some("Test Address".to_string()),
        town_name: Some("Warsaw".to_string()),
        country_name: Some("POLAND".to_string()),
        time_zone: Some("Europe/Warsaw".to_string()),
        is_headquarter: Some(true),
    }
}
