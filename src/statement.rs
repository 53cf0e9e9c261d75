use crate::error::{CatalogError, Result};
use crate::mapping::{ColumnMeta, TableMeta};
use crate::query::{render_select, Expr, PlaceholderStyle, SqlParam, SqlWriter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatementKind {
    Insert { rows: usize },
    Update,
    SelectByKey,
    SelectByKeys,
    SelectAll,
    SelectLast { limit: i64 },
    Select,
    DeleteByKey,
    DeleteByKeys,
    DeleteAll,
}

impl StatementKind {
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            StatementKind::SelectByKey
                | StatementKind::SelectByKeys
                | StatementKind::SelectAll
                | StatementKind::SelectLast { .. }
                | StatementKind::Select
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SqlStatement {
    pub kind: StatementKind,
    pub table: String,
    pub columns: Vec<String>,
    pub sql: String,
    pub inline: String,
    pub params: Vec<SqlParam>,
}

impl SqlStatement {
    pub(crate) fn from_writer(
        kind: StatementKind,
        table: &str,
        columns: Vec<String>,
        writer: SqlWriter,
    ) -> Self {
        let (sql, inline, params) = writer.into_parts();
        Self {
            kind,
            table: table.to_string(),
            columns,
            sql,
            inline,
            params,
        }
    }
}

pub struct SqlBuilder<'m> {
    meta: &'m TableMeta,
    style: PlaceholderStyle,
}

impl<'m> SqlBuilder<'m> {
    pub fn new(meta: &'m TableMeta, style: PlaceholderStyle) -> Self {
        Self { meta, style }
    }

    pub fn insert(&self, values: &[SqlParam]) -> Result<SqlStatement> {
        self.bulk_insert(&[values.to_vec()])
    }

    pub fn bulk_insert(&self, rows: &[Vec<SqlParam>]) -> Result<SqlStatement> {
        if rows.is_empty() {
            return Err(CatalogError::InvalidOperation(format!(
                "insert into {} needs at least one row",
                self.meta.name
            )));
        }
        let columns: Vec<&ColumnMeta> = self.meta.insert_columns().collect();
        let names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();

        let mut w = SqlWriter::new(self.style);
        w.push(&format!(
            "INSERT INTO {} ({}) VALUES ",
            self.meta.name,
            names.join(", ")
        ));
        for (i, row) in rows.iter().enumerate() {
            self.check_arity(row)?;
            if i > 0 {
                w.push(", ");
            }
            w.push("(");
            for (j, (column, value)) in self
                .meta
                .columns
                .iter()
                .zip(row)
                .filter(|(c, _)| c.insertable)
                .enumerate()
            {
                if j > 0 {
                    w.push(", ");
                }
                w.push_param(value.clone(), column.class);
            }
            w.push(")");
        }
        Ok(SqlStatement::from_writer(
            StatementKind::Insert { rows: rows.len() },
            &self.meta.name,
            names,
            w,
        ))
    }

    /// Partial update: only present, non-key values are assigned.
    pub fn update(&self, key: &str, values: &[SqlParam]) -> Result<SqlStatement> {
        self.check_arity(values)?;
        let assignments: Vec<(&ColumnMeta, &SqlParam)> = self
            .meta
            .columns
            .iter()
            .zip(values)
            .filter(|(c, v)| !c.is_key && !v.is_null())
            .collect();
        if assignments.is_empty() {
            return Err(CatalogError::InvalidOperation(format!(
                "update of {} '{}' has no fields to assign",
                self.meta.name, key
            )));
        }

        let mut w = SqlWriter::new(self.style);
        w.push(&format!("UPDATE {} SET ", self.meta.name));
        for (i, (column, value)) in assignments.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            w.push(&column.name);
            w.push("=");
            w.push_param((*value).clone(), column.class);
        }
        self.push_key_filter(&mut w, key);
        let names = assignments.iter().map(|(c, _)| c.name.clone()).collect();
        Ok(SqlStatement::from_writer(
            StatementKind::Update,
            &self.meta.name,
            names,
            w,
        ))
    }

    pub fn select_by_key(&self, key: &str) -> SqlStatement {
        let mut w = SqlWriter::new(self.style);
        w.push(&format!("SELECT * FROM {}", self.meta.name));
        self.push_key_filter(&mut w, key);
        SqlStatement::from_writer(StatementKind::SelectByKey, &self.meta.name, Vec::new(), w)
    }

    pub fn select_by_keys(&self, keys: &[String]) -> Result<SqlStatement> {
        let filter = self.key_set_filter(keys)?;
        let mut w = SqlWriter::new(self.style);
        render_select(&mut w, &self.meta.name, &[filter], None, None);
        Ok(SqlStatement::from_writer(
            StatementKind::SelectByKeys,
            &self.meta.name,
            Vec::new(),
            w,
        ))
    }

    pub fn select_all(&self) -> SqlStatement {
        let mut w = SqlWriter::new(self.style);
        render_select(&mut w, &self.meta.name, &[], None, None);
        SqlStatement::from_writer(StatementKind::SelectAll, &self.meta.name, Vec::new(), w)
    }

    pub fn select_last(&self, n: i64) -> SqlStatement {
        let order = format!("{} DESC", self.meta.key().name);
        let mut w = SqlWriter::new(self.style);
        render_select(&mut w, &self.meta.name, &[], Some(&order), Some(n));
        SqlStatement::from_writer(
            StatementKind::SelectLast { limit: n },
            &self.meta.name,
            Vec::new(),
            w,
        )
    }

    pub fn delete_by_key(&self, key: &str) -> SqlStatement {
        let mut w = SqlWriter::new(self.style);
        w.push(&format!("DELETE FROM {}", self.meta.name));
        self.push_key_filter(&mut w, key);
        SqlStatement::from_writer(StatementKind::DeleteByKey, &self.meta.name, Vec::new(), w)
    }

    pub fn delete_by_keys(&self, keys: &[String]) -> Result<SqlStatement> {
        let filter = self.key_set_filter(keys)?;
        let mut w = SqlWriter::new(self.style);
        w.push(&format!("DELETE FROM {} WHERE ", self.meta.name));
        filter.write_to(&mut w);
        Ok(SqlStatement::from_writer(
            StatementKind::DeleteByKeys,
            &self.meta.name,
            Vec::new(),
            w,
        ))
    }

    pub fn delete_all(&self) -> SqlStatement {
        let mut w = SqlWriter::new(self.style);
        w.push(&format!("DELETE FROM {}", self.meta.name));
        SqlStatement::from_writer(StatementKind::DeleteAll, &self.meta.name, Vec::new(), w)
    }

    fn push_key_filter(&self, w: &mut SqlWriter, key: &str) {
        let key_column = self.meta.key();
        w.push(&format!(" WHERE {} = ", key_column.name));
        w.push_param(SqlParam::Text(key.to_string()), key_column.class);
    }

    fn key_set_filter(&self, keys: &[String]) -> Result<Expr> {
        if keys.is_empty() {
            return Err(CatalogError::InvalidOperation(format!(
                "key set for {} is empty",
                self.meta.name
            )));
        }
        let list = keys.iter().cloned().map(SqlParam::Text).collect();
        Ok(Expr::Col(self.meta.key().name.clone()).in_list(list))
    }

    fn check_arity(&self, values: &[SqlParam]) -> Result<()> {
        if values.len() != self.meta.columns.len() {
            return Err(CatalogError::Configuration(format!(
                "{} has {} columns but {} values were supplied",
                self.meta.name,
                self.meta.columns.len(),
                values.len()
            )));
        }
        Ok(())
    }
}
