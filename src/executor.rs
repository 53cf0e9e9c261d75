use anyhow::Result;
use async_trait::async_trait;
use bytes::BytesMut;
use futures::TryStreamExt;
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};
use tracing::debug;

use crate::db::{DatabaseRef, DbKind};
use crate::mapping::FromRowNamed;
use crate::query::{PlaceholderStyle, SqlParam};
use crate::statement::SqlStatement;

#[async_trait]
pub trait SqlExecutor: Send + Sync {
    fn placeholder_style(&self) -> PlaceholderStyle;

    async fn execute(&self, statement: &SqlStatement) -> Result<u64>;

    async fn query<T>(&self, statement: &SqlStatement) -> Result<Vec<T>>
    where
        T: FromRowNamed + Send + 'static;
}

#[async_trait]
impl SqlExecutor for DatabaseRef {
    fn placeholder_style(&self) -> PlaceholderStyle {
        match self.kind() {
            DbKind::Mssql => PlaceholderStyle::AtP,
            DbKind::Postgres => PlaceholderStyle::Dollar,
        }
    }

    async fn execute(&self, statement: &SqlStatement) -> Result<u64> {
        debug!(table = %statement.table, sql = %statement.inline, "execute");
        match self {
            DatabaseRef::Mssql(conn) => {
                let mut guard = conn.lock().await;
                let boxed = ms_params(&statement.params);
                let refs: Vec<&dyn tiberius::ToSql> =
                    boxed.iter().map(|b| &**b as &dyn tiberius::ToSql).collect();
                let res = guard.execute(statement.sql.as_str(), &refs[..]).await?;
                Ok(res.total())
            }
            DatabaseRef::Postgres(pg) => {
                let boxed = pg_params(&statement.params);
                let refs: Vec<&(dyn ToSql + Sync)> = boxed.iter().map(|b| &**b as _).collect();
                Ok(pg.execute(statement.sql.as_str(), &refs[..]).await?)
            }
        }
    }

    async fn query<T>(&self, statement: &SqlStatement) -> Result<Vec<T>>
    where
        T: FromRowNamed + Send + 'static,
    {
        debug!(table = %statement.table, sql = %statement.inline, "query");
        match self {
            DatabaseRef::Mssql(conn) => {
                let mut guard = conn.lock().await;
                let boxed = ms_params(&statement.params);
                let refs: Vec<&dyn tiberius::ToSql> =
                    boxed.iter().map(|b| &**b as &dyn tiberius::ToSql).collect();
                let mut stream = guard.query(statement.sql.as_str(), &refs[..]).await?;
                let mut out = Vec::new();
                while let Some(item) = stream.try_next().await? {
                    if let Some(row) = item.into_row() {
                        out.push(T::from_row_ms(&row)?);
                    }
                }
                Ok(out)
            }
            DatabaseRef::Postgres(pg) => {
                let boxed = pg_params(&statement.params);
                let refs: Vec<&(dyn ToSql + Sync)> = boxed.iter().map(|b| &**b as _).collect();
                let rows = pg.query(statement.sql.as_str(), &refs[..]).await?;
                rows.iter().map(T::from_row_pg).collect()
            }
        }
    }
}

fn ms_params(params: &[SqlParam]) -> Vec<Box<dyn tiberius::ToSql + Send + Sync>> {
    params
        .iter()
        .map(|p| -> Box<dyn tiberius::ToSql + Send + Sync> {
            match p {
                SqlParam::I32(v) => Box::new(*v),
                SqlParam::I64(v) => Box::new(*v),
                SqlParam::Bool(v) => Box::new(*v),
                SqlParam::Text(v) => Box::new(v.clone()),
                SqlParam::Date(v) => Box::new(*v),
                SqlParam::DateTime(v) => Box::new(*v),
                SqlParam::Null => Box::new(Option::<i32>::None),
            }
        })
        .collect()
}

fn pg_params(params: &[SqlParam]) -> Vec<Box<dyn ToSql + Send + Sync>> {
    params
        .iter()
        .map(|p| -> Box<dyn ToSql + Send + Sync> {
            match p {
                SqlParam::I32(v) => Box::new(*v),
                SqlParam::I64(v) => Box::new(*v),
                SqlParam::Bool(v) => Box::new(*v),
                SqlParam::Text(v) => Box::new(v.clone()),
                SqlParam::Date(v) => Box::new(*v),
                SqlParam::DateTime(v) => Box::new(*v),
                SqlParam::Null => Box::new(UntypedNull),
            }
        })
        .collect()
}

/// NULL that binds to a parameter of any column type.
#[derive(Debug)]
struct UntypedNull;

impl ToSql for UntypedNull {
    fn to_sql(
        &self,
        _ty: &Type,
        _out: &mut BytesMut,
    ) -> std::result::Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        Ok(IsNull::Yes)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}
