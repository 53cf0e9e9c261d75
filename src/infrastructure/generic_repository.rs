use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::db::DatabaseRef;
use crate::error::{CatalogError, Result};
use crate::executor::SqlExecutor;
use crate::mapping::{Entity, FromRowNamed, TableMeta};
use crate::query::{Query, SqlParam};
use crate::repository::{Crud, QueryExecutor, Repository};
use crate::statement::{SqlBuilder, SqlStatement};

pub struct GenericRepository<T, E = DatabaseRef>
where
    T: Entity + FromRowNamed,
    E: SqlExecutor,
{
    executor: Arc<E>,
    meta: &'static TableMeta,
    _t: PhantomData<T>,
}

impl<T, E> GenericRepository<T, E>
where
    T: Entity + FromRowNamed,
    E: SqlExecutor,
{
    pub fn new(executor: Arc<E>) -> Result<Self> {
        let meta = T::table()?;
        debug!(entity = T::NAME, table = %meta.name, key = %meta.key().name, "repository ready");
        Ok(Self {
            executor,
            meta,
            _t: PhantomData,
        })
    }

    pub fn table(&self) -> &'static TableMeta {
        self.meta
    }

    pub fn executor(&self) -> &Arc<E> {
        &self.executor
    }

    pub fn builder(&self) -> SqlBuilder<'static> {
        SqlBuilder::new(self.meta, self.executor.placeholder_style())
    }

    fn key_value(&self, values: &[SqlParam]) -> Result<String> {
        values
            .get(self.meta.key_index())
            .and_then(SqlParam::as_text)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                CatalogError::InvalidOperation(format!(
                    "{} row is missing its {} value",
                    self.meta.name,
                    self.meta.key().name
                ))
            })
    }

    async fn execute(&self, statement: &SqlStatement) -> Result<u64> {
        Ok(self.executor.execute(statement).await?)
    }

    async fn query(&self, statement: &SqlStatement) -> Result<Vec<T>> {
        Ok(self.executor.query::<T>(statement).await?)
    }

    async fn read_back(&self, key: &str) -> Result<T> {
        self.find_by_key(key)
            .await?
            .ok_or_else(|| CatalogError::not_found(self.meta.name.as_str(), key))
    }

    /// Rows for `keys`; empty when none match, an error unless exactly
    /// `keys.len()` rows come back. Repeated keys are bound once but still
    /// counted.
    async fn key_set_snapshot(
        &self,
        operation: &'static str,
        keys: &[String],
    ) -> Result<(Vec<String>, Vec<T>)> {
        let mut seen = HashSet::new();
        let requested: Vec<String> = keys
            .iter()
            .filter(|k| seen.insert(k.as_str()))
            .cloned()
            .collect();
        if requested.is_empty() {
            return Ok((requested, Vec::new()));
        }

        let statement = self.builder().select_by_keys(&requested)?;
        let items = self.query(&statement).await?;
        if !items.is_empty() && items.len() != keys.len() {
            warn!(
                table = %self.meta.name,
                operation,
                requested = keys.len(),
                found = items.len(),
                "key set only partially present"
            );
            return Err(CatalogError::consistency(
                operation,
                self.meta.name.as_str(),
                keys.len(),
                items.len(),
            ));
        }
        Ok((requested, items))
    }
}

impl<T, E> Clone for GenericRepository<T, E>
where
    T: Entity + FromRowNamed,
    E: SqlExecutor,
{
    fn clone(&self) -> Self {
        Self {
            executor: self.executor.clone(),
            meta: self.meta,
            _t: PhantomData,
        }
    }
}

#[allow(non_snake_case)]
#[async_trait]
impl<T, E> QueryExecutor<T, E> for GenericRepository<T, E>
where
    T: Entity + FromRowNamed,
    E: SqlExecutor,
{
    fn Select(&self) -> Query<T, E> {
        Query::new(&self.meta.name, self.executor.placeholder_style())
            .with_executor(self.executor.clone())
    }

    async fn find_by_key(&self, key: &str) -> Result<Option<T>> {
        let statement = self.builder().select_by_key(key);
        let mut items = self.query(&statement).await?;
        Ok(if items.is_empty() {
            None
        } else {
            Some(items.swap_remove(0))
        })
    }

    async fn find_all(&self) -> Result<Vec<T>> {
        self.query(&self.builder().select_all()).await
    }

    async fn find_last(&self, n: usize) -> Result<Vec<T>> {
        let limit = i64::try_from(n).unwrap_or(i64::MAX);
        self.query(&self.builder().select_last(limit)).await
    }

    async fn find_by_key_set(&self, keys: &[String]) -> Result<Vec<T>> {
        let (_, items) = self.key_set_snapshot("find_by_key_set", keys).await?;
        Ok(items)
    }
}

#[async_trait]
impl<T, E> Crud<T> for GenericRepository<T, E>
where
    T: Entity + FromRowNamed,
    E: SqlExecutor,
{
    async fn save(&self, item: &T) -> Result<T> {
        let values = item.values();
        let key = self.key_value(&values)?;
        let statement = self.builder().insert(&values)?;
        if self.execute(&statement).await? == 0 {
            warn!(table = %self.meta.name, key = %key, "insert affected no rows");
            return Err(CatalogError::write_failure("save", self.meta.name.as_str()));
        }
        self.read_back(&key).await
    }

    async fn update(&self, key: &str, item: &T) -> Result<T> {
        let statement = self.builder().update(key, &item.values())?;
        if self.execute(&statement).await? == 0 {
            warn!(table = %self.meta.name, key = %key, "update affected no rows");
            return Err(CatalogError::write_failure("update", self.meta.name.as_str()));
        }
        self.read_back(key).await
    }

    async fn save_all(&self, items: &[T]) -> Result<Vec<T>> {
        let rows: Vec<Vec<SqlParam>> = items.iter().map(T::values).collect();
        for row in &rows {
            self.key_value(row)?;
        }
        let statement = self.builder().bulk_insert(&rows)?;
        let inserted = self.execute(&statement).await?;
        if inserted == 0 {
            warn!(table = %self.meta.name, rows = rows.len(), "bulk insert affected no rows");
            return Err(CatalogError::write_failure(
                "save_all",
                self.meta.name.as_str(),
            ));
        }
        debug!(table = %self.meta.name, inserted, "bulk insert");
        self.find_last(usize::try_from(inserted).unwrap_or(usize::MAX))
            .await
    }

    async fn delete(&self, key: &str) -> Result<T> {
        let snapshot = self
            .find_by_key(key)
            .await?
            .ok_or_else(|| CatalogError::not_found(self.meta.name.as_str(), key))?;
        self.execute(&self.builder().delete_by_key(key)).await?;
        Ok(snapshot)
    }

    async fn delete_by_key_set(&self, keys: &[String]) -> Result<Vec<T>> {
        let (requested, snapshot) = self.key_set_snapshot("delete_by_key_set", keys).await?;
        if snapshot.is_empty() {
            return Ok(snapshot);
        }
        let statement = self.builder().delete_by_keys(&requested)?;
        self.execute(&statement).await?;
        Ok(snapshot)
    }

    async fn delete_all(&self) -> Result<Vec<T>> {
        let snapshot = self.find_all().await?;
        let deleted = self.execute(&self.builder().delete_all()).await?;
        debug!(table = %self.meta.name, deleted, "delete all");
        Ok(snapshot)
    }
}

impl<T, E> Repository<T, E> for GenericRepository<T, E>
where
    T: Entity + FromRowNamed,
    E: SqlExecutor,
{
}
