use async_trait::async_trait;

use crate::db::DatabaseRef;
use crate::error::Result;
use crate::executor::SqlExecutor;
use crate::mapping::{Entity, FromRowNamed};
use crate::query::Query;

#[allow(non_snake_case)]
#[async_trait]
pub trait QueryExecutor<T, E = DatabaseRef>
where
    T: Entity + FromRowNamed,
    E: SqlExecutor,
{
    fn Select(&self) -> Query<T, E>;

    async fn find_by_key(&self, key: &str) -> Result<Option<T>>;

    async fn find_all(&self) -> Result<Vec<T>>;

    async fn find_last(&self, n: usize) -> Result<Vec<T>>;

    /// Exactly `keys.len()` rows, or an empty list when none of the keys
    /// exist. Any other count is a consistency error.
    async fn find_by_key_set(&self, keys: &[String]) -> Result<Vec<T>>;
}

#[async_trait]
pub trait Crud<T>
where
    T: Entity + FromRowNamed,
{
    async fn save(&self, item: &T) -> Result<T>;

    /// Assigns only the fields of `item` that are present.
    async fn update(&self, key: &str, item: &T) -> Result<T>;

    async fn save_all(&self, items: &[T]) -> Result<Vec<T>>;

    async fn delete(&self, key: &str) -> Result<T>;

    async fn delete_by_key_set(&self, keys: &[String]) -> Result<Vec<T>>;

    async fn delete_all(&self) -> Result<Vec<T>>;
}

pub trait Repository<T, E = DatabaseRef>: QueryExecutor<T, E> + Crud<T>
where
    T: Entity + FromRowNamed,
    E: SqlExecutor,
{
}
