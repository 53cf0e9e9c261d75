use std::ops::Deref;
use std::sync::Arc;

use tracing::debug;

use crate::db::DatabaseRef;
use crate::error::{CatalogError, Result};
use crate::executor::SqlExecutor;
use crate::infrastructure::generic_repository::GenericRepository;
use crate::mapping::{Entity, FromRowNamed};
use crate::model::{swift_prefix, Branch, Headquarters};
use crate::repository::QueryExecutor;
use crate::{col, val};

async fn find_where<T, E>(
    repo: &GenericRepository<T, E>,
    field: &str,
    value: &str,
) -> Result<Vec<T>>
where
    T: Entity + FromRowNamed,
    E: SqlExecutor,
{
    let column = repo.table().column_for_field(field).ok_or_else(|| {
        CatalogError::Configuration(format!("{} has no field {}", T::NAME, field))
    })?;
    Ok(repo
        .Select()
        .Where(col!(column.name).eq(val!(value)))
        .to_list_async()
        .await?)
}

pub struct HeadquartersRepository<E = DatabaseRef>
where
    E: SqlExecutor,
{
    inner: GenericRepository<Headquarters, E>,
}

impl<E: SqlExecutor> HeadquartersRepository<E> {
    pub fn new(executor: Arc<E>) -> Result<Self> {
        Ok(Self {
            inner: GenericRepository::new(executor)?,
        })
    }

    pub async fn find_all_for_swift(&self, swift_code: &str) -> Result<Vec<Headquarters>> {
        find_where(&self.inner, "swift_code", swift_code).await
    }

    pub async fn find_all_for_country(&self, country_iso2: &str) -> Result<Vec<Headquarters>> {
        find_where(&self.inner, "country_iso2", country_iso2).await
    }
}

impl<E: SqlExecutor> Deref for HeadquartersRepository<E> {
    type Target = GenericRepository<Headquarters, E>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

pub struct BranchRepository<E = DatabaseRef>
where
    E: SqlExecutor,
{
    inner: GenericRepository<Branch, E>,
}

impl<E: SqlExecutor> BranchRepository<E> {
    pub fn new(executor: Arc<E>) -> Result<Self> {
        Ok(Self {
            inner: GenericRepository::new(executor)?,
        })
    }

    /// Branches of the institution `swift_code` belongs to, matched on the
    /// 8-character prefix.
    pub async fn find_all_for_swift(&self, swift_code: &str) -> Result<Vec<Branch>> {
        let prefix = swift_prefix(swift_code)?;
        find_where(&self.inner, "swift_prefix", prefix).await
    }

    pub async fn find_all_for_country(&self, country_iso2: &str) -> Result<Vec<Branch>> {
        find_where(&self.inner, "country_iso2", country_iso2).await
    }
}

impl<E: SqlExecutor> Deref for BranchRepository<E> {
    type Target = GenericRepository<Branch, E>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

pub async fn country_name_for_iso2<E: SqlExecutor>(
    headquarters: &HeadquartersRepository<E>,
    branches: &BranchRepository<E>,
    country_iso2: &str,
) -> Result<String> {
    let from_headquarters = headquarters
        .find_all_for_country(country_iso2)
        .await?
        .into_iter()
        .find_map(|hq| hq.country_name);
    if let Some(name) = from_headquarters {
        return Ok(name);
    }

    debug!(country_iso2, "no headquarters carry a country name, trying branches");
    branches
        .find_all_for_country(country_iso2)
        .await?
        .into_iter()
        .find_map(|branch| branch.country_name)
        .ok_or_else(|| CatalogError::not_found("headquarters, branches", country_iso2))
}
