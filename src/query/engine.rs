//! One-stop facade that owns the catalog and function table and chains
//! builder and executor for a request.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::backend::SqlConnection;
use crate::catalog::SchemaCatalog;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::filter::FunctionTable;
use crate::model::{Entity, EntityId, EntityType};

use super::builder::{BuilderConfig, QueryBuilder};
use super::executor::Executor;
use super::options::{QueryOptions, Selection};

/// One page of a collection request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Page {
    /// Root entities of this page.
    #[serde(rename = "value")]
    pub entities: Vec<Entity>,
    /// More roots exist after this page.
    #[serde(skip)]
    pub has_more: bool,
    /// Total number of matching roots, when requested.
    #[serde(rename = "@iot.count", skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

/// Translates and runs requests against a [`SqlConnection`].
#[derive(Debug, Clone)]
pub struct QueryEngine {
    config: EngineConfig,
    builder: QueryBuilder,
    executor: Executor,
}

impl QueryEngine {
    /// Builds the catalog and function table once for all requests.
    pub fn new(config: EngineConfig) -> Self {
        let catalog = Arc::new(SchemaCatalog::new(config.schema.as_deref()));
        let functions = Arc::new(FunctionTable::standard());
        let builder = QueryBuilder::new(catalog, functions, BuilderConfig::from(&config));
        QueryEngine {
            config,
            builder,
            executor: Executor::new(),
        }
    }

    /// Configuration the engine was created with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The statement builder.
    pub fn builder(&self) -> &QueryBuilder {
        &self.builder
    }

    /// Fetches `target` entities; runs the count statement unless the
    /// request says `$count=false`.
    pub fn fetch(
        &self,
        conn: &mut dyn SqlConnection,
        target: EntityType,
        selection: &Selection,
        options: &QueryOptions,
    ) -> Result<Page> {
        let (sql, tree) = self.builder.build_select(target, selection, options)?;
        let result = self.executor.execute(conn, &tree, &sql)?;
        let count = match self.builder.build_count(target, selection, options)? {
            Some(count_sql) => Some(self.executor.execute_count(conn, &count_sql)?),
            None => None,
        };
        debug!(
            entity = %target,
            returned = result.entities.len(),
            has_more = result.has_more,
            count = ?count,
            "fetched page"
        );
        Ok(Page {
            entities: result.entities,
            has_more: result.has_more,
            count,
        })
    }

    /// Returns whether the entity with `id` exists.
    pub fn exists(
        &self,
        conn: &mut dyn SqlConnection,
        entity_type: EntityType,
        id: EntityId,
    ) -> Result<bool> {
        let (sql, params) = self.builder.build_exists(entity_type, id);
        self.executor.execute_exists(conn, &sql, &params)
    }

    /// Returns the select statement a [`QueryEngine::fetch`] would run.
    pub fn explain(
        &self,
        target: EntityType,
        selection: &Selection,
        options: &QueryOptions,
    ) -> Result<String> {
        self.builder
            .build_select(target, selection, options)
            .map(|(sql, _)| sql)
    }
}

impl Default for QueryEngine {
    fn default() -> Self {
        QueryEngine::new(EngineConfig::default())
    }
}
