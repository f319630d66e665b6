//! Runs built statements and folds the flat rows back into entity trees.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace};

use crate::backend::SqlConnection;
use crate::error::{Phase, QueryError, Result};
use crate::model::{Entity, EntityId, Fields, Value};

use super::parse_tree::QueryTree;

/// Materialised result returned by [`Executor::execute`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// Root entities with their expansions attached.
    pub entities: Vec<Entity>,
    /// More roots exist beyond the requested page.
    pub has_more: bool,
}

/// Column position to (query index, field key).
fn route_columns(tree: &QueryTree, columns: &[String]) -> Result<Vec<(usize, String)>> {
    let mut node: Option<usize> = None;
    let mut routes = Vec::with_capacity(columns.len());
    for column in columns {
        if column.ends_with("_id") {
            node = Some(node.map_or(0, |n| n + 1));
        }
        let index = node.unwrap_or(0);
        if index >= tree.len() {
            return Err(QueryError::decode(
                tree.root().entity_type,
                format!("column '{column}' does not belong to any requested entity set"),
            ));
        }
        let key = column
            .split_once('_')
            .map_or(column.as_str(), |(_, rest)| rest)
            .to_owned();
        trace!(column = %column, node = index, key = %key, "routing column");
        routes.push((index, key));
    }
    Ok(routes)
}

/// Executes statements against a [`SqlConnection`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Executor;

impl Executor {
    /// Creates an executor.
    pub fn new() -> Self {
        Executor
    }

    /// Runs the select `sql` built for `tree` and assembles the entities.
    pub fn execute(
        &self,
        conn: &mut dyn SqlConnection,
        tree: &QueryTree,
        sql: &str,
    ) -> Result<QueryResult> {
        let rows = conn
            .query(sql, &[])
            .map_err(|source| QueryError::execution(Phase::Select, source))?;
        if rows.is_empty() {
            return Ok(QueryResult::default());
        }
        let routes = route_columns(tree, &rows.columns)?;

        let mut roots: Vec<Entity> = Vec::new();
        let mut seen_roots: HashSet<EntityId> = HashSet::new();
        let mut seen_children: HashSet<(usize, usize, EntityId, EntityId)> = HashSet::new();
        let mut children: HashMap<(usize, EntityId), Vec<Entity>> = HashMap::new();

        for row in rows.rows {
            let mut fields: Vec<Fields> = vec![Fields::new(); tree.len()];
            for ((index, key), value) in routes.iter().zip(row) {
                fields[*index].insert(key.clone(), value);
            }

            let mut current: Vec<Option<EntityId>> = vec![None; tree.len()];
            for node in tree.iter() {
                let id_key = format!("{}_id", node.entity_type.table());
                let Some(id) = fields[node.index].get(&id_key).and_then(Value::as_i64) else {
                    continue;
                };
                current[node.index] = Some(id);
                if node.generated {
                    continue;
                }
                match node.parent {
                    None => {
                        if seen_roots.insert(id) {
                            roots.push(node.factory.parse(&fields[node.index])?);
                        }
                    }
                    Some(parent) => {
                        let Some(parent_id) = current[parent] else {
                            continue;
                        };
                        if seen_children.insert((node.index, parent, parent_id, id)) {
                            let entity = node.factory.parse(&fields[node.index])?;
                            children
                                .entry((node.index, parent_id))
                                .or_default()
                                .push(entity);
                        }
                    }
                }
            }
        }

        for root in &mut roots {
            assemble(tree, 0, root, &children);
        }

        let mut has_more = false;
        if let Some(top) = tree.root_top().and_then(|t| usize::try_from(t).ok()) {
            if roots.len() > top {
                roots.truncate(top);
                has_more = true;
            }
        }
        debug!(
            entity = %tree.root().entity_type,
            roots = roots.len(),
            has_more,
            "assembled query result"
        );
        Ok(QueryResult {
            entities: roots,
            has_more,
        })
    }

    /// Runs a `COUNT` statement and returns its scalar.
    pub fn execute_count(&self, conn: &mut dyn SqlConnection, sql: &str) -> Result<u64> {
        let rows = conn
            .query(sql, &[])
            .map_err(|source| QueryError::execution(Phase::Count, source))?;
        let count = rows
            .scalar()
            .and_then(Value::as_i64)
            .and_then(|n| u64::try_from(n).ok())
            .unwrap_or(0);
        debug!(count, "executed count statement");
        Ok(count)
    }

    /// Runs an existence check; any returned row means the entity exists.
    pub fn execute_exists(
        &self,
        conn: &mut dyn SqlConnection,
        sql: &str,
        params: &[Value],
    ) -> Result<bool> {
        let rows = conn
            .query(sql, params)
            .map_err(|source| QueryError::execution(Phase::Exists, source))?;
        Ok(!rows.is_empty())
    }
}

/// Attaches the collected children of `entity` (node `index`) recursively,
/// then drops its id when `$select` left it out.
///
/// Children are copied, not moved: the same entity may sit under several
/// parents of a many-to-many relation and each copy gets the full subtree.
fn assemble(
    tree: &QueryTree,
    index: usize,
    entity: &mut Entity,
    children: &HashMap<(usize, EntityId), Vec<Entity>>,
) {
    let id = entity.id();
    for &child in tree.children(index) {
        let node = tree.node(child);
        if node.generated {
            continue;
        }
        let mut related = id
            .and_then(|id| children.get(&(child, id)).cloned())
            .unwrap_or_default();
        for related_entity in &mut related {
            assemble(tree, child, related_entity, children);
        }
        entity.attach(node.entity_type, related);
    }
    if !tree.node(index).options.selects_id() {
        entity.set_id(None);
    }
}
