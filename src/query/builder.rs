//! SQL generation for entity requests.
//!
//! A request becomes one statement: the root entity set as a derived table
//! aliased `A_<table>`, and one correlated `LATERAL` subquery per expansion
//! aliased by its query index. Columns are projected as
//! `<prefix>_<table>_<property>` so the executor can route them back.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::catalog::{JoinCondition, Resolution, SchemaCatalog};
use crate::config::EngineConfig;
use crate::error::{QueryError, Result};
use crate::filter::{hoist, FilterCompiler, FunctionTable};
use crate::model::{EntityId, EntityType, Value};

use super::options::{QueryOptions, Selection};
use super::parse_tree::{QueryNode, QueryTree};

/// Paging and strictness knobs of the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuilderConfig {
    /// Row limit of expansions without `$top`.
    pub max_top: u64,
    /// Root `$top` applied when the request has none.
    pub default_top: Option<u64>,
    /// Fail on unknown properties, functions and relations.
    pub strict: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        BuilderConfig {
            max_top: 200,
            default_top: None,
            strict: false,
        }
    }
}

impl From<&EngineConfig> for BuilderConfig {
    fn from(config: &EngineConfig) -> Self {
        BuilderConfig {
            max_top: config.max_top,
            default_top: config.default_top,
            strict: config.strict_schema,
        }
    }
}

/// Builds select, count and existence statements.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    catalog: Arc<SchemaCatalog>,
    functions: Arc<FunctionTable>,
    config: BuilderConfig,
}

fn conjoin(parts: Vec<String>) -> Option<String> {
    match parts.len() {
        0 => None,
        1 => parts.into_iter().next(),
        _ => Some(
            parts
                .iter()
                .map(|p| format!("({p})"))
                .collect::<Vec<_>>()
                .join(" AND "),
        ),
    }
}

fn where_clause(parts: Vec<String>) -> String {
    conjoin(parts).map_or_else(String::new, |w| format!(" WHERE {w}"))
}

fn paging(limit: Option<u64>, skip: Option<u64>) -> String {
    let mut out = String::new();
    if let Some(limit) = limit {
        out.push_str(&format!(" LIMIT {limit}"));
    }
    if let Some(skip) = skip.filter(|&s| s > 0) {
        out.push_str(&format!(" OFFSET {skip}"));
    }
    out
}

fn from_clause(table: &str, link: Option<&str>) -> String {
    match link {
        Some(link) => format!("{table} {link}"),
        None => table.to_owned(),
    }
}

impl QueryBuilder {
    /// Creates a builder over a shared catalog and function table.
    pub fn new(catalog: Arc<SchemaCatalog>, functions: Arc<FunctionTable>, config: BuilderConfig) -> Self {
        QueryBuilder {
            catalog,
            functions,
            config,
        }
    }

    /// Builder configuration.
    pub fn config(&self) -> BuilderConfig {
        self.config
    }

    fn compiler(&self) -> FilterCompiler<'_> {
        FilterCompiler::new(&self.catalog, &self.functions).strict(self.config.strict)
    }

    /// Builds the select statement for `target` and the parse tree the
    /// executor needs to assemble its rows.
    pub fn build_select(
        &self,
        target: EntityType,
        selection: &Selection,
        options: &QueryOptions,
    ) -> Result<(String, QueryTree)> {
        let (options, mut tree) = self.prepare(target, selection, options)?;
        let top = self.root_top(&tree);
        let root = tree.root();
        let table = root.entity_type.table();
        let alias = root.alias();

        let projection = tree
            .iter()
            .flat_map(|node| self.outer_columns(node))
            .collect::<Vec<_>>()
            .join(", ");

        let mut parts = self.root_predicates(target, selection)?;
        if let Some(filter) = self.compiler().compile_tree(target, options.filter.as_ref())? {
            parts.push(filter);
        }
        parts.extend(self.exists_chains(&tree)?);

        let order = self.order_terms(root)?;
        let inner_order = order
            .iter()
            .map(|(expr, _, dir)| format!("{expr} {dir}"))
            .collect::<Vec<_>>()
            .join(", ");
        let outer_order = order
            .iter()
            .map(|(_, col_alias, dir)| format!("{alias}.{col_alias} {dir}"))
            .collect::<Vec<_>>()
            .join(", ");

        let limit = top.map(|top| top + 1);
        let mut sql = format!(
            "SELECT {projection} FROM (SELECT {} FROM {}{} ORDER BY {inner_order}{}) AS {alias}",
            self.inner_columns(root)?.join(", "),
            self.catalog.resolve_table(root.entity_type),
            where_clause(parts),
            paging(limit, root.options.skip),
        );
        if let Selection::Related { via, id } = *selection {
            if let Some(block) = self.via_block(target, via, id) {
                sql.push(' ');
                sql.push_str(&block);
            }
        }
        for node in tree.iter().skip(1) {
            sql.push(' ');
            sql.push_str(&self.expansion_join(&tree, node)?);
        }
        sql.push_str(&format!(" ORDER BY {outer_order}"));
        tree.set_root_top(top);
        debug!(entity = %table, nodes = tree.len(), sql = %sql, "built select statement");
        Ok((sql, tree))
    }

    /// Builds the `$count` statement, or `None` when `$count=false`.
    pub fn build_count(
        &self,
        target: EntityType,
        selection: &Selection,
        options: &QueryOptions,
    ) -> Result<Option<String>> {
        if options.count == Some(false) {
            return Ok(None);
        }
        let (options, tree) = self.prepare(target, selection, options)?;
        let table = target.table();
        let mut parts = self.root_predicates(target, selection)?;
        if let Some(filter) = self.compiler().compile_tree(target, options.filter.as_ref())? {
            parts.push(filter);
        }
        parts.extend(self.exists_chains(&tree)?);
        let sql = format!(
            "SELECT COUNT(DISTINCT A_{table}.{table}_id) FROM (SELECT {table}.id AS {table}_id FROM {}{}) AS A_{table}",
            self.catalog.resolve_table(target),
            where_clause(parts),
        );
        debug!(entity = %table, sql = %sql, "built count statement");
        Ok(Some(sql))
    }

    /// Builds the existence check for one entity; the id is bound as `$1`.
    pub fn build_exists(&self, entity_type: EntityType, id: EntityId) -> (String, Vec<Value>) {
        let table = entity_type.table();
        let sql = format!(
            "SELECT 1 FROM {} WHERE {table}.id = $1",
            self.catalog.resolve_table(entity_type)
        );
        (sql, vec![Value::Int(id)])
    }

    fn prepare(
        &self,
        target: EntityType,
        selection: &Selection,
        options: &QueryOptions,
    ) -> Result<(QueryOptions, QueryTree)> {
        let mut options = options.clone();
        hoist(target, &mut options);
        let via = match *selection {
            Selection::Related { via, .. } => Some(via),
            _ => None,
        };
        let tree = QueryTree::build(target, &options, via)?;
        Ok((options, tree))
    }

    fn outer_columns(&self, node: &QueryNode) -> Vec<String> {
        let alias = node.alias();
        let prefix = node.prefix();
        node.options
            .projected_properties(node.entity_type)
            .into_iter()
            .map(|property| {
                let column = self.catalog.column_alias(node.entity_type, property);
                format!("{alias}.{column} AS {prefix}_{column}")
            })
            .collect()
    }

    /// `<expr> AS <alias>` for the foreign keys, the projected properties
    /// and the ordering properties of `node`.
    fn inner_columns(&self, node: &QueryNode) -> Result<Vec<String>> {
        let entity_type = node.entity_type;
        let mut names: Vec<String> = self
            .catalog
            .foreign_keys(entity_type)
            .iter()
            .map(|fk| (*fk).to_owned())
            .collect();
        names.extend(
            node.options
                .projected_properties(entity_type)
                .into_iter()
                .map(str::to_ascii_lowercase),
        );
        for order in &node.options.order_by {
            let name = order.property.to_ascii_lowercase();
            if !names.contains(&name) && self.catalog.column(entity_type, &name).is_resolved() {
                names.push(name);
            }
        }
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            match self.catalog.column(entity_type, &name) {
                Resolution::Resolved(column) => {
                    columns.push(format!("{} AS {}", column.expr, column.alias))
                }
                Resolution::Unknown => {
                    return Err(QueryError::UnknownProperty {
                        entity: entity_type,
                        prop: name,
                    })
                }
            }
        }
        Ok(columns)
    }

    /// `(select expression, column alias, direction)` per ordering term.
    fn order_terms(&self, node: &QueryNode) -> Result<Vec<(String, String, &'static str)>> {
        let entity_type = node.entity_type;
        if node.options.order_by.is_empty() {
            let table = entity_type.table();
            return Ok(vec![(format!("{table}.id"), format!("{table}_id"), "DESC")]);
        }
        let mut terms = Vec::new();
        for order in &node.options.order_by {
            let dir = if order.descending { "DESC" } else { "ASC" };
            match self.catalog.column(entity_type, &order.property) {
                Resolution::Resolved(column) => {
                    terms.push((column.expr.clone(), column.alias.clone(), dir))
                }
                Resolution::Unknown if self.config.strict => {
                    return Err(QueryError::UnknownProperty {
                        entity: entity_type,
                        prop: order.property.clone(),
                    })
                }
                Resolution::Unknown => {
                    warn!(entity = %entity_type, property = %order.property, "ignoring unknown $orderby property")
                }
            }
        }
        if terms.is_empty() {
            let table = entity_type.table();
            terms.push((format!("{table}.id"), format!("{table}_id"), "DESC"));
        }
        Ok(terms)
    }

    /// Root restriction implied by the addressed path.
    fn root_predicates(&self, target: EntityType, selection: &Selection) -> Result<Vec<String>> {
        let table = target.table();
        match *selection {
            Selection::All => Ok(Vec::new()),
            Selection::ById(id) => Ok(vec![format!("{table}.id = {id}")]),
            Selection::Related { via, id } => {
                if let Resolution::Resolved(direct) = self.catalog.resolve_join_by_id(target, via, id) {
                    return Ok(vec![direct]);
                }
                let join = self
                    .catalog
                    .resolve_join(target, via, "")
                    .ok_or_else(|| QueryError::UnknownRelation { get: target, by: via })?;
                let via_table = via.table();
                Ok(vec![format!(
                    "EXISTS (SELECT 1 FROM {} WHERE {} AND {via_table}.id = {id})",
                    from_clause(&self.catalog.resolve_table(via), join.link.as_deref()),
                    join.predicate,
                )])
            }
        }
    }

    /// `INNER JOIN LATERAL` restricting the root to the `via` entity.
    fn via_block(&self, target: EntityType, via: EntityType, id: EntityId) -> Option<String> {
        let join = self.catalog.resolve_join(via, target, "A").resolved()?;
        let via_table = via.table();
        Some(format!(
            "INNER JOIN LATERAL (SELECT {via_table}.id AS {via_table}_id FROM {} WHERE {} AND {via_table}.id = {id}) AS {via_table} ON true",
            from_clause(&self.catalog.resolve_table(via), join.link.as_deref()),
            join.predicate,
        ))
    }

    fn root_top(&self, tree: &QueryTree) -> Option<u64> {
        let root = tree.root();
        root.options
            .top
            .or_else(|| self.location_default(tree, root))
            .or(self.config.default_top)
    }

    /// A Location reached from a Thing defaults to the current one.
    fn location_default(&self, tree: &QueryTree, node: &QueryNode) -> Option<u64> {
        (node.entity_type == EntityType::Location
            && tree.reached_from(node.index) == Some(EntityType::Thing))
        .then_some(1)
    }

    fn relation(&self, get: EntityType, by: EntityType, prefix: &str) -> Result<Option<JoinCondition>> {
        match self.catalog.resolve_join(get, by, prefix) {
            Resolution::Resolved(join) => Ok(Some(join)),
            Resolution::Unknown if self.config.strict => Err(QueryError::UnknownRelation { get, by }),
            Resolution::Unknown => {
                warn!(get = %get, by = %by, "no relation between entity types; join predicate omitted");
                Ok(None)
            }
        }
    }

    fn expansion_join(&self, tree: &QueryTree, node: &QueryNode) -> Result<String> {
        let parent = tree.node(node.parent.unwrap_or(0));
        let join = self.relation(node.entity_type, parent.entity_type, &parent.prefix())?;
        let mut parts = Vec::new();
        let mut link = None;
        if let Some(join) = join {
            parts.push(join.predicate);
            link = join.link;
        }
        if let Some(filter) = self
            .compiler()
            .compile_tree(node.entity_type, node.options.filter.as_ref())?
        {
            parts.push(filter);
        }
        let order = self
            .order_terms(node)?
            .into_iter()
            .map(|(expr, _, dir)| format!("{expr} {dir}"))
            .collect::<Vec<_>>()
            .join(", ");
        let top = node
            .options
            .top
            .or_else(|| self.location_default(tree, node))
            .unwrap_or(self.config.max_top);
        let kind = if node.inner { "INNER" } else { "LEFT" };
        Ok(format!(
            "{kind} JOIN LATERAL (SELECT {} FROM {}{} ORDER BY {order}{}) AS {} ON true",
            self.inner_columns(node)?.join(", "),
            from_clause(&self.catalog.resolve_table(node.entity_type), link.as_deref()),
            where_clause(parts),
            paging(Some(top), node.options.skip),
            node.alias(),
        ))
    }

    /// One nested `EXISTS` per inner leaf so root paging only counts roots
    /// that have matching related rows.
    fn exists_chains(&self, tree: &QueryTree) -> Result<Vec<String>> {
        let mut chains = Vec::new();
        'leaves: for leaf in tree.inner_leaves() {
            let mut lineage = vec![leaf];
            let mut current = tree.parent(leaf);
            while let Some(index) = current.filter(|&i| i != 0) {
                lineage.push(index);
                current = tree.parent(index);
            }
            let mut chain: Option<String> = None;
            for &index in &lineage {
                let node = tree.node(index);
                let parent = tree.node(node.parent.unwrap_or(0));
                let Some(join) = self.relation(node.entity_type, parent.entity_type, "")? else {
                    continue 'leaves;
                };
                let mut parts = vec![join.predicate];
                if let Some(filter) = self
                    .compiler()
                    .compile_tree(node.entity_type, node.options.filter.as_ref())?
                {
                    parts.push(filter);
                }
                parts.extend(chain.take());
                chain = Some(format!(
                    "EXISTS (SELECT 1 FROM {}{})",
                    from_clause(&self.catalog.resolve_table(node.entity_type), join.link.as_deref()),
                    where_clause(parts),
                ));
            }
            chains.extend(chain);
        }
        Ok(chains)
    }
}
