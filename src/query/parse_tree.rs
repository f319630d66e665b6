//! Query parse tree: one node per entity set touched by a request.
//!
//! Nodes live in an arena indexed by their query index. Index 0 is the
//! root; the others are assigned depth-first in the order the expansion
//! list introduces them. The builder derives SQL aliases from the index and
//! the executor routes result columns back to nodes by the same index.

use std::collections::HashMap;

use crate::error::{QueryError, Result};
use crate::filter::FilterTree;
use crate::model::{EntityType, RowFactory};

use super::options::{ExpandItem, QueryOptions};

/// Alias prefix for query index `index`: `A`..`Z`, `AA`..`AZ`, `BA`..
pub fn alias_prefix(index: usize) -> String {
    let mut n = index + 1;
    let mut out = Vec::new();
    while n > 0 {
        n -= 1;
        out.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// One entity set within a request.
#[derive(Debug, Clone)]
pub struct QueryNode {
    /// Entity type produced by this node.
    pub entity_type: EntityType,
    /// Dense query index.
    pub index: usize,
    /// Parent query index, `None` for the root.
    pub parent: Option<usize>,
    /// Options scoped to this node; `expand` is always empty.
    pub options: QueryOptions,
    /// Child query indices in creation order.
    pub children: Vec<usize>,
    /// Decoder for this node's columns.
    pub factory: RowFactory,
    /// Materialized only for filtering, never surfaced.
    pub generated: bool,
    /// Joined with `INNER JOIN LATERAL`.
    pub inner: bool,
    path: Vec<EntityType>,
}

impl QueryNode {
    /// `A`, `B`, ... alias prefix of this node.
    pub fn prefix(&self) -> String {
        alias_prefix(self.index)
    }

    /// Derived table alias, e.g. `B_datastream`.
    pub fn alias(&self) -> String {
        format!("{}_{}", self.prefix(), self.entity_type.table())
    }
}

/// Arena of [`QueryNode`]s for one request.
#[derive(Debug, Clone)]
pub struct QueryTree {
    nodes: Vec<QueryNode>,
    via: Option<EntityType>,
    root_top: Option<u64>,
}

impl QueryTree {
    /// Builds the tree for `root_type` and the (already hoisted) options.
    ///
    /// `via` is the entity type the root set is addressed through, if any.
    pub fn build(
        root_type: EntityType,
        root_options: &QueryOptions,
        via: Option<EntityType>,
    ) -> Result<Self> {
        let mut tree = QueryTree {
            nodes: Vec::new(),
            via,
            root_top: None,
        };
        let root = tree.push(root_type, None, Vec::new(), false)?;
        tree.nodes[root].options = scoped(root_options);
        tree.add_items(root, &[], &root_options.expand)?;

        let inner: Vec<usize> = tree.nodes.iter().filter(|n| n.inner).map(|n| n.index).collect();
        for index in inner {
            let mut current = tree.nodes[index].parent;
            while let Some(parent) = current.filter(|&p| p != 0) {
                tree.nodes[parent].inner = true;
                current = tree.nodes[parent].parent;
            }
        }
        Ok(tree)
    }

    fn push(
        &mut self,
        entity_type: EntityType,
        parent: Option<usize>,
        path: Vec<EntityType>,
        generated: bool,
    ) -> Result<usize> {
        let factory = RowFactory::for_type(entity_type).ok_or_else(|| {
            QueryError::InvalidOption(format!("{} is not an entity set", entity_type.table()))
        })?;
        let index = self.nodes.len();
        let mut options = QueryOptions::default();
        if generated {
            options.select = vec!["id".to_owned()];
        }
        self.nodes.push(QueryNode {
            entity_type,
            index,
            parent,
            options,
            children: Vec::new(),
            factory,
            generated,
            inner: false,
            path,
        });
        if let Some(parent) = parent {
            self.nodes[parent].children.push(index);
        }
        Ok(index)
    }

    fn add_items(&mut self, base: usize, base_path: &[EntityType], items: &[ExpandItem]) -> Result<()> {
        for item in items {
            let mut current = base;
            let mut path = base_path.to_vec();
            for &entity_type in &item.path {
                path.push(entity_type);
                current = match self.find(&path) {
                    Some(index) => index,
                    None => self.push(entity_type, Some(current), path.clone(), item.generated)?,
                };
                if !item.generated && self.nodes[current].generated {
                    self.nodes[current].generated = false;
                    self.nodes[current].options.select.clear();
                }
            }
            if current == base {
                continue;
            }
            self.apply(current, item);
            self.add_items(current, &path, &item.options.expand)?;
        }
        Ok(())
    }

    fn apply(&mut self, index: usize, item: &ExpandItem) {
        let node = &mut self.nodes[index];
        let incoming = &item.options;
        if let Some(filter) = incoming.filter.clone() {
            node.options.filter = Some(match node.options.filter.take() {
                Some(existing) => {
                    let op = if item.or_coupled { "or" } else { "and" };
                    FilterTree::combine(existing, filter, op)
                }
                None => filter,
            });
        }
        node.inner |= item.outer_filter;
        if item.generated {
            return;
        }
        node.options.select = incoming.select.clone();
        if incoming.top.is_some() {
            node.options.top = incoming.top;
        }
        if incoming.skip.is_some() {
            node.options.skip = incoming.skip;
        }
        if !incoming.order_by.is_empty() {
            node.options.order_by = incoming.order_by.clone();
        }
    }

    fn find(&self, path: &[EntityType]) -> Option<usize> {
        self.nodes.iter().position(|n| n.parent.is_some() && n.path == path)
    }

    /// Node at `index`.
    pub fn node(&self, index: usize) -> &QueryNode {
        &self.nodes[index]
    }

    /// The root node.
    pub fn root(&self) -> &QueryNode {
        &self.nodes[0]
    }

    /// Parent index of `index`.
    pub fn parent(&self, index: usize) -> Option<usize> {
        self.nodes[index].parent
    }

    /// Children of `index`.
    pub fn children(&self, index: usize) -> &[usize] {
        &self.nodes[index].children
    }

    /// Entity types from the root to `index`, root excluded.
    pub fn path(&self, index: usize) -> &[EntityType] {
        &self.nodes[index].path
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false; a tree has at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in query index order.
    pub fn iter(&self) -> impl Iterator<Item = &QueryNode> {
        self.nodes.iter()
    }

    /// Child index to parent index for every non-root node.
    pub fn relation_map(&self) -> HashMap<usize, usize> {
        self.nodes
            .iter()
            .filter_map(|n| n.parent.map(|p| (n.index, p)))
            .collect()
    }

    /// Entity type `index` is reached from: its parent's type, or the `via`
    /// type for the root.
    pub fn reached_from(&self, index: usize) -> Option<EntityType> {
        match self.nodes[index].parent {
            Some(parent) => Some(self.nodes[parent].entity_type),
            None => self.via,
        }
    }

    /// Number of roots the statement was paged to, if paged.
    pub fn root_top(&self) -> Option<u64> {
        self.root_top
    }

    pub(crate) fn set_root_top(&mut self, top: Option<u64>) {
        self.root_top = top;
    }

    /// Inner nodes none of whose children are inner.
    pub fn inner_leaves(&self) -> Vec<usize> {
        self.nodes
            .iter()
            .filter(|n| n.inner && !n.children.iter().any(|&c| self.nodes[c].inner))
            .map(|n| n.index)
            .collect()
    }
}

fn scoped(options: &QueryOptions) -> QueryOptions {
    QueryOptions {
        expand: Vec::new(),
        ..options.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterExpr;

    fn expand(path: &str) -> ExpandItem {
        ExpandItem::parse(path).expect("valid path")
    }

    #[test]
    fn alias_prefixes_are_bijective_base_26() {
        assert_eq!(alias_prefix(0), "A");
        assert_eq!(alias_prefix(25), "Z");
        assert_eq!(alias_prefix(26), "AA");
        assert_eq!(alias_prefix(51), "AZ");
        assert_eq!(alias_prefix(52), "BA");
        assert_eq!(alias_prefix(701), "ZZ");
        assert_eq!(alias_prefix(702), "AAA");
    }

    #[test]
    fn shared_prefixes_reuse_nodes() {
        let options = QueryOptions::new()
            .with_expand(expand("Datastreams/Sensor"))
            .with_expand(expand("Datastreams/ObservedProperty"))
            .with_expand(expand("Locations"));
        let tree = QueryTree::build(EntityType::Thing, &options, None).expect("builds");
        let types: Vec<_> = tree.iter().map(|n| n.entity_type).collect();
        assert_eq!(
            types,
            vec![
                EntityType::Thing,
                EntityType::Datastream,
                EntityType::Sensor,
                EntityType::ObservedProperty,
                EntityType::Location,
            ]
        );
        assert_eq!(tree.children(0), &[1, 4]);
        assert_eq!(tree.children(1), &[2, 3]);
        assert_eq!(tree.relation_map().get(&3), Some(&1));
        assert_eq!(tree.path(3), &[EntityType::Datastream, EntityType::ObservedProperty]);
        assert!(tree.root().options.expand.is_empty());
        assert_eq!(tree.node(4).alias(), "E_location");
    }

    #[test]
    fn nested_expansions_recurse_under_their_node() {
        let options = QueryOptions::new().with_expand(
            expand("Datastreams").with_options(
                QueryOptions::new()
                    .with_top(5)
                    .with_expand(expand("Observations").with_options(QueryOptions::new().with_top(2))),
            ),
        );
        let tree = QueryTree::build(EntityType::Thing, &options, None).expect("builds");
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.node(1).options.top, Some(5));
        assert_eq!(tree.node(2).options.top, Some(2));
        assert_eq!(tree.parent(2), Some(1));
        assert_eq!(tree.reached_from(2), Some(EntityType::Datastream));
    }

    #[test]
    fn inner_flag_propagates_to_ancestors_but_not_root() {
        let mut item = expand("Datastreams/Observations");
        item.generated = true;
        item.outer_filter = true;
        item.options.select = vec!["id".into()];
        let options = QueryOptions::new().with_expand(item);
        let tree = QueryTree::build(EntityType::Thing, &options, None).expect("builds");
        assert!(!tree.root().inner);
        assert!(tree.node(1).inner);
        assert!(tree.node(2).inner);
        assert!(tree.node(1).generated);
        assert_eq!(tree.inner_leaves(), vec![2]);
        assert_eq!(tree.node(1).options.select, vec!["id".to_owned()]);
    }

    #[test]
    fn surfaced_item_overrides_generated_node() {
        let mut hidden = expand("Datastreams");
        hidden.generated = true;
        hidden.outer_filter = true;
        hidden.options = QueryOptions::new()
            .with_select(&["id"])
            .with_filter(FilterExpr::compare("eq", FilterExpr::literal("name"), FilterExpr::string("t")));
        let options = QueryOptions::new()
            .with_expand(hidden)
            .with_expand(expand("Datastreams"));
        let tree = QueryTree::build(EntityType::Thing, &options, None).expect("builds");
        let node = tree.node(1);
        assert!(!node.generated);
        assert!(node.inner);
        assert!(node.options.select.is_empty());
        assert!(node.options.filter.is_some());
    }

    #[test]
    fn filters_on_the_same_node_are_merged() {
        let first = expand("Datastreams").with_options(
            QueryOptions::new().with_filter(FilterExpr::compare("gt", FilterExpr::literal("id"), FilterExpr::int(1))),
        );
        let mut second = expand("Datastreams").with_options(
            QueryOptions::new().with_filter(FilterExpr::compare("lt", FilterExpr::literal("id"), FilterExpr::int(9))),
        );
        second.or_coupled = true;
        let options = QueryOptions::new().with_expand(first).with_expand(second);
        let tree = QueryTree::build(EntityType::Thing, &options, None).expect("builds");
        assert_eq!(
            tree.node(1).options.filter.as_ref().map(ToString::to_string),
            Some("id gt 1 or id lt 9".to_owned())
        );
    }

    #[test]
    fn root_is_reached_from_via() {
        let tree = QueryTree::build(EntityType::Location, &QueryOptions::new(), Some(EntityType::Thing))
            .expect("builds");
        assert_eq!(tree.reached_from(0), Some(EntityType::Thing));
        assert_eq!(tree.root().alias(), "A_location");
    }
}
