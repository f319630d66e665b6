//! Moves filter terms that navigate into related entities down to the
//! expansion they navigate to.
//!
//! `Things?$filter=Datastreams/Observations/result ge 20` becomes a filter
//! `result ge 20` on a (generated) `Datastreams/Observations` expansion that
//! is inner-joined, so only Things with a matching observation survive.

use tracing::debug;

use super::tree::{FilterTree, NodeId, Token, TokenKind};
use crate::model::EntityType;
use crate::query::{ExpandItem, QueryOptions};

/// A navigation token that addresses a related entity's property.
struct EntityPath {
    nav: NodeId,
    path: Vec<EntityType>,
    property: Vec<String>,
}

/// Rewrites `options` (scoped to `entity_type`) and every expansion's own
/// options so that no filter navigates through an entity path. Running it
/// twice is a no-op.
pub fn hoist(entity_type: EntityType, options: &mut QueryOptions) {
    if let Some(mut tree) = options.filter.take() {
        while let Some(found) = next_entity_path(entity_type, &tree) {
            hoist_one(entity_type, &mut tree, found, &mut options.expand);
        }
        if let Some(root) = tree.root() {
            compact(&mut tree, root);
        }
        options.filter = Some(tree).filter(|t| !t.is_empty());
    }
    for item in &mut options.expand {
        if let Some(target) = item.target() {
            hoist(target, &mut item.options);
        }
    }
}

/// Finds the first navigation whose leading segments walk from `entity_type`
/// into related entities. A segment naming a property of the entity reached
/// so far ends the walk, so `Location`'s own `location/type` is not a hop.
fn next_entity_path(entity_type: EntityType, tree: &FilterTree) -> Option<EntityPath> {
    tree.preorder().into_iter().find_map(|id| {
        if tree.token(id).kind != TokenKind::Nav {
            return None;
        }
        let segments: Vec<&str> = tree
            .children(id)
            .iter()
            .map(|&c| tree.token(c).value.as_str())
            .collect();
        let (_, leading) = segments.split_last()?;
        let mut path = Vec::new();
        let mut current = entity_type;
        for segment in leading {
            let own = current
                .property_names()
                .iter()
                .any(|p| p.eq_ignore_ascii_case(segment));
            match EntityType::from_name(segment) {
                Some(next) if !own => {
                    path.push(next);
                    current = next;
                }
                _ => break,
            }
        }
        if path.is_empty() {
            return None;
        }
        Some(EntityPath {
            nav: id,
            property: segments[path.len()..].iter().map(|s| (*s).to_owned()).collect(),
            path,
        })
    })
}

/// Nearest `and`/`or` ancestor of `id` and the child of it that contains
/// `id`. Without a coupling the whole tree is detached.
fn detach_point(tree: &FilterTree, id: NodeId) -> (NodeId, Option<String>) {
    let mut child = id;
    while let Some(parent) = tree.parent(child) {
        let token = tree.token(parent);
        if token.is_coupling() {
            return (child, Some(token.value.to_ascii_lowercase()));
        }
        child = parent;
    }
    (child, None)
}

fn hoist_one(
    entity_type: EntityType,
    tree: &mut FilterTree,
    found: EntityPath,
    expand: &mut Vec<ExpandItem>,
) {
    let EntityPath {
        nav,
        path,
        property,
    } = found;
    let (mut detached, coupling) = detach_point(tree, nav);

    let replacement = match property.as_slice() {
        [single] => {
            tree.replace(nav, Token::new(TokenKind::Literal, single.as_str()));
            nav
        }
        segments => {
            let children = segments
                .iter()
                .map(|s| tree.push(Token::new(TokenKind::Literal, s.as_str()), Vec::new()))
                .collect();
            let shorter = tree.push(Token::new(TokenKind::Nav, "/"), children);
            tree.promote(nav, shorter);
            shorter
        }
    };
    if detached == nav {
        detached = replacement;
    }

    let hoisted = tree.subtree(detached);
    tree.clear(detached);

    let or_coupled = coupling.as_deref() == Some("or");
    debug!(
        entity = %entity_type,
        path = ?path,
        filter = %hoisted,
        or_coupled,
        "hoisting navigation filter into expansion"
    );

    let index = match expand.iter().position(|item| item.path == path) {
        Some(index) => index,
        None => {
            let mut item = ExpandItem::new(path);
            item.generated = true;
            item.options.select = vec!["id".to_owned()];
            expand.push(item);
            expand.len() - 1
        }
    };
    let item = &mut expand[index];
    let existing = item.options.filter.take().unwrap_or_default();
    let op = if or_coupled { "or" } else { "and" };
    item.options.filter = Some(FilterTree::combine(existing, hoisted, op));
    item.outer_filter = true;
    item.or_coupled |= or_coupled;
}

/// Removes `Empty` positions: couplings with no meaningful operand become
/// `Empty`, couplings with one are replaced by it, `not` over `Empty`
/// becomes `Empty`. Returns whether `id` is still meaningful.
fn compact(tree: &mut FilterTree, id: NodeId) -> bool {
    let token = tree.token(id).clone();
    match token.kind {
        TokenKind::Empty => false,
        TokenKind::Logical if token.is_coupling() => {
            let children = tree.children(id).to_vec();
            let kept: Vec<NodeId> = children
                .into_iter()
                .filter(|&c| compact(tree, c))
                .collect();
            match kept.as_slice() {
                [] => {
                    tree.clear(id);
                    false
                }
                [only] => {
                    tree.promote(id, *only);
                    true
                }
                _ => true,
            }
        }
        TokenKind::Logical if token.value.eq_ignore_ascii_case("not") => {
            match tree.child(id, 0) {
                Some(operand) if compact(tree, operand) => true,
                _ => {
                    tree.clear(id);
                    false
                }
            }
        }
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::tree::FilterExpr;

    fn hoisted(entity_type: EntityType, expr: FilterExpr) -> QueryOptions {
        let mut options = QueryOptions::new().with_filter(expr);
        hoist(entity_type, &mut options);
        options
    }

    #[test]
    fn whole_filter_moves_to_generated_expansion() {
        let options = hoisted(
            EntityType::Thing,
            FilterExpr::compare(
                "ge",
                FilterExpr::nav(&["Datastreams", "Observations", "result"]),
                FilterExpr::int(20),
            ),
        );
        assert!(options.filter.is_none());
        assert_eq!(options.expand.len(), 1);
        let item = &options.expand[0];
        assert_eq!(item.path, vec![EntityType::Datastream, EntityType::Observation]);
        assert!(item.generated);
        assert!(item.outer_filter);
        assert_eq!(item.options.select, vec!["id".to_owned()]);
        let filter = item.options.filter.as_ref().expect("moved filter");
        assert_eq!(filter.to_string(), "result ge 20");
    }

    #[test]
    fn and_sibling_stays_in_place() {
        let options = hoisted(
            EntityType::Thing,
            FilterExpr::and(
                FilterExpr::compare("eq", FilterExpr::literal("name"), FilterExpr::string("buoy")),
                FilterExpr::compare(
                    "eq",
                    FilterExpr::nav(&["Datastreams", "name"]),
                    FilterExpr::string("temp"),
                ),
            ),
        );
        let root = options.filter.as_ref().expect("remaining filter");
        assert_eq!(root.to_string(), "name eq 'buoy'");
        assert_eq!(
            options.expand[0].options.filter.as_ref().map(ToString::to_string),
            Some("name eq 'temp'".to_owned())
        );
        assert!(!options.expand[0].or_coupled);
    }

    #[test]
    fn existing_expansion_is_reused_and_or_combined() {
        let mut options = QueryOptions::new()
            .with_filter(FilterExpr::or(
                FilterExpr::compare("eq", FilterExpr::literal("name"), FilterExpr::string("a")),
                FilterExpr::compare(
                    "eq",
                    FilterExpr::nav(&["Datastreams", "name"]),
                    FilterExpr::string("b"),
                ),
            ))
            .with_expand(ExpandItem::new(vec![EntityType::Datastream]).with_options(
                QueryOptions::new().with_filter(FilterExpr::compare(
                    "gt",
                    FilterExpr::literal("id"),
                    FilterExpr::int(3),
                )),
            ));
        hoist(EntityType::Thing, &mut options);
        assert_eq!(options.expand.len(), 1);
        let item = &options.expand[0];
        assert!(!item.generated);
        assert!(item.or_coupled);
        assert_eq!(
            item.options.filter.as_ref().map(ToString::to_string),
            Some("id gt 3 or name eq 'b'".to_owned())
        );
    }

    #[test]
    fn json_paths_are_left_alone() {
        let options = hoisted(
            EntityType::Thing,
            FilterExpr::compare(
                "eq",
                FilterExpr::nav(&["properties", "owner"]),
                FilterExpr::string("ann"),
            ),
        );
        assert!(options.expand.is_empty());
        assert_eq!(
            options.filter.as_ref().map(ToString::to_string),
            Some("properties/owner eq 'ann'".to_owned())
        );
    }

    #[test]
    fn json_sub_path_keeps_shorter_navigation() {
        let options = hoisted(
            EntityType::Datastream,
            FilterExpr::compare(
                "eq",
                FilterExpr::nav(&["Thing", "properties", "owner"]),
                FilterExpr::string("ann"),
            ),
        );
        let item = &options.expand[0];
        assert_eq!(item.path, vec![EntityType::Thing]);
        let filter = item.options.filter.as_ref().expect("moved filter");
        assert_eq!(filter.to_string(), "properties/owner eq 'ann'");
        let root = filter.root().expect("root");
        assert_eq!(filter.token(filter.child(root, 0).expect("lhs")).kind, TokenKind::Nav);
    }

    #[test]
    fn not_over_hoisted_term_moves_with_it() {
        let options = hoisted(
            EntityType::Thing,
            FilterExpr::and(
                FilterExpr::compare("eq", FilterExpr::literal("id"), FilterExpr::int(1)),
                FilterExpr::not(FilterExpr::compare(
                    "eq",
                    FilterExpr::nav(&["Locations", "name"]),
                    FilterExpr::string("x"),
                )),
            ),
        );
        assert_eq!(
            options.filter.as_ref().map(ToString::to_string),
            Some("id eq 1".to_owned())
        );
        assert_eq!(
            options.expand[0].options.filter.as_ref().map(ToString::to_string),
            Some("not name eq 'x'".to_owned())
        );
    }

    #[test]
    fn hoisting_twice_is_a_no_op() {
        let mut options = hoisted(
            EntityType::Thing,
            FilterExpr::and(
                FilterExpr::compare(
                    "ge",
                    FilterExpr::nav(&["Datastreams", "Observations", "result"]),
                    FilterExpr::int(20),
                ),
                FilterExpr::compare("eq", FilterExpr::literal("name"), FilterExpr::string("x")),
            ),
        );
        let once = options.clone();
        hoist(EntityType::Thing, &mut options);
        assert_eq!(options, once);
    }

    #[test]
    fn nested_expansion_filters_are_hoisted_relative_to_their_type() {
        let mut options = QueryOptions::new().with_expand(
            ExpandItem::new(vec![EntityType::Datastream]).with_options(
                QueryOptions::new().with_filter(FilterExpr::compare(
                    "eq",
                    FilterExpr::nav(&["Sensor", "name"]),
                    FilterExpr::string("dht22"),
                )),
            ),
        );
        hoist(EntityType::Thing, &mut options);
        let datastreams = &options.expand[0];
        assert!(datastreams.options.filter.is_none());
        assert_eq!(datastreams.options.expand[0].path, vec![EntityType::Sensor]);
        assert!(datastreams.options.expand[0].generated);
    }

    #[test]
    fn own_property_sharing_an_entity_name_is_not_hoisted() {
        let options = hoisted(
            EntityType::Location,
            FilterExpr::compare(
                "eq",
                FilterExpr::nav(&["location", "type"]),
                FilterExpr::string("Point"),
            ),
        );
        assert!(options.expand.is_empty());
        assert_eq!(
            options.filter.as_ref().map(ToString::to_string),
            Some("location/type eq 'Point'".to_owned())
        );
    }

    #[test]
    fn walk_stops_at_the_reached_entity_property() {
        let options = hoisted(
            EntityType::Thing,
            FilterExpr::compare(
                "eq",
                FilterExpr::nav(&["Locations", "location", "type"]),
                FilterExpr::string("Point"),
            ),
        );
        assert!(options.filter.is_none());
        let item = &options.expand[0];
        assert_eq!(item.path, vec![EntityType::Location]);
        assert_eq!(
            item.options.filter.as_ref().map(ToString::to_string),
            Some("location/type eq 'Point'".to_owned())
        );
    }
}
