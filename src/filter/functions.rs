//! Name-keyed translators for `$filter` function calls.

use std::collections::HashMap;

use super::compiler::{as_text_extraction, CompileContext};
use super::prepare::unquote;
use super::tree::{NodeId, TokenKind};
use crate::error::Result;

/// Translates one function call node to SQL.
pub type Translator = fn(&CompileContext<'_>, NodeId) -> Result<String>;

const TIMESTAMP_PATTERN: &str = r#"'YYYY-MM-DD"T"HH24:MI:SS.MS"Z"'"#;

/// Immutable dispatch table from lower-case function name to translator.
#[derive(Clone)]
pub struct FunctionTable {
    translators: HashMap<&'static str, Translator>,
}

impl std::fmt::Debug for FunctionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.translators.keys().collect();
        names.sort();
        f.debug_struct("FunctionTable").field("names", &names).finish()
    }
}

impl FunctionTable {
    /// Table covering the string, math, date and spatial functions.
    pub fn standard() -> Self {
        let entries: [(&'static str, Translator); 40] = [
            ("contains", contains),
            ("substringof", substringof),
            ("startswith", startswith),
            ("endswith", endswith),
            ("length", |cx, n| Ok(format!("LENGTH({})", cx.arg(n, 0)?))),
            ("indexof", |cx, n| {
                Ok(format!("STRPOS({}, {}) -1", cx.arg(n, 0)?, cx.arg(n, 1)?))
            }),
            ("substring", substring),
            ("tolower", |cx, n| Ok(format!("LOWER({})", cx.arg(n, 0)?))),
            ("toupper", |cx, n| Ok(format!("UPPER({})", cx.arg(n, 0)?))),
            ("trim", |cx, n| Ok(format!("TRIM(both ' ' from {})", cx.arg(n, 0)?))),
            ("concat", |cx, n| {
                Ok(format!("CONCAT({}, {})", cx.arg(n, 0)?, cx.arg(n, 1)?))
            }),
            ("round", |cx, n| rounding(cx, n, "ROUND")),
            ("floor", |cx, n| rounding(cx, n, "FLOOR")),
            ("ceiling", |cx, n| rounding(cx, n, "CEILING")),
            ("year", |cx, n| extract(cx, n, "YEAR")),
            ("month", |cx, n| extract(cx, n, "MONTH")),
            ("day", |cx, n| extract(cx, n, "DAY")),
            ("hour", |cx, n| extract(cx, n, "HOUR")),
            ("minute", |cx, n| extract(cx, n, "MINUTE")),
            ("second", |cx, n| extract(cx, n, "SECOND")),
            ("fractionalseconds", |cx, n| {
                Ok(format!("{} / 1000000", extract(cx, n, "MICROSECONDS")?))
            }),
            ("totaloffsetminutes", |cx, n| extract(cx, n, "TIMEZONE_MINUTE")),
            ("date", |cx, n| Ok(format!("({})::date", cx.arg(n, 0)?))),
            ("time", time_of_day),
            ("totalseconds", |cx, n| {
                Ok(format!("extract(epoch from ({})::timestamp)", cx.arg(n, 0)?))
            }),
            ("now", |_, _| {
                Ok(format!(
                    "to_char(now()::timestamp at time zone 'UTC', {TIMESTAMP_PATTERN})"
                ))
            }),
            ("mindatetime", |_, _| Ok("'0001-01-01T00:00:00.000Z'".to_owned())),
            ("maxdatetime", |_, _| Ok("'9999-12-31T23:59:59.999Z'".to_owned())),
            ("geo.distance", |cx, n| spatial(cx, n, "ST_Distance", 2)),
            ("geo.length", |cx, n| spatial(cx, n, "ST_Length", 1)),
            ("geo.intersects", |cx, n| spatial(cx, n, "ST_Intersects", 2)),
            ("st_intersects", |cx, n| spatial(cx, n, "ST_Intersects", 2)),
            ("st_equals", |cx, n| spatial(cx, n, "ST_Equals", 2)),
            ("st_touches", |cx, n| spatial(cx, n, "ST_Touches", 2)),
            ("st_overlaps", |cx, n| spatial(cx, n, "ST_Overlaps", 2)),
            ("st_crosses", |cx, n| spatial(cx, n, "ST_Crosses", 2)),
            ("st_contains", |cx, n| spatial(cx, n, "ST_Contains", 2)),
            ("st_disjoint", |cx, n| spatial(cx, n, "ST_Disjoint", 2)),
            ("st_within", |cx, n| spatial(cx, n, "ST_Within", 2)),
            ("st_relate", st_relate),
        ];
        FunctionTable {
            translators: entries.into_iter().collect(),
        }
    }

    /// Translator for `name`, matched case-insensitively.
    pub fn get(&self, name: &str) -> Option<Translator> {
        self.translators
            .get(name.to_ascii_lowercase().as_str())
            .copied()
    }

    /// Number of registered functions.
    pub fn len(&self) -> usize {
        self.translators.len()
    }

    /// Returns true when no function is registered.
    pub fn is_empty(&self) -> bool {
        self.translators.is_empty()
    }
}

impl Default for FunctionTable {
    fn default() -> Self {
        FunctionTable::standard()
    }
}

#[derive(Clone, Copy)]
enum Like {
    Contains,
    StartsWith,
    EndsWith,
}

/// LIKE pattern for `arg`: quoted literals get their wildcards inline, any
/// other expression is concatenated with them.
fn like_pattern(arg: &str, like: Like) -> String {
    if arg.len() >= 2 && arg.starts_with('\'') && arg.ends_with('\'') {
        let text = unquote(arg);
        return match like {
            Like::Contains => format!("'%{text}%'"),
            Like::StartsWith => format!("'{text}%'"),
            Like::EndsWith => format!("'%{text}'"),
        };
    }
    match like {
        Like::Contains => format!("'%' || {arg} || '%'"),
        Like::StartsWith => format!("{arg} || '%'"),
        Like::EndsWith => format!("'%' || {arg}"),
    }
}

fn like(cx: &CompileContext<'_>, node: NodeId, subject: usize, like: Like) -> Result<String> {
    let haystack = cx.arg(node, subject)?;
    let needle = cx.arg(node, 1 - subject)?;
    Ok(format!("{haystack} LIKE {}", like_pattern(&needle, like)))
}

fn contains(cx: &CompileContext<'_>, node: NodeId) -> Result<String> {
    like(cx, node, 0, Like::Contains)
}

fn substringof(cx: &CompileContext<'_>, node: NodeId) -> Result<String> {
    like(cx, node, 1, Like::Contains)
}

fn startswith(cx: &CompileContext<'_>, node: NodeId) -> Result<String> {
    like(cx, node, 0, Like::StartsWith)
}

fn endswith(cx: &CompileContext<'_>, node: NodeId) -> Result<String> {
    like(cx, node, 0, Like::EndsWith)
}

fn substring(cx: &CompileContext<'_>, node: NodeId) -> Result<String> {
    let text = cx.arg(node, 0)?;
    let start = cx.arg(node, 1)?;
    let length = if cx.arg_count(node) > 2 {
        cx.arg(node, 2)?
    } else {
        format!("LENGTH({text})")
    };
    Ok(format!("SUBSTRING({text} from ({start} + 1) for {length})"))
}

fn rounding(cx: &CompileContext<'_>, node: NodeId, function: &str) -> Result<String> {
    let value = as_text_extraction(&cx.arg(node, 0)?);
    Ok(format!("{function}(CAST({value} as double precision))"))
}

fn extract(cx: &CompileContext<'_>, node: NodeId, field: &str) -> Result<String> {
    Ok(format!(
        "EXTRACT({field} FROM to_timestamp({},{TIMESTAMP_PATTERN}))",
        cx.arg(node, 0)?
    ))
}

fn time_of_day(cx: &CompileContext<'_>, node: NodeId) -> Result<String> {
    let value = cx.arg(node, 0)?;
    if value.to_ascii_lowercase().contains("time") {
        Ok(format!("(({value})::timestamp)::time"))
    } else {
        Ok(format!("({value})::time"))
    }
}

/// Spatial operand: geography literals and raw geometry columns are used
/// as is, anything else is parsed from GeoJSON.
fn geometry(cx: &CompileContext<'_>, node: NodeId, index: usize) -> Result<String> {
    let value = cx.arg(node, index)?;
    if cx.arg_kind(node, index) == Some(TokenKind::Geography) || cx.arg_is_geometry(node, index) {
        Ok(value)
    } else {
        Ok(format!("ST_GeomFromGeoJSON({value})"))
    }
}

fn spatial(cx: &CompileContext<'_>, node: NodeId, function: &str, arity: usize) -> Result<String> {
    let operands = (0..arity)
        .map(|i| geometry(cx, node, i))
        .collect::<Result<Vec<_>>>()?;
    Ok(format!("{function}({})", operands.join(", ")))
}

fn st_relate(cx: &CompileContext<'_>, node: NodeId) -> Result<String> {
    Ok(format!(
        "ST_Relate({}, {}, {})",
        geometry(cx, node, 0)?,
        geometry(cx, node, 1)?,
        cx.arg(node, 2)?
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SchemaCatalog;
    use crate::filter::compiler::FilterCompiler;
    use crate::filter::tree::{FilterExpr, FilterTree};
    use crate::model::EntityType;

    fn compile(entity_type: EntityType, expr: FilterExpr) -> String {
        let catalog = SchemaCatalog::default();
        let functions = FunctionTable::standard();
        let tree = FilterTree::from(expr);
        FilterCompiler::new(&catalog, &functions)
            .compile_tree(entity_type, Some(&tree))
            .expect("compiles")
            .unwrap_or_default()
    }

    fn call(name: &str, args: Vec<FilterExpr>) -> FilterExpr {
        FilterExpr::func(name, args)
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let table = FunctionTable::standard();
        assert!(table.get("StartsWith").is_some());
        assert!(table.get("geo.intersects").is_some());
        assert!(table.get("levenshtein").is_none());
        assert_eq!(table.len(), 40);
    }

    #[test]
    fn like_functions_inline_wildcards() {
        let thing = EntityType::Thing;
        assert_eq!(
            compile(thing, call("contains", vec![FilterExpr::literal("name"), FilterExpr::string("uoy")])),
            "thing.name LIKE '%uoy%'"
        );
        assert_eq!(
            compile(thing, call("substringof", vec![FilterExpr::string("uoy"), FilterExpr::literal("name")])),
            "thing.name LIKE '%uoy%'"
        );
        assert_eq!(
            compile(thing, call("startswith", vec![FilterExpr::literal("name"), FilterExpr::string("b")])),
            "thing.name LIKE 'b%'"
        );
        assert_eq!(
            compile(thing, call("endswith", vec![FilterExpr::literal("name"), FilterExpr::string("y")])),
            "thing.name LIKE '%y'"
        );
    }

    #[test]
    fn like_with_expression_argument_concatenates() {
        let sql = compile(
            EntityType::Thing,
            call("contains", vec![FilterExpr::literal("name"), FilterExpr::literal("description")]),
        );
        assert_eq!(sql, "thing.name LIKE '%' || thing.description || '%'");
    }

    #[test]
    fn string_functions() {
        let thing = EntityType::Thing;
        let name = || FilterExpr::literal("name");
        assert_eq!(
            compile(thing, FilterExpr::compare("eq", call("length", vec![name()]), FilterExpr::int(4))),
            "LENGTH(thing.name) = 4"
        );
        assert_eq!(
            compile(thing, call("indexof", vec![name(), FilterExpr::string("u")])),
            "STRPOS(thing.name, 'u') -1"
        );
        assert_eq!(
            compile(thing, call("substring", vec![name(), FilterExpr::int(1)])),
            "SUBSTRING(thing.name from (1 + 1) for LENGTH(thing.name))"
        );
        assert_eq!(
            compile(thing, call("substring", vec![name(), FilterExpr::int(1), FilterExpr::int(2)])),
            "SUBSTRING(thing.name from (1 + 1) for 2)"
        );
        assert_eq!(compile(thing, call("trim", vec![name()])), "TRIM(both ' ' from thing.name)");
        assert_eq!(
            compile(thing, call("concat", vec![name(), FilterExpr::string("x")])),
            "CONCAT(thing.name, 'x')"
        );
    }

    #[test]
    fn rounding_uses_text_extraction() {
        let sql = compile(
            EntityType::Observation,
            call("round", vec![FilterExpr::literal("result")]),
        );
        assert_eq!(sql, "ROUND(CAST(observation.data ->> 'result' as double precision))");
    }

    #[test]
    fn date_functions() {
        let obs = EntityType::Observation;
        assert_eq!(
            compile(obs, call("year", vec![FilterExpr::literal("resultTime")])),
            r#"EXTRACT(YEAR FROM to_timestamp(observation.data ->> 'resultTime','YYYY-MM-DD"T"HH24:MI:SS.MS"Z"'))"#
        );
        assert_eq!(
            compile(obs, call("time", vec![FilterExpr::literal("resultTime")])),
            "((observation.data ->> 'resultTime')::timestamp)::time"
        );
        assert_eq!(
            compile(obs, call("date", vec![FilterExpr::literal("resultTime")])),
            "(observation.data ->> 'resultTime')::date"
        );
        assert_eq!(compile(obs, call("maxdatetime", vec![])), "'9999-12-31T23:59:59.999Z'");
    }

    #[test]
    fn spatial_operands() {
        let sql = compile(
            EntityType::Location,
            call(
                "geo.intersects",
                vec![
                    FilterExpr::literal("location"),
                    FilterExpr::geography("POINT(-122 43)"),
                ],
            ),
        );
        assert_eq!(
            sql,
            "ST_Intersects(location.location, ST_SetSRID(ST_GeomFromText('POINT(-122 43)'), 4326))"
        );
        let relate = compile(
            EntityType::Location,
            call(
                "st_relate",
                vec![
                    FilterExpr::string("{\"type\":\"Point\",\"coordinates\":[1,2]}"),
                    FilterExpr::literal("location"),
                    FilterExpr::string("T********"),
                ],
            ),
        );
        assert_eq!(
            relate,
            "ST_Relate(ST_GeomFromGeoJSON('{\"type\":\"Point\",\"coordinates\":[1,2]}'), location.location, 'T********')"
        );
    }
}
