use std::collections::HashSet;

use proptest::prelude::*;
use sensorthings_query::{
    filter::{hoist, prepare::prepare_operand, FilterExpr},
    model::{time::normalize_timestamp, EntityType},
    query::{alias_prefix, QueryOptions},
};

const SPECIAL: [&str; 5] = ["encodingtype", "observationtype", "phenomenontime", "resulttime", "time"];

fn is_normalized(ts: &str) -> bool {
    let bytes = ts.as_bytes();
    bytes.len() == 24
        && bytes.iter().enumerate().all(|(i, &b)| match i {
            4 | 7 => b == b'-',
            10 => b == b'T',
            13 | 16 => b == b':',
            19 => b == b'.',
            23 => b == b'Z',
            _ => b.is_ascii_digit(),
        })
}

fn arb_timestamp() -> impl Strategy<Value = String> {
    (
        1970i32..2100,
        1u8..=12,
        1u8..=28,
        0u8..24,
        0u8..60,
        0u8..60,
        prop::option::of(0u16..1000),
        prop_oneof![Just("Z".to_owned()), (-11i8..=14, 0u8..2).prop_map(|(h, half)| {
            let sign = if h < 0 { '-' } else { '+' };
            format!("{sign}{:02}:{:02}", h.unsigned_abs(), half * 30)
        })],
    )
        .prop_map(|(y, mo, d, h, mi, s, ms, offset)| {
            let fraction = ms.map(|ms| format!(".{ms:03}")).unwrap_or_default();
            format!("{y:04}-{mo:02}-{d:02}T{h:02}:{mi:02}:{s:02}{fraction}{offset}")
        })
}

fn arb_operand() -> impl Strategy<Value = FilterExpr> {
    prop_oneof![
        Just(FilterExpr::literal("name")),
        Just(FilterExpr::nav(&["properties", "owner"])),
        Just(FilterExpr::nav(&["Datastreams", "name"])),
        Just(FilterExpr::nav(&["Datastreams", "Observations", "result"])),
        Just(FilterExpr::nav(&["Locations", "name"])),
        Just(FilterExpr::nav(&["Datastreams", "Sensor", "metadata"])),
    ]
}

fn arb_filter() -> impl Strategy<Value = FilterExpr> {
    let leaf = (arb_operand(), 0i64..100)
        .prop_map(|(operand, n)| FilterExpr::compare("eq", operand, FilterExpr::int(n)));
    leaf.prop_recursive(3, 16, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(l, r)| FilterExpr::and(l, r)),
            (inner.clone(), inner.clone()).prop_map(|(l, r)| FilterExpr::or(l, r)),
            inner.prop_map(FilterExpr::not),
        ]
    })
}

proptest! {
    #[test]
    fn prop_prepare_ignores_ordinary_properties(
        property in "[a-zA-Z]{1,12}",
        value in "'[a-zA-Z0-9:/. -]{0,20}'",
    ) {
        prop_assume!(!SPECIAL.contains(&property.to_ascii_lowercase().as_str()));
        prop_assert_eq!(prepare_operand(&property, &value), None);
    }

    #[test]
    fn prop_timestamps_normalize_to_utc_millis(ts in arb_timestamp()) {
        let normalized = normalize_timestamp(&ts).expect("valid RFC 3339 input");
        prop_assert!(is_normalized(&normalized), "{} -> {}", ts, normalized);
        prop_assert_eq!(normalize_timestamp(&normalized), Some(normalized.clone()));

        let quoted = prepare_operand("phenomenonTime", &format!("'{ts}'"));
        prop_assert_eq!(quoted, Some(format!("'{normalized}'")));
    }

    #[test]
    fn prop_hoisting_is_idempotent(filter in arb_filter()) {
        let mut options = QueryOptions::new().with_filter(filter);
        hoist(EntityType::Thing, &mut options);
        let once = options.clone();
        hoist(EntityType::Thing, &mut options);
        prop_assert_eq!(options, once);
    }
}

#[test]
fn alias_prefixes_are_unique_for_two_letter_range() {
    let prefixes: Vec<String> = (0..702).map(alias_prefix).collect();
    let distinct: HashSet<&String> = prefixes.iter().collect();
    assert_eq!(distinct.len(), 702);
    assert_eq!(prefixes[0], "A");
    assert_eq!(prefixes[25], "Z");
    assert_eq!(prefixes[26], "AA");
    assert_eq!(prefixes[701], "ZZ");
    assert_eq!(alias_prefix(702), "AAA");
}
