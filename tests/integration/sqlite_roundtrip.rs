use rusqlite::Connection;
use sensorthings_query::{
    config::EngineConfig,
    filter::FilterExpr,
    model::entities::Sensor,
    query::{OrderBy, QueryEngine, QueryOptions, Selection},
    Entity, EntityType, Phase, QueryError,
};

fn seeded() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch(
        "CREATE TABLE thing (id INTEGER PRIMARY KEY, name TEXT, description TEXT, properties TEXT);
         CREATE TABLE sensor (id INTEGER PRIMARY KEY, name TEXT, description TEXT, encodingtype INTEGER, metadata TEXT);
         INSERT INTO thing VALUES (1, 'buoy', 'floating', '{\"owner\":\"ann\"}');
         INSERT INTO thing VALUES (2, 'mast', 'weather mast', NULL);
         INSERT INTO thing VALUES (3, 'kite', NULL, NULL);
         INSERT INTO sensor VALUES (1, 'dht22', 'humidity', 2, 'https://example.org/dht22.pdf');
         INSERT INTO sensor VALUES (2, 'bme280', 'pressure', 3, NULL);",
    )?;
    Ok(conn)
}

fn names(entities: &[Entity]) -> Vec<String> {
    entities
        .iter()
        .map(|entity| match entity {
            Entity::Thing(thing) => thing.name.clone().unwrap_or_default(),
            Entity::Sensor(sensor) => sensor.name.clone().unwrap_or_default(),
            other => panic!("unexpected entity {other:?}"),
        })
        .collect()
}

#[test]
fn collection_is_newest_first_with_count() {
    let mut conn = seeded().expect("seed");
    let engine = QueryEngine::default();
    let page = engine
        .fetch(&mut conn, EntityType::Thing, &Selection::All, &QueryOptions::new())
        .expect("fetch");
    assert_eq!(names(&page.entities), vec!["kite", "mast", "buoy"]);
    assert_eq!(page.count, Some(3));
    assert!(!page.has_more);

    let Entity::Thing(buoy) = &page.entities[2] else {
        panic!("expected a thing");
    };
    assert_eq!(buoy.properties, Some(serde_json::json!({ "owner": "ann" })));
}

#[test]
fn top_reports_more_rows() {
    let mut conn = seeded().expect("seed");
    let engine = QueryEngine::default();
    let options = QueryOptions::new().with_top(2);
    let page = engine
        .fetch(&mut conn, EntityType::Thing, &Selection::All, &options)
        .expect("fetch");
    assert_eq!(names(&page.entities), vec!["kite", "mast"]);
    assert!(page.has_more);
    assert_eq!(page.count, Some(3));

    let last = engine
        .fetch(
            &mut conn,
            EntityType::Thing,
            &Selection::All,
            &options.clone().with_skip(2),
        )
        .expect("fetch");
    assert_eq!(names(&last.entities), vec!["buoy"]);
    assert!(!last.has_more);
}

#[test]
fn top_equal_to_matches_has_no_more() {
    let mut conn = seeded().expect("seed");
    let engine = QueryEngine::default();
    let options = QueryOptions::new()
        .with_filter(FilterExpr::compare(
            "ne",
            FilterExpr::literal("description"),
            FilterExpr::null(),
        ))
        .with_top(2);
    let page = engine
        .fetch(&mut conn, EntityType::Thing, &Selection::All, &options)
        .expect("fetch");
    assert_eq!(names(&page.entities), vec!["mast", "buoy"]);
    assert!(!page.has_more);
    assert_eq!(page.count, Some(2));
}

#[test]
fn default_top_from_config_pages_the_root() {
    let mut conn = seeded().expect("seed");
    let engine = QueryEngine::new(EngineConfig {
        default_top: Some(1),
        ..EngineConfig::default()
    });
    let page = engine
        .fetch(&mut conn, EntityType::Thing, &Selection::All, &QueryOptions::new())
        .expect("fetch");
    assert_eq!(page.entities.len(), 1);
    assert!(page.has_more);
}

#[test]
fn filter_select_and_order() {
    let mut conn = seeded().expect("seed");
    let engine = QueryEngine::default();
    let options = QueryOptions::new()
        .with_filter(FilterExpr::compare(
            "ne",
            FilterExpr::literal("description"),
            FilterExpr::null(),
        ))
        .with_order_by(OrderBy::asc("name"))
        .with_select(&["name"]);
    let page = engine
        .fetch(&mut conn, EntityType::Thing, &Selection::All, &options)
        .expect("fetch");
    assert_eq!(names(&page.entities), vec!["buoy", "mast"]);
    assert!(page.entities.iter().all(|e| e.id().is_none()));
    assert_eq!(page.count, Some(2));
}

#[test]
fn coded_encoding_type_round_trips() {
    let mut conn = seeded().expect("seed");
    let engine = QueryEngine::default();
    let options = QueryOptions::new().with_filter(FilterExpr::compare(
        "eq",
        FilterExpr::literal("encodingType"),
        FilterExpr::string("application/pdf"),
    ));
    let page = engine
        .fetch(&mut conn, EntityType::Sensor, &Selection::All, &options)
        .expect("fetch");
    assert_eq!(
        page.entities,
        vec![Entity::Sensor(Sensor {
            id: Some(1),
            name: Some("dht22".into()),
            description: Some("humidity".into()),
            encoding_type: Some("application/pdf".into()),
            metadata: Some("https://example.org/dht22.pdf".into()),
            ..Sensor::default()
        })]
    );
}

#[test]
fn single_entity_and_existence() {
    let mut conn = seeded().expect("seed");
    let engine = QueryEngine::default();
    let page = engine
        .fetch(
            &mut conn,
            EntityType::Sensor,
            &Selection::ById(2),
            &QueryOptions::new().with_count(false),
        )
        .expect("fetch");
    assert_eq!(names(&page.entities), vec!["bme280"]);
    assert_eq!(page.count, None);

    let missing = engine
        .fetch(&mut conn, EntityType::Sensor, &Selection::ById(9), &QueryOptions::new())
        .expect("fetch");
    assert!(missing.entities.is_empty());
    assert_eq!(missing.count, Some(0));

    assert!(engine.exists(&mut conn, EntityType::Thing, 3).expect("exists"));
    assert!(!engine.exists(&mut conn, EntityType::Thing, 4).expect("exists"));
}

#[test]
fn missing_table_is_a_select_failure() {
    let mut conn = Connection::open_in_memory().expect("open");
    let err = QueryEngine::default()
        .fetch(&mut conn, EntityType::Thing, &Selection::All, &QueryOptions::new())
        .expect_err("no tables");
    assert!(matches!(err, QueryError::Execution { phase: Phase::Select, .. }));
    assert_eq!(err.code(), "Execution");
}
