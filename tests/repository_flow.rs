//! End-to-end repository flows against the in-memory store

use annostore::{
    annotation_tag, container_tag, Annotation, ChoreState, Error, GlobalSearchOutcome,
    MemoryStore, Repository, RepositoryConfig, VersionTag,
};
use serde_json::json;
use std::sync::Arc;

fn repository_with_page_size(page_size: usize) -> Repository {
    let config = RepositoryConfig {
        page_size,
        ..RepositoryConfig::default()
    };
    Repository::new(Arc::new(MemoryStore::new()), config)
}

fn target(source: &str, start: u64, end: u64) -> serde_json::Value {
    json!([{
        "type": "Text",
        "source": source,
        "selector": {"type": "TextAnchorSelector", "start": start, "end": end}
    }])
}

#[test]
fn annotation_protocol_flow() {
    let repo = repository_with_page_size(10);

    let container = repo.create_container(Some("volume-1674"), "Volume 1674").unwrap();
    assert_eq!(container.metadata.name, "volume-1674");
    assert_eq!(container.tag, container_tag("volume-1674"));

    let created = repo
        .create_annotation(
            "volume-1674",
            Some("resolution-12"),
            json!({
                "@context": "http://www.w3.org/ns/anno.jsonld",
                "type": "Annotation",
                "body": {"type": "Resolution", "value": "..."},
                "target": target("urn:vol1674", 100, 300)
            }),
        )
        .unwrap();
    assert_eq!(created.tag, annotation_tag("volume-1674", "resolution-12"));

    // the ledger counts occurrences, '@'-paths excluded
    let counts = repo.field_counts("volume-1674").unwrap();
    assert_eq!(counts.get("type"), Some(&1));
    assert_eq!(counts.get("body.type"), Some(&1));
    assert_eq!(counts.get("target.selector.start"), Some(&1));
    assert!(counts.keys().all(|path| !path.contains('@')));

    // replace with the current tag succeeds and reshapes the ledger
    let current = repo.get_annotation("volume-1674", "resolution-12").unwrap();
    repo.replace_annotation(
        "volume-1674",
        "resolution-12",
        Some(&current.tag),
        json!({"body": {"type": "Attendance"}}),
    )
    .unwrap();
    let counts = repo.field_counts("volume-1674").unwrap();
    assert_eq!(counts.get("body.type"), Some(&1));
    assert!(!counts.contains_key("target.selector.start"));

    repo.shutdown();
}

#[test]
fn stale_tag_leaves_everything_untouched() {
    let repo = repository_with_page_size(10);
    repo.create_container(Some("vol"), "").unwrap();
    repo.create_annotation("vol", Some("a1"), json!({"body": {"id": "x"}}))
        .unwrap();

    let stale = VersionTag::from_value("0000000000000000");
    let err = repo
        .delete_annotation("vol", "a1", Some(&stale))
        .unwrap_err();
    assert!(matches!(err, Error::PreconditionFailed { .. }));

    let read_back = repo.get_annotation("vol", "a1").unwrap();
    assert_eq!(read_back.content, json!({"body": {"id": "x"}}));
    assert_eq!(repo.field_counts("vol").unwrap().get("body.id"), Some(&1));
    repo.shutdown();
}

#[test]
fn search_session_survives_mutations_with_stable_hit_count() {
    let repo = repository_with_page_size(2);
    repo.create_container(Some("vol"), "").unwrap();
    for i in 0..5 {
        repo.create_annotation(
            "vol",
            Some(&format!("a{i}")),
            json!({"body": {"type": "Page", "seq": i}}),
        )
        .unwrap();
    }

    let search_id = repo
        .create_search("vol", &json!({"body.type": "Page"}))
        .unwrap();

    // lazy hit count computed on first info read
    assert_eq!(repo.search_info("vol", &search_id).unwrap().hits, 5);

    // later mutations do not disturb the session's total
    repo.delete_annotation("vol", "a0", None).unwrap();
    assert_eq!(repo.search_info("vol", &search_id).unwrap().hits, 5);

    // pagination appends to the cached stages; page two now holds the tail
    let page = repo.search_result_page("vol", &search_id, 1).unwrap();
    assert_eq!(page.annotations.len(), 2);
    repo.shutdown();
}

#[test]
fn range_queries_match_spec_boundaries() {
    let repo = repository_with_page_size(10);
    repo.create_container(Some("vol"), "").unwrap();
    repo.create_annotation(
        "vol",
        Some("a1"),
        json!({"target": target("urn:src", 100, 300)}),
    )
    .unwrap();

    let hits = |query: serde_json::Value| {
        let id = repo.create_search("vol", &query).unwrap();
        repo.search_result_page("vol", &id, 0).unwrap().annotations.len()
    };

    // within: inclusive boundaries
    assert_eq!(
        hits(json!({":isWithinTextAnchorRange": {"source": "urn:src", "start": 100, "end": 300}})),
        1
    );
    assert_eq!(
        hits(json!({":isWithinTextAnchorRange": {"source": "urn:src", "start": 150, "end": 200}})),
        0
    );

    // overlap: strict boundaries
    assert_eq!(
        hits(json!({":overlapsWithTextAnchorRange": {"source": "urn:src", "start": 250, "end": 400}})),
        1
    );
    assert_eq!(
        hits(json!({":overlapsWithTextAnchorRange": {"source": "urn:src", "start": 300, "end": 400}})),
        0
    );

    // a different source never matches
    assert_eq!(
        hits(json!({":overlapsWithTextAnchorRange": {"source": "urn:other", "start": 0, "end": 1000}})),
        0
    );
    repo.shutdown();
}

#[test]
fn global_search_lifecycle() {
    let repo = repository_with_page_size(3);
    for (container, n) in [("vol-a", 2), ("vol-b", 3)] {
        repo.create_container(Some(container), "").unwrap();
        for i in 0..n {
            repo.create_annotation(
                container,
                Some(&format!("a{i}")),
                json!({"body": {"type": "Page"}}),
            )
            .unwrap();
        }
    }

    let (id, initial) = repo
        .create_global_search(
            vec!["vol-b".to_string(), "vol-a".to_string()],
            &json!({"body.type": "Page"}),
        )
        .unwrap();
    assert_eq!(initial.state, ChoreState::Created);
    assert_eq!(initial.containers_searched, 0);

    repo.drain_chores();

    let status = repo.global_search_status(&id).unwrap();
    assert_eq!(status.state, ChoreState::Done);
    assert_eq!(status.total_containers_to_search, 2);
    assert_eq!(status.containers_searched, 2);
    assert_eq!(status.hits_found_so_far, 5);
    assert!(status.finished_at.unwrap() >= status.started_at.unwrap());
    assert!(status.expires_after.unwrap() > status.finished_at.unwrap());

    // results honor caller container order, paginated in memory
    match repo.global_search_page(&id, 0).unwrap() {
        GlobalSearchOutcome::Page(page) => {
            assert_eq!(page.total, 5);
            assert_eq!(page.annotations.len(), 3);
            assert!(page.annotations.iter().take(3).all(|r| r.container == "vol-b"));
            assert!(page.has_more);
        }
        other => panic!("expected page, got {other:?}"),
    }
    match repo.global_search_page(&id, 1).unwrap() {
        GlobalSearchOutcome::Page(page) => {
            assert_eq!(page.annotations.len(), 2);
            assert!(!page.has_more);
        }
        other => panic!("expected page, got {other:?}"),
    }

    // unknown ids are NotFound
    assert!(matches!(
        repo.global_search_status("no-such-chore").unwrap_err(),
        Error::NotFound { .. }
    ));
    repo.shutdown();
}

#[test]
fn expired_chores_are_purged_by_the_sweep() {
    let config = RepositoryConfig {
        chore_ttl_secs: 0,
        sweep_interval_secs: 1,
        ..RepositoryConfig::default()
    };
    let repo = Repository::new(Arc::new(MemoryStore::new()), config);
    repo.create_container(Some("vol"), "").unwrap();

    let (id, _) = repo
        .create_global_search(vec!["vol".to_string()], &json!({"body.type": "Page"}))
        .unwrap();
    repo.drain_chores();
    assert!(repo.global_search_status(&id).is_ok());

    // zero TTL: the next sweep removes the terminal chore
    std::thread::sleep(std::time::Duration::from_millis(1600));
    assert!(matches!(
        repo.global_search_status(&id).unwrap_err(),
        Error::NotFound { .. }
    ));
    repo.shutdown();
}

#[test]
fn index_build_flow() {
    let repo = repository_with_page_size(10);
    repo.create_container(Some("vol"), "").unwrap();

    let fields = vec![
        ("body.type".to_string(), "hashed".to_string()),
        ("target.source".to_string(), "ascending".to_string()),
    ];
    let (index_id, initial) = repo.add_index("vol", &fields).unwrap();
    assert_eq!(initial.state, ChoreState::Created);

    repo.drain_chores();
    assert_eq!(repo.index_status(&index_id).unwrap().state, ChoreState::Done);

    let definition = repo.index_definition("vol", &index_id).unwrap();
    assert_eq!(definition.fields.len(), 2);
    assert_eq!(definition.partial_filter_field.as_deref(), Some("body.type"));

    repo.delete_index("vol", &index_id).unwrap();
    assert!(repo.index_definition("vol", &index_id).is_err());
    repo.shutdown();
}

#[test]
fn store_iteration_order_is_preserved_in_search_pages() {
    let repo = repository_with_page_size(10);
    repo.create_container(Some("vol"), "").unwrap();
    for name in ["first", "second", "third"] {
        repo.create_annotation("vol", Some(name), json!({"kind": "x"}))
            .unwrap();
    }
    let id = repo.create_search("vol", &json!({"kind": "x"})).unwrap();
    let page = repo.search_result_page("vol", &id, 0).unwrap();
    let names: Vec<&str> = page.annotations.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["first", "second", "third"]);

    let annotations: Vec<Annotation> = page.annotations;
    assert_eq!(annotations[0].content, json!({"kind": "x"}));
    repo.shutdown();
}
