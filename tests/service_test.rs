//! Tests for the link service, code allocator and redirect resolver
//! without the HTTP layer

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tempfile::NamedTempFile;

use shortlink::allocator::CodeGenerator;
use shortlink::config::Config;
use shortlink::database::{init_db, AppState};
use shortlink::error::LinkError;
use shortlink::model::Link;
use shortlink::resolver::Resolution;
use shortlink::store::LinkStore;

const ALICE: Option<&str> = Some("user_alice");
const BOB: Option<&str> = Some("user_bob");

/// Always proposes the same code and counts how often it was asked
struct FixedCodeGenerator {
    code: String,
    calls: AtomicUsize,
}

impl FixedCodeGenerator {
    fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
            calls: AtomicUsize::new(0),
        }
    }
}

impl CodeGenerator for FixedCodeGenerator {
    fn generate(&self) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.code.clone()
    }
}

fn setup_state() -> (AppState, NamedTempFile) {
    let temp_db = NamedTempFile::new().expect("Failed to create temp file");
    let db = init_db(temp_db.path().to_str().unwrap()).expect("Failed to initialize test database");
    (AppState::new(db, Config::default()), temp_db)
}

fn setup_state_with_generator(generator: Arc<dyn CodeGenerator>) -> (AppState, NamedTempFile) {
    let temp_db = NamedTempFile::new().expect("Failed to create temp file");
    let db = init_db(temp_db.path().to_str().unwrap()).expect("Failed to initialize test database");
    (
        AppState::with_generator(db, Config::default(), generator),
        temp_db,
    )
}

#[test]
fn test_create_with_requested_code() {
    let (state, _temp_db) = setup_state();

    let link = state
        .links
        .create(ALICE, "https://example.com/a", Some("my-link"))
        .unwrap();

    assert_eq!(link.short_code, "my-link");
    assert_eq!(link.owner_id, "user_alice");
    assert_eq!(link.destination_url, "https://example.com/a");
    assert_eq!(link.created_at, link.updated_at);
}

#[test]
fn test_requested_code_taken_by_anyone() {
    let (state, _temp_db) = setup_state();

    state
        .links
        .create(ALICE, "https://example.com/a", Some("shared"))
        .unwrap();

    let err = state
        .links
        .create(BOB, "https://example.com/b", Some("shared"))
        .unwrap_err();
    assert!(matches!(err, LinkError::CodeTaken));
}

#[test]
fn test_invalid_requested_code_is_a_slug_field_error() {
    let (state, _temp_db) = setup_state();

    let long = "x".repeat(51);
    for slug in ["has space", "a/b", long.as_str()] {
        match state.links.create(ALICE, "https://example.com", Some(slug)) {
            Err(LinkError::Validation(fields)) => {
                assert!(fields.contains_key("slug"));
                assert!(!fields.contains_key("url"));
            }
            other => panic!("expected validation error for {slug:?}, got {other:?}"),
        }
    }
}

#[test]
fn test_relative_url_is_rejected() {
    let (state, _temp_db) = setup_state();

    match state.links.create(ALICE, "/relative/path", None) {
        Err(LinkError::Validation(fields)) => assert!(fields.contains_key("url")),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn test_allocation_exhausted_after_ten_collisions() {
    let generator = Arc::new(FixedCodeGenerator::new("abc123"));
    let (state, _temp_db) = setup_state_with_generator(generator.clone());

    // The first draw is free and claims the code.
    let first = state.links.create(ALICE, "https://example.com/1", None).unwrap();
    assert_eq!(first.short_code, "abc123");
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);

    let err = state
        .links
        .create(ALICE, "https://example.com/2", None)
        .unwrap_err();
    assert!(matches!(err, LinkError::AllocationExhausted));
    assert_eq!(generator.calls.load(Ordering::SeqCst), 11);
}

#[test]
fn test_unauthenticated_calls_are_rejected() {
    let (state, _temp_db) = setup_state();

    assert!(matches!(
        state.links.create(None, "https://example.com", None),
        Err(LinkError::Unauthorized)
    ));
    assert!(matches!(
        state.links.edit(None, "id", "https://example.com", "code"),
        Err(LinkError::Unauthorized)
    ));
    assert!(matches!(
        state.links.delete(None, "id"),
        Err(LinkError::Unauthorized)
    ));
    assert!(matches!(
        state.links.list(None, None, None),
        Err(LinkError::Unauthorized)
    ));
}

#[test]
fn test_edit_and_delete_hide_foreign_links() {
    let (state, _temp_db) = setup_state();

    let link = state
        .links
        .create(ALICE, "https://example.com/a", Some("alice"))
        .unwrap();

    assert!(matches!(
        state.links.edit(BOB, &link.id, "https://example.com/b", "alice"),
        Err(LinkError::NotFound)
    ));
    assert!(matches!(
        state.links.delete(BOB, &link.id),
        Err(LinkError::NotFound)
    ));
    assert!(matches!(
        state.links.edit(ALICE, "missing", "https://example.com/b", "x"),
        Err(LinkError::NotFound)
    ));
    assert!(matches!(
        state.links.delete(ALICE, "missing"),
        Err(LinkError::NotFound)
    ));

    assert_eq!(
        state.resolver.resolve("alice").unwrap(),
        Resolution::Found("https://example.com/a".to_string())
    );
}

#[test]
fn test_edit_keeps_identity_and_refreshes_timestamp() {
    let (state, _temp_db) = setup_state();

    let link = state
        .links
        .create(ALICE, "https://example.com/a", Some("before"))
        .unwrap();

    let edited = state
        .links
        .edit(ALICE, &link.id, "https://example.com/b", "after")
        .unwrap();

    assert_eq!(edited.id, link.id);
    assert_eq!(edited.owner_id, link.owner_id);
    assert_eq!(edited.created_at, link.created_at);
    assert!(edited.updated_at >= link.updated_at);
    assert_eq!(edited.short_code, "after");

    assert_eq!(state.resolver.resolve("before").unwrap(), Resolution::NotFound);
    assert_eq!(
        state.resolver.resolve("after").unwrap(),
        Resolution::Found("https://example.com/b".to_string())
    );
}

#[test]
fn test_edit_destination_only_keeps_code() {
    let (state, _temp_db) = setup_state();

    let link = state
        .links
        .create(ALICE, "https://example.com/a", Some("same"))
        .unwrap();

    state
        .links
        .edit(ALICE, &link.id, "https://example.com/new", "same")
        .unwrap();

    assert_eq!(
        state.resolver.resolve("same").unwrap(),
        Resolution::Found("https://example.com/new".to_string())
    );
}

#[test]
fn test_edit_to_code_of_other_link_is_taken() {
    let (state, _temp_db) = setup_state();

    state
        .links
        .create(BOB, "https://example.com/bob", Some("bobs"))
        .unwrap();
    let link = state
        .links
        .create(ALICE, "https://example.com/alice", Some("alices"))
        .unwrap();

    assert!(matches!(
        state.links.edit(ALICE, &link.id, "https://example.com/alice", "bobs"),
        Err(LinkError::CodeTaken)
    ));
}

#[test]
fn test_released_codes_can_be_reused() {
    let (state, _temp_db) = setup_state();

    let link = state
        .links
        .create(ALICE, "https://example.com/a", Some("recycle"))
        .unwrap();
    state.links.delete(ALICE, &link.id).unwrap();

    assert_eq!(state.resolver.resolve("recycle").unwrap(), Resolution::NotFound);

    let again = state
        .links
        .create(BOB, "https://example.com/b", Some("recycle"))
        .unwrap();
    assert_ne!(again.id, link.id);
}

#[test]
fn test_list_paginates_newest_first() {
    let (state, _temp_db) = setup_state();

    for i in 0..5 {
        let slug = format!("code{}", i);
        state
            .links
            .create(ALICE, "https://example.com", Some(slug.as_str()))
            .unwrap();
    }

    let (page, limit, links) = state.links.list(ALICE, Some(1), Some(2)).unwrap();
    assert_eq!((page, limit), (1, 2));
    let codes: Vec<_> = links.iter().map(|l| l.short_code.as_str()).collect();
    assert_eq!(codes, vec!["code4", "code3"]);

    let (_, _, links) = state.links.list(ALICE, Some(3), Some(2)).unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].short_code, "code0");

    let (page, limit, _) = state.links.list(ALICE, Some(0), Some(1000)).unwrap();
    assert_eq!((page, limit), (1, 100));

    let (_, _, links) = state.links.list(BOB, None, None).unwrap();
    assert!(links.is_empty());
}

#[test]
fn test_resolver_skips_malformed_codes() {
    let (state, _temp_db) = setup_state();

    assert_eq!(state.resolver.resolve("no spaces").unwrap(), Resolution::NotFound);
    assert_eq!(state.resolver.resolve("").unwrap(), Resolution::NotFound);
}

#[test]
fn test_store_rejects_duplicate_code_on_insert() {
    let temp_db = NamedTempFile::new().unwrap();
    let db = init_db(temp_db.path().to_str().unwrap()).unwrap();
    let store = LinkStore::new(Arc::new(db));

    let now = Utc::now();
    let link = |id: &str, owner: &str| Link {
        id: id.to_string(),
        owner_id: owner.to_string(),
        short_code: "race".to_string(),
        destination_url: "https://example.com".to_string(),
        created_at: now,
        updated_at: now,
    };

    store.insert(&link("first", "user_alice")).unwrap();
    let err = store.insert(&link("second", "user_bob")).unwrap_err();
    assert!(matches!(err, shortlink::error::StoreError::CodeConflict(ref code) if code == "race"));

    // The losing insert left nothing behind.
    assert!(store.get_by_id("second").unwrap().is_none());
    assert!(store.list_by_owner("user_bob", 0, 10).unwrap().is_empty());
    assert_eq!(store.get_by_code("race").unwrap().unwrap().id, "first");
    assert!(store.find_by_code_excluding("race", "first").unwrap().is_none());
    assert!(store.find_by_code_excluding("race", "second").unwrap().is_some());
}

#[test]
fn test_store_conflict_maps_to_code_taken() {
    let err: LinkError = shortlink::error::StoreError::CodeConflict("x".to_string()).into();
    assert!(matches!(err, LinkError::CodeTaken));
}

#[test]
fn test_store_update_refuses_taken_code() {
    let temp_db = NamedTempFile::new().unwrap();
    let db = init_db(temp_db.path().to_str().unwrap()).unwrap();
    let store = LinkStore::new(Arc::new(db));

    let now = Utc::now();
    let make = |id: &str, code: &str| Link {
        id: id.to_string(),
        owner_id: "user_alice".to_string(),
        short_code: code.to_string(),
        destination_url: "https://example.com".to_string(),
        created_at: now,
        updated_at: now,
    };

    store.insert(&make("one", "first")).unwrap();
    store.insert(&make("two", "second")).unwrap();

    assert!(store.update(&make("two", "first")).is_err());
    assert_eq!(store.get_by_code("second").unwrap().unwrap().id, "two");
    assert!(!store.update(&make("missing", "third")).unwrap());
    assert!(!store.delete("missing").unwrap());
}

#[test]
fn test_concurrent_creates_of_same_code_have_one_winner() {
    let (state, _temp_db) = setup_state();

    let results: Vec<Result<Link, LinkError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let state = state.clone();
                scope.spawn(move || {
                    let owner = format!("user_{}", i);
                    state
                        .links
                        .create(Some(owner.as_str()), "https://example.com", Some("contested"))
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let winners = results.iter().filter(|r| r.is_ok()).count();
    let taken = results
        .iter()
        .filter(|r| matches!(r, Err(LinkError::CodeTaken)))
        .count();
    assert_eq!(winners, 1);
    assert_eq!(taken, 7);
}

#[test]
fn test_custom_not_found_path_reserves_its_first_segment() {
    let temp_db = NamedTempFile::new().unwrap();
    let db = init_db(temp_db.path().to_str().unwrap()).unwrap();
    let config = Config {
        not_found_path: "/missing/link".to_string(),
        ..Config::default()
    };
    let state = AppState::new(db, config);

    match state.links.create(ALICE, "https://example.com", Some("missing")) {
        Err(LinkError::Validation(fields)) => assert!(fields.contains_key("slug")),
        other => panic!("expected validation error, got {other:?}"),
    }
    // The default not-found segment is an ordinary code here.
    assert!(state
        .links
        .create(ALICE, "https://example.com", Some("link-not-found"))
        .is_ok());
}

#[test]
fn test_generated_codes_skip_reserved_segment() {
    let generator = Arc::new(FixedCodeGenerator::new("link-not-found"));
    let (state, _temp_db) = setup_state_with_generator(generator.clone());

    let err = state
        .links
        .create(ALICE, "https://example.com", None)
        .unwrap_err();
    assert!(matches!(err, LinkError::AllocationExhausted));
    assert_eq!(generator.calls.load(Ordering::SeqCst), 10);
}

#[test]
fn test_slug_is_validated_as_sent() {
    let (state, _temp_db) = setup_state();

    let link = state
        .links
        .create(ALICE, "https://example.com", Some("exact"))
        .unwrap();

    for slug in [" exact", "exact ", "   "] {
        assert!(matches!(
            state.links.create(BOB, "https://example.com", Some(slug)),
            Err(LinkError::Validation(_))
        ));
        assert!(matches!(
            state.links.edit(ALICE, &link.id, "https://example.com", slug),
            Err(LinkError::Validation(_))
        ));
    }
}
