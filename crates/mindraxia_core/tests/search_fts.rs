mod common;

use common::{draft, post_service, publish, register};
use mindraxia_core::model::author::AuthorRole;
use mindraxia_core::model::post::PostStatus;
use mindraxia_core::{open_db_in_memory, search_posts, SearchError, SearchQuery};

#[test]
fn search_finds_published_posts_with_snippets() {
    let conn = open_db_in_memory().unwrap();
    let author = register(&conn, "Ada", AuthorRole::Editor);
    publish(&conn, &author, "Fourier Series", "Periodic functions decompose into sines.");
    publish(&conn, &author, "Group Theory", "Symmetry and sines are unrelated here.");
    post_service(&conn)
        .create_post(&author, &draft("Draft Sines", "sines everywhere", PostStatus::Draft))
        .unwrap();

    let hits = search_posts(&conn, &SearchQuery::new("fourier")).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].slug, "fourier-series");
    assert!(hits[0].snippet.contains("[Fourier]"));

    let public = search_posts(&conn, &SearchQuery::new("sines")).unwrap();
    assert_eq!(public.len(), 2);
    assert!(public.iter().all(|hit| hit.status == PostStatus::Published));

    let mut with_drafts = SearchQuery::new("sines");
    with_drafts.include_drafts = true;
    assert_eq!(search_posts(&conn, &with_drafts).unwrap().len(), 3);
}

#[test]
fn search_index_follows_updates_and_deletes() {
    let conn = open_db_in_memory().unwrap();
    let author = register(&conn, "Ada", AuthorRole::Editor);
    let service = post_service(&conn);
    let post = publish(&conn, &author, "Topology", "Open sets.");

    service
        .update_post(
            &author,
            post.uuid,
            &draft("Topology", "Compact spaces.", PostStatus::Published),
        )
        .unwrap();
    assert!(search_posts(&conn, &SearchQuery::new("open")).unwrap().is_empty());
    assert_eq!(search_posts(&conn, &SearchQuery::new("compact")).unwrap().len(), 1);

    service.delete_post(&author, post.uuid).unwrap();
    assert!(search_posts(&conn, &SearchQuery::new("compact")).unwrap().is_empty());
}

#[test]
fn search_index_survives_vacuum_after_deletes() {
    let conn = open_db_in_memory().unwrap();
    let author = register(&conn, "Ada", AuthorRole::Editor);
    let first = publish(&conn, &author, "Lattices", "Meets and joins.");
    publish(&conn, &author, "Rings", "Ideals and quotients.");
    publish(&conn, &author, "Fields", "Extensions and quotients.");
    post_service(&conn).delete_post(&author, first.uuid).unwrap();

    conn.execute_batch("VACUUM;").unwrap();

    let hits = search_posts(&conn, &SearchQuery::new("quotients")).unwrap();
    let mut slugs: Vec<_> = hits.iter().map(|hit| hit.slug.as_str()).collect();
    slugs.sort_unstable();
    assert_eq!(slugs, vec!["fields", "rings"]);

    let ideals = search_posts(&conn, &SearchQuery::new("ideals")).unwrap();
    assert_eq!(ideals.len(), 1);
    assert_eq!(ideals[0].slug, "rings");
    assert!(search_posts(&conn, &SearchQuery::new("lattices")).unwrap().is_empty());
}

#[test]
fn blank_query_and_zero_limit_return_nothing() {
    let conn = open_db_in_memory().unwrap();
    let author = register(&conn, "Ada", AuthorRole::Editor);
    publish(&conn, &author, "Anything", "content");

    assert!(search_posts(&conn, &SearchQuery::new("   ")).unwrap().is_empty());

    let mut zero = SearchQuery::new("content");
    zero.limit = 0;
    assert!(search_posts(&conn, &zero).unwrap().is_empty());
}

#[test]
fn punctuation_is_escaped_unless_raw_syntax_requested() {
    let conn = open_db_in_memory().unwrap();
    let author = register(&conn, "Ada", AuthorRole::Editor);
    publish(&conn, &author, "Quotes", "He said \"hello\" (twice).");

    assert_eq!(
        search_posts(&conn, &SearchQuery::new("\"hello")).unwrap().len(),
        1
    );

    let mut raw = SearchQuery::new("\"hello");
    raw.raw_fts_syntax = true;
    let err = search_posts(&conn, &raw).unwrap_err();
    assert!(matches!(err, SearchError::InvalidQuery { .. }));
}
