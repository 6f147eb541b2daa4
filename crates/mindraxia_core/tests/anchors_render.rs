mod common;

use common::{draft, post_service, public_post_service, publish, register};
use mindraxia_core::model::anchor::{AnchorKind, AnchorRecord};
use mindraxia_core::model::author::AuthorRole;
use mindraxia_core::model::post::{PostId, PostStatus};
use mindraxia_core::open_db_in_memory;
use mindraxia_core::repo::anchor_repo::{AnchorRepository, SqliteAnchorRepository};
use mindraxia_core::repo::post_repo::SqlitePostRepository;
use mindraxia_core::service::post_service::PostService;
use mindraxia_core::{AnchorLookup, Renderer, RepoError, RepoResult};

const GEOMETRY: &str = "\
$$ a^2 + b^2 = c^2 $$ {#eq:pyth}

:::theorem Pythagoras {#thm:pyth}
In a right triangle {{eq:pyth}} holds.
:::
";

#[test]
fn creating_a_post_persists_its_anchor_index() {
    let conn = open_db_in_memory().unwrap();
    let author = register(&conn, "Ada", AuthorRole::Editor);
    let post = publish(&conn, &author, "Geometry", GEOMETRY);

    let anchors = post_service(&conn).list_anchors(post.uuid, None).unwrap();
    let summary: Vec<_> = anchors
        .iter()
        .map(|anchor| (anchor.kind, anchor.anchor_id.as_str(), anchor.number))
        .collect();
    assert_eq!(
        summary,
        vec![
            (AnchorKind::Equation, "pyth", 1),
            (AnchorKind::Theorem, "pyth", 1),
        ]
    );
    assert_eq!(anchors[1].title.as_deref(), Some("Pythagoras"));
}

#[test]
fn updating_content_replaces_anchor_index() {
    let conn = open_db_in_memory().unwrap();
    let author = register(&conn, "Ada", AuthorRole::Editor);
    let service = post_service(&conn);
    let post = publish(&conn, &author, "Geometry", GEOMETRY);

    service
        .update_post(
            &author,
            post.uuid,
            &draft("Geometry", "$$ x $$ {#eq:other}", PostStatus::Published),
        )
        .unwrap();

    let repo = SqliteAnchorRepository::try_new(&conn).unwrap();
    let anchors = repo.list_post_anchors(post.uuid).unwrap();
    assert_eq!(anchors.len(), 1);
    assert_eq!(anchors[0].anchor_id, "other");
    assert!(repo
        .find_anchor("geometry", AnchorKind::Theorem, "pyth")
        .unwrap()
        .is_none());
}

#[test]
fn anchors_disappear_with_their_post() {
    let conn = open_db_in_memory().unwrap();
    let author = register(&conn, "Ada", AuthorRole::Editor);
    let post = publish(&conn, &author, "Geometry", GEOMETRY);

    post_service(&conn).delete_post(&author, post.uuid).unwrap();

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM post_anchors;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn cross_post_lookup_only_sees_published_posts_by_default() {
    let conn = open_db_in_memory().unwrap();
    let author = register(&conn, "Ada", AuthorRole::Editor);
    publish(&conn, &author, "Geometry", GEOMETRY);
    post_service(&conn)
        .create_post(&author, &draft("Secret", GEOMETRY, PostStatus::Draft))
        .unwrap();

    let public = SqliteAnchorRepository::try_new(&conn).unwrap();
    assert!(public.lookup("geometry", AnchorKind::Theorem, "pyth").is_some());
    assert!(public.lookup("secret", AnchorKind::Theorem, "pyth").is_none());
    assert!(public.lookup("geometry", AnchorKind::Definition, "pyth").is_none());

    let private = SqliteAnchorRepository::try_new(&conn).unwrap().with_drafts();
    assert!(private.lookup("secret", AnchorKind::Theorem, "pyth").is_some());
}

#[test]
fn rendered_post_links_to_anchors_of_other_posts() {
    let conn = open_db_in_memory().unwrap();
    let author = register(&conn, "Ada", AuthorRole::Editor);
    publish(&conn, &author, "Geometry", GEOMETRY);
    let citing = publish(
        &conn,
        &author,
        "Trigonometry",
        "By {{thm:geometry/pyth}} and {{eq:geometry/pyth|the identity}}, done.",
    );

    let rendered = public_post_service(&conn).render_post(&citing);

    assert!(rendered.html.contains(
        "<a class=\"anchor-ref anchor-ref-thm\" href=\"/posts/geometry#thm-pyth\">Theorem 1</a>"
    ));
    assert!(rendered.html.contains(
        "<a class=\"anchor-ref anchor-ref-eq\" href=\"/posts/geometry#eq-pyth\">the identity</a>"
    ));
    assert!(rendered.diagnostics.is_empty());
}

#[test]
fn cross_post_embed_copies_foreign_block_without_ids() {
    let conn = open_db_in_memory().unwrap();
    let author = register(&conn, "Ada", AuthorRole::Editor);
    publish(&conn, &author, "Geometry", GEOMETRY);

    let repo = SqliteAnchorRepository::try_new(&conn).unwrap();
    let rendered = Renderer::new(&repo)
        .with_post_slug("notes")
        .render("{{thm:geometry/pyth|embed}}");

    assert!(rendered.html.contains("anchor-embed anchor-embed-thm"));
    assert!(rendered.html.contains("Theorem 1"));
    assert!(!rendered.html.contains("id=\"thm-pyth\""));
    assert!(rendered
        .html
        .contains("href=\"/posts/geometry#eq-pyth\""));
}

#[test]
fn references_to_drafts_are_missing_for_public_render() {
    let conn = open_db_in_memory().unwrap();
    let author = register(&conn, "Ada", AuthorRole::Editor);
    post_service(&conn)
        .create_post(&author, &draft("Secret", GEOMETRY, PostStatus::Draft))
        .unwrap();
    let citing = publish(&conn, &author, "Citing", "See {{thm:secret/pyth}}.");

    let public = public_post_service(&conn).render_post(&citing);
    assert!(public.html.contains(
        "<a class=\"anchor-ref anchor-ref-missing\" href=\"/posts/secret\">secret/pyth</a>"
    ));
    assert_eq!(public.diagnostics[0].code, "missing_cross_reference");

    let private = post_service(&conn).render_post(&citing);
    assert!(private.html.contains("href=\"/posts/secret#thm-pyth\""));
}

#[test]
fn preview_renders_unsaved_markdown() {
    let conn = open_db_in_memory().unwrap();
    let rendered = post_service(&conn).preview("$$ x $$ {#eq:x}\n\nSee {{eq:x}}.", None);

    assert!(rendered.html.contains("id=\"eq-x\""));
    assert!(rendered.html.contains("href=\"#eq-x\">(1)</a>"));
    assert_eq!(rendered.anchors.len(), 1);
}

/// Anchor store whose writes always fail; reads go to SQLite.
struct UnwritableAnchors<'conn>(SqliteAnchorRepository<'conn>);

impl AnchorRepository for UnwritableAnchors<'_> {
    fn replace_post_anchors(&self, _post: PostId, _anchors: &[AnchorRecord]) -> RepoResult<()> {
        Err(RepoError::Conflict("post_anchors is read-only".to_string()))
    }

    fn list_post_anchors(&self, post: PostId) -> RepoResult<Vec<AnchorRecord>> {
        self.0.list_post_anchors(post)
    }

    fn find_anchor(
        &self,
        post_slug: &str,
        kind: AnchorKind,
        anchor_id: &str,
    ) -> RepoResult<Option<AnchorRecord>> {
        self.0.find_anchor(post_slug, kind, anchor_id)
    }
}

impl AnchorLookup for UnwritableAnchors<'_> {
    fn lookup(&self, post_slug: &str, kind: AnchorKind, anchor_id: &str) -> Option<AnchorRecord> {
        self.0.lookup(post_slug, kind, anchor_id)
    }
}

#[test]
fn failed_anchor_sync_does_not_fail_the_write() {
    let conn = open_db_in_memory().unwrap();
    let author = register(&conn, "Ada", AuthorRole::Editor);
    let service = PostService::new(
        SqlitePostRepository::try_new(&conn).unwrap(),
        UnwritableAnchors(SqliteAnchorRepository::try_new(&conn).unwrap()),
    );

    let created = service
        .create_post(&author, &draft("Geometry", GEOMETRY, PostStatus::Published))
        .unwrap();
    let stored = service.get_post(created.uuid, None).unwrap();
    assert_eq!(stored.content, GEOMETRY);
    assert!(service.list_anchors(created.uuid, None).unwrap().is_empty());

    let updated = service
        .update_post(
            &author,
            created.uuid,
            &draft("Geometry", "Revised {{eq:pyth}}.", PostStatus::Published),
        )
        .unwrap();
    assert_eq!(updated.content, "Revised {{eq:pyth}}.");
    assert_eq!(
        service.get_post(created.uuid, None).unwrap().content,
        "Revised {{eq:pyth}}."
    );
}
