mod common;

use common::{draft, post_service, register};
use mindraxia_core::model::author::AuthorRole;
use mindraxia_core::model::post::{PostDraft, PostStatus};
use mindraxia_core::model::taxonomy::CategoryDraft;
use mindraxia_core::open_db_in_memory;
use mindraxia_core::repo::taxonomy_repo::SqliteTaxonomyRepository;
use mindraxia_core::service::taxonomy_service::TaxonomyService;
use mindraxia_core::ServiceError;

#[test]
fn category_writes_are_admin_only() {
    let conn = open_db_in_memory().unwrap();
    let editor = register(&conn, "Ed", AuthorRole::Editor);
    let service = TaxonomyService::new(SqliteTaxonomyRepository::try_new(&conn).unwrap());

    let err = service
        .create_category(&editor, &named("Mathematics"))
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
    assert!(service.list_categories().unwrap().is_empty());
}

#[test]
fn categories_are_listed_by_name_with_unique_slugs() {
    let conn = open_db_in_memory().unwrap();
    let admin = register(&conn, "Admin", AuthorRole::Admin);
    let service = TaxonomyService::new(SqliteTaxonomyRepository::try_new(&conn).unwrap());

    service.create_category(&admin, &named("Physics")).unwrap();
    let math = service.create_category(&admin, &named("Mathematics")).unwrap();
    assert_eq!(math.slug, "mathematics");

    let names: Vec<_> = service
        .list_categories()
        .unwrap()
        .into_iter()
        .map(|category| category.name)
        .collect();
    assert_eq!(names, vec!["Mathematics", "Physics"]);

    let err = service.create_category(&admin, &named("mathematics")).unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    let renamed = service
        .update_category(
            &admin,
            math.uuid,
            &CategoryDraft {
                name: "Pure Mathematics".to_string(),
                slug: Some("pure-math".to_string()),
                description: Some("Proofs".to_string()),
            },
        )
        .unwrap();
    assert_eq!(renamed.slug, "pure-math");
    assert_eq!(renamed.description.as_deref(), Some("Proofs"));
}

#[test]
fn subcategory_slugs_are_unique_per_category() {
    let conn = open_db_in_memory().unwrap();
    let admin = register(&conn, "Admin", AuthorRole::Admin);
    let service = TaxonomyService::new(SqliteTaxonomyRepository::try_new(&conn).unwrap());
    let math = service.create_category(&admin, &named("Mathematics")).unwrap();
    let physics = service.create_category(&admin, &named("Physics")).unwrap();

    service
        .create_subcategory(&admin, math.uuid, &named("Foundations"))
        .unwrap();
    service
        .create_subcategory(&admin, physics.uuid, &named("Foundations"))
        .unwrap();
    let err = service
        .create_subcategory(&admin, math.uuid, &named("Foundations"))
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    let missing = service
        .create_subcategory(&admin, uuid::Uuid::new_v4(), &named("Orphan"))
        .unwrap_err();
    assert!(matches!(
        missing,
        ServiceError::NotFound {
            entity: "category",
            ..
        }
    ));

    let detail = service.get_category(math.uuid).unwrap();
    assert_eq!(detail.category.uuid, math.uuid);
    assert_eq!(detail.subcategories.len(), 1);
    assert_eq!(detail.subcategories[0].slug, "foundations");
}

#[test]
fn deleting_category_cascades_subcategories_and_detaches_posts() {
    let conn = open_db_in_memory().unwrap();
    let admin = register(&conn, "Admin", AuthorRole::Admin);
    let service = TaxonomyService::new(SqliteTaxonomyRepository::try_new(&conn).unwrap());
    let math = service.create_category(&admin, &named("Mathematics")).unwrap();
    let algebra = service
        .create_subcategory(&admin, math.uuid, &named("Algebra"))
        .unwrap();

    let posts = post_service(&conn);
    let post = posts
        .create_post(
            &admin,
            &PostDraft {
                category_uuid: Some(math.uuid),
                subcategory_uuid: Some(algebra.uuid),
                ..draft("Groups", "body", PostStatus::Published)
            },
        )
        .unwrap();

    service.delete_category(&admin, math.uuid).unwrap();

    assert!(matches!(
        service.get_category(math.uuid).unwrap_err(),
        ServiceError::NotFound { .. }
    ));
    let subcategories: i64 = conn
        .query_row("SELECT COUNT(*) FROM subcategories;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(subcategories, 0);

    let detached = posts.get_post(post.uuid, None).unwrap();
    assert_eq!(detached.category_uuid, None);
    assert_eq!(detached.subcategory_uuid, None);
}

#[test]
fn tags_report_post_counts_and_can_be_deleted() {
    let conn = open_db_in_memory().unwrap();
    let admin = register(&conn, "Admin", AuthorRole::Admin);
    let posts = post_service(&conn);
    for (title, tags) in [("One", vec!["rust", "math"]), ("Two", vec!["math"])] {
        posts
            .create_post(
                &admin,
                &PostDraft {
                    tags: Some(tags.into_iter().map(str::to_string).collect()),
                    ..draft(title, "body", PostStatus::Published)
                },
            )
            .unwrap();
    }
    let service = TaxonomyService::new(SqliteTaxonomyRepository::try_new(&conn).unwrap());

    let tags = service.list_tags().unwrap();
    let counts: Vec<_> = tags
        .iter()
        .map(|tag| (tag.name.as_str(), tag.post_count))
        .collect();
    assert_eq!(counts, vec![("math", 2), ("rust", 1)]);

    let math = tags.iter().find(|tag| tag.name == "math").unwrap();
    service.delete_tag(&admin, math.id).unwrap();

    let remaining: Vec<_> = service
        .list_tags()
        .unwrap()
        .into_iter()
        .map(|tag| tag.name)
        .collect();
    assert_eq!(remaining, vec!["rust"]);
    let one = posts.get_post_by_slug("one", None).unwrap();
    assert_eq!(one.tags, vec!["rust"]);
}

fn named(name: &str) -> CategoryDraft {
    CategoryDraft {
        name: name.to_string(),
        ..CategoryDraft::default()
    }
}
