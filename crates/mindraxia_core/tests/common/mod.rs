#![allow(dead_code)]

use mindraxia_core::model::author::{Author, AuthorRole};
use mindraxia_core::model::post::{Post, PostDraft, PostStatus};
use mindraxia_core::repo::anchor_repo::SqliteAnchorRepository;
use mindraxia_core::repo::author_repo::SqliteAuthorRepository;
use mindraxia_core::repo::post_repo::SqlitePostRepository;
use mindraxia_core::service::author_service::AuthorService;
use mindraxia_core::service::post_service::PostService;
use rusqlite::Connection;

pub fn register(conn: &Connection, name: &str, role: AuthorRole) -> Author {
    let service = AuthorService::new(SqliteAuthorRepository::try_new(conn).unwrap());
    service
        .register_author(name, &format!("{}@example.org", name.to_lowercase()), role)
        .unwrap()
        .author
}

pub fn post_service(
    conn: &Connection,
) -> PostService<SqlitePostRepository<'_>, SqliteAnchorRepository<'_>> {
    PostService::new(
        SqlitePostRepository::try_new(conn).unwrap(),
        SqliteAnchorRepository::try_new(conn).unwrap().with_drafts(),
    )
}

pub fn public_post_service(
    conn: &Connection,
) -> PostService<SqlitePostRepository<'_>, SqliteAnchorRepository<'_>> {
    PostService::new(
        SqlitePostRepository::try_new(conn).unwrap(),
        SqliteAnchorRepository::try_new(conn).unwrap(),
    )
}

pub fn draft(title: &str, content: &str, status: PostStatus) -> PostDraft {
    PostDraft {
        title: title.to_string(),
        content: content.to_string(),
        status,
        ..PostDraft::default()
    }
}

pub fn publish(conn: &Connection, author: &Author, title: &str, content: &str) -> Post {
    post_service(conn)
        .create_post(author, &draft(title, content, PostStatus::Published))
        .unwrap()
}
