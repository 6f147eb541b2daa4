//! Server-rendered post pages.
//!
//! Only published posts are served here, and cross-post references resolve
//! against published posts only. Math is typeset client-side with KaTeX and
//! plots are drawn with Plotly from their `data-plot` JSON.

use crate::api::post_service;
use crate::config::SiteConfig;
use crate::error::ApiError;
use crate::extract::ApiPath;
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use mindraxia_core::markdown::escape_html;
use mindraxia_core::model::post::Post;

const KATEX_VERSION: &str = "0.16.11";
const PLOTLY_SRC: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

pub fn routes() -> Router<AppState> {
    Router::new().route("/posts/{slug}", get(post_page))
}

async fn post_page(State(state): State<AppState>, ApiPath(slug): ApiPath<String>) -> Response {
    let result = state.with_conn(|conn| {
        let service = post_service(conn, None)?;
        let post = service.get_post_by_slug(&slug, None)?;
        let rendered = service.render_post(&post);
        Ok((post, rendered.html))
    });

    match result {
        Ok((post, body)) => Html(post_document(state.site(), &post, &body)).into_response(),
        Err(ApiError::NotFound(_)) => (
            StatusCode::NOT_FOUND,
            Html(not_found_document(state.site(), &slug)),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

fn post_document(site: &SiteConfig, post: &Post, body: &str) -> String {
    let title = escape_html(&post.title);
    let site_title = escape_html(&site.title);
    let canonical = if site.base_url.is_empty() {
        String::new()
    } else {
        format!(
            "<link rel=\"canonical\" href=\"{}/posts/{}\">",
            escape_html(site.base_url.trim_end_matches('/')),
            escape_html(&post.slug)
        )
    };
    let description = post
        .excerpt
        .as_deref()
        .map(|excerpt| format!("<meta name=\"description\" content=\"{}\">", escape_html(excerpt)))
        .unwrap_or_default();
    let tags = post
        .tags
        .iter()
        .map(|tag| format!("<li class=\"tag\">{}</li>", escape_html(tag)))
        .collect::<String>();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} · {site_title}</title>
{description}
{canonical}
<link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/katex@{KATEX_VERSION}/dist/katex.min.css">
<script defer src="https://cdn.jsdelivr.net/npm/katex@{KATEX_VERSION}/dist/katex.min.js"></script>
<script defer src="{PLOTLY_SRC}"></script>
</head>
<body>
<header><a href="/">{site_title}</a></header>
<main>
<article class="post">
<h1>{title}</h1>
<ul class="tags">{tags}</ul>
{body}
</article>
</main>
<script>
window.addEventListener("DOMContentLoaded", function () {{
  document.querySelectorAll(".math").forEach(function (el) {{
    katex.render(el.textContent, el, {{
      displayMode: el.classList.contains("math-display"),
      throwOnError: false
    }});
  }});
  document.querySelectorAll(".plot-canvas[data-plot]").forEach(function (el) {{
    var spec = JSON.parse(el.dataset.plot);
    Plotly.newPlot(el, spec.data || [], spec.layout || {{}});
  }});
}});
</script>
</body>
</html>
"#
    )
}

fn not_found_document(site: &SiteConfig, slug: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>Not found · {}</title></head>\n<body><h1>Not found</h1><p>No published post named <code>{}</code>.</p></body>\n</html>\n",
        escape_html(&site.title),
        escape_html(slug)
    )
}

#[cfg(test)]
mod tests {
    use super::post_document;
    use crate::config::SiteConfig;
    use mindraxia_core::model::post::{Post, PostStatus};
    use uuid::Uuid;

    #[test]
    fn document_escapes_title_and_links_canonical_url() {
        let post = Post {
            uuid: Uuid::new_v4(),
            title: "Sets <and> Maps".to_string(),
            slug: "sets-and-maps".to_string(),
            content: String::new(),
            excerpt: Some("Intro".to_string()),
            cover_image: None,
            author_uuid: Uuid::new_v4(),
            category_uuid: None,
            subcategory_uuid: None,
            status: PostStatus::Published,
            published_at: Some(1),
            created_at: 1,
            updated_at: 1,
            tags: vec!["math".to_string()],
        };
        let site = SiteConfig {
            title: "Blog".to_string(),
            base_url: "https://example.org/".to_string(),
        };

        let html = post_document(&site, &post, "<p>body</p>");
        assert!(html.contains("<h1>Sets &lt;and&gt; Maps</h1>"));
        assert!(html.contains("href=\"https://example.org/posts/sets-and-maps\""));
        assert!(html.contains("<li class=\"tag\">math</li>"));
        assert!(html.contains("<p>body</p>"));
    }
}
