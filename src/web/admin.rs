use axum::{
    extract::State,
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::error;

use crate::history::{self, PromptLogEntry};
use crate::web::{
    AppState, auth,
    templates::{self, escape_html, server_error},
};

/// Full read of the prompt log, newest first. Gated on an admin session; no
/// pagination, the log is meant for low-volume inspection.
pub async fn dashboard(State(state): State<AppState>, jar: CookieJar) -> Response {
    if let Err(redirect) = auth::require_admin(&state, &jar).await {
        return redirect.into_response();
    }

    let prompts = match history::fetch_all_prompts(state.pool_ref()).await {
        Ok(prompts) => prompts,
        Err(err) => {
            error!(?err, "failed to load prompt log for admin view");
            return server_error().into_response();
        }
    };

    Html(render_dashboard(&prompts)).into_response()
}

fn render_dashboard(prompts: &[PromptLogEntry]) -> String {
    let rows = if prompts.is_empty() {
        r#"<tr><td colspan="6">No generation requests logged yet.</td></tr>"#.to_string()
    } else {
        prompts
            .iter()
            .map(|entry| {
                format!(
                    "<tr><td>{timestamp}</td><td>{project_type}</td><td>{difficulty}</td>\
                     <td>{language}</td><td>{topic}</td><td>{requested_by}</td></tr>",
                    timestamp = entry.created_at.format("%Y-%m-%d %H:%M:%S"),
                    project_type = escape_html(&entry.project_type),
                    difficulty = escape_html(&entry.difficulty),
                    language = escape_html(&entry.language),
                    topic = escape_html(&entry.topic),
                    requested_by = escape_html(entry.requested_by.as_deref().unwrap_or("-")),
                )
            })
            .collect::<String>()
    };

    let footer = templates::render_footer();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>CodeCraft Admin — Prompt log</title>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="robots" content="noindex,nofollow">
    <style>
{base_styles}
    </style>
</head>
<body>
    <header>
        <div class="header-bar">
            <h1>Prompt log</h1>
            <a class="nav-link" href="/logout">Sign out</a>
        </div>
    </header>
    <main>
        <section class="panel">
            <p>Every successful generation request, most recent first.</p>
            <table>
                <thead>
                    <tr><th>Timestamp</th><th>Project type</th><th>Difficulty</th><th>Language</th><th>Topic</th><th>Requested by</th></tr>
                </thead>
                <tbody>
                    {rows}
                </tbody>
            </table>
        </section>
        {footer}
    </main>
</body>
</html>"#,
        base_styles = templates::PAGE_BASE_STYLES,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn dashboard_escapes_logged_values() {
        let prompts = vec![PromptLogEntry {
            id: Uuid::new_v4(),
            project_type: "<script>".to_string(),
            difficulty: "Beginner".to_string(),
            language: "Python".to_string(),
            topic: "sorting".to_string(),
            requested_by: Some("alice".to_string()),
            created_at: Utc::now(),
        }];

        let page = render_dashboard(&prompts);
        assert!(page.contains("&lt;script&gt;"));
        assert!(!page.contains("<script>"));
        assert!(page.contains("alice"));
    }

    #[test]
    fn missing_requester_renders_plain_dash() {
        let prompts = vec![PromptLogEntry {
            id: Uuid::new_v4(),
            project_type: "Web Scraper".to_string(),
            difficulty: "Beginner".to_string(),
            language: "Python".to_string(),
            topic: "sorting".to_string(),
            requested_by: None,
            created_at: Utc::now(),
        }];

        let page = render_dashboard(&prompts);
        assert!(page.contains("<td>-</td>"));
    }

    #[test]
    fn empty_log_renders_placeholder_row() {
        let page = render_dashboard(&[]);
        assert!(page.contains("No generation requests logged yet."));
    }
}
