use axum::http::StatusCode;
use axum::response::Html;
use chrono::{Datelike, Utc};
use rand_core::{OsRng, RngCore};
use serde::Deserialize;

/// Base styles shared by the workshop and admin pages.
pub const PAGE_BASE_STYLES: &str = r#"
        :root { color-scheme: light; }
        body { font-family: "Helvetica Neue", Arial, sans-serif; margin: 0; background: #f8fafc; color: #0f172a; }
        header { background: #ffffff; padding: 2rem 1.5rem; border-bottom: 1px solid #e2e8f0; }
        .header-bar { display: flex; justify-content: space-between; align-items: center; flex-wrap: wrap; gap: 1rem; }
        .header-bar h1 { margin: 0; }
        .nav-link { display: inline-flex; align-items: center; gap: 0.4rem; color: #1d4ed8; text-decoration: none; font-weight: 600; background: #e0f2fe; padding: 0.5rem 0.95rem; border-radius: 999px; border: 1px solid #bfdbfe; }
        .nav-link:hover { background: #bfdbfe; border-color: #93c5fd; }
        main { padding: 2rem 1.5rem; max-width: 960px; margin: 0 auto; box-sizing: border-box; }
        .panel { background: #ffffff; border-radius: 12px; border: 1px solid #e2e8f0; padding: 1.5rem; box-shadow: 0 18px 40px rgba(15, 23, 42, 0.08); margin-bottom: 2rem; }
        .panel h2 { margin-top: 0; }
        label { display: block; margin-bottom: 0.5rem; font-weight: 600; color: #0f172a; }
        input, select, textarea { width: 100%; padding: 0.75rem; border-radius: 8px; border: 1px solid #cbd5f5; background: #f8fafc; color: #0f172a; box-sizing: border-box; margin-bottom: 1rem; font-size: 1rem; }
        input:focus, select:focus, textarea:focus { outline: none; border-color: #2563eb; box-shadow: 0 0 0 3px rgba(37, 99, 235, 0.12); }
        button { padding: 0.85rem 1.2rem; border: none; border-radius: 8px; background: #2563eb; color: #ffffff; font-weight: 600; cursor: pointer; margin-right: 0.5rem; }
        button:hover { background: #1d4ed8; }
        pre { background: #0f172a; color: #e2e8f0; padding: 1.25rem; border-radius: 12px; overflow-x: auto; font-size: 0.9rem; line-height: 1.5; white-space: pre-wrap; }
        table { width: 100%; border-collapse: collapse; margin-top: 1.5rem; background: #ffffff; border: 1px solid #e2e8f0; border-radius: 12px; overflow: hidden; }
        th, td { padding: 0.75rem 1rem; border-bottom: 1px solid #e2e8f0; text-align: left; }
        th { background: #f1f5f9; color: #0f172a; font-weight: 600; }
        .flash { padding: 1rem 1.25rem; border-radius: 10px; margin-bottom: 1.5rem; font-weight: 600; border: 1px solid transparent; }
        .flash.success { background: #ecfdf3; border-color: #bbf7d0; color: #166534; }
        .flash.error { background: #fef2f2; border-color: #fecaca; color: #b91c1c; }
        .app-footer { margin-top: 3rem; text-align: center; font-size: 0.85rem; color: #94a3b8; }
"#;

const AUTH_PAGE_STYLES: &str = r#"
        :root { color-scheme: light; }
        body { font-family: "Helvetica Neue", Arial, sans-serif; display: flex; flex-direction: column; align-items: center; justify-content: center; min-height: 100vh; margin: 0; background: #0f172a; color: #0f172a; padding: 1.5rem; box-sizing: border-box; gap: 1.5rem; overflow: hidden; }
        main { width: 100%; max-width: 480px; display: flex; flex-direction: column; align-items: center; gap: 1.5rem; z-index: 1; }
        .panel { background: #ffffff; padding: 2.5rem 2.25rem; border-radius: 18px; box-shadow: 0 20px 60px rgba(15, 23, 42, 0.35); width: 100%; border: 1px solid #e2e8f0; box-sizing: border-box; }
        h1 { margin: 0 0 1rem; font-size: 1.8rem; text-align: center; }
        p.description { margin: 0 0 1.75rem; color: #475569; text-align: center; font-size: 0.95rem; }
        label { display: block; margin-top: 1.2rem; font-weight: 600; letter-spacing: 0.01em; color: #0f172a; }
        input { width: 100%; padding: 0.85rem; margin-top: 0.65rem; border-radius: 10px; border: 1px solid #cbd5f5; background: #f8fafc; color: #0f172a; font-size: 1rem; box-sizing: border-box; }
        input:focus { outline: none; border-color: #2563eb; box-shadow: 0 0 0 3px rgba(37, 99, 235, 0.15); }
        button { margin-top: 2rem; width: 100%; padding: 0.95rem; border: none; border-radius: 10px; background: #2563eb; color: #ffffff; font-weight: 600; font-size: 1.05rem; cursor: pointer; }
        button:hover { background: #1d4ed8; }
        .flash { padding: 0.85rem 1rem; border-radius: 10px; margin-bottom: 1rem; font-weight: 600; border: 1px solid transparent; font-size: 0.95rem; }
        .flash.success { background: #ecfdf3; border-color: #bbf7d0; color: #166534; }
        .flash.error { background: #fef2f2; border-color: #fecaca; color: #b91c1c; }
        .switch-link { margin-top: 1.5rem; text-align: center; font-size: 0.95rem; }
        .switch-link a { color: #2563eb; text-decoration: none; font-weight: 600; }
        .code-backdrop { position: fixed; inset: 0; pointer-events: none; z-index: 0; }
        .code-backdrop span { position: absolute; color: rgba(148, 163, 184, 0.25); font-family: "Courier New", monospace; font-size: 0.85rem; white-space: nowrap; }
        .app-footer { margin-top: 2.5rem; text-align: center; font-size: 0.85rem; color: #64748b; z-index: 1; }
"#;

/// Decorative snippets scattered behind the auth panels.
const CODE_SAMPLES: &[&str] = &[
    "import numpy as np",
    "from sklearn.model_selection import train_test_split",
    "def train(model, data):",
    "    model.fit(data)",
    "print(\"Hello, AI!\")",
    "X = df[['feature1', 'feature2']]",
    "y = df['target']",
    "model.predict(new_data)",
    "plt.plot(x, y)",
    "torch.nn.ReLU()",
    "input().split()",
    "class Project:",
    "    def __init__(self):",
    "    def generate_code(self):",
    "json.loads(response)",
    "requests.get(url)",
];

/// Flash messages travel as query parameters rather than server-side state.
#[derive(Debug, Default, Deserialize)]
pub struct FlashQuery {
    pub status: Option<String>,
    pub error: Option<String>,
}

pub fn compose_flash(flash: &FlashQuery) -> String {
    let mut blocks = String::new();

    if let Some(status) = flash.status.as_deref() {
        let message = match status {
            "registered" => Some("Registration successful! Please log in."),
            "logged_out" => Some("You've been logged out."),
            _ => None,
        };
        if let Some(message) = message {
            blocks.push_str(&format!(r#"<div class="flash success">{message}</div>"#));
        }
    }

    if let Some(error) = flash.error.as_deref() {
        let message = match error {
            "duplicate" => Some("Username already exists."),
            "not_found" => Some("User not found. Please register first."),
            "bad_credentials" => Some("Invalid password or corrupted account. Please re-register."),
            "invalid" => Some("Invalid admin credentials."),
            _ => None,
        };
        if let Some(message) = message {
            blocks.push_str(&format!(r#"<div class="flash error">{message}</div>"#));
        }
    }

    blocks
}

fn render_code_backdrop() -> String {
    let mut rng = OsRng;
    let spans = (0..30)
        .map(|_| {
            let top = rng.next_u32() % 101;
            let left = rng.next_u32() % 101;
            let snippet = CODE_SAMPLES[rng.next_u32() as usize % CODE_SAMPLES.len()];
            format!(
                r#"<span style="top:{top}%;left:{left}%;">{snippet}</span>"#,
                snippet = escape_html(snippet),
            )
        })
        .collect::<String>();

    format!(r#"<div class="code-backdrop">{spans}</div>"#)
}

fn render_auth_page(
    title: &str,
    description: &str,
    action: &str,
    submit_label: &str,
    flash_html: &str,
    switch_html: &str,
) -> String {
    let backdrop = render_code_backdrop();
    let footer = render_footer();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>CodeCraft AI</title>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="robots" content="noindex,nofollow">
    <style>
{AUTH_PAGE_STYLES}
    </style>
</head>
<body>
    {backdrop}
    <main>
        <section class="panel">
            <h1>{title}</h1>
            <p class="description">{description}</p>
            {flash_html}
            <form method="post" action="{action}">
                <label for="username">Username</label>
                <input id="username" name="username" required>
                <label for="password">Password</label>
                <input id="password" type="password" name="password" required>
                <button type="submit">{submit_label}</button>
            </form>
            {switch_html}
        </section>
        {footer}
    </main>
</body>
</html>"#,
    )
}

pub fn render_register_page(flash: &FlashQuery) -> String {
    render_auth_page(
        "Join CodeCraft AI",
        "Create an account to start generating programming projects.",
        "/user-register",
        "Register",
        &compose_flash(flash),
        r#"<p class="switch-link">Already registered? <a href="/user-login">Log in</a></p>"#,
    )
}

pub fn render_user_login_page(flash: &FlashQuery) -> String {
    render_auth_page(
        "CodeCraft AI",
        "Log in to continue building your project.",
        "/user-login",
        "Log in",
        &compose_flash(flash),
        r#"<p class="switch-link">New here? <a href="/user-register">Register</a></p>"#,
    )
}

pub fn render_admin_login_page(flash: &FlashQuery) -> String {
    render_auth_page(
        "CodeCraft Admin",
        "Sign in with an administrator account to inspect the prompt log.",
        "/login",
        "Sign in",
        &compose_flash(flash),
        "",
    )
}

pub fn render_splash_page(username: &str, welcome: bool) -> String {
    let greeting = if welcome {
        format!(
            r#"<div class="flash success">Welcome back, {}!</div>"#,
            escape_html(username)
        )
    } else {
        String::new()
    };
    let footer = render_footer();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>CodeCraft AI</title>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="robots" content="noindex,nofollow">
    <style>
{PAGE_BASE_STYLES}
        .splash {{ text-align: center; padding: 4rem 1.5rem; }}
        .splash h1 {{ font-size: 2.4rem; margin-bottom: 1rem; }}
        .splash p {{ color: #475569; margin-bottom: 2.5rem; }}
        .splash a.start {{ background: #2563eb; color: #ffffff; padding: 1rem 2.2rem; border-radius: 999px; text-decoration: none; font-weight: 600; font-size: 1.1rem; }}
        .splash a.start:hover {{ background: #1d4ed8; }}
    </style>
</head>
<body>
    <main>
        {greeting}
        <section class="panel splash">
            <h1>CodeCraft AI</h1>
            <p>Generate complete programming projects with code, report, and viva questions.</p>
            <a class="start" href="/home">Start building →</a>
        </section>
        <p style="text-align:center;"><a class="nav-link" href="/user-logout">Log out</a></p>
        {footer}
    </main>
</body>
</html>"#,
    )
}

pub fn render_footer() -> String {
    let current_year = Utc::now().year();
    format!(r#"<footer class="app-footer">© {current_year} CodeCraft AI</footer>"#)
}

pub fn server_error() -> (StatusCode, Html<String>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html("<h1>Server error</h1><p>Something went wrong. Please try again later.</p>".to_string()),
    )
}

pub fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_html_covers_delimiters() {
        assert_eq!(
            escape_html(r#"<a href="x">&'"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;"
        );
    }

    #[test]
    fn flash_maps_known_codes() {
        let flash = FlashQuery {
            status: Some("registered".to_string()),
            error: Some("duplicate".to_string()),
        };
        let html = compose_flash(&flash);
        assert!(html.contains("Registration successful"));
        assert!(html.contains("Username already exists."));
    }

    #[test]
    fn flash_ignores_unknown_codes() {
        let flash = FlashQuery {
            status: Some("nonsense".to_string()),
            error: None,
        };
        assert!(compose_flash(&flash).is_empty());
    }
}
