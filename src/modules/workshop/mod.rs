//! The project workshop: form-driven generation of a programming project,
//! line-by-line explanation, viva questions, and a pair-programming panel,
//! plus the PDF download and session reset endpoints.

use axum::{
    Router,
    extract::{Form, Query, State},
    http::header,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use crate::{
    history::{self, PromptRecord},
    llm::GenerateRequest,
    pdf,
    web::{
        AppState,
        auth::{self, AuthUser},
        state::{PairExchange, Workspace},
        templates::{self, FlashQuery, escape_html, server_error},
    },
};

const DOWNLOAD_FILENAME: &str = "CodeCraft_Project.pdf";

const GENERATE_MAX_TOKENS: u32 = 4000;
const GENERATE_TEMPERATURE: f32 = 0.8;
const EXPLAIN_MAX_TOKENS: u32 = 2000;
const EXPLAIN_TEMPERATURE: f32 = 0.5;
const VIVA_MAX_TOKENS: u32 = 1000;
const VIVA_TEMPERATURE: f32 = 0.7;
const ASK_MAX_TOKENS: u32 = 2000;
const ASK_TEMPERATURE: f32 = 0.7;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/splash", get(splash_page))
        .route("/home", get(home_page).post(home_submit))
        .route("/download", get(download_project))
        .route("/reset-session", get(reset_session))
}

/// The four workflow actions submitted through the `action` form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Generate,
    Explain,
    Viva,
    Ask,
}

impl Action {
    /// Unknown values map to `None`; the request then renders without side
    /// effects.
    fn parse(value: &str) -> Option<Self> {
        match value {
            "generate" => Some(Action::Generate),
            "explain" => Some(Action::Explain),
            "viva" => Some(Action::Viva),
            "ask" => Some(Action::Ask),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct WorkshopForm {
    #[serde(default)]
    action: String,
    #[serde(default)]
    project_type: String,
    #[serde(default)]
    difficulty: String,
    #[serde(default)]
    language: String,
    #[serde(default)]
    topic: String,
    #[serde(default)]
    user_question: String,
    /// Hidden field carrying the previously rendered code, a continuity
    /// fallback for sessions whose workspace has not been populated yet.
    #[serde(default)]
    generated_code: String,
}

impl WorkshopForm {
    fn record(&self) -> PromptRecord {
        PromptRecord {
            project_type: self.project_type.clone(),
            difficulty: self.difficulty.clone(),
            language: self.language.clone(),
            topic: self.topic.clone(),
        }
    }
}

fn build_project_prompt(record: &PromptRecord) -> String {
    format!(
        "Generate a {} {} project in {}. Topic: {}. Include code, project report, and viva questions.",
        record.difficulty.to_lowercase(),
        record.project_type.to_lowercase(),
        record.language,
        record.topic,
    )
}

fn build_explain_prompt(language: &str, code: &str) -> String {
    format!(
        "Explain the following {language} code in a detailed, step-by-step manner, \
         but ONLY explain the code itself. Do NOT include introductions, summaries, or implementation steps. \
         Just break down the code and its logic line by line:\n\n{code}"
    )
}

fn build_viva_prompt(language: &str, code: &str) -> String {
    format!(
        "Generate important viva or oral exam questions based on the following {language} code:\n\n{code}"
    )
}

fn build_pair_prompt(language: &str, code: &str, question: &str) -> String {
    format!(
        "You are an expert {language} developer helping a user understand and improve their code.\n\
         The code is:\n{code}\n\n\
         User question/request: {question}\n\n\
         Answer clearly, helpfully, and FORMAT the response using markdown where appropriate."
    )
}

/// Install a fresh generation result: the new code replaces the old artifact
/// and the explanation, conversation history, and document start over.
fn install_generation(
    workspace: &mut Workspace,
    record: PromptRecord,
    code: String,
    document: Vec<u8>,
) {
    workspace.form = record;
    workspace.generated_code = code;
    workspace.explanation.clear();
    workspace.pair_history.clear();
    workspace.pdf = Some(document);
}

/// Append one question/answer pair to the session's conversation history.
fn record_exchange(workspace: &mut Workspace, question: String, answer: String) {
    workspace.pair_history.push(PairExchange { question, answer });
}

/// A generate action needs all four form fields; anything missing makes the
/// request a silent no-op.
fn generate_ready(record: &PromptRecord) -> bool {
    !record.project_type.trim().is_empty()
        && !record.difficulty.trim().is_empty()
        && !record.language.trim().is_empty()
        && !record.topic.trim().is_empty()
}

pub async fn splash_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(flash): Query<FlashQuery>,
) -> Response {
    let (_, user) = match auth::require_user(&state, &jar).await {
        Ok(pair) => pair,
        Err(redirect) => return redirect.into_response(),
    };

    let welcome = flash.status.as_deref() == Some("welcome");
    Html(templates::render_splash_page(&user.username, welcome)).into_response()
}

pub async fn home_page(State(state): State<AppState>, jar: CookieJar) -> Response {
    let (token, user) = match auth::require_user(&state, &jar).await {
        Ok(pair) => pair,
        Err(redirect) => return redirect.into_response(),
    };

    let workspace = state.workspace_snapshot(token).await;
    let form = WorkshopForm {
        project_type: workspace.form.project_type.clone(),
        difficulty: workspace.form.difficulty.clone(),
        language: workspace.form.language.clone(),
        topic: workspace.form.topic.clone(),
        ..WorkshopForm::default()
    };

    Html(render_workshop_page(
        &user,
        &form,
        &workspace.generated_code,
        &workspace.explanation,
        "",
        &workspace.pair_history,
    ))
    .into_response()
}

pub async fn home_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<WorkshopForm>,
) -> Response {
    let (token, user) = match auth::require_user(&state, &jar).await {
        Ok(pair) => pair,
        Err(redirect) => return redirect.into_response(),
    };

    // Seed the workspace from the hidden field when it carries code that the
    // server no longer holds for this session.
    if !form.generated_code.is_empty() {
        state
            .with_workspace(token, |workspace| {
                if workspace.generated_code.is_empty() {
                    workspace.generated_code = form.generated_code.clone();
                }
            })
            .await;
    }

    let mut viva_questions = String::new();

    match Action::parse(&form.action) {
        Some(Action::Generate) => {
            if let Err(response) = run_generate(&state, token, &user, &form).await {
                return response;
            }
        }
        Some(Action::Explain) => {
            if let Err(response) = run_explain(&state, token, &form).await {
                return response;
            }
        }
        Some(Action::Viva) => match run_viva(&state, token, &form).await {
            Ok(questions) => viva_questions = questions,
            Err(response) => return response,
        },
        Some(Action::Ask) => {
            if let Err(response) = run_ask(&state, token, &form).await {
                return response;
            }
        }
        None => {}
    }

    let workspace = state.workspace_snapshot(token).await;
    Html(render_workshop_page(
        &user,
        &form,
        &workspace.generated_code,
        &workspace.explanation,
        &viva_questions,
        &workspace.pair_history,
    ))
    .into_response()
}

async fn run_generate(
    state: &AppState,
    token: Uuid,
    user: &AuthUser,
    form: &WorkshopForm,
) -> Result<(), Response> {
    let record = form.record();
    if !generate_ready(&record) {
        return Ok(());
    }

    let prompt = build_project_prompt(&record);
    let response = state
        .llm_client()
        .execute(GenerateRequest::new(
            prompt,
            GENERATE_MAX_TOKENS,
            GENERATE_TEMPERATURE,
        ))
        .await
        .map_err(|err| {
            error!(?err, "project generation call failed");
            server_error().into_response()
        })?;

    let document = pdf::render_document(&response.text);

    state
        .with_workspace(token, |workspace| {
            install_generation(workspace, record.clone(), response.text.clone(), document);
        })
        .await;

    history::record_prompt(state.pool_ref(), &record, Some(&user.username))
        .await
        .map_err(|err| {
            error!(?err, "failed to record prompt log entry");
            server_error().into_response()
        })?;

    Ok(())
}

async fn run_explain(state: &AppState, token: Uuid, form: &WorkshopForm) -> Result<(), Response> {
    let code = state.workspace_snapshot(token).await.generated_code;
    if code.is_empty() {
        return Ok(());
    }

    let prompt = build_explain_prompt(&form.language, &code);
    let response = state
        .llm_client()
        .execute(GenerateRequest::new(
            prompt,
            EXPLAIN_MAX_TOKENS,
            EXPLAIN_TEMPERATURE,
        ))
        .await
        .map_err(|err| {
            error!(?err, "explanation call failed");
            server_error().into_response()
        })?;

    state
        .with_workspace(token, |workspace| {
            workspace.explanation = response.text;
        })
        .await;

    Ok(())
}

async fn run_viva(state: &AppState, token: Uuid, form: &WorkshopForm) -> Result<String, Response> {
    let code = state.workspace_snapshot(token).await.generated_code;
    if code.is_empty() {
        return Ok(String::new());
    }

    let prompt = build_viva_prompt(&form.language, &code);
    let response = state
        .llm_client()
        .execute(GenerateRequest::new(
            prompt,
            VIVA_MAX_TOKENS,
            VIVA_TEMPERATURE,
        ))
        .await
        .map_err(|err| {
            error!(?err, "viva question call failed");
            server_error().into_response()
        })?;

    // Viva questions are rendered once and never persisted.
    Ok(response.text)
}

async fn run_ask(state: &AppState, token: Uuid, form: &WorkshopForm) -> Result<(), Response> {
    let code = state.workspace_snapshot(token).await.generated_code;
    if code.is_empty() || form.user_question.is_empty() {
        return Ok(());
    }

    let prompt = build_pair_prompt(&form.language, &code, &form.user_question);
    let response = state
        .llm_client()
        .execute(GenerateRequest::new(prompt, ASK_MAX_TOKENS, ASK_TEMPERATURE))
        .await
        .map_err(|err| {
            error!(?err, "pair programming call failed");
            server_error().into_response()
        })?;

    state
        .with_workspace(token, |workspace| {
            record_exchange(workspace, form.user_question.clone(), response.text);
        })
        .await;

    Ok(())
}

pub async fn download_project(State(state): State<AppState>, jar: CookieJar) -> Response {
    let Some(token) = auth::session_token(&jar) else {
        return Redirect::to("/home").into_response();
    };

    let workspace = state.workspace_snapshot(token).await;
    match workspace.pdf {
        Some(bytes) => (
            [
                (header::CONTENT_TYPE, "application/pdf".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{DOWNLOAD_FILENAME}\""),
                ),
            ],
            bytes,
        )
            .into_response(),
        None => Redirect::to("/home").into_response(),
    }
}

/// Clears the session unconditionally and answers 200 regardless of prior
/// auth state.
pub async fn reset_session(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, &'static str) {
    let jar = auth::close_session(&state, jar).await;
    (jar, "Session cleared.")
}

fn render_workshop_page(
    user: &AuthUser,
    form: &WorkshopForm,
    generated_code: &str,
    explanation: &str,
    viva_questions: &str,
    pair_history: &[PairExchange],
) -> String {
    let footer = templates::render_footer();

    let code_section = if generated_code.is_empty() {
        String::new()
    } else {
        format!(
            r#"<section class="panel">
            <h2>Generated project</h2>
            <pre>{code}</pre>
            <a class="nav-link" href="/download">Download PDF</a>
        </section>"#,
            code = escape_html(generated_code),
        )
    };

    let explanation_section = if explanation.is_empty() {
        String::new()
    } else {
        format!(
            r#"<section class="panel">
            <h2>Explanation</h2>
            <pre>{explanation}</pre>
        </section>"#,
            explanation = escape_html(explanation),
        )
    };

    let viva_section = if viva_questions.is_empty() {
        String::new()
    } else {
        format!(
            r#"<section class="panel">
            <h2>Viva questions</h2>
            <pre>{viva}</pre>
        </section>"#,
            viva = escape_html(viva_questions),
        )
    };

    let history_items = pair_history
        .iter()
        .map(|exchange| {
            format!(
                r#"<div class="exchange"><p class="question">Q: {question}</p><pre>{answer}</pre></div>"#,
                question = escape_html(&exchange.question),
                answer = escape_html(&exchange.answer),
            )
        })
        .collect::<String>();

    let history_section = if history_items.is_empty() {
        String::new()
    } else {
        format!(
            r#"<section class="panel">
            <h2>Pair programming</h2>
            {history_items}
        </section>"#,
        )
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>CodeCraft AI — Workshop</title>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="robots" content="noindex,nofollow">
    <style>
{base_styles}
        .exchange .question {{ font-weight: 600; margin-bottom: 0.5rem; }}
        .actions {{ display: flex; flex-wrap: wrap; gap: 0.5rem; margin-top: 0.5rem; }}
    </style>
</head>
<body>
    <header>
        <div class="header-bar">
            <h1>CodeCraft AI</h1>
            <div style="display:flex; gap:0.75rem; align-items:center; flex-wrap:wrap;">
                <span>Signed in as {username}</span>
                <a class="nav-link" href="/user-logout">Log out</a>
            </div>
        </div>
    </header>
    <main>
        <form method="post" action="/home">
            <section class="panel">
                <h2>Project request</h2>
                <label for="project_type">Project type</label>
                <input id="project_type" name="project_type" value="{project_type}" placeholder="e.g. web scraper">
                <label for="difficulty">Difficulty</label>
                <select id="difficulty" name="difficulty">
                    <option value="" {sel_none}>Select difficulty</option>
                    <option value="Beginner" {sel_beginner}>Beginner</option>
                    <option value="Intermediate" {sel_intermediate}>Intermediate</option>
                    <option value="Advanced" {sel_advanced}>Advanced</option>
                </select>
                <label for="language">Language</label>
                <input id="language" name="language" value="{language}" placeholder="e.g. Python">
                <label for="topic">Topic</label>
                <input id="topic" name="topic" value="{topic}" placeholder="e.g. sorting">
                <input type="hidden" name="generated_code" value="{hidden_code}">
                <div class="actions">
                    <button type="submit" name="action" value="generate">Generate project</button>
                    <button type="submit" name="action" value="explain">Explain code</button>
                    <button type="submit" name="action" value="viva">Viva questions</button>
                </div>
            </section>
            <section class="panel">
                <h2>Ask the pair programmer</h2>
                <textarea name="user_question" rows="3" placeholder="Ask about the generated code...">{user_question}</textarea>
                <button type="submit" name="action" value="ask">Ask</button>
            </section>
        </form>
        {code_section}
        {explanation_section}
        {viva_section}
        {history_section}
        {footer}
    </main>
</body>
</html>"#,
        base_styles = templates::PAGE_BASE_STYLES,
        username = escape_html(&user.username),
        project_type = escape_html(&form.project_type),
        sel_none = selected(&form.difficulty, ""),
        sel_beginner = selected(&form.difficulty, "Beginner"),
        sel_intermediate = selected(&form.difficulty, "Intermediate"),
        sel_advanced = selected(&form.difficulty, "Advanced"),
        language = escape_html(&form.language),
        topic = escape_html(&form.topic),
        hidden_code = escape_html(generated_code),
        user_question = escape_html(&form.user_question),
        code_section = code_section,
        explanation_section = explanation_section,
        viva_section = viva_section,
        history_section = history_section,
        footer = footer,
    )
}

fn selected(current: &str, option: &str) -> &'static str {
    if current == option { "selected" } else { "" }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> PromptRecord {
        PromptRecord {
            project_type: "Web Scraper".to_string(),
            difficulty: "Beginner".to_string(),
            language: "Python".to_string(),
            topic: "sorting".to_string(),
        }
    }

    #[test]
    fn project_prompt_lowercases_type_and_difficulty() {
        let prompt = build_project_prompt(&sample_record());
        assert_eq!(
            prompt,
            "Generate a beginner web scraper project in Python. Topic: sorting. \
             Include code, project report, and viva questions."
        );
    }

    #[test]
    fn explain_prompt_forbids_preamble_and_embeds_code() {
        let prompt = build_explain_prompt("Python", "print('hi')");
        assert!(prompt.contains("ONLY explain the code itself"));
        assert!(prompt.contains("line by line"));
        assert!(prompt.ends_with("print('hi')"));
    }

    #[test]
    fn pair_prompt_combines_code_and_question() {
        let prompt = build_pair_prompt("Rust", "fn main() {}", "why main?");
        assert!(prompt.contains("expert Rust developer"));
        assert!(prompt.contains("fn main() {}"));
        assert!(prompt.contains("User question/request: why main?"));
        assert!(prompt.contains("markdown"));
    }

    #[test]
    fn unknown_actions_parse_to_none() {
        assert_eq!(Action::parse("generate"), Some(Action::Generate));
        assert_eq!(Action::parse("explain"), Some(Action::Explain));
        assert_eq!(Action::parse("viva"), Some(Action::Viva));
        assert_eq!(Action::parse("ask"), Some(Action::Ask));
        assert_eq!(Action::parse("delete-everything"), None);
        assert_eq!(Action::parse(""), None);
    }

    #[test]
    fn generate_requires_every_form_field() {
        assert!(generate_ready(&sample_record()));

        let mut missing_topic = sample_record();
        missing_topic.topic = String::new();
        assert!(!generate_ready(&missing_topic));

        let mut blank_language = sample_record();
        blank_language.language = "   ".to_string();
        assert!(!generate_ready(&blank_language));
    }

    #[test]
    fn consecutive_asks_accumulate_history_in_order() {
        let mut workspace = Workspace::default();
        workspace.generated_code = "fn main() {}".to_string();

        record_exchange(
            &mut workspace,
            "first question".to_string(),
            "first answer".to_string(),
        );
        record_exchange(
            &mut workspace,
            "second question".to_string(),
            "second answer".to_string(),
        );

        assert_eq!(workspace.pair_history.len(), 2);
        assert_eq!(workspace.pair_history[0].question, "first question");
        assert_eq!(workspace.pair_history[0].answer, "first answer");
        assert_eq!(workspace.pair_history[1].question, "second question");
        assert_eq!(workspace.pair_history[1].answer, "second answer");
    }

    #[test]
    fn new_generation_resets_explanation_history_and_document() {
        let mut workspace = Workspace::default();
        workspace.explanation = "stale explanation".to_string();
        record_exchange(&mut workspace, "q".to_string(), "a".to_string());

        install_generation(
            &mut workspace,
            sample_record(),
            "fresh code".to_string(),
            vec![0x25, 0x50],
        );

        assert_eq!(workspace.generated_code, "fresh code");
        assert!(workspace.explanation.is_empty());
        assert!(workspace.pair_history.is_empty());
        assert_eq!(workspace.pdf, Some(vec![0x25, 0x50]));
        assert_eq!(workspace.form, sample_record());
    }

    #[test]
    fn workshop_page_round_trips_code_through_hidden_field() {
        let user = AuthUser {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            is_admin: false,
        };
        let form = WorkshopForm::default();
        let page = render_workshop_page(&user, &form, "let x = 1;", "", "", &[]);
        assert!(page.contains(r#"name="generated_code" value="let x = 1;""#));
        assert!(page.contains("Signed in as alice"));
    }
}
