use crate::carousel::{Carousel, CarouselInput, CarouselView};
use crate::client::QueryClient;
use crate::controller::{
    CardSelection, ControllerError, RenderedResult, ResultController, TransportError,
};
use crate::language::{LangCode, LanguagePair, LanguageState, locale_from_accept_language};
use crate::render::{self, Fragment};
use crate::request::{SearchMode, SearchParams};
use crate::sanitize::escape_html;
use crate::store::{KeyValueStore, StoreError};
use askama::Template;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{ACCEPT_LANGUAGE, COOKIE, SET_COOKIE},
    },
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, warn};

type SharedState = Arc<AppState>;
const COOKIE_MAX_AGE_DAYS: i64 = 365;

pub struct AppState {
    pub client: QueryClient,
}

/// Class names shared by every page.
#[derive(Debug, Clone, Copy)]
struct Chrome {
    body_class: &'static str,
    main_class: &'static str,
    card_class: &'static str,
    eyebrow_class: &'static str,
    headline_class: &'static str,
    lede_class: &'static str,
    input_class: &'static str,
    button_class: &'static str,
}

const CHROME: Chrome = Chrome {
    body_class: "bg-slate-50 text-slate-900",
    main_class: "min-h-screen flex flex-col items-center py-10 px-4",
    card_class: "max-w-4xl w-full space-y-6",
    eyebrow_class: "uppercase tracking-wide text-sm text-slate-500",
    headline_class: "text-4xl font-extrabold tracking-tight",
    lede_class: "text-lg text-slate-600",
    input_class: "rounded-md border border-slate-300 px-3 py-2",
    button_class: "rounded-md bg-slate-900 px-4 py-2 text-white font-semibold",
};

const HEAD_TAGS: &str =
    r#"<script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>"#;

#[derive(Clone)]
pub struct WebConfig {
    pub addr: SocketAddr,
    pub upstream_url: String,
    pub timeout: Duration,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            upstream_url: "http://127.0.0.1:5000".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
pub enum WebError {
    Io(std::io::Error),
    Client(TransportError),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::Io(err) => write!(f, "io error: {err}"),
            WebError::Client(err) => write!(f, "client error: {err}"),
        }
    }
}

impl std::error::Error for WebError {}

impl From<std::io::Error> for WebError {
    fn from(value: std::io::Error) -> Self {
        WebError::Io(value)
    }
}

impl From<TransportError> for WebError {
    fn from(value: TransportError) -> Self {
        WebError::Client(value)
    }
}

pub async fn serve(config: WebConfig) -> Result<(), WebError> {
    let state = Arc::new(AppState {
        client: QueryClient::new(config.upstream_url.clone(), config.timeout)?,
    });
    let router = build_router(state);
    info!(
        %config.addr,
        upstream = %config.upstream_url,
        timeout_secs = config.timeout.as_secs(),
        "Binding HTTP listener"
    );
    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server exited");
    Ok(())
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = json!({ "error": self.message });
        (self.status, Json(payload)).into_response()
    }
}

fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/result", get(result_html))
        .route("/api/render", post(api_render))
        .route("/api/language", post(api_language))
        .route("/api/carousel", post(api_carousel))
        .route("/api/select", post(api_select))
        .route("/healthz", get(health))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CompressionLayer::new())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Browser cookies as a [`KeyValueStore`]. Writes are collected and turned
/// into `Set-Cookie` headers on the response.
#[derive(Debug, Default)]
pub struct CookieStore {
    values: BTreeMap<String, String>,
    changed: BTreeMap<String, String>,
}

impl CookieStore {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut values = BTreeMap::new();
        for header in headers.get_all(COOKIE) {
            let Ok(raw) = header.to_str() else {
                continue;
            };
            for cookie in Cookie::split_parse_encoded(raw).flatten() {
                values.insert(cookie.name().to_string(), cookie.value().to_string());
            }
        }
        Self {
            values,
            changed: BTreeMap::new(),
        }
    }

    pub fn set_cookie_headers(&self) -> Vec<HeaderValue> {
        self.changed
            .iter()
            .filter_map(|(name, value)| {
                let cookie = Cookie::build((name.clone(), value.clone()))
                    .path("/")
                    .same_site(SameSite::Lax)
                    .max_age(cookie::time::Duration::days(COOKIE_MAX_AGE_DAYS))
                    .build();
                HeaderValue::from_str(&cookie.encoded().to_string()).ok()
            })
            .collect()
    }

    fn apply_to(&self, response: &mut Response) {
        for value in self.set_cookie_headers() {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
}

impl KeyValueStore for CookieStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_string());
        self.changed.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

fn locale_hint(headers: &HeaderMap) -> Option<&'static str> {
    headers
        .get(ACCEPT_LANGUAGE)
        .and_then(|value| value.to_str().ok())
        .and_then(locale_from_accept_language)
        .map(LangCode::code)
}

async fn home(headers: HeaderMap) -> impl IntoResponse {
    let language = restore_language(&headers);
    let form = search_form(&SearchParams::default(), SearchMode::default(), language.pair());
    Html(render_home(&form))
}

fn restore_language(headers: &HeaderMap) -> LanguageState<CookieStore> {
    LanguageState::restore(CookieStore::from_headers(headers), locale_hint(headers))
}

fn render_home(form: &str) -> String {
    let chrome = CHROME;
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>AdapDict</title>
    {head_tags}
  </head>
  <body class="{body_class}">
    <main class="{main_class}">
      <div class="{card_class}">
        <div>
          <p class="{eyebrow_class}">AdapDict v{version}</p>
          <h1 class="{headline_class}">Look up a word, a sentence, or a whole paragraph.</h1>
          <p class="{lede_class}">Dictionary mode explains the text between your two languages. Encyclopedia mode explains the idea in your native language.</p>
        </div>
        {form}
      </div>
    </main>
  </body>
</html>"#,
        head_tags = HEAD_TAGS,
        body_class = chrome.body_class,
        main_class = chrome.main_class,
        card_class = chrome.card_class,
        eyebrow_class = chrome.eyebrow_class,
        headline_class = chrome.headline_class,
        lede_class = chrome.lede_class,
        version = env!("CARGO_PKG_VERSION"),
        form = form,
    )
}

fn search_form(params: &SearchParams, mode: SearchMode, pair: LanguagePair) -> String {
    let chrome = CHROME;
    let target_enabled = mode == SearchMode::Dictionary;
    let mode_options = [SearchMode::Dictionary, SearchMode::Encyclopedia]
        .iter()
        .map(|option| {
            format!(
                r#"<option value="{value}"{selected}>{option}</option>"#,
                value = option.query_value(),
                selected = if *option == mode { " selected" } else { "" },
            )
        })
        .collect::<String>();
    format!(
        r#"<form class="search-form" action="/result" method="get">
          <input type="hidden" name="education" value="{education}" />
          <input type="hidden" name="field" value="{field}" />
          <input class="{input_class}" type="text" name="query" value="{query}" placeholder="apple, 사과, Ich habe Hunger." />
          <select class="{input_class}" name="mode">{mode_options}</select>
          <select class="{input_class}" name="native_lang" aria-label="Native language">{native_options}</select>
          <select class="{input_class}" name="target_lang" aria-label="Target language"{disabled}>{target_options}</select>
          <button class="{button_class}" type="submit">Search</button>
        </form>"#,
        education = escape_html(&params.education),
        field = escape_html(&params.field),
        query = escape_html(&params.query),
        input_class = chrome.input_class,
        button_class = chrome.button_class,
        mode_options = mode_options,
        native_options = language_options(pair.native()),
        target_options = language_options(pair.target()),
        disabled = if target_enabled { "" } else { " disabled" },
    )
}

fn language_options(selected: LangCode) -> String {
    LangCode::ALL
        .iter()
        .map(|code| {
            format!(
                r#"<option value="{value}"{flag}>{name}</option>"#,
                value = code.code(),
                flag = if *code == selected { " selected" } else { "" },
                name = code.display_name(),
            )
        })
        .collect()
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "adapdict-web" }))
}

async fn result_html(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Response {
    let store = CookieStore::from_headers(&headers);
    let mut controller = ResultController::new(store, locale_hint(&headers), params);
    let request = match controller.begin_request() {
        Ok(request) => request,
        Err(ControllerError::EmptyQuery) => {
            let message = render::render_error_message("Query is empty.");
            let page = render_result_page(&controller, &message);
            return (StatusCode::BAD_REQUEST, Html(page)).into_response();
        }
        Err(err) => {
            let page = render_error_page(err.to_string());
            return (StatusCode::INTERNAL_SERVER_ERROR, Html(page)).into_response();
        }
    };
    let outcome = state.client.search(&request).await;
    let fragment = match controller.complete(outcome) {
        Ok(result) => fragment_of(result),
        Err(err) => {
            warn!(error = %err, "result controller rejected the response");
            render::render_transport_failure()
        }
    };
    Html(render_result_page(&controller, &fragment)).into_response()
}

fn fragment_of(result: &RenderedResult) -> Fragment {
    Fragment {
        html: result.html.clone(),
        card_count: result.card_count,
        carousels: result.carousels.clone(),
    }
}

fn render_result_page<S: KeyValueStore>(
    controller: &ResultController<S>,
    fragment: &Fragment,
) -> String {
    let params = controller.params();
    let shape = controller
        .result()
        .and_then(RenderedResult::shape)
        .map(|shape| shape.label().to_string())
        .unwrap_or_default();
    let template = ResultTemplate {
        chrome: CHROME,
        head_tags: HEAD_TAGS,
        query: &params.query,
        mode: controller.mode(),
        shape,
        form: search_form(params, controller.mode(), controller.language().pair()),
        result_html: &fragment.html,
        card_count: fragment.card_count,
        carousel_count: fragment.carousels.len(),
        script: RESULT_SCRIPT,
    };
    template
        .render()
        .unwrap_or_else(|err| render_error_page(err.to_string()))
}

#[derive(Debug, Deserialize)]
struct RenderPayload {
    #[serde(default)]
    mode: Option<String>,
    document: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct RenderResponsePayload {
    shape: String,
    html: String,
    card_count: usize,
    carousels: Vec<usize>,
}

async fn api_render(
    Json(payload): Json<RenderPayload>,
) -> Result<Json<RenderResponsePayload>, ApiError> {
    let mode = match payload.mode.as_deref().map(str::trim) {
        None | Some("") => SearchMode::default(),
        Some(raw) => SearchMode::parse(raw)
            .ok_or_else(|| ApiError::bad_request(format!("Unknown mode `{raw}`")))?,
    };
    let (shape, fragment) = crate::present(&payload.document, mode);
    Ok(Json(RenderResponsePayload {
        shape: shape.label().to_string(),
        html: fragment.html,
        card_count: fragment.card_count,
        carousels: fragment.carousels,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum LanguageAction {
    SetNative,
    SetTarget,
    Swap,
}

#[derive(Debug, Deserialize)]
struct LanguagePayload {
    action: LanguageAction,
    #[serde(default)]
    code: Option<String>,
}

async fn api_language(
    headers: HeaderMap,
    Json(payload): Json<LanguagePayload>,
) -> Result<Response, ApiError> {
    let mut language = restore_language(&headers);
    let pair = match payload.action {
        LanguageAction::SetNative => language.set_native(parse_code(payload.code.as_deref())?),
        LanguageAction::SetTarget => language.set_target(parse_code(payload.code.as_deref())?),
        LanguageAction::Swap => language.swap(),
    };
    let mut response = Json(pair).into_response();
    language.store().apply_to(&mut response);
    Ok(response)
}

fn parse_code(raw: Option<&str>) -> Result<LangCode, ApiError> {
    let raw = raw
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| ApiError::bad_request("Field `code` is required"))?;
    LangCode::parse(raw)
        .ok_or_else(|| ApiError::bad_request(format!("Unsupported language `{raw}`")))
}

#[derive(Debug, Deserialize)]
struct CarouselPayload {
    len: usize,
    #[serde(default)]
    index: usize,
    input: CarouselInput,
}

#[derive(Debug, Serialize)]
struct CarouselResponsePayload {
    index: usize,
    changed: bool,
    view: CarouselView,
}

/// Applies one page interaction to a carousel whose position the page keeps.
/// Inputs that name no valid page leave the position as it was.
async fn api_carousel(
    Json(payload): Json<CarouselPayload>,
) -> Result<Json<CarouselResponsePayload>, ApiError> {
    let mut carousel = Carousel::at(payload.len, payload.index).ok_or_else(|| {
        ApiError::bad_request(format!(
            "Page {} is outside a carousel of {}",
            payload.index, payload.len
        ))
    })?;
    let changed = carousel.apply(&payload.input).is_some();
    Ok(Json(CarouselResponsePayload {
        index: carousel.index(),
        changed,
        view: carousel.view(),
    }))
}

#[derive(Debug, Deserialize)]
struct SelectPayload {
    card_count: usize,
    #[serde(default)]
    selected: Option<usize>,
    #[serde(default)]
    card: Option<usize>,
}

async fn api_select(Json(payload): Json<SelectPayload>) -> Json<Value> {
    let mut selection = CardSelection::restore(payload.card_count, payload.selected);
    let selected = selection.select(payload.card);
    Json(json!({ "selected": selected }))
}

fn render_error_page(message: impl Into<String>) -> String {
    let chrome = CHROME;
    let message = escape_html(&message.into());
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>AdapDict • Error</title>
    {head_tags}
  </head>
  <body class="{body_class}">
    <main class="{main_class}">
      <div class="{card_class}">
        <h1 class="{headline_class}">Something went wrong</h1>
        <p class="{lede_class}">{message}</p>
        <a href="/" class="{button_class}">Back to search</a>
      </div>
    </main>
  </body>
</html>"#,
        head_tags = HEAD_TAGS,
        body_class = chrome.body_class,
        main_class = chrome.main_class,
        card_class = chrome.card_class,
        headline_class = chrome.headline_class,
        lede_class = chrome.lede_class,
        button_class = chrome.button_class,
        message = message,
    )
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>AdapDict • {{ query }}</title>
    {{ head_tags|safe }}
  </head>
  <body class="{{ chrome.body_class }}">
    <main class="{{ chrome.main_class }}">
      <div class="{{ chrome.card_class }}">
        <div>
          <p class="{{ chrome.eyebrow_class }}">
            {{ mode }}{% if !shape.is_empty() %} · {{ shape }}{% endif %}
          </p>
          <h1 class="{{ chrome.headline_class }}">{{ query }}</h1>
        </div>
        {{ form|safe }}
        <section id="results"
                 data-card-count="{{ card_count }}"
                 data-carousel-count="{{ carousel_count }}">
          {{ result_html|safe }}
        </section>
      </div>
    </main>
    <script>{{ script|safe }}</script>
  </body>
</html>"#,
    ext = "html"
)]
struct ResultTemplate<'a> {
    chrome: Chrome,
    head_tags: &'static str,
    query: &'a str,
    mode: SearchMode,
    shape: String,
    form: String,
    result_html: &'a str,
    card_count: usize,
    carousel_count: usize,
    script: &'static str,
}

/// Sends carousel and card clicks to `/api/carousel` and `/api/select` and
/// applies the returned flags.
const RESULT_SCRIPT: &str = r#"
(function () {
  const results = document.getElementById("results");
  if (!results) return;
  const post = (url, body) =>
    fetch(url, {
      method: "POST",
      headers: { "content-type": "application/json" },
      body: JSON.stringify(body),
    }).then((response) => (response.ok ? response.json() : null));

  const applyView = (carousel, reply) => {
    if (!reply) return;
    carousel.dataset.index = reply.index;
    carousel.querySelectorAll(".carousel-page").forEach((page, i) => {
      page.hidden = !reply.view.cards[i];
      page.classList.toggle("is-visible", reply.view.cards[i]);
    });
    carousel.querySelectorAll(".carousel-dot").forEach((dot, i) => {
      dot.classList.toggle("is-active", reply.view.indicators[i]);
    });
  };

  results.addEventListener("click", (event) => {
    const carousel = event.target.closest(".sentence-carousel");
    if (carousel) {
      const dot = event.target.closest(".carousel-dot");
      const track = carousel.querySelector(".carousel-track");
      const rect = track.getBoundingClientRect();
      const input = dot
        ? { action: "indicator", index: dot.dataset.index }
        : { action: "pointer", x: event.clientX - rect.left, width: rect.width };
      if (dot || track.contains(event.target)) {
        post("/api/carousel", {
          len: Number(carousel.dataset.cardCount),
          index: Number(carousel.dataset.index || 0),
          input: input,
        }).then((reply) => applyView(carousel, reply));
      }
    }
    const card = event.target.closest("[data-card-id]");
    const current = results.dataset.selected;
    post("/api/select", {
      card_count: Number(results.dataset.cardCount),
      selected: current === undefined ? null : Number(current),
      card: card ? Number(card.dataset.cardId) : null,
    }).then((reply) => {
      if (!reply || reply.selected === null) return;
      results.dataset.selected = reply.selected;
      results.querySelectorAll("[data-card-id]").forEach((el) => {
        el.classList.toggle("is-selected", Number(el.dataset.cardId) === reply.selected);
      });
    });
  });
})();
"#;
