//! Session cookie middleware.
//!
//! Every request passes through [`resolve_session`], which maps the session
//! cookie to a participant (minting one when needed) and leaves the
//! [`ResolvedSession`] in the request extensions for handlers.

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use taskpulse_core::SessionToken;
use taskpulse_store::ResolvedSession;
use taskpulse_telemetry::JsMode;

use crate::metrics;
use crate::server::AppState;

/// Header set by the partial-update client library on its requests.
pub const HX_REQUEST: &str = "hx-request";

/// Resolve or mint the caller's session and set the cookie on new sessions.
pub async fn resolve_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let cookie_name = state.config.session_cookie.as_str();
    let presented = jar
        .get(cookie_name)
        .map(|cookie| SessionToken::from_raw(cookie.value()));
    let session = state.sessions.resolve_or_create(presented.as_ref());

    if session.created {
        metrics::observe_session_created(state.sessions.len());
    }

    let _ = request.extensions_mut().insert(session.clone());
    let response = next.run(request).await;

    if session.created {
        (jar.add(session_cookie(cookie_name, &session)), response).into_response()
    } else {
        response
    }
}

fn session_cookie(name: &str, session: &ResolvedSession) -> Cookie<'static> {
    Cookie::build((name.to_owned(), session.token.as_str().to_owned()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .build()
}

/// `on` iff the request carries `HX-Request: true` (value case-insensitive).
pub fn js_mode(headers: &HeaderMap) -> JsMode {
    headers
        .get(HX_REQUEST)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
        .into()
}
