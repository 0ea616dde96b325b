//! Observability - logging strutturato e contesto della richiesta
//!
//! Il contesto (request id, session id, ...) vive in un `task_local` per tutta la
//! durata della richiesta ed è replicato come campi di uno span `tracing`, così
//! ogni evento emesso durante la richiesta li eredita.

use crate::core::config::ObservabilitySettings;
use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use std::cell::RefCell;
use std::future::Future;
use tracing::{Instrument, Span, debug, info_span};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-api-request-id";

/// Installa il subscriber globale.
///
/// `RUST_LOG`, se presente, ha la precedenza sul livello configurato.
/// Restituisce false se un subscriber era già installato.
pub fn init_logging(settings: &ObservabilitySettings) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let output = if settings.console_logging {
        tracing_subscriber::fmt::layer().pretty().boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .try_init()
        .is_ok()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: String,
    pub session_id: Option<String>,
    pub transaction_id: Option<String>,
    pub connection_id: Option<String>,
}

tokio::task_local! {
    static REQUEST_CONTEXT: RefCell<RequestContext>;
    // span "request" che dichiara i campi del contesto
    static REQUEST_SPAN: Span;
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            ..Default::default()
        }
    }

    /// Esegue `future` con questo contesto attivo
    pub async fn scope<F: Future>(self, future: F) -> F::Output {
        REQUEST_CONTEXT.scope(RefCell::new(self), future).await
    }

    /// Come [`scope`](Self::scope), registrando gli aggiornamenti del contesto
    /// anche come campi di `span`
    pub async fn scope_in_span<F: Future>(self, span: Span, future: F) -> F::Output {
        REQUEST_SPAN
            .scope(span.clone(), REQUEST_CONTEXT.scope(RefCell::new(self), future))
            .instrument(span)
            .await
    }

    /// Copia del contesto attivo, se il task ne ha uno
    pub fn current() -> Option<RequestContext> {
        REQUEST_CONTEXT.try_with(|ctx| ctx.borrow().clone()).ok()
    }

    /// Aggiorna il contesto attivo; non fa nulla fuori da uno scope
    pub fn update(apply: impl FnOnce(&mut RequestContext)) {
        let _ = REQUEST_CONTEXT.try_with(|ctx| apply(&mut ctx.borrow_mut()));
    }
}

/// Associa una sessione di database al contesto e allo span correnti
pub fn bind_session(session_id: &str) {
    RequestContext::update(|ctx| ctx.session_id = Some(session_id.to_string()));
    // lo span corrente è di solito quello dell'handler, che non dichiara session_id
    let recorded = REQUEST_SPAN.try_with(|span| {
        span.record("session_id", session_id);
    });
    if recorded.is_err() {
        Span::current().record("session_id", session_id);
    }
    debug!(session_id, "Session bound to request context");
}

/// Identificativi per correlare log e tracce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceIds {
    pub request_id: Option<String>,
    pub span_id: Option<u64>,
}

pub fn current_trace_ids() -> TraceIds {
    TraceIds {
        request_id: RequestContext::current().map(|ctx| ctx.request_id),
        span_id: Span::current().id().map(|id| id.into_u64()),
    }
}

/// Middleware che assegna un request id, apre lo span della richiesta e
/// restituisce l'id nell'header `X-API-Request-ID`
pub async fn request_context_middleware(req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path(),
        session_id = tracing::field::Empty,
    );

    let mut response = RequestContext::new(request_id.clone())
        .scope_in_span(span, next.run(req))
        .await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tracing::field::{Field, Visit};
    use tracing::span::{Id, Record};
    use tracing::Subscriber;
    use tracing_subscriber::layer::Context;
    use tracing_subscriber::registry::LookupSpan;

    #[tokio::test]
    async fn test_context_is_visible_inside_scope_only() {
        assert!(RequestContext::current().is_none());

        let seen = RequestContext::new("req-1")
            .scope(async {
                bind_session("sess-1");
                RequestContext::current()
            })
            .await
            .unwrap();

        assert_eq!(seen.request_id, "req-1");
        assert_eq!(seen.session_id.as_deref(), Some("sess-1"));
        assert!(RequestContext::current().is_none());
    }

    #[tokio::test]
    async fn test_trace_ids_carry_request_id() {
        let ids = RequestContext::new("req-2")
            .scope(async { current_trace_ids() })
            .await;
        assert_eq!(ids.request_id.as_deref(), Some("req-2"));
    }

    /// Layer che raccoglie i campi registrati dopo la creazione di uno span
    #[derive(Clone, Default)]
    struct RecordedFields(Arc<Mutex<Vec<(String, String, String)>>>);

    struct FieldVisitor<'a> {
        span: &'a str,
        out: &'a mut Vec<(String, String, String)>,
    }

    impl Visit for FieldVisitor<'_> {
        fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
            self.out
                .push((self.span.to_string(), field.name().to_string(), format!("{:?}", value)));
        }

        fn record_str(&mut self, field: &Field, value: &str) {
            self.out
                .push((self.span.to_string(), field.name().to_string(), value.to_string()));
        }
    }

    impl<S> Layer<S> for RecordedFields
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
            let name = ctx.span(id).map(|span| span.name()).unwrap_or_default();
            let mut out = self.0.lock().unwrap();
            values.record(&mut FieldVisitor { span: name, out: &mut *out });
        }
    }

    #[tokio::test]
    async fn test_session_is_recorded_on_request_span() {
        let recorded = RecordedFields::default();
        let subscriber = tracing_subscriber::registry().with(recorded.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let request = info_span!("request", session_id = tracing::field::Empty);
        let handler = info_span!("handler", sub = "user-1");
        RequestContext::new("req-3")
            .scope_in_span(request, async { bind_session("sess-3") }.instrument(handler))
            .await;

        let fields = recorded.0.lock().unwrap();
        assert!(
            fields
                .iter()
                .any(|(span, name, value)| span == "request" && name == "session_id" && value == "sess-3"),
            "session_id not recorded on the request span: {:?}",
            *fields
        );
    }

    #[test]
    fn test_update_outside_scope_is_noop() {
        RequestContext::update(|ctx| ctx.request_id = "ignored".to_string());
        assert!(RequestContext::current().is_none());
    }
}
