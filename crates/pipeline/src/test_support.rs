//! In-process stand-ins for the OCR and parser services.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// An axum router served on an ephemeral local port, counting every request it receives.
pub(crate) struct StubUpstream {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl StubUpstream {
    pub(crate) async fn spawn(router: Router) -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = router.layer(middleware::from_fn_with_state(hits.clone(), count_hit));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { base_url: format!("http://{addr}"), hits, handle }
    }

    pub(crate) fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for StubUpstream {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn count_hit(State(hits): State<Arc<AtomicUsize>>, request: Request, next: Next) -> Response {
    hits.fetch_add(1, Ordering::SeqCst);
    next.run(request).await
}

/// Headers seen by a stub handler, in arrival order.
#[derive(Clone, Default)]
pub(crate) struct HeaderLog(Arc<Mutex<Vec<HeaderMap>>>);

impl HeaderLog {
    pub(crate) fn record(&self, headers: HeaderMap) {
        self.0.lock().unwrap().push(headers);
    }

    pub(crate) fn last(&self) -> Option<HeaderMap> {
        self.0.lock().unwrap().last().cloned()
    }
}

/// A base URL nothing listens on.
pub(crate) const CLOSED_PORT_URL: &str = "http://127.0.0.1:9";
