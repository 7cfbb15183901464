// The HTTP capability the client sits on. A transport reports each request's
// outcome through a `Reply`, which delivers to the waiting caller exactly once.

use crate::config::Config;
use crate::error::{ClientError, Result};
use log::{debug, warn};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    /// Absolute path including the API prefix and query string
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Status plus the fully accumulated body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

type Callback = Box<dyn FnOnce(Result<HttpResponse>) + Send>;

struct Completion {
    done: AtomicBool,
    callback: Mutex<Option<Callback>>,
}

impl Drop for Completion {
    // A transport that loses the request without reporting still completes it.
    fn drop(&mut self) {
        if *self.done.get_mut() {
            return;
        }
        let callback = match self.callback.get_mut() {
            Ok(slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(callback) = callback {
            warn!("Request dropped by transport without a response");
            callback(Err(ClientError::Transport(
                "request dropped without a response".to_string(),
            )));
        }
    }
}

/// Single-resolution completion handle for one request. Clones share the
/// same guard: the first `complete` wins and every later one is ignored.
#[derive(Clone)]
pub struct Reply {
    inner: Arc<Completion>,
}

impl Reply {
    pub fn new<F>(callback: F) -> Reply
    where
        F: FnOnce(Result<HttpResponse>) + Send + 'static,
    {
        Reply {
            inner: Arc::new(Completion {
                done: AtomicBool::new(false),
                callback: Mutex::new(Some(Box::new(callback))),
            }),
        }
    }

    /// Returns false when the request had already completed.
    pub fn complete(&self, result: Result<HttpResponse>) -> bool {
        if self.inner.done.swap(true, Ordering::AcqRel) {
            debug!("Ignoring late completion");
            return false;
        }
        let callback = match self.inner.callback.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(callback) = callback {
            callback(result);
        }
        true
    }

    pub fn response(&self, response: HttpResponse) -> bool {
        self.complete(Ok(response))
    }

    pub fn error(&self, err: ClientError) -> bool {
        self.complete(Err(err))
    }

    pub fn is_complete(&self) -> bool {
        self.inner.done.load(Ordering::Acquire)
    }
}

/// Sends requests to the service. Implementations must be safe to share
/// between concurrent independent requests.
pub trait Transport: Send + Sync {
    fn dispatch(&self, request: HttpRequest, reply: Reply);
}

/// Blocking `reqwest` transport, one exchange per call
pub struct HttpTransport {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<HttpTransport> {
        let client = reqwest::blocking::ClientBuilder::new()
            .timeout(config.timeout())
            .build()?;
        Ok(HttpTransport {
            base_url: config.base_url(),
            client,
        })
    }

    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send()?;
        let status = response.status().as_u16();
        let body = response.bytes()?.to_vec();
        Ok(HttpResponse { status, body })
    }
}

impl Transport for HttpTransport {
    fn dispatch(&self, request: HttpRequest, reply: Reply) {
        reply.complete(self.execute(&request));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_reply() -> (Reply, Arc<AtomicUsize>, Arc<Mutex<Option<bool>>>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let outcome = Arc::new(Mutex::new(None));
        let (c, o) = (Arc::clone(&calls), Arc::clone(&outcome));
        let reply = Reply::new(move |result| {
            c.fetch_add(1, Ordering::SeqCst);
            *o.lock().unwrap() = Some(result.is_ok());
        });
        (reply, calls, outcome)
    }

    #[test]
    fn test_first_completion_wins() {
        let (reply, calls, outcome) = counting_reply();
        assert!(reply.error(ClientError::Transport("reset".to_string())));
        assert!(!reply.response(HttpResponse {
            status: 200,
            body: b"{}".to_vec(),
        }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*outcome.lock().unwrap(), Some(false));
    }

    #[test]
    fn test_racing_threads_complete_once() {
        let (reply, calls, _) = counting_reply();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let reply = reply.clone();
                std::thread::spawn(move || {
                    if i % 2 == 0 {
                        reply.error(ClientError::Transport("boom".to_string()))
                    } else {
                        reply.response(HttpResponse {
                            status: 200,
                            body: Vec::new(),
                        })
                    }
                })
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dropped_reply_reports_transport_error() {
        let (reply, calls, outcome) = counting_reply();
        drop(reply);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*outcome.lock().unwrap(), Some(false));
    }

    #[test]
    fn test_completed_reply_does_not_fire_on_drop() {
        let (reply, calls, _) = counting_reply();
        reply.response(HttpResponse {
            status: 204,
            body: Vec::new(),
        });
        assert!(reply.is_complete());
        drop(reply);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_header_lookup_ignores_case() {
        let request = HttpRequest {
            method: Method::Get,
            path: "/v1/".to_string(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: None,
        };
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.header("X-Proof-Of-Work"), None);
    }
}
