#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use dhartirakshak::client::DhartiClient;
use dhartirakshak_common::http_client::HttpClient;
use http::{Method, Request, Response as HttpResponse};
use serde_json::Value;
use tokio::sync::Mutex;

struct Route {
    method: Method,
    path: String,
    delay: Duration,
    responses: VecDeque<HttpResponse<Vec<u8>>>,
}

#[derive(Clone, Default)]
pub struct MockClient {
    // Responses popped in order when no route matches
    queue: Arc<Mutex<VecDeque<HttpResponse<Vec<u8>>>>>,
    // Responses keyed by method and path, for interleaved requests
    routes: Arc<Mutex<Vec<Route>>>,
    // Capture requests for assertions
    log: Arc<Mutex<Vec<Request<Vec<u8>>>>>,
}

impl MockClient {
    pub async fn push(&self, resp: HttpResponse<Vec<u8>>) {
        self.queue.lock().await.push_back(resp);
    }

    pub async fn push_json(&self, status: u16, body: Value) {
        self.push(json_response(status, body)).await;
    }

    /// Answer `method path` with `resp` after `delay`.
    pub async fn route(
        &self,
        method: Method,
        path: &str,
        delay: Duration,
        resp: HttpResponse<Vec<u8>>,
    ) {
        let mut routes = self.routes.lock().await;
        match routes
            .iter_mut()
            .find(|r| r.method == method && r.path == path)
        {
            Some(route) => route.responses.push_back(resp),
            None => routes.push(Route {
                method,
                path: path.to_owned(),
                delay,
                responses: VecDeque::from([resp]),
            }),
        }
    }

    pub async fn take_log(&self) -> Vec<Request<Vec<u8>>> {
        std::mem::take(&mut *self.log.lock().await)
    }

    pub async fn request_count(&self) -> usize {
        self.log.lock().await.len()
    }
}

impl HttpClient for MockClient {
    type Error = std::convert::Infallible;

    fn send_http(
        &self,
        request: Request<Vec<u8>>,
    ) -> impl core::future::Future<
        Output = core::result::Result<http::Response<Vec<u8>>, Self::Error>,
    > + Send {
        let log = self.log.clone();
        let queue = self.queue.clone();
        let routes = self.routes.clone();
        async move {
            let method = request.method().clone();
            let path = request.uri().path().to_owned();
            log.lock().await.push(request);

            let routed = {
                let mut routes = routes.lock().await;
                routes
                    .iter_mut()
                    .find(|r| r.method == method && r.path == path)
                    .and_then(|r| r.responses.pop_front().map(|resp| (r.delay, resp)))
            };
            if let Some((delay, resp)) = routed {
                tokio::time::sleep(delay).await;
                return Ok(resp);
            }
            Ok(queue
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| panic!("no queued response for {method} {path}")))
        }
    }
}

pub fn json_response(status: u16, body: Value) -> HttpResponse<Vec<u8>> {
    HttpResponse::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(serde_json::to_vec(&body).unwrap())
        .unwrap()
}

pub fn client(mock: &MockClient) -> DhartiClient<MockClient> {
    DhartiClient::new(mock.clone(), url::Url::parse("https://api.test").unwrap())
}

pub fn body_str(req: &Request<Vec<u8>>) -> String {
    String::from_utf8_lossy(req.body()).into_owned()
}

pub fn body_json(req: &Request<Vec<u8>>) -> Value {
    serde_json::from_slice(req.body()).unwrap()
}

/// Names of the multipart fields in a request body, in order.
pub fn form_fields(req: &Request<Vec<u8>>) -> Vec<String> {
    let body = body_str(req);
    body.split("Content-Disposition: form-data; name=\"")
        .skip(1)
        .filter_map(|part| part.split('"').next())
        .map(str::to_owned)
        .collect()
}

/// Text value of a multipart field.
pub fn form_text(req: &Request<Vec<u8>>, name: &str) -> Option<String> {
    let body = body_str(req);
    let marker = format!("name=\"{name}\"\r\n\r\n");
    let start = body.find(&marker)? + marker.len();
    let rest = &body[start..];
    let end = rest.find("\r\n--")?;
    Some(rest[..end].to_owned())
}
