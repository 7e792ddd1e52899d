//! Scripted transport and fixtures shared by unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::api::{Section, SectionId};
use crate::core::http::{
    ApiClient, EventStreamResponse, HttpRequest, HttpResponse, Transport, TransportError,
};

pub const TEST_BASE_URL: &str = "http://readmegen.test";

type Handler = Box<dyn Fn(&HttpRequest) -> HttpResponse + Send + Sync>;
type StreamItem = Result<Vec<u8>, TransportError>;

pub enum FakeEventStream {
    /// Emits the chunks, then stays open without further data.
    Open(Vec<String>),
    /// Emits the chunks, then ends as if the connection dropped.
    Closed(Vec<String>),
    /// Emits whatever the test pushes through the paired sender.
    Channel(mpsc::UnboundedReceiver<StreamItem>),
    Rejected(HttpResponse),
}

pub struct FakeTransport {
    handler: Handler,
    failure: Option<String>,
    requests: Mutex<Vec<HttpRequest>>,
    delays: Mutex<Vec<(String, Duration)>>,
    streams: Mutex<VecDeque<FakeEventStream>>,
    stream_opens: Mutex<usize>,
}

impl FakeTransport {
    pub fn new(
        handler: impl Fn(&HttpRequest) -> HttpResponse + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            failure: None,
            requests: Mutex::new(Vec::new()),
            delays: Mutex::new(Vec::new()),
            streams: Mutex::new(VecDeque::new()),
            stream_opens: Mutex::new(0),
        })
    }

    /// Every request fails below HTTP with `message`.
    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(|_| HttpResponse::no_content()),
            failure: Some(message.to_string()),
            requests: Mutex::new(Vec::new()),
            delays: Mutex::new(Vec::new()),
            streams: Mutex::new(VecDeque::new()),
            stream_opens: Mutex::new(0),
        })
    }

    pub fn client(self: &Arc<Self>) -> ApiClient {
        ApiClient::builder(Arc::clone(self) as Arc<dyn Transport>, TEST_BASE_URL).build()
    }

    pub fn delay(&self, path: &str, duration: Duration) {
        self.delays
            .lock()
            .unwrap()
            .push((path.to_string(), duration));
    }

    pub fn push_stream(&self, stream: FakeEventStream) {
        self.streams.lock().unwrap().push_back(stream);
    }

    /// Queues a stream driven by the returned sender.
    pub fn push_channel_stream(&self) -> mpsc::UnboundedSender<StreamItem> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.push_stream(FakeEventStream::Channel(rx));
        tx
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests().into_iter().map(|request| request.path).collect()
    }

    pub fn count(&self, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.path == path)
            .count()
    }

    pub fn stream_opens(&self) -> usize {
        *self.stream_opens.lock().unwrap()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());

        let delay = self
            .delays
            .lock()
            .unwrap()
            .iter()
            .find(|(path, _)| *path == request.path)
            .map(|(_, duration)| *duration);
        if let Some(duration) = delay {
            tokio::time::sleep(duration).await;
        }

        if let Some(message) = &self.failure {
            return Err(TransportError(message.clone()));
        }
        Ok((self.handler)(&request))
    }

    async fn open_event_stream(&self, _path: &str) -> Result<EventStreamResponse, TransportError> {
        *self.stream_opens.lock().unwrap() += 1;
        let next = self.streams.lock().unwrap().pop_front();
        let Some(next) = next else {
            return Err(TransportError("no event stream scripted".to_string()));
        };

        let to_items = |chunks: Vec<String>| {
            chunks
                .into_iter()
                .map(|chunk| Ok::<_, TransportError>(chunk.into_bytes()))
                .collect::<Vec<_>>()
        };

        Ok(match next {
            FakeEventStream::Open(chunks) => EventStreamResponse::Stream(
                stream::iter(to_items(chunks))
                    .chain(stream::pending())
                    .boxed(),
            ),
            FakeEventStream::Closed(chunks) => {
                EventStreamResponse::Stream(stream::iter(to_items(chunks)).boxed())
            }
            FakeEventStream::Channel(rx) => EventStreamResponse::Stream(
                stream::unfold(rx, |mut rx| async move {
                    rx.recv().await.map(|item| (item, rx))
                })
                .boxed(),
            ),
            FakeEventStream::Rejected(response) => EventStreamResponse::Rejected(response),
        })
    }
}

pub fn error_body(status: u16, error_code: &str) -> Value {
    json!({
        "status": status,
        "errorCode": error_code,
        "error": "error",
        "code": error_code,
        "message": format!("{error_code} from test server"),
    })
}

pub fn sse_frame(event: &str, data: &Value) -> String {
    format!("event: {event}\ndata: {data}\n\n")
}

pub fn section(id: i64, title: &str, order_idx: u32) -> Section {
    Section {
        id: SectionId::Number(id),
        title: title.to_string(),
        content: format!("## {title}"),
        order_idx,
    }
}

pub fn sample_sections() -> Vec<Section> {
    vec![section(1, "A", 1), section(2, "B", 2), section(3, "C", 3)]
}
