//! # Test Suite for the ZivyObraz Client
//!
//! Exercises the poller and the client loop end to end against scripted
//! fakes: a transport that replays canned responses and a display that
//! records every call. No network or hardware is touched.


use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;
use tracing::Span;
use zivyobraz_lib::client::{Client, Shutdown};
use zivyobraz_lib::config::Config;
use zivyobraz_lib::display::DisplayDriver;
use zivyobraz_lib::error::{DisplayError, TransportError};
use zivyobraz_lib::identity::DeviceIdentity;
use zivyobraz_lib::image::MonoImage;
use zivyobraz_lib::protocol::{DeviceQuery, Poller};
use zivyobraz_lib::transport::{HttpResponse, Query, Transport};

pub const TEST_MAC: &str = "AA:BB:CC:DD:EE:FF";

/// One recorded request
#[derive(Clone, Debug)]
pub struct Request {
    pub query: Vec<(&'static str, String)>,
    pub timeout: Duration,
}

impl Request {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Transport replaying scripted responses in order.
#[derive(Clone, Default)]
pub struct FakeTransport {
    responses: Rc<RefCell<VecDeque<Result<HttpResponse, TransportError>>>>,
    requests: Rc<RefCell<Vec<Request>>>,
    shutdown_on_request: Option<Rc<Shutdown>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, response: HttpResponse) -> &Self {
        self.responses.borrow_mut().push_back(Ok(response));
        self
    }

    pub fn fail(&self, error: TransportError) -> &Self {
        self.responses.borrow_mut().push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.borrow().clone()
    }

    /// Trigger `shutdown` as soon as a request arrives.
    pub fn shutdown_on_request(mut self, shutdown: Rc<Shutdown>) -> Self {
        self.shutdown_on_request = Some(shutdown);
        self
    }
}

impl Transport for FakeTransport {
    async fn get(&self, query: &Query, timeout: Duration) -> Result<HttpResponse, TransportError> {
        self.requests.borrow_mut().push(Request {
            query: query.to_vec(),
            timeout,
        });
        if let Some(shutdown) = &self.shutdown_on_request {
            shutdown.trigger();
        }
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or(Err(TransportError::Status(500)))
    }
}

/// Something a display driver was asked to do
#[derive(Clone, Debug, PartialEq)]
pub enum DisplayEvent {
    Initialize,
    Render(MonoImage),
    Sleep,
}

/// Display recording every call.
#[derive(Clone, Default)]
pub struct FakeDisplay {
    events: Rc<RefCell<Vec<DisplayEvent>>>,
}

impl FakeDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DisplayEvent> {
        self.events.borrow().clone()
    }

    pub fn rendered(&self) -> Vec<MonoImage> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                DisplayEvent::Render(image) => Some(image.clone()),
                _ => None,
            })
            .collect()
    }
}

impl DisplayDriver for FakeDisplay {
    fn initialize(&mut self) -> Result<(), DisplayError> {
        self.events.borrow_mut().push(DisplayEvent::Initialize);
        Ok(())
    }

    fn render(&mut self, image: &MonoImage) -> Result<(), DisplayError> {
        self.events
            .borrow_mut()
            .push(DisplayEvent::Render(image.clone()));
        Ok(())
    }

    fn sleep(&mut self) -> Result<(), DisplayError> {
        self.events.borrow_mut().push(DisplayEvent::Sleep);
        Ok(())
    }
}

/// 200 response carrying only control headers.
pub fn check_response(headers: &[(&str, &str)]) -> HttpResponse {
    HttpResponse {
        status: 200,
        headers: headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        body: Vec::new(),
    }
}

/// 200 response carrying a payload.
pub fn payload_response(body: &[u8]) -> HttpResponse {
    HttpResponse {
        status: 200,
        headers: Vec::new(),
        body: body.to_vec(),
    }
}

pub fn identity() -> DeviceIdentity {
    DeviceIdentity::from_mac(TEST_MAC)
}

pub fn poller(transport: FakeTransport) -> Poller<FakeTransport> {
    let config = Config::default();
    let query = DeviceQuery::new(&identity(), &config);
    Poller::new(transport, query, &config.server, Span::none())
}

pub fn client(transport: FakeTransport, display: FakeDisplay) -> Client<FakeTransport, FakeDisplay> {
    let config = Config::default();
    Client::new(poller(transport), display, identity(), &config, Span::none())
}
