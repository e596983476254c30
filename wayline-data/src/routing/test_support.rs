//! Test utilities for OSRM routers.
//!
//! [`StubOsrmServer`] answers every request on a loopback socket with one
//! canned response, optionally after a delay, so
//! [`OsrmRouter`](super::OsrmRouter) can be driven end to end without a
//! running OSRM service.

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use geo::Coord;
use log::warn;
use wayline_core::{ResultCode, Route, RouteReadyCallback};

/// Origin of [`SAMPLE_ROUTE_RESPONSE`], in lon/lat degrees.
pub const SAMPLE_ORIGIN: Coord<f64> = Coord { x: 13.4, y: 52.5 };

/// Three-point route heading east then turning left onto a northbound road.
pub const SAMPLE_ROUTE_RESPONSE: &str = r#"{
    "code": "Ok",
    "routes": [{
        "distance": 179.1,
        "duration": 22.0,
        "geometry": {
            "type": "LineString",
            "coordinates": [[13.4, 52.5], [13.401, 52.5], [13.401, 52.501]]
        },
        "legs": [{
            "steps": [
                {"distance": 67.8, "duration": 10.0,
                 "maneuver": {"type": "depart", "location": [13.4, 52.5]}},
                {"distance": 111.3, "duration": 12.0,
                 "maneuver": {"type": "turn", "modifier": "left", "location": [13.401, 52.5]}},
                {"distance": 0.0, "duration": 0.0,
                 "maneuver": {"type": "arrive", "location": [13.401, 52.501]}}
            ]
        }]
    }]
}"#;

/// Loopback HTTP server replying to every request with the same response.
///
/// The accept loop runs on a detached thread for the life of the process and
/// each connection is answered from its own thread.
///
/// # Example
///
/// ```
/// use wayline_data::routing::test_support::{SAMPLE_ROUTE_RESPONSE, StubOsrmServer};
///
/// let server = StubOsrmServer::serve(200, SAMPLE_ROUTE_RESPONSE)?;
/// assert!(server.base_url().starts_with("http://127.0.0.1:"));
/// assert_eq!(server.request_count(), 0);
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct StubOsrmServer {
    address: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubOsrmServer {
    /// Start answering with `status` and a JSON `body`.
    ///
    /// # Errors
    ///
    /// Returns an error if the loopback listener cannot be bound.
    pub fn serve(status: u16, body: impl Into<String>) -> std::io::Result<Self> {
        Self::serve_delayed(status, body, Duration::ZERO)
    }

    /// Like [`serve`](Self::serve), but hold every reply for `delay` after
    /// the request has been read.
    ///
    /// # Errors
    ///
    /// Returns an error if the loopback listener cannot be bound.
    pub fn serve_delayed(
        status: u16,
        body: impl Into<String>,
        delay: Duration,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let address = listener.local_addr()?;
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);
        let body: Arc<str> = Arc::from(Into::<String>::into(body));
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let reply = Reply {
                    status,
                    body: Arc::clone(&body),
                    delay,
                };
                let seen = Arc::clone(&seen);
                thread::spawn(move || {
                    if let Err(err) = reply.send(stream, &seen) {
                        warn!("stub OSRM server failed to answer: {err}");
                    }
                });
            }
        });
        Ok(Self { address, requests })
    }

    /// Base URL to hand to an OSRM router.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.address)
    }

    /// Request targets received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of requests received so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Canned reply shared by every connection.
struct Reply {
    status: u16,
    body: Arc<str>,
    delay: Duration,
}

impl Reply {
    fn send(&self, stream: TcpStream, seen: &Mutex<Vec<String>>) -> std::io::Result<()> {
        let mut reader = BufReader::new(stream.try_clone()?);
        let mut request_line = String::new();
        reader.read_line(&mut request_line)?;
        let mut header = String::new();
        loop {
            header.clear();
            if reader.read_line(&mut header)? == 0 || header == "\r\n" {
                break;
            }
        }

        let target = request_line
            .split_whitespace()
            .nth(1)
            .unwrap_or_default()
            .to_owned();
        seen.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(target);

        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        let mut writer = stream;
        write!(
            writer,
            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            self.status,
            reason_phrase(self.status),
            self.body.len(),
            self.body
        )?;
        writer.flush()
    }
}

const fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    }
}

/// URL of a loopback port with nothing listening on it.
///
/// # Errors
///
/// Returns an error if no ephemeral port can be reserved.
pub fn closed_port_url() -> std::io::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let address = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{address}"))
}

/// Callback forwarding the build outcome to the returned receiver.
#[must_use]
pub fn completion_channel() -> (RouteReadyCallback, Receiver<(Route, ResultCode)>) {
    let (sender, receiver) = mpsc::channel();
    let callback: RouteReadyCallback = Box::new(move |route: Route, code: ResultCode| {
        sender.send((route, code)).ok();
    });
    (callback, receiver)
}
