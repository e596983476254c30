//! `Router` over OSRM's Route API.
//!
//! [`OsrmRouter`] turns each [`Router::calculate_route`] call into one HTTP
//! request against an OSRM service and reports the converted [`Route`] from
//! a task on its own Tokio runtime.
//!
//! # Architecture
//!
//! The [`Router`] trait is synchronous and callback based so that the
//! session can stay on a single owning thread. The router owns a
//! one-worker multi-threaded runtime: requests are spawned onto it and the
//! completion callback runs on the worker, never on the caller's thread.
//!
//! Callers hand the router local metres. The configured origin anchors a
//! [`LocalProjection`] that converts them to the longitude/latitude pairs
//! OSRM expects, and converts the returned geometry back.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use geo::Coord;
use log::{debug, warn};
use reqwest::Client;
use thiserror::Error;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use wayline_core::{LocalProjection, ResultCode, Route, RouteReadyCallback, Router, TravelProfile};

use super::osrm::{self, RouteResponse};

/// Error type for [`OsrmRouter`] construction failures.
#[derive(Debug, Error)]
pub enum RouterBuildError {
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    /// Failed to build the Tokio runtime.
    #[error("failed to build Tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Default user agent for OSRM requests.
pub const DEFAULT_USER_AGENT: &str = "wayline-routing/0.1";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for [`OsrmRouter`].
#[derive(Debug, Clone)]
pub struct OsrmRouterConfig {
    /// Base URL for the OSRM service (e.g., `"http://localhost:5000"`).
    pub base_url: String,
    /// Request timeout duration.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
    /// Travel profile requested from the service.
    pub profile: TravelProfile,
    /// Longitude/latitude mapped to local `(0, 0)`.
    pub origin: Coord<f64>,
}

impl Default for OsrmRouterConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            profile: TravelProfile::default(),
            origin: Coord { x: 0.0, y: 0.0 },
        }
    }
}

impl OsrmRouterConfig {
    /// Create a new configuration with the given base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the travel profile.
    #[must_use]
    pub const fn with_profile(mut self, profile: TravelProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Set the projection origin, in longitude/latitude degrees.
    #[must_use]
    pub const fn with_origin(mut self, origin: Coord<f64>) -> Self {
        self.origin = origin;
        self
    }
}

/// Successful response bodies keyed by request URL.
#[derive(Debug, Default, Clone)]
struct ResponseCache(Arc<Mutex<HashMap<String, String>>>);

impl ResponseCache {
    fn get(&self, url: &str) -> Option<String> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned()
    }

    fn insert(&self, url: String, body: String) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url, body);
    }

    fn clear(&self) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Everything a spawned build needs, detached from the router.
struct BuildRequest {
    client: Client,
    cache: ResponseCache,
    projection: LocalProjection,
    url: String,
    name: &'static str,
}

/// Router backed by an OSRM HTTP service.
///
/// # Example
///
/// ```no_run
/// use geo::Coord;
/// use wayline_core::{ResultCode, Route, Router, TravelProfile};
/// use wayline_data::routing::{OsrmRouter, OsrmRouterConfig};
///
/// let config = OsrmRouterConfig::new("http://localhost:5000")
///     .with_profile(TravelProfile::Pedestrian)
///     .with_origin(Coord { x: -0.1276, y: 51.5072 });
/// let mut router = OsrmRouter::with_config(config)?;
/// router.set_destination(Coord { x: 800.0, y: 350.0 });
/// router.calculate_route(
///     Coord { x: 0.0, y: 0.0 },
///     Box::new(|route: Route, code: ResultCode| {
///         println!("{code}: {} m", route.total_length());
///     }),
/// );
/// # Ok::<(), wayline_data::routing::RouterBuildError>(())
/// ```
pub struct OsrmRouter {
    client: Client,
    config: OsrmRouterConfig,
    runtime: Runtime,
    projection: LocalProjection,
    destination: Option<Coord<f64>>,
    cache: ResponseCache,
    in_flight: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for OsrmRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OsrmRouter")
            .field("client", &self.client)
            .field("config", &self.config)
            .field("runtime", &"<tokio::runtime::Runtime>")
            .field("destination", &self.destination)
            .field("cached_responses", &self.cache.len())
            .field("in_flight", &self.in_flight.is_some())
            .finish_non_exhaustive()
    }
}

impl OsrmRouter {
    /// Create a router for the default profile and origin.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or Tokio runtime fails to build.
    pub fn new(base_url: impl Into<String>) -> Result<Self, RouterBuildError> {
        Self::with_config(OsrmRouterConfig::new(base_url))
    }

    /// Create a router with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or Tokio runtime fails to build.
    pub fn with_config(config: OsrmRouterConfig) -> Result<Self, RouterBuildError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(RouterBuildError::HttpClient)?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("wayline-osrm")
            .enable_all()
            .build()
            .map_err(RouterBuildError::Runtime)?;
        Ok(Self {
            client,
            projection: LocalProjection::new(config.origin),
            config,
            runtime,
            destination: None,
            cache: ResponseCache::default(),
            in_flight: None,
        })
    }

    /// Configuration this router was built with.
    #[must_use]
    pub const fn config(&self) -> &OsrmRouterConfig {
        &self.config
    }

    /// Number of responses held in the cache.
    #[must_use]
    pub fn cached_responses(&self) -> usize {
        self.cache.len()
    }

    /// Build the OSRM Route API URL between two local points.
    ///
    /// The URL format is
    /// `{base_url}/route/v1/{profile}/{lon},{lat};{lon},{lat}?{options}`.
    fn build_route_url(&self, start: Coord<f64>, end: Coord<f64>) -> String {
        let from = self.projection.to_geographic(start);
        let to = self.projection.to_geographic(end);
        format!(
            "{}/route/v1/{}/{:.6},{:.6};{:.6},{:.6}?overview=full&geometries=geojson&steps=true",
            self.config.base_url.trim_end_matches('/'),
            osrm::profile_segment(self.config.profile),
            from.x,
            from.y,
            to.x,
            to.y
        )
    }
}

impl BuildRequest {
    async fn run(self) -> Result<Route, ResultCode> {
        let (body, fresh) = match self.cache.get(&self.url) {
            Some(body) => {
                debug!("reusing cached OSRM response for {}", self.url);
                (body, false)
            }
            None => (self.fetch().await?, true),
        };

        let response: RouteResponse = serde_json::from_str(&body).map_err(|err| {
            warn!("unreadable OSRM response from {}: {err}", self.url);
            ResultCode::InternalError
        })?;
        let route = osrm::into_route(response, self.name, &self.projection)?;
        if fresh {
            self.cache.insert(self.url, body);
        }
        Ok(route)
    }

    /// Fetch the raw body. OSRM reports routing failures as JSON with a
    /// non-2xx status, so the body is returned whatever the status.
    async fn fetch(&self) -> Result<String, ResultCode> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|err| convert_reqwest_error(&err, &self.url))?;
        debug!("OSRM answered {} for {}", response.status(), self.url);
        response
            .text()
            .await
            .map_err(|err| convert_reqwest_error(&err, &self.url))
    }
}

fn convert_reqwest_error(error: &reqwest::Error, url: &str) -> ResultCode {
    if error.is_timeout() {
        warn!("OSRM request to {url} timed out");
    } else {
        warn!("OSRM request to {url} failed: {error}");
    }
    ResultCode::NetworkError
}

impl Router for OsrmRouter {
    fn name(&self) -> &str {
        self.config.profile.as_str()
    }

    fn profile(&self) -> TravelProfile {
        self.config.profile
    }

    fn set_destination(&mut self, point: Coord<f64>) {
        self.destination = Some(point);
    }

    fn calculate_route(&mut self, start: Coord<f64>, on_ready: RouteReadyCallback) {
        self.cancel();
        let name = self.config.profile.as_str();
        let Some(end) = self.destination else {
            on_ready(Route::empty(name), ResultCode::EndPointNotFound);
            return;
        };

        let request = BuildRequest {
            client: self.client.clone(),
            cache: self.cache.clone(),
            projection: self.projection,
            url: self.build_route_url(start, end),
            name,
        };
        self.in_flight = Some(self.runtime.spawn(async move {
            match request.run().await {
                Ok(route) => on_ready(route, ResultCode::NoError),
                Err(code) => on_ready(Route::empty(name), code),
            }
        }));
    }

    fn cancel(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            if !handle.is_finished() {
                debug!("aborting in-flight OSRM request");
            }
            handle.abort();
        }
    }

    fn clear_cached_state(&mut self) {
        self.cache.clear();
    }
}

impl Drop for OsrmRouter {
    fn drop(&mut self) {
        self.cancel();
    }
}
