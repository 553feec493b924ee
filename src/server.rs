//! Local HTTP server for the viewer page and its JSON API.
//!
//! Connections are accepted and parsed by tiny_http's own threads. Requests
//! are then handled one at a time on the server thread, so every session's
//! controller runs its recomputations to completion before the next event.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read};
use tiny_http::Header;

use crate::chart_export::render_svg;
use crate::config::AppConfig;
use crate::controller::{Derived, View, ViewController, ViewOptions};
use crate::selection::InputEvent;

const PAGE: &str = include_str!("page.html");

/// Largest request body accepted (input events are tiny).
const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Request {
    pub fn new(method: &str, target: &str, body: impl Into<Vec<u8>>) -> Self {
        let (path, query) = split_target(target);
        Self {
            method: method.to_string(),
            path,
            query,
            body: body.into(),
        }
    }

    /// Take method, target and body from an incoming request.
    fn read_from(request: &mut tiny_http::Request) -> Result<Self> {
        let mut body = Vec::new();
        request
            .as_reader()
            .take(MAX_BODY_BYTES as u64 + 1)
            .read_to_end(&mut body)?;
        if body.len() > MAX_BODY_BYTES {
            return Err(eyre!("request body larger than {} bytes", MAX_BODY_BYTES));
        }
        let method = request.method().to_string();
        Ok(Self::new(&method, request.url(), body))
    }
}

fn split_target(target: &str) -> (String, HashMap<String, String>) {
    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    let params = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect();
    (path.to_string(), params)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Response {
    fn new(status: u16, content_type: &'static str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type,
            body: body.into(),
        }
    }

    fn json(status: u16, value: &impl Serialize) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self::new(status, "application/json", body),
            Err(e) => Self::error(500, &format!("cannot encode response: {}", e)),
        }
    }

    fn error(status: u16, message: &str) -> Self {
        Self::new(
            status,
            "application/json",
            json!({ "error": message }).to_string(),
        )
    }

    fn into_http(self) -> Result<tiny_http::Response<Cursor<Vec<u8>>>> {
        let header = |name: &str, value: &str| {
            Header::from_bytes(name, value).map_err(|_| eyre!("invalid header {}: {}", name, value))
        };
        Ok(tiny_http::Response::from_data(self.body)
            .with_status_code(self.status)
            .with_header(header("Content-Type", self.content_type)?)
            .with_header(header("Cache-Control", "no-store")?))
    }
}

#[derive(Serialize)]
struct SessionView<'a> {
    session: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    recomputed: Option<&'a [Derived]>,
    view: View,
}

/// Open browser sessions, oldest first.
struct Sessions {
    options: ViewOptions,
    initial_path: Option<String>,
    max_sessions: usize,
    next_id: u64,
    open: BTreeMap<u64, ViewController>,
}

impl Sessions {
    fn new(options: ViewOptions, initial_path: Option<String>, max_sessions: usize) -> Self {
        Self {
            options,
            initial_path,
            max_sessions: max_sessions.max(1),
            next_id: 1,
            open: BTreeMap::new(),
        }
    }

    /// Start a session, dropping the oldest ones beyond the limit.
    fn create(&mut self) -> Result<(u64, &ViewController)> {
        let controller = ViewController::new(self.options.clone(), self.initial_path.as_deref())?;
        while self.open.len() >= self.max_sessions {
            if let Some((&oldest, _)) = self.open.iter().next() {
                debug!("dropping session {}", oldest);
                self.open.remove(&oldest);
            }
        }
        let id = self.next_id;
        self.next_id += 1;
        let controller = self.open.entry(id).or_insert(controller);
        Ok((id, controller))
    }

    fn get(&self, id: u64) -> Option<&ViewController> {
        self.open.get(&id)
    }

    fn get_mut(&mut self, id: u64) -> Option<&mut ViewController> {
        self.open.get_mut(&id)
    }
}

pub struct Server {
    http: tiny_http::Server,
    sessions: Sessions,
    chart_size: (u32, u32),
}

/// Bind the listening socket described by the config.
pub fn bind(config: &AppConfig) -> Result<tiny_http::Server> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    tiny_http::Server::http(&addr).map_err(|e| eyre!("cannot bind {}: {}", addr, e))
}

impl Server {
    pub fn new(http: tiny_http::Server, config: &AppConfig, initial_path: Option<String>) -> Self {
        Self {
            http,
            sessions: Sessions::new(
                ViewOptions::from(config),
                initial_path,
                config.server.max_sessions,
            ),
            chart_size: (config.chart.width, config.chart.height),
        }
    }

    /// Address the page is served at.
    pub fn url(&self) -> Result<String> {
        let addr = self
            .http
            .server_addr()
            .to_ip()
            .ok_or_else(|| eyre!("server is not listening on an IP address"))?;
        let host = if addr.ip().is_unspecified() {
            "localhost".to_string()
        } else {
            addr.ip().to_string()
        };
        Ok(format!("http://{}:{}", host, addr.port()))
    }

    /// Serve requests until the listening socket fails.
    pub fn run(mut self) {
        info!("serving on {}", self.url().unwrap_or_default());
        loop {
            match self.http.recv() {
                Ok(request) => {
                    if let Err(e) = self.handle(request) {
                        warn!("cannot send response: {}", e);
                    }
                }
                Err(e) => {
                    warn!("server stopped: {}", e);
                    break;
                }
            }
        }
    }

    fn handle(&mut self, mut incoming: tiny_http::Request) -> Result<()> {
        let response = match Request::read_from(&mut incoming) {
            Ok(request) => {
                debug!("{} {}", request.method, request.path);
                self.route(&request)
            }
            Err(e) => Response::error(400, &e.to_string()),
        };
        incoming.respond(response.into_http()?)?;
        Ok(())
    }

    /// Dispatch a request to its handler.
    pub fn route(&mut self, request: &Request) -> Response {
        match (request.method.as_str(), request.path.as_str()) {
            ("GET", "/") | ("GET", "/index.html") => {
                Response::new(200, "text/html; charset=utf-8", PAGE)
            }
            ("GET", "/api/health") => Response::json(200, &json!({ "status": "ok" })),
            ("POST", "/api/session") => self.create_session(),
            ("GET", "/api/view") => self.show_view(request),
            ("POST", "/api/input") => self.apply_input(request),
            ("GET", "/api/chart.svg") => self.chart_svg(request),
            (
                _,
                "/" | "/index.html" | "/api/health" | "/api/session" | "/api/view" | "/api/input"
                | "/api/chart.svg",
            ) => Response::error(405, "method not allowed"),
            _ => Response::error(404, "not found"),
        }
    }

    fn create_session(&mut self) -> Response {
        match self.sessions.create() {
            Ok((id, controller)) => {
                info!("session {} opened", id);
                Response::json(
                    200,
                    &SessionView {
                        session: id.to_string(),
                        recomputed: None,
                        view: controller.view(),
                    },
                )
            }
            Err(e) => Response::error(500, &e.to_string()),
        }
    }

    fn session_id(request: &Request) -> std::result::Result<u64, Response> {
        request
            .query
            .get("session")
            .and_then(|id| id.parse().ok())
            .ok_or_else(|| Response::error(400, "missing or invalid session parameter"))
    }

    fn show_view(&self, request: &Request) -> Response {
        let id = match Self::session_id(request) {
            Ok(id) => id,
            Err(response) => return response,
        };
        match self.sessions.get(id) {
            Some(controller) => Response::json(
                200,
                &SessionView {
                    session: id.to_string(),
                    recomputed: None,
                    view: controller.view(),
                },
            ),
            None => Response::error(404, "unknown session"),
        }
    }

    fn apply_input(&mut self, request: &Request) -> Response {
        let id = match Self::session_id(request) {
            Ok(id) => id,
            Err(response) => return response,
        };
        let event: InputEvent = match serde_json::from_slice(&request.body) {
            Ok(event) => event,
            Err(e) => return Response::error(400, &format!("invalid input event: {}", e)),
        };
        let Some(controller) = self.sessions.get_mut(id) else {
            return Response::error(404, "unknown session");
        };
        debug!("session {}: {:?}", id, event);
        let recomputed = controller.handle(event);
        Response::json(
            200,
            &SessionView {
                session: id.to_string(),
                recomputed: Some(&recomputed),
                view: controller.view(),
            },
        )
    }

    fn chart_svg(&self, request: &Request) -> Response {
        let id = match Self::session_id(request) {
            Ok(id) => id,
            Err(response) => return response,
        };
        let Some(controller) = self.sessions.get(id) else {
            return Response::error(404, "unknown session");
        };
        let (width, height) = self.chart_size;
        match render_svg(controller.chart(), width, height) {
            Ok(svg) => Response::new(200, "image/svg+xml", svg),
            Err(e) => {
                warn!("chart rendering failed: {}", e);
                Response::error(500, &format!("chart rendering failed: {}", e))
            }
        }
    }
}
