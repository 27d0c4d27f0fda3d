//! Scoring protocol spoken with the gallery's scoring client.
//!
//! The client reports every shot to every unit with `/shoot?gun_num=<n>`; the
//! unit answers `target=<n>` when one of its live targets saw that gun, and
//! `target=0` otherwise. `/init` starts a new round.
//!
//! The HTTP server itself is a transport supplied by the firmware through
//! [`ScoringEndpoint`]; this module only routes requests and builds replies.

use alloc::{
    format,
    string::String,
};

pub const SHOOT_PATH: &str = "/shoot";
pub const INIT_PATH: &str = "/init";
pub const GUN_NUM_PARAM: &str = "gun_num";
pub const CONTENT_TYPE: &str = "text/plain";

/// A request as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub path: String,
    /// URL-encoded `key=value` pairs from the query string or form body.
    pub params: String,
}

impl Request {
    pub fn new(path: impl Into<String>, params: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            params: params.into(),
        }
    }

    /// Build a request from a raw target such as `/shoot?gun_num=2`.
    pub fn from_target(target: &str) -> Self {
        match target.split_once('?') {
            Some((path, query)) => Self::new(path, query),
            None => Self::new(target, ""),
        }
    }

    pub fn route(&self) -> Option<Route> {
        Route::from_path(&self.path)
    }

    /// First value of `name`, if present.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .split('&')
            .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Route {
    Shoot,
    Init,
}

impl Route {
    pub fn from_path(path: &str) -> Option<Self> {
        match path.trim_end_matches('/') {
            SHOOT_PATH => Some(Self::Shoot),
            INIT_PATH => Some(Self::Init),
            _ => None,
        }
    }

    pub const fn path(self) -> &'static str {
        match self {
            Self::Shoot => SHOOT_PATH,
            Self::Init => INIT_PATH,
        }
    }
}

/// Plain-text reply handed back to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    /// Shot acknowledgment; `gun_num` is 0 when nothing was hit.
    pub fn target(gun_num: u8) -> Self {
        Self {
            status: 200,
            body: format!("target={gun_num}"),
        }
    }

    pub fn initialized() -> Self {
        Self {
            status: 200,
            body: String::from("initialized"),
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: 404,
            body: String::from("not found"),
        }
    }

    pub const fn content_type(&self) -> &'static str {
        CONTENT_TYPE
    }
}

/// Parse the `gun_num` parameter. Absent, non-numeric, zero or out-of-range
/// values are not a gun.
pub fn parse_gun_number(value: Option<&str>) -> Option<u8> {
    value?.trim().parse::<u8>().ok().filter(|&gun| gun != 0)
}

/// Transport carrying scoring requests to the unit.
///
/// `poll` must not block; the control loop calls it once per tick.
pub trait ScoringEndpoint {
    type Error;

    /// Start listening on [`SHOOT_PATH`] and [`INIT_PATH`].
    fn start(&mut self) -> Result<(), Self::Error>;

    /// Next pending request, if any.
    fn poll(&mut self) -> Option<Request>;

    /// Reply to the request most recently returned by `poll`.
    fn respond(&mut self, response: &Response) -> Result<(), Self::Error>;
}

/// Endpoint for a unit running without network: never receives a request.
#[derive(Debug, Default, Clone, Copy)]
pub struct Offline;

impl ScoringEndpoint for Offline {
    type Error = core::convert::Infallible;

    fn start(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn poll(&mut self) -> Option<Request> {
        None
    }

    fn respond(&mut self, _response: &Response) -> Result<(), Self::Error> {
        Ok(())
    }
}
