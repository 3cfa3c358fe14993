//! HTTP header formats of the LSAT / L402 protocol.
//!
//! - Challenge: `WWW-Authenticate: L402 macaroon=<base64>, invoice=<bolt11>`
//! - Credential: `Authorization: L402 <base64 macaroon>:<hex preimage>`

use std::{fmt::Display, str::FromStr};

use http::HeaderMap;
use macaroon::Macaroon;
use serde::{Deserialize, Serialize};

use crate::{
    errors::{Error, Result},
    token::decode_macaroon,
    types::Preimage,
};

/// Header a client sets to announce it can answer an LSAT challenge.
pub const ACCEPT_AUTHENTICATE: &str = "accept-authenticate";
/// `Accept` media type announcing LSAT support.
pub const LSAT_MEDIA_TYPE: &str = "application/vnd.lsat.v1.full+json";

/// Authentication scheme name used in headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AuthScheme {
    #[serde(rename = "LSAT")]
    Lsat,
    #[default]
    #[serde(rename = "L402")]
    L402,
}

impl AuthScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthScheme::Lsat => "LSAT",
            AuthScheme::L402 => "L402",
        }
    }
}

impl Display for AuthScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthScheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("LSAT") {
            Ok(AuthScheme::Lsat)
        } else if s.eq_ignore_ascii_case("L402") {
            Ok(AuthScheme::L402)
        } else {
            Err(Error::MalformedHeader(format!("unknown scheme {s:?}")))
        }
    }
}

/// A `WWW-Authenticate` challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub scheme: AuthScheme,
    /// Standard base64 of the macaroon.
    pub macaroon: String,
    /// Encoded payment request.
    pub invoice: String,
}

impl Display for Challenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} macaroon={}, invoice={}",
            self.scheme, self.macaroon, self.invoice
        )
    }
}

impl Challenge {
    /// Parse a `WWW-Authenticate` value, as a client would.
    pub fn parse(header: &str) -> Result<Self> {
        let (scheme, params) = header
            .trim()
            .split_once(char::is_whitespace)
            .ok_or_else(|| Error::MalformedHeader("challenge has no parameters".into()))?;
        let scheme = scheme.parse()?;

        let mut macaroon = None;
        let mut invoice = None;
        for param in params.split(',') {
            let (key, value) = param
                .trim()
                .split_once('=')
                .ok_or_else(|| Error::MalformedHeader(format!("bad parameter {param:?}")))?;
            let value = value.trim().trim_matches('"').to_string();
            match key.trim() {
                "macaroon" => macaroon = Some(value),
                "invoice" => invoice = Some(value),
                _ => {}
            }
        }

        Ok(Challenge {
            scheme,
            macaroon: macaroon
                .ok_or_else(|| Error::MalformedHeader("challenge without macaroon".into()))?,
            invoice: invoice
                .ok_or_else(|| Error::MalformedHeader("challenge without invoice".into()))?,
        })
    }
}

/// The `<scheme> <macaroon>:<preimage>` pieces of an `Authorization` header,
/// not yet decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCredential<'a> {
    pub scheme: AuthScheme,
    pub macaroon: &'a str,
    pub preimage: &'a str,
}

impl<'a> RawCredential<'a> {
    pub fn parse(header: &'a str) -> Result<Self> {
        let header = header.trim();
        if header.is_empty() {
            return Err(Error::MalformedHeader("LSAT header is not present".into()));
        }

        let (scheme, token) = header
            .split_once(char::is_whitespace)
            .ok_or_else(|| Error::MalformedHeader("missing token after scheme".into()))?;
        let scheme = scheme.parse()?;

        let (macaroon, preimage) = token
            .trim()
            .split_once(':')
            .ok_or_else(|| Error::MalformedHeader("token is not <macaroon>:<preimage>".into()))?;

        Ok(RawCredential {
            scheme,
            macaroon: macaroon.trim(),
            preimage: preimage.trim(),
        })
    }
}

/// A decoded LSAT credential. Lives for one verification only.
#[derive(Clone)]
pub struct Credential {
    pub scheme: AuthScheme,
    pub macaroon: Macaroon,
    pub preimage: Preimage,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("scheme", &self.scheme)
            .field("preimage", &self.preimage)
            .finish_non_exhaustive()
    }
}

impl Credential {
    /// Parse and decode an `Authorization` header value.
    pub fn parse(header: &str) -> Result<Self> {
        let raw = RawCredential::parse(header)?;
        let macaroon = decode_macaroon(raw.macaroon)?;
        let preimage = Preimage::from_hex(raw.preimage)?;
        Ok(Credential {
            scheme: raw.scheme,
            macaroon,
            preimage,
        })
    }
}

/// Whether the client announced it understands LSAT challenges.
pub fn client_supports_lsat(headers: &HeaderMap) -> bool {
    let accepts_media_type = headers
        .get_all(http::header::ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|media| {
            media
                .split(';')
                .next()
                .is_some_and(|m| m.trim().eq_ignore_ascii_case(LSAT_MEDIA_TYPE))
        });

    let accepts_scheme = headers
        .get_all(ACCEPT_AUTHENTICATE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|scheme| scheme.trim().parse::<AuthScheme>().is_ok());

    accepts_media_type || accepts_scheme
}

/// The first `Authorization` header value using an LSAT scheme.
pub fn lsat_authorization(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(http::header::AUTHORIZATION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| {
            value
                .trim()
                .split(char::is_whitespace)
                .next()
                .is_some_and(|scheme| scheme.parse::<AuthScheme>().is_ok())
        })
}

/// Whether the request carries an `Authorization` header for an LSAT scheme.
pub fn has_lsat_authorization(headers: &HeaderMap) -> bool {
    lsat_authorization(headers).is_some()
}
