use crate::fetch::client::{HttpClient, HttpResponse};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{AUTHORIZATION, HeaderValue};

/// An [`HttpClient`] wrapper that sends HTTP Basic credentials.
///
/// The header value is `Basic <base64(username:password)>`, computed once at
/// construction.
pub struct BasicAuth<C> {
    inner: C,
    header: HeaderValue,
}

impl<C> BasicAuth<C> {
    pub fn new(inner: C, username: &str, password: &str) -> Self {
        Self {
            inner,
            header: basic_auth_header(username, password),
        }
    }
}

/// Builds the `Authorization` value for `username:password`.
pub fn basic_auth_header(username: &str, password: &str) -> HeaderValue {
    let encoded = STANDARD.encode(format!("{username}:{password}"));
    let mut value = HeaderValue::try_from(format!("Basic {encoded}"))
        .unwrap_or_else(|_| unreachable!("base64 output is always a valid header"));
    value.set_sensitive(true);
    value
}

impl<C: HttpClient> HttpClient for BasicAuth<C> {
    fn execute(&self, mut req: reqwest::blocking::Request) -> reqwest::Result<HttpResponse> {
        req.headers_mut().insert(AUTHORIZATION, self.header.clone());
        self.inner.execute(req)
    }
}
