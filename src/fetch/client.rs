use reqwest::blocking::Request;

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

pub trait HttpClient {
    fn execute(&self, req: Request) -> reqwest::Result<HttpResponse>;
}

impl<C: HttpClient + ?Sized> HttpClient for Box<C> {
    fn execute(&self, req: Request) -> reqwest::Result<HttpResponse> {
        (**self).execute(req)
    }
}
