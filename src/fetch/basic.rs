use super::client::{HttpClient, HttpResponse};

pub struct BasicClient(reqwest::blocking::Client);

impl BasicClient {
    pub fn new() -> reqwest::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("nextbus/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self(client))
    }
}

impl HttpClient for BasicClient {
    fn execute(&self, req: reqwest::blocking::Request) -> reqwest::Result<HttpResponse> {
        let resp = self.0.execute(req)?;
        let status = resp.status().as_u16();
        let body = resp.bytes()?.to_vec();
        Ok(HttpResponse { status, body })
    }
}
