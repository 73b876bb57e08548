mod basic_auth;

pub use basic_auth::BasicAuth;
