// Build-time identity from Cargo.toml, reported on GET /version and sent as the API user agent

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const NAME: &str = env!("CARGO_PKG_NAME");

pub fn user_agent() -> String {
    format!("{NAME}/{VERSION}")
}
