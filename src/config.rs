use chrono_tz::Tz;
use once_cell::sync::Lazy;
use std::env;

pub struct Config {
    database_url: String,
    bind_addr: String,
    reference_tz: Tz,
}

impl Config {
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn bind_addr(&self) -> &str {
        &self.bind_addr
    }

    /// Zone used to anchor the "last N days" query window.
    pub fn reference_tz(&self) -> Tz {
        self.reference_tz
    }
}

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    dotenv::dotenv().ok();

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let bind_addr = env::var("BIND_ADDR").expect("BIND_ADDR must be set");
    let reference_tz = env::var("REFERENCE_TIMEZONE")
        .unwrap_or_else(|_| "Europe/Belgrade".to_owned())
        .parse()
        .expect("REFERENCE_TIMEZONE must be a valid IANA zone name");

    Config {
        database_url,
        bind_addr,
        reference_tz,
    }
});
