//! Layered configuration for the board mirror.
//!
//! Values come from an optional TOML file with `MIRROR_`-prefixed
//! environment variables merged on top. The origin and database location
//! are required; every tunable has a default.

mod error;

use std::path::{Path, PathBuf};
use std::time::Duration;

use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

pub use crate::error::{Error, ErrorKind, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Origin of the live board being mirrored, scheme and host only.
    pub origin: Url,
    /// Public base URL the mirror itself is served under. Handed to the
    /// front end for link rewriting; the crawl core never fetches it.
    pub base: Url,
    /// SQLite database file backing the page cache and the crawl queue.
    pub database: PathBuf,
    /// Validity of a cached historical page, in seconds.
    #[serde(default = "default_page_ttl")]
    pub page_ttl_secs: u64,
    /// Validity of the cached last page of a resource, in seconds. The
    /// last page is where new content lands, so it expires much sooner.
    #[serde(default = "default_last_page_ttl")]
    pub last_page_ttl_secs: u64,
    /// Crawl interval floor, in milliseconds.
    #[serde(default = "default_interval_base")]
    pub interval_base_ms: u64,
    /// Crawl interval ceiling under backoff, in milliseconds.
    #[serde(default = "default_interval_max")]
    pub interval_max_ms: u64,
    /// How often the crawl queue row is written back, in seconds.
    #[serde(default = "default_persist_interval")]
    pub persist_interval_secs: u64,
}

fn default_page_ttl() -> u64 {
    2_592_000
}

fn default_last_page_ttl() -> u64 {
    21_600
}

fn default_interval_base() -> u64 {
    2_000
}

fn default_interval_max() -> u64 {
    60_000
}

fn default_persist_interval() -> u64 {
    60
}

/// Load and validate the configuration, merging the file (when given)
/// under the environment.
pub fn load(file: Option<&Path>) -> Result<MirrorConfig> {
    let mut figment = Figment::new();
    if let Some(file) = file {
        figment = figment.merge(Toml::file(file));
    }
    let config: MirrorConfig = figment
        .merge(Env::prefixed("MIRROR_"))
        .extract()
        .or_raise(|| ErrorKind::Read)?;
    config.validate()?;
    debug!(
        origin = %config.origin,
        database = %config.database.display(),
        "Configuration loaded"
    );
    Ok(config)
}

impl MirrorConfig {
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.origin.scheme(), "http" | "https") {
            exn::bail!(ErrorKind::Invalid("origin must be an http(s) URL"));
        }
        if self.origin.path() != "/" || self.origin.query().is_some() {
            exn::bail!(ErrorKind::Invalid("origin must not carry a path or query"));
        }
        if !matches!(self.base.scheme(), "http" | "https") {
            exn::bail!(ErrorKind::Invalid("base must be an http(s) URL"));
        }
        if self.page_ttl_secs == 0 || self.last_page_ttl_secs == 0 {
            exn::bail!(ErrorKind::Invalid("cache TTLs must be positive"));
        }
        if self.interval_base_ms == 0 {
            exn::bail!(ErrorKind::Invalid("interval floor must be positive"));
        }
        if self.interval_max_ms < self.interval_base_ms {
            exn::bail!(ErrorKind::Invalid("interval ceiling must not undercut the floor"));
        }
        if self.persist_interval_secs == 0 {
            exn::bail!(ErrorKind::Invalid("persist interval must be positive"));
        }
        Ok(())
    }

    pub fn page_ttl(&self) -> Duration {
        Duration::from_secs(self.page_ttl_secs)
    }

    pub fn last_page_ttl(&self) -> Duration {
        Duration::from_secs(self.last_page_ttl_secs)
    }

    pub fn interval_base(&self) -> Duration {
        Duration::from_millis(self.interval_base_ms)
    }

    pub fn interval_max(&self) -> Duration {
        Duration::from_millis(self.interval_max_ms)
    }

    pub fn persist_interval(&self) -> Duration {
        Duration::from_secs(self.persist_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn valid() -> MirrorConfig {
        MirrorConfig {
            origin: Url::parse("https://board.example").unwrap(),
            base: Url::parse("https://mirror.example").unwrap(),
            database: PathBuf::from("/var/lib/mirror/mirror.db"),
            page_ttl_secs: default_page_ttl(),
            last_page_ttl_secs: default_last_page_ttl(),
            interval_base_ms: default_interval_base(),
            interval_max_ms: default_interval_max(),
            persist_interval_secs: default_persist_interval(),
        }
    }

    #[test]
    fn minimal_file_loads_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mirror.toml");
        std::fs::write(
            &path,
            "origin = \"https://board.example\"\n\
             base = \"https://mirror.example\"\n\
             database = \"/tmp/mirror.db\"\n",
        )
        .unwrap();

        let config = load(Some(&path)).unwrap();
        assert_eq!(config.origin.as_str(), "https://board.example/");
        assert_eq!(config.interval_base_ms, default_interval_base());
        assert_eq!(config.page_ttl(), Duration::from_secs(default_page_ttl()));
    }

    #[test]
    fn missing_origin_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mirror.toml");
        std::fs::write(
            &path,
            "base = \"https://mirror.example\"\ndatabase = \"/tmp/mirror.db\"\n",
        )
        .unwrap();

        let err = load(Some(&path)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Read));
    }

    #[test]
    fn environment_overrides_the_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "mirror.toml",
                "origin = \"https://board.example\"\n\
                 base = \"https://mirror.example\"\n\
                 database = \"/tmp/mirror.db\"\n\
                 interval_base_ms = 1000\n",
            )?;
            jail.set_env("MIRROR_INTERVAL_BASE_MS", "500");

            let config = load(Some(Path::new("mirror.toml"))).unwrap();
            assert_eq!(config.interval_base_ms, 500);
            assert_eq!(config.interval_base(), Duration::from_millis(500));
            Ok(())
        });
    }

    #[test]
    fn environment_alone_is_enough() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("MIRROR_ORIGIN", "http://board.example");
            jail.set_env("MIRROR_BASE", "http://localhost:8080");
            jail.set_env("MIRROR_DATABASE", "/tmp/mirror.db");

            let config = load(None).unwrap();
            assert_eq!(config.origin.scheme(), "http");
            Ok(())
        });
    }

    #[rstest]
    #[case::bad_scheme("ftp://board.example", "origin must be an http(s) URL")]
    #[case::path("https://board.example/forum/", "origin must not carry a path or query")]
    fn origins_are_checked(#[case] origin: &str, #[case] message: &str) {
        let mut config = valid();
        config.origin = Url::parse(origin).unwrap();
        let err = config.validate().unwrap_err();
        match &*err {
            ErrorKind::Invalid(reason) => assert_eq!(*reason, message),
            other => panic!("expected an invalid-config error, got {other:?}"),
        }
    }

    #[test]
    fn intervals_and_ttls_are_checked() {
        let mut config = valid();
        config.interval_max_ms = config.interval_base_ms - 1;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.last_page_ttl_secs = 0;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.persist_interval_secs = 0;
        assert!(config.validate().is_err());
    }
}
