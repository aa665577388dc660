//! Configuration structs for the strata demo application.
//!
//! The root [`DemoConfig`] has top-level scalars plus two nested sub-configs,
//! [`ServerConfig`] and [`DisplayConfig`], to show dotted paths flowing from
//! every layer.
//!
//! | Setting               | Env var             | Aliases                  |
//! |-----------------------|---------------------|--------------------------|
//! | `name`                | `STRATA_DEMO_NAME`  | `-n`, `--name`           |
//! | `verbose`             |                     | `-v`, `--verbose`        |
//! | `server.host`         | `STRATA_DEMO_HOST`  | `--host`                 |
//! | `server.port`         | `STRATA_DEMO_PORT`  | `-p`, `--port`           |
//! | `display.color`       | `STRATA_DEMO_COLOR` | `-c:`, `--color:`        |
//! | `save`                |                     | `--save`                 |
//! | `watch`               |                     | `-w`, `--watch`          |

use serde::Serialize;
use strata::{Bind, Schema};

#[derive(Serialize, Debug, Clone)]
pub struct DemoConfig {
    /// Application name shown in the banner.
    pub name: String,
    pub verbose: bool,
    pub server: ServerConfig,
    pub display: DisplayConfig,
    /// Write the resolved configuration back to the file.
    #[serde(skip)]
    pub save: bool,
    /// Keep running and reload on SIGHUP.
    #[serde(skip)]
    pub watch: bool,
}

#[derive(Serialize, Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
}

#[derive(Serialize, Debug, Clone)]
pub struct DisplayConfig {
    pub color: String,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            name: "strata-demo".into(),
            verbose: false,
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 3000,
                max_connections: 100,
            },
            display: DisplayConfig {
                color: "yellow".into(),
            },
            save: false,
            watch: false,
        }
    }
}

impl Bind for DemoConfig {
    fn schema() -> Schema<Self> {
        Schema::new()
            .field("name", |c: &mut Self| &mut c.name)
            .field("verbose", |c: &mut Self| &mut c.verbose)
            .nested("server", |c: &mut Self| &mut c.server)
            .nested("display", |c: &mut Self| &mut c.display)
            .field("save", |c: &mut Self| &mut c.save)
            .field("watch", |c: &mut Self| &mut c.watch)
    }
}

impl Bind for ServerConfig {
    fn schema() -> Schema<Self> {
        Schema::new()
            .field("host", |c: &mut Self| &mut c.host)
            .field("port", |c: &mut Self| &mut c.port)
            .field("max_connections", |c: &mut Self| &mut c.max_connections)
    }
}

impl Bind for DisplayConfig {
    fn schema() -> Schema<Self> {
        Schema::new().field("color", |c: &mut Self| &mut c.color)
    }
}
