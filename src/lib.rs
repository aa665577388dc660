//! Layered configuration for Rust applications: defaults, a JSON file,
//! environment variables and command-line flags folded into one typed struct.
//!
//! ```ignore
//! let strata = Strata::builder()
//!     .app_name("myapp")
//!     .description("Serves files.")
//!     .setting(Setting::new("port").env("MYAPP_PORT").aliases(["-p", "--port"]))
//!     .setting(Setting::new("root").alias("--root:"))
//!     .default_value("port", 8080)
//!     .build(AppConfig::default())?;
//!
//! if let Outcome::Help(text) = strata.load() {
//!     print!("{text}");
//!     return Ok(());
//! }
//! let port = strata.read(|c| c.port);
//! ```
//!
//! # Layer precedence
//!
//! ```text
//! Defaults              .default_value()
//!        ↑ overridden by
//! Config file           first existing candidate
//!        ↑ overridden by
//! Environment vars      Setting::env()
//!        ↑ overridden by
//! Command line          Setting::alias()
//! ```
//!
//! Every layer is **sparse**: it only carries the keys it sets. Layers are
//! untyped trees (`serde_json::Map`) that are deep-merged, so a file can set
//! `database.url` while the command line sets `database.pool_size`. Nothing
//! is typed until the merged tree is bound onto the destination.
//!
//! # Settings
//!
//! Only registered settings are read from the environment and the command
//! line. A [`Setting`] names a dotted path and the sources that feed it:
//!
//! - **`.env("NAME")`**: the variable's value, as a string, whenever it is set
//!   (even to the empty string).
//! - **`.alias("-p")` / `.alias("--port")`**: a switch. It takes the next
//!   argument as its value unless that argument starts with `-`; otherwise the
//!   value is `true`. `--port=80` sets the value inline.
//! - **`.alias("-r:")` / `.alias("--root:")`**: a greedy alias. It always takes
//!   a value: the rest of its short cluster (`-r/tmp`) or the whole next
//!   argument, even one that looks like a flag.
//!
//! Short aliases combine: with `-a`, `-b` and greedy `-n:`, `-abn5` sets `a`
//! and `b` to `true` and `n` to `"5"`. A bare `--` ends option parsing. A
//! first argument of `help` (or `-h`/`--help` when a description is set)
//! makes [`Strata::load`] return [`Outcome::Help`] with the rendered usage.
//!
//! A setting with neither an env binding nor an alias is not registered; the
//! file and defaults layers need no registration.
//!
//! # Binding
//!
//! The destination implements [`Bind`], listing its fields in a [`Schema`].
//! Values are coerced through [`Castable`]: numbers and booleans may arrive as
//! strings (env and command line always do), keys match case-insensitively
//! as a fallback, and a value that does not fit leaves the field unchanged.
//! See the [`bind`] module for the full rules, including embedded structs.
//!
//! # Config file
//!
//! The file is JSON with `//` and `/* */` comments allowed. Candidates are the
//! explicit [`file()`](StrataBuilder::file) paths, then each [`SearchPath`]
//! joined with the file name (`"{app_name}.json"` by default). The first
//! candidate that exists is used for the life of the handle, including by
//! [`Strata::save`].
//!
//! # Reloading
//!
//! [`Strata::reload`] re-reads the file only if its modification time moved
//! forward, then re-merges it with the defaults, environment and command-line
//! layers captured by the last [`load`](Strata::load). With the `reload`
//! feature (on by default), [`Strata::watch`] runs this in a background task
//! on SIGHUP or on [`ReloadHandle::reload`].
//!
//! # Error handling
//!
//! Loading never fails: a missing file contributes nothing and a malformed
//! one is logged with `tracing` and skipped. Fallible operations
//! ([`Strata::try_save`], [`StrataBuilder::build`]) return [`StrataError`].

pub mod bind;
pub mod cli;
pub mod comments;
pub mod env;
pub mod error;
pub mod merge;
pub mod registry;
pub mod tree;
pub mod types;

mod builder;
mod file;
mod fs;
mod help;
mod persist;
#[cfg(feature = "reload")]
mod reload;
mod resolve;

#[cfg(test)]
mod fixtures;

pub use bind::{Bind, Castable, Schema};
pub use builder::{Strata, StrataBuilder};
pub use error::StrataError;
pub use fs::{Filesystem, OsFilesystem};
pub use help::Usage;
pub use registry::{Registry, Setting};
#[cfg(feature = "reload")]
pub use reload::ReloadHandle;
pub use types::{Outcome, SearchPath};
