use std::path::PathBuf;

/// Where to search for the config file.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchPath {
    /// Platform config directory (XDG on Linux, ~/Library/Application Support on macOS).
    Platform,
    /// A subdirectory under the user's home directory, e.g. `Home(".myapp")`.
    Home(&'static str),
    /// Current working directory.
    Cwd,
    /// An explicit directory.
    Path(PathBuf),
}

/// What [`Strata::load`](crate::Strata::load) did with the sources.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// All layers were merged and bound onto the destination.
    Loaded,
    /// The command line asked for help. Carries the rendered usage text; the
    /// caller is expected to print it and exit successfully.
    Help(String),
}
