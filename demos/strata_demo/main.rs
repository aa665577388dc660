//! # strata demo application
//!
//! A sample CLI tool wiring every strata source together. It exists purely to
//! demonstrate and manually verify the library.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example strata_demo
//! cargo run --example strata_demo -- help
//! ```
//!
//! ## Features demonstrated
//!
//! | Feature              | How to exercise it                                                   |
//! |----------------------|----------------------------------------------------------------------|
//! | Defaults             | `cargo run --example strata_demo`                                    |
//! | Config file (cwd)    | Create `strata-demo.json` in cwd, then run it                        |
//! | Env var override     | `STRATA_DEMO_PORT=9999 cargo run --example strata_demo`              |
//! | Short cluster        | `cargo run --example strata_demo -- -vp 8080`                        |
//! | Greedy alias         | `cargo run --example strata_demo -- --color --not-a-flag`            |
//! | Bypass               | `cargo run --example strata_demo -- -- --port 1`                     |
//! | Help                 | `cargo run --example strata_demo -- --help`                          |
//! | Save                 | `cargo run --example strata_demo -- --save`                          |
//! | Reload on SIGHUP     | `cargo run --example strata_demo -- -w`, edit the file, `kill -HUP`  |
//!
//! Set `RUST_LOG=strata=debug` to see what each layer contributes.

mod config;

use strata::{Outcome, SearchPath, Setting, Strata, StrataError};
use tracing_subscriber::EnvFilter;

use config::DemoConfig;

fn build() -> Result<Strata<DemoConfig>, StrataError> {
    Strata::builder()
        .app_name("strata-demo")
        .search_paths(vec![
            SearchPath::Cwd,
            SearchPath::Home(".strata-demo"),
            SearchPath::Platform,
        ])
        .description("strata demo: a sample CLI app for showcasing layered configuration.")
        .setting(
            Setting::new("name")
                .describe("Application name shown in the banner.")
                .env("STRATA_DEMO_NAME")
                .aliases(["-n", "--name"]),
        )
        .setting(
            Setting::new("verbose")
                .describe("Print the whole configuration.")
                .aliases(["-v", "--verbose"]),
        )
        .setting(
            Setting::new("server.host")
                .describe("Server bind address.")
                .env("STRATA_DEMO_HOST")
                .alias("--host"),
        )
        .setting(
            Setting::new("server.port")
                .describe("Server port.")
                .env("STRATA_DEMO_PORT")
                .aliases(["-p", "--port"]),
        )
        .setting(
            Setting::new("display.color")
                .describe("Banner color.")
                .env("STRATA_DEMO_COLOR")
                .aliases(["-c:", "--color:"]),
        )
        .setting(
            Setting::new("save")
                .describe("Write the resolved configuration to the config file.")
                .alias("--save"),
        )
        .setting(
            Setting::new("watch")
                .describe("Keep running and reload the config file on SIGHUP.")
                .aliases(["-w", "--watch"]),
        )
        .example("strata-demo -vp 8080")
        .example("STRATA_DEMO_COLOR=red strata-demo --save")
        .build(DemoConfig::default())
}

fn print_banner(strata: &Strata<DemoConfig>) {
    strata.read(|c| {
        println!(
            "[{}] {} listening on {}:{} (max {} connections)",
            c.display.color, c.name, c.server.host, c.server.port, c.server.max_connections
        );
        if c.verbose {
            match serde_json::to_string_pretty(c) {
                Ok(json) => println!("{json}"),
                Err(e) => eprintln!("error: {e}"),
            }
        }
    });
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let strata = match build() {
        Ok(strata) => strata,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    if let Outcome::Help(text) = strata.load() {
        print!("{text}");
        return;
    }
    print_banner(&strata);

    if strata.read(|c| c.save) {
        match strata.try_save() {
            Ok(path) => println!("Saved to {}", path.display()),
            Err(e) => {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
    }

    if !strata.read(|c| c.watch) {
        return;
    }

    let handle = match strata.watch() {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("error: cannot install signal handler: {e}");
            std::process::exit(1);
        }
    };
    println!("Watching for SIGHUP (pid {}), Ctrl-C to quit", std::process::id());

    let printer = {
        let strata = strata.clone();
        tokio::spawn(async move {
            let mut last = strata.read(|c| serde_json::to_value(c).ok());
            loop {
                tokio::time::sleep(std::time::Duration::from_millis(500)).await;
                let current = strata.read(|c| serde_json::to_value(c).ok());
                if current != last {
                    print_banner(&strata);
                    last = current;
                }
            }
        })
    };

    let _ = tokio::signal::ctrl_c().await;
    printer.abort();
    handle.shutdown().await;
}
