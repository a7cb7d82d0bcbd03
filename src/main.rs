use std::process::ExitCode;

use glowtree::config::SceneParams;
use glowtree::viewer::{self, ViewerOptions};

/// Environment variable holding a fixed random seed.
const SEED_VAR: &str = "GLOWTREE_SEED";
/// Environment variable overriding the emblem model path.
const EMBLEM_VAR: &str = "GLOWTREE_EMBLEM";

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut options = ViewerOptions::default();
    if let Some(path) = std::env::args_os().nth(1) {
        match SceneParams::from_json_file(&path) {
            Ok(params) => options.params = params,
            Err(err) => {
                log::error!("{err}");
                return ExitCode::FAILURE;
            }
        }
    }
    if let Ok(raw) = std::env::var(SEED_VAR) {
        match raw.parse() {
            Ok(seed) => options.seed = Some(seed),
            Err(_) => log::warn!("ignoring {SEED_VAR}={raw:?}: not an unsigned integer"),
        }
    }

    if let Some(path) = std::env::var_os(EMBLEM_VAR) {
        options.emblem_path = path.into();
    }

    match viewer::run(options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
