//! Interactive viewer
//!
//! ```text
//! lumen [CONFIG.ron]
//! lumen --dump-config
//! ```
//!
//! Without a config file the built-in defaults are used: an orange cube
//! and a green icosphere, toggled with `M`. Their `shaders/` and `assets/`
//! paths are looked up next to the executable, then in the working directory.

use std::path::PathBuf;
use std::process::ExitCode;

use lumen::core::{self, RendererConfig};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            eprintln!("lumen: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> lumen::Result<()> {
    let arg = std::env::args().nth(1);
    let config = match arg.as_deref() {
        Some("--dump-config") => {
            let text = RendererConfig::default()
                .to_ron()
                .map_err(|message| lumen::Error::Config {
                    path: "<defaults>".into(),
                    message,
                })?;
            println!("{text}");
            return Ok(());
        }
        Some(path) => RendererConfig::load(path)?,
        None => default_config(),
    };

    core::run(config)
}

fn default_config() -> RendererConfig {
    let config = RendererConfig::default();
    let install_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(PathBuf::from));

    match install_dir {
        Some(dir) if dir.join(&config.shaders.directory).is_dir() => {
            config.with_base_directory(dir)
        }
        _ => config,
    }
}
