use crate::config::LogConfig;
use env_logger::{Builder, Env, Target};
use std::fs::OpenOptions;
use std::io;

fn builder(config: &LogConfig) -> io::Result<Builder> {
    // RUST_LOG wins over the configured level.
    let mut builder = Builder::from_env(Env::default().default_filter_or(config.level.as_str()));
    builder.format_timestamp_secs();
    if let Some(path) = &config.file {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(Target::Pipe(Box::new(file)));
    }
    Ok(builder)
}

/// Install the global logger. Calling it again is a no-op.
pub fn init(config: &LogConfig) -> io::Result<()> {
    if builder(config)?.try_init().is_err() {
        log::debug!("Logger already initialised");
    }
    Ok(())
}
