use std::path::Path;

/// Initialise `env_logger` once for the process.
///
/// The TUI owns the terminal, so logs go to `log_path`; if the file cannot be
/// opened they fall back to stderr. `RUST_LOG` overrides the `info` default.
pub fn init(log_path: &Path) {
    use env_logger::{Env, Target};
    use std::fs;
    use std::io;

    let target = (|| -> io::Result<Target> {
        if let Some(parent) = log_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;
        Ok(Target::Pipe(Box::new(file)))
    })()
    .unwrap_or(Target::Stderr);

    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(target)
        .try_init();
}
