use env_logger::Env;

/// Initializes the logger. A filter set by `RUST_LOG` takes precedence
/// over the verbosity flags of a command.
pub(crate) fn init_logger(verbose: bool, quiet: bool) {
    let level = match (verbose, quiet) {
        (true, _) => "info",
        (_, true) => "error",
        _ => "warn",
    };

    let _ = env_logger::Builder::from_env(
        Env::default().default_filter_or(level),
    )
    .format_timestamp(None)
    .try_init();
}
