/// Initialize the stderr logger; stdout is reserved for responses.
///
/// # Arguments
/// * `verbose` - Verbosity level (0=info, 1=debug, 2+=trace)
pub fn setup_logger(verbose: u8) {
    let env_filter = match verbose {
        0 => "lockpool=info",
        1 => "lockpool=debug",
        _ => "lockpool=trace",
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(env_filter))
        .format_timestamp(None)
        .format_target(false)
        .target(env_logger::Target::Stderr)
        .init();
}
