/// Version reported by `--version`. Overridable at build time through the
/// APP_VERSION environment variable, falling back to the crate version.
pub const VERSION: &str = match option_env!("APP_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};
