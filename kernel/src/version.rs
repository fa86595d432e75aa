// kernel/src/version.rs: build version stamped by `cargo xtask build`.
pub const MAJOR: &str = match option_env!("LASKAR_VERSION_MAJOR") {
    Some(value) => value,
    None => "0",
};
pub const MINOR: &str = match option_env!("LASKAR_VERSION_MINOR") {
    Some(value) => value,
    None => "1",
};
pub const BUILD: &str = match option_env!("LASKAR_BUILD_COUNT") {
    Some(value) => value,
    None => "0",
};
