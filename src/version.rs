use std::sync::LazyLock;

/// Version of the software from the Cargo package metadata.
pub static VERSION: LazyLock<String> =
    LazyLock::new(|| env!("CARGO_PKG_VERSION").to_string());
