//! `tracing` subscriber setup for the server binary.

use tracing_subscriber::EnvFilter;

/// Filter from `RUST_LOG`, else from `level`, else `info` when `level` does
/// not parse as a directive.
pub fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install a stderr subscriber, one JSON object per line when `json` is set
/// and compact text otherwise. Only the first call in a process takes effect.
pub fn init_subscriber(level: &str, json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter_for(level))
        .with_writer(std::io::stderr)
        .with_target(true);
    let installed = if json {
        builder.json().try_init().is_ok()
    } else {
        builder.compact().try_init().is_ok()
    };
    if installed {
        tracing::debug!(level, json, "logging initialised");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_level_falls_back() {
        let filter = filter_for("not a [valid directive");
        assert!(!filter.to_string().is_empty());
    }

    #[test]
    fn second_init_is_ignored() {
        init_subscriber("debug", false);
        init_subscriber("trace", true);
        tracing::info!("subscriber still installed");
    }
}
