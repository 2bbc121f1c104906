use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` overrides the default
/// `linkbrief=info`; `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("linkbrief=info".parse()?)
        .add_directive("linkbrief_bot=info".parse()?);
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}
