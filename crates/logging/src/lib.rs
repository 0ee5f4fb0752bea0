//! Helpers for logging.
//!
//! Everything in the workspace logs through the `log` facade.  Binaries and tests call [log_to_stderr] once at startup
//! to get the output somewhere useful.

/// Level used when `RUST_LOG` isn't set.
const DEFAULT_FILTER: &str = "info";

/// Log to stderr, filtered by `RUST_LOG` (falling back to `info`).
///
/// If called multiple times in the same process, only applies once.  Safe to call from every test.
pub fn log_to_stderr() {
    static ONCE: std::sync::Once = std::sync::Once::new();

    ONCE.call_once(|| {
        let env = env_logger::Env::default().default_filter_or(DEFAULT_FILTER);
        let res = env_logger::Builder::from_env(env)
            .format(|buf, record| {
                use std::io::Write;

                let now = time::OffsetDateTime::now_utc();

                writeln!(
                    buf,
                    "{} {} time={} target={}",
                    record.level(),
                    record.args(),
                    now,
                    record.target()
                )
            })
            .try_init();

        // Someone else got there first, e.g. the embedding application.  Their logger wins.
        if res.is_err() {
            log::debug!("A logger was already installed; leaving it in place");
        }
    });
}
