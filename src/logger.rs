use log::LevelFilter;
use env_logger::Builder;
use std::io::Write;
use chrono::Local;

/// Installs the line logger. `RUST_LOG`, when set, overrides `level`.
pub fn init(level: LevelFilter) {
    Builder::new()
        .format(|buf, record| {
            writeln!(buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, level)
        .parse_env("RUST_LOG")
        .init();

    log::debug!("Logger initialized at {}.", level);
}
