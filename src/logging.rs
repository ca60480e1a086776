//! Настройка логирования для приложений, встраивающих движок

use std::io::Write;
use env_logger::{Builder, Env};
use log::LevelFilter;

/// Фильтр по умолчанию, если `RUST_LOG` не задан
pub const DEFAULT_FILTER: &str = "warn,reader_sync=info";

/// Инициализировать `env_logger`
///
/// Повторный вызов ничего не делает и возвращает `false`.
pub fn init_logger() -> bool {
    let env = Env::default().filter_or("RUST_LOG", DEFAULT_FILTER);
    let mut builder = Builder::from_env(env);

    builder
        .filter_module("hyper", LevelFilter::Error)
        .filter_module("mio", LevelFilter::Error)
        .filter_module("tokio_util", LevelFilter::Error)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}: {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .target(env_logger::Target::Stderr);

    builder.try_init().is_ok()
}
