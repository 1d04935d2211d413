use {
    anyhow::Result,
    std::{
        fs::File,
        path::Path,
        sync::Arc,
    },
    tracing::Level,
    tracing_subscriber::{
        fmt::{
            layer,
            writer::MakeWriterExt,
        },
        layer::SubscriberExt,
        util::SubscriberInitExt,
    },
};

/// Install the global subscriber.
///
/// Events up to `min_level_stdout` are pretty-printed to stdout. When a
/// `log_file` is given, events up to `min_level_file` are also written to
/// it without ANSI colors. Fails if a subscriber is already installed.
pub fn setup_logging(
    log_file: Option<&Path>,
    min_level_file: Level,
    min_level_stdout: Level,
) -> Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            let file = Arc::new(File::create(path)?);
            Some(
                layer()
                    .with_writer(file.with_max_level(min_level_file))
                    .with_ansi(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(
            layer()
                .with_writer(std::io::stdout.with_max_level(min_level_stdout))
                .compact()
                .pretty()
                .with_line_number(true)
                .with_thread_ids(false)
                .with_target(false),
        )
        .try_init()?;

    Ok(())
}
