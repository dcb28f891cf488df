//! Tracing setup for the terminal.

use tracing_subscriber::fmt::format;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Longest message field printed before it gets cut.
const MAX_MESSAGE_CHARS: usize = 280;

/// Initialize tracing with a compact terminal formatter.
///
/// `RUST_LOG` wins over the `debug` flag when set.
pub fn init_tracing(debug: bool) {
    let field_formatter = format::debug_fn(|writer, field, value| {
        let field_name = field.name();

        if field_name == "message" {
            let formatted = format!("{value:?}");
            let (truncated, was_truncated) = truncate_for_log(&formatted, MAX_MESSAGE_CHARS);
            if was_truncated {
                write!(writer, "{field_name}={truncated}...")
            } else {
                write!(writer, "{field_name}={formatted}")
            }
        } else {
            write!(writer, "{field_name}={value:?}")
        }
    });

    let fmt_layer = tracing_subscriber::fmt::layer()
        .fmt_fields(field_formatter)
        .compact();

    tracing_subscriber::registry()
        .with(build_env_filter(debug))
        .with(fmt_layer)
        .init();
}

fn build_env_filter(debug: bool) -> tracing_subscriber::EnvFilter {
    if let Ok(filter) = tracing_subscriber::EnvFilter::try_from_default_env() {
        return filter;
    }
    if debug {
        tracing_subscriber::EnvFilter::new("lifegiver=debug,serenity=info")
    } else {
        tracing_subscriber::EnvFilter::new("lifegiver=info,serenity=warn")
    }
}

fn truncate_for_log(message: &str, max_chars: usize) -> (&str, bool) {
    match message.char_indices().nth(max_chars) {
        Some((byte_index, _character)) => (&message[..byte_index], true),
        None => (message, false),
    }
}
