//! shell-mask - masks bound secrets from stdin to stdout.

use shell_mask::audit::AuditLogger;
use shell_mask::config::Config;
use shell_mask::output::{MaskingWriter, pump};

use std::io;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Logs go to stderr; stdout carries the masked stream.
///
/// Level comes from `SHELL_MASK_LOG`, default `shell_mask=warn`.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("SHELL_MASK_LOG")
        .unwrap_or_else(|_| EnvFilter::new("shell_mask=warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    init_tracing();

    // Nothing is forwarded until every secret is bound: an unmasked
    // stream is worse than no stream.
    let cwd = std::env::current_dir().ok();
    let compiled = match Config::load(cwd.as_deref()).and_then(Config::compile) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return ExitCode::from(2);
        }
    };

    let bindings = match compiled.resolve_bindings(|name| std::env::var_os(name)) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return ExitCode::from(2);
        }
    };

    let filter = match compiled.build_filter(&bindings) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return ExitCode::from(2);
        }
    };
    tracing::debug!(
        secrets = bindings.len(),
        dialect = %compiled.dialect,
        chunk_size = compiled.chunk_size,
        "starting masking pipe"
    );

    let mut writer = MaskingWriter::new(io::stdout().lock(), filter);
    let result = pump(&mut io::stdin().lock(), &mut writer, compiled.chunk_size)
        .and_then(|_| writer.finish());
    let stats = match result {
        Ok((_, stats)) => stats,
        Err(e) => {
            eprintln!("I/O error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if compiled.raw.audit.enabled
        && let Some(path) = &compiled.raw.audit.path
    {
        let logged = AuditLogger::open(Path::new(path)).and_then(|mut l| l.log_stats(&stats));
        if let Err(e) = logged {
            tracing::warn!(path = %path, error = %e, "failed to write audit log");
        }
    }

    ExitCode::SUCCESS
}
