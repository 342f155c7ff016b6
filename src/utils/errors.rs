//! User-Friendly Error Formatting
//!
//! Renders fatal binary errors with troubleshooting hints for the few ways
//! the host bridge can fail to start or keep running.

use std::fmt::Write;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Format error for user consumption
///
/// Takes technical error and produces user-friendly message with
/// troubleshooting steps and context.
pub fn format_user_error(error: &anyhow::Error) -> String {
    let mut output = String::new();

    writeln!(output).ok();
    writeln!(
        output,
        "╔════════════════════════════════════════════════════════════╗"
    )
    .ok();
    writeln!(
        output,
        "║                     ERROR                                  ║"
    )
    .ok();
    writeln!(
        output,
        "╚════════════════════════════════════════════════════════════╝"
    )
    .ok();
    writeln!(output).ok();

    // Match on the whole chain, the context usually sits on top
    let error_msg = format!("{:#}", error);

    if error_msg.contains("config") {
        format_config_error(&mut output);
    } else if error_msg.contains("Broken pipe")
        || error_msg.contains("stdin")
        || error_msg.contains("stdout")
    {
        format_host_error(&mut output);
    } else if error_msg.contains("log file") {
        format_log_file_error(&mut output);
    } else {
        format_generic_error(&mut output);
    }

    writeln!(output).ok();
    writeln!(output, "{}", RULE).ok();
    writeln!(output, "Technical Details:").ok();
    writeln!(output).ok();
    writeln!(output, "{:#}", error).ok();
    writeln!(output).ok();

    writeln!(output, "{}", RULE).ok();
    writeln!(output, "Need Help?").ok();
    writeln!(
        output,
        "  - Run with --verbose for detailed logs: radiant-input -vv"
    )
    .ok();
    writeln!(
        output,
        "  - Logs go to stderr; stdout carries only the host protocol"
    )
    .ok();

    output
}

fn format_config_error(output: &mut String) {
    writeln!(output, "Configuration Error").ok();
    writeln!(output).ok();
    writeln!(output, "The input engine configuration could not be used.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. TOML syntax error").ok();
    writeln!(output, "     → Check brackets, quotes and [[shortcuts]] tables").ok();
    writeln!(output).ok();
    writeln!(output, "  2. Invalid value").ok();
    writeln!(output, "     → window width/height must be positive").ok();
    writeln!(output, "     → throttle intervals and queue sizes must be > 0").ok();
    writeln!(output, "     → input.platform is auto, macos or other").ok();
    writeln!(output, "     → logging.format is pretty, compact or json").ok();
    writeln!(output).ok();
    writeln!(output, "  3. Start from the defaults").ok();
    writeln!(output, "     → Run: radiant-input --print-default-config").ok();
}

fn format_host_error(output: &mut String) {
    writeln!(output, "Host Connection Error").ok();
    writeln!(output).ok();
    writeln!(
        output,
        "The host process closed the protocol streams unexpectedly."
    )
    .ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. The host UI exited or crashed").ok();
    writeln!(output, "     → Check the host's own logs").ok();
    writeln!(output).ok();
    writeln!(output, "  2. Something else writes to stdout").ok();
    writeln!(output, "     → Only the engine may write protocol lines").ok();
}

fn format_log_file_error(output: &mut String) {
    writeln!(output, "Log File Error").ok();
    writeln!(output).ok();
    writeln!(output, "Could not open the requested log file.").ok();
    writeln!(output).ok();
    writeln!(output, "  → Check that the directory exists and is writable").ok();
    writeln!(output, "  → Or drop --log-file to log to stderr only").ok();
}

fn format_generic_error(output: &mut String) {
    writeln!(output, "Input Engine Error").ok();
    writeln!(output).ok();
    writeln!(output, "The input engine stopped because of an unexpected error.").ok();
}
