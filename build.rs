//! Build script for radiant-input
//!
//! Stamps the binary with build date, time and git revision for the startup
//! banner.

use std::process::Command;

fn run(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!text.is_empty()).then_some(text)
}

fn main() {
    let stamps = [
        ("BUILD_DATE", run("date", &["+%Y-%m-%d"]), "unknown"),
        ("BUILD_TIME", run("date", &["+%H:%M:%S"]), ""),
        ("GIT_HASH", run("git", &["rev-parse", "--short", "HEAD"]), "unknown"),
    ];
    for (name, value, fallback) in stamps {
        println!(
            "cargo:rustc-env={}={}",
            name,
            value.as_deref().unwrap_or(fallback)
        );
    }

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=build.rs");
}
