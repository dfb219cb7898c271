//! Embeds build identification for the startup log and `/health`
//!
//! `GIT_HASH`, `BUILD_TIMESTAMP` and `BUILD_PROFILE` are always set;
//! `GIT_HASH` is `unknown` outside a git checkout.

use std::path::Path;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    // Rebuild when the checked-out commit moves, not on every source edit
    for git_file in ["../.git/HEAD", "../.git/index"] {
        if Path::new(git_file).exists() {
            println!("cargo:rerun-if-changed={}", git_file);
        }
    }

    let vars = [
        ("GIT_HASH", git_short_hash().unwrap_or_else(|| "unknown".to_string())),
        (
            "BUILD_TIMESTAMP",
            chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        ),
        (
            "BUILD_PROFILE",
            std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string()),
        ),
    ];
    for (name, value) in vars {
        println!("cargo:rustc-env={}={}", name, value);
    }
}

fn git_short_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?.trim().to_string();
    (!hash.is_empty()).then_some(hash)
}
