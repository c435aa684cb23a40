use std::env;
use std::process::Command;

const SHA_VAR: &str = "GENEPAIR_LLR_GIT_SHA";

/// Short hash of HEAD, or None outside a git checkout.
fn git_short_sha() -> Option<String> {
    let output = Command::new("git").args(["rev-parse", "--short", "HEAD"]).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!sha.is_empty()).then_some(sha)
}

fn main() {
    println!("cargo:rerun-if-env-changed={}", SHA_VAR);
    println!("cargo:rerun-if-changed=.git/HEAD");

    // an explicit value (packaging, CI) wins over the checkout
    let sha = env::var(SHA_VAR)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(git_short_sha);

    if let Some(sha) = sha {
        println!("cargo:rustc-env={}={}", SHA_VAR, sha);
    }
}
