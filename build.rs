use std::process::Command;

/// Build identifier logged at startup. Release pipelines without a `.git`
/// directory pass it in through `BUILD_REVISION`.
fn revision() -> String {
    if let Ok(rev) = std::env::var("BUILD_REVISION") {
        if !rev.trim().is_empty() {
            return rev.trim().to_string();
        }
    }

    Command::new("git")
        .args(["rev-parse", "--short=10", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .filter(|rev| !rev.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn main() {
    println!("cargo:rustc-env=GIT_HASH={}", revision());
    println!("cargo:rerun-if-env-changed=BUILD_REVISION");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads");
}
