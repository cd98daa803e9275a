use std::env;
use std::process::Command;

// Embeds the short git SHA so reports can carry an exact build identity.
// An explicit OMICSTAT_GIT_SHA wins over whatever git reports.
fn main() {
    println!("cargo:rerun-if-env-changed=OMICSTAT_GIT_SHA");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs");

    let sha = env::var("OMICSTAT_GIT_SHA").ok().or_else(git_short_sha);
    if let Some(sha) = sha {
        let sha = sha.trim().to_string();
        if !sha.is_empty() {
            println!("cargo:rustc-env=OMICSTAT_GIT_SHA={}", sha);
        }
    }
}

fn git_short_sha() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if output.status.success() {
        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        None
    }
}
