use std::process::Command;
use std::env;

fn main() {
    // Set build-time environment variables
    set_build_info();

    // Platform-specific cfg flags used by the MTU probe
    set_platform_config();

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=Cargo.toml");
}

fn set_build_info() {
    let build_time = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
    println!("cargo:rustc-env=BUILD_TIME={}", build_time);

    // Get git commit hash if available
    let commit = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=GIT_COMMIT={}", commit);

    let target = env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());
    println!("cargo:rustc-env=TARGET_TRIPLE={}", target);
}

fn set_platform_config() {
    println!("cargo::rustc-check-cfg=cfg(linux_platform)");
    println!("cargo::rustc-check-cfg=cfg(windows_platform)");

    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    match target_os.as_str() {
        "windows" => println!("cargo:rustc-cfg=windows_platform"),
        "linux" => println!("cargo:rustc-cfg=linux_platform"),
        _ => {}
    }
}
