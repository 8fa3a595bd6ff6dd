//! Build plumbing for the BPF side of the workspace.
//!
//! `schedlab-ebpf` only compiles for BPF targets and is excluded from the
//! workspace's default members, so `cargo xtask build-ebpf` drives the
//! nightly build and reports where the object landed. The release path is
//! the one the `schedlab` binary probes on its own; anything else has to be
//! handed over via `--bpf-object` or `SCHEDLAB_BPF_OBJ`.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

/// Object name produced by the schedlab-ebpf package.
const BPF_OBJECT: &str = "schedlab";

#[derive(Parser)]
struct Args {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Compile the scheduler tracepoint programs with the nightly toolchain
    BuildEbpf {
        /// BPF target triple
        #[arg(long, default_value = "bpfel-unknown-none")]
        target: String,
        /// Optimized build; this is the profile the tracer searches by default
        #[arg(long)]
        release: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Cmd::BuildEbpf { target, release } => build_ebpf(&target, release),
    }
}

fn build_ebpf(target: &str, release: bool) -> Result<()> {
    let root = workspace_root();

    let mut cmd = Command::new("cargo");
    cmd.current_dir(&root)
        .args(["+nightly", "build", "--package", "schedlab-ebpf"])
        .args(["--target", target])
        .args(["-Z", "build-std=core"]);
    if release {
        cmd.arg("--release");
    }

    let status = cmd.status().context("failed to run the nightly cargo build")?;
    if !status.success() {
        bail!("BPF build failed ({status})");
    }

    let profile = if release { "release" } else { "debug" };
    let object = root.join("target").join(target).join(profile).join(BPF_OBJECT);
    if !object.exists() {
        bail!("build succeeded but no object at {}", object.display());
    }

    println!("BPF object ready: {}", object.display());
    if release {
        println!("schedlab picks this path up on its own when run from the workspace root");
    } else {
        println!("debug objects are off the tracer's search path; run with");
        println!("  sudo schedlab --bpf-object {}", object.display());
    }
    Ok(())
}

/// The xtask package sits one level below the workspace root.
fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}
