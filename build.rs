//! Build hints for linking the FFmpeg libraries on Windows.
//!
//! `ffmpeg-next` finds the libraries through `FFMPEG_DIR` or vcpkg. When
//! neither is configured the link step fails with an unhelpful message, so
//! print what to set instead.

use std::env;
use std::path::PathBuf;

const WATCHED_VARIABLES: [&str; 4] = ["FFMPEG_DIR", "VCPKG_ROOT", "VCPKGRS_DYNAMIC", "VCPKGRS_TRIPLET"];

fn warn(message: impl AsRef<str>) {
    println!("cargo:warning=mediafold: {}", message.as_ref());
}

fn main() {
    for variable in WATCHED_VARIABLES {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    if env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("windows") || env::var_os("FFMPEG_DIR").is_some() {
        return;
    }

    let Some(vcpkg_root) = env::var_os("VCPKG_ROOT") else {
        warn("FFMPEG_DIR is not set; point it at an FFmpeg install (or set VCPKG_ROOT) before building.");
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let install = PathBuf::from(vcpkg_root).join("installed").join(&triplet);

    if !install.exists() {
        warn(format!("no vcpkg FFmpeg found for triplet {triplet} at {}.", install.display()));
        return;
    }

    warn(format!("using vcpkg FFmpeg at {}; set FFMPEG_DIR to it to silence this hint.", install.display()));
    if env::var_os("VCPKGRS_DYNAMIC").is_none() {
        warn("set VCPKGRS_DYNAMIC=1 if the vcpkg FFmpeg is a dynamic build.");
    }
    warn("the ffmpeg executable used at run time is looked up separately: bin\\ffmpeg.exe beside mediafold.exe, MEDIAFOLD_FFMPEG, or PATH.");
}
