//! apk2aab - APK to Android App Bundle conversion
//!
//! Converts an APK into a minimal AAB, signs it with a local keystore and
//! inspects the result, orchestrating Java, keytool, jarsigner and
//! bundletool.
//!
//! ## Architecture
//!
//! - `apk2aab-core`: configuration, errors, logging and external tool execution
//! - `apk2aab-android-toolchain`: Java probe, bundletool download, keystore management
//! - `apk2aab-build-engine`: bundle construction, signing, inspection and analysis

#![warn(clippy::all)]

pub mod commands;

// Re-export main components for library usage
pub use apk2aab_android_toolchain as toolchain;
pub use apk2aab_build_engine as build;
pub use apk2aab_core as core;

