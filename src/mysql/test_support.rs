// ABOUTME: Test helpers standing in for a container runtime
// ABOUTME: Shell scripts receive `exec -i <name> bash -c <line>` like docker would

use super::{ConnectionOptions, ServerConnection, StaticCredentials};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

/// Write an executable `sh` script named `runtime` into `dir`; returns its path.
/// The shell line a real runtime would run arrives as `$6`.
pub(crate) fn fake_runtime(dir: &Path, body: &str) -> String {
    let path = dir.join("runtime");
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}

/// Container connection whose runtime is `runtime`, with a fixed password
pub(crate) fn runtime_connection(runtime: &str) -> ServerConnection {
    ServerConnection::new(
        ConnectionOptions {
            container: Some("db".to_string()),
            container_runtime: Some(runtime.to_string()),
            password: Some("pw".to_string()),
            ..Default::default()
        },
        &StaticCredentials::new("unused"),
    )
    .unwrap()
}
