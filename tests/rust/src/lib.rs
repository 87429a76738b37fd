//! Shared fixtures for the integration tests

use std::io::Write;
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;

/// Deterministic, poorly compressible test payload
pub fn payload(size: usize) -> Vec<u8> {
    let mut state: u32 = 0x2545_f491;
    (0..size)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state as u8
        })
        .collect()
}

/// Gzip `data` at the default level
pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("write to Vec cannot fail");
    encoder.finish().expect("finish to Vec cannot fail")
}

/// Write an object below `base`, creating parent directories
pub fn write_object(base: &Path, name: &str, data: &[u8]) {
    let path = base.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent directory");
    }
    std::fs::write(path, data).expect("write test object");
}
