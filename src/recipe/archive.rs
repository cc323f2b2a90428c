// src/recipe/archive.rs

//! Archive source utilities: fetch, checksum and unpack

use crate::error::{Error, Result};
use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use reqwest::blocking::Client;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tar::Archive;
use tracing::{debug, info};
use url::Url;
use xz2::read::XzDecoder;
use zip::read::ZipArchive;

/// Default timeout for HTTP requests
const HTTP_TIMEOUT: Duration = Duration::from_secs(300);

/// Supported archive compressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Tar,
    TarGz,
    TarXz,
    TarBz2,
    Zip,
}

impl ArchiveFormat {
    /// Detect the format from a file name
    ///
    /// Supports: .tar, .tar.gz, .tgz, .tar.xz, .txz, .tar.bz2, .tbz2, .tb2, .zip
    pub fn detect(filename: &str) -> Result<Self> {
        if filename.ends_with(".tar.gz") || filename.ends_with(".tgz") {
            Ok(Self::TarGz)
        } else if filename.ends_with(".tar.xz") || filename.ends_with(".txz") {
            Ok(Self::TarXz)
        } else if [".tar.bz2", ".tbz2", ".tb2"]
            .iter()
            .any(|ext| filename.ends_with(ext))
        {
            Ok(Self::TarBz2)
        } else if filename.ends_with(".zip") {
            Ok(Self::Zip)
        } else if filename.ends_with(".tar") {
            Ok(Self::Tar)
        } else {
            Err(Error::ParseError(format!(
                "Unknown archive format: {}",
                filename
            )))
        }
    }
}

/// Last path segment of an archive URI
pub fn archive_filename(uri: &str) -> String {
    let path = match Url::parse(uri) {
        Ok(url) if url.scheme() != "file" => url.path().to_string(),
        _ => uri.trim_start_matches("file://").to_string(),
    };
    path.rsplit('/')
        .find(|s| !s.is_empty())
        .unwrap_or("source.tar.gz")
        .to_string()
}

/// Fetch `uri` to `dest`
///
/// http(s) URIs are downloaded; `file://` URIs and plain paths are copied.
pub fn fetch_file(uri: &str, dest: &Path) -> Result<()> {
    match Url::parse(uri) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => download_file(url, dest),
        Ok(url) if url.scheme() == "file" => {
            let path = url
                .to_file_path()
                .map_err(|_| Error::ParseError(format!("Invalid file URI: {}", uri)))?;
            copy_file(&path, dest)
        }
        _ => copy_file(Path::new(uri), dest),
    }
}

fn copy_file(src: &Path, dest: &Path) -> Result<()> {
    debug!("Copying archive {} -> {}", src.display(), dest.display());
    fs::copy(src, dest).map_err(|e| {
        Error::DownloadError(format!("Failed to copy {}: {}", src.display(), e))
    })?;
    Ok(())
}

fn download_file(url: Url, dest: &Path) -> Result<()> {
    info!("Downloading {}", url);

    let client = Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|e| Error::DownloadError(format!("Failed to create HTTP client: {e}")))?;

    let mut response = client
        .get(url.clone())
        .send()
        .map_err(|e| Error::DownloadError(format!("Failed to download {}: {}", url, e)))?;

    if !response.status().is_success() {
        return Err(Error::DownloadError(format!(
            "Failed to download {}: HTTP {}",
            url,
            response.status()
        )));
    }

    let mut file = File::create(dest)?;
    let bytes = io::copy(&mut response, &mut file)
        .map_err(|e| Error::IoError(format!("Failed to write {}: {}", dest.display(), e)))?;
    file.sync_all()?;

    debug!("Downloaded {} bytes to {}", bytes, dest.display());
    Ok(())
}

/// Hex sha256 of a file
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Verify file checksum
///
/// The expected checksum should be in the format `sha256:<hex>`.
pub fn verify_file_checksum(path: &Path, expected: &str) -> Result<()> {
    let expected_hash = expected.strip_prefix("sha256:").ok_or_else(|| {
        Error::ParseError(format!(
            "Unsupported checksum: {} (supported: sha256)",
            expected
        ))
    })?;

    let actual = sha256_file(path)?;
    if !actual.eq_ignore_ascii_case(expected_hash) {
        return Err(Error::ChecksumMismatch {
            name: path.display().to_string(),
            expected: expected_hash.to_string(),
            actual,
        });
    }

    Ok(())
}

/// Extract an archive into `dest`
pub fn extract_archive(archive: &Path, format: ArchiveFormat, dest: &Path) -> Result<()> {
    let file = File::open(archive).map_err(|e| {
        Error::IoError(format!("Failed to open archive {}: {}", archive.display(), e))
    })?;

    fs::create_dir_all(dest)?;
    let reader: Box<dyn Read> = match format {
        ArchiveFormat::Tar => Box::new(file),
        ArchiveFormat::TarGz => Box::new(GzDecoder::new(file)),
        ArchiveFormat::TarXz => Box::new(XzDecoder::new(file)),
        ArchiveFormat::TarBz2 => Box::new(BzDecoder::new(file)),
        ArchiveFormat::Zip => return extract_zip(archive, file, dest),
    };

    Archive::new(reader).unpack(dest).map_err(|e| {
        Error::IoError(format!("Failed to extract {}: {}", archive.display(), e))
    })?;

    Ok(())
}

fn extract_zip(archive: &Path, file: File, dest: &Path) -> Result<()> {
    let mut zip = ZipArchive::new(file).map_err(|e| {
        Error::IoError(format!("Failed to read zip {}: {}", archive.display(), e))
    })?;
    debug!("Extracting {} zip entries from {}", zip.len(), archive.display());
    zip.extract(dest).map_err(|e| {
        Error::IoError(format!("Failed to extract {}: {}", archive.display(), e))
    })
}

/// Directory holding the unpacked sources
///
/// Most tarballs wrap everything in a single top-level directory; in that
/// case the tree starts inside it.
pub fn source_root(unpacked: &Path) -> Result<PathBuf> {
    let mut entries = fs::read_dir(unpacked)?.collect::<io::Result<Vec<_>>>()?;
    if entries.len() == 1 && entries[0].file_type()?.is_dir() {
        return Ok(entries.remove(0).path());
    }
    Ok(unpacked.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_detect_format() {
        assert_eq!(ArchiveFormat::detect("x-1.0.tar.gz").unwrap(), ArchiveFormat::TarGz);
        assert_eq!(ArchiveFormat::detect("x-1.0.tgz").unwrap(), ArchiveFormat::TarGz);
        assert_eq!(ArchiveFormat::detect("x-1.0.tar.xz").unwrap(), ArchiveFormat::TarXz);
        assert_eq!(ArchiveFormat::detect("x-1.0.tar").unwrap(), ArchiveFormat::Tar);
        assert_eq!(ArchiveFormat::detect("x-1.0.tar.bz2").unwrap(), ArchiveFormat::TarBz2);
        assert_eq!(ArchiveFormat::detect("x-1.0.tbz2").unwrap(), ArchiveFormat::TarBz2);
        assert_eq!(ArchiveFormat::detect("x-1.0.tb2").unwrap(), ArchiveFormat::TarBz2);
        assert_eq!(ArchiveFormat::detect("x-1.0.zip").unwrap(), ArchiveFormat::Zip);
        assert!(ArchiveFormat::detect("x-1.0.rar").is_err());
    }

    #[test]
    fn test_archive_filename() {
        assert_eq!(
            archive_filename("https://example.com/dl/ag-0.30.0.tar.gz?x=1"),
            "ag-0.30.0.tar.gz"
        );
        assert_eq!(archive_filename("/tmp/pkgs/vim.tar.xz"), "vim.tar.xz");
        assert_eq!(archive_filename("file:///tmp/pkgs/vim.tar"), "vim.tar");
    }

    #[test]
    fn test_verify_checksum() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data");
        fs::write(&path, b"hello").unwrap();

        let good = "sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
        verify_file_checksum(&path, good).unwrap();

        let bad = format!("sha256:{}", "0".repeat(64));
        assert!(matches!(
            verify_file_checksum(&path, &bad),
            Err(Error::ChecksumMismatch { .. })
        ));
        assert!(verify_file_checksum(&path, "md5:abc").is_err());
    }

    #[test]
    fn test_extract_and_source_root() {
        let temp = TempDir::new().unwrap();
        let staging = temp.path().join("staging");
        fs::create_dir_all(staging.join("tool-1.0/bin")).unwrap();
        fs::write(staging.join("tool-1.0/bin/tool"), b"#!/bin/sh\n").unwrap();

        let tarball = temp.path().join("tool-1.0.tar.gz");
        {
            let file = File::create(&tarball).unwrap();
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            let mut builder = tar::Builder::new(encoder);
            builder.append_dir_all("tool-1.0", staging.join("tool-1.0")).unwrap();
            builder.into_inner().unwrap().finish().unwrap();
        }

        let out = temp.path().join("out");
        extract_archive(&tarball, ArchiveFormat::TarGz, &out).unwrap();

        let root = source_root(&out).unwrap();
        assert_eq!(root, out.join("tool-1.0"));
        assert!(root.join("bin/tool").exists());
    }

    #[test]
    fn test_extract_tar_bz2() {
        let temp = TempDir::new().unwrap();
        let staging = temp.path().join("staging/tool-1.0");
        fs::create_dir_all(&staging).unwrap();
        fs::write(staging.join("configure"), b"#!/bin/sh\n").unwrap();

        let tarball = temp.path().join("tool-1.0.tar.bz2");
        {
            let file = File::create(&tarball).unwrap();
            let encoder = bzip2::write::BzEncoder::new(file, bzip2::Compression::default());
            let mut builder = tar::Builder::new(encoder);
            builder.append_dir_all("tool-1.0", &staging).unwrap();
            builder.into_inner().unwrap().finish().unwrap();
        }

        let out = temp.path().join("out");
        let format = ArchiveFormat::detect(&archive_filename(&tarball.to_string_lossy())).unwrap();
        extract_archive(&tarball, format, &out).unwrap();
        assert!(source_root(&out).unwrap().join("configure").exists());
    }

    #[test]
    fn test_extract_zip() {
        use std::io::Write;

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tool-1.0.zip");
        {
            let file = File::create(&path).unwrap();
            let mut zip = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default();
            zip.add_directory("tool-1.0/src/", options).unwrap();
            zip.start_file("tool-1.0/src/main.c", options).unwrap();
            zip.write_all(b"int main(void) { return 0; }\n").unwrap();
            zip.finish().unwrap();
        }

        let out = temp.path().join("out");
        extract_archive(&path, ArchiveFormat::Zip, &out).unwrap();

        let root = source_root(&out).unwrap();
        assert_eq!(root, out.join("tool-1.0"));
        assert_eq!(
            fs::read_to_string(root.join("src/main.c")).unwrap(),
            "int main(void) { return 0; }\n"
        );
    }
}
