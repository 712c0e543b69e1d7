//! Fetching and opening GeoNames dump files.

use std::fs::File;
use std::io::{BufReader, Read, Seek, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use zip::ZipArchive;

pub const DEFAULT_DUMP_URL: &str = "http://download.geonames.org/export/dump/allCountries.zip";

/// Container format of a dump file, from its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpFormat {
    Text,
    Zip,
    Gzip,
}

impl DumpFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("zip") => DumpFormat::Zip,
            Some(ext) if ext.eq_ignore_ascii_case("gz") => DumpFormat::Gzip,
            _ => DumpFormat::Text,
        }
    }
}

/// File name component of a dump URL
pub fn file_name_from_url(url: &str) -> String {
    url.split('/')
        .last()
        .filter(|s| !s.is_empty())
        .unwrap_or("allCountries.zip")
        .to_string()
}

/// Source name recorded on indexed documents: the file name up to its first
/// dot, so `US.zip` and `US.txt` both import as `US`.
pub fn dump_source(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.split('.').next())
        .filter(|n| !n.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

/// Download `url` into `dir`, reusing a previously downloaded file.
///
/// The body is streamed into a temporary file in the same directory and
/// only moved into place once complete.
pub async fn download_dump(client: &reqwest::Client, url: &str, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create download directory {}", dir.display()))?;

    let target = dir.join(file_name_from_url(url));
    if target.exists() {
        info!("File {} exists, skipping download", target.display());
        return Ok(target);
    }

    info!("Downloading {}...", url);
    let response = client
        .get(url)
        .send()
        .await
        .context("Download request failed")?
        .error_for_status()
        .context("Download returned an error status")?;

    let pb = match response.content_length() {
        Some(len) => {
            let pb = ProgressBar::new(len);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})",
                    )?
                    .progress_chars("#>-"),
            );
            pb
        }
        None => ProgressBar::new_spinner(),
    };

    let mut staging = tempfile::NamedTempFile::new_in(dir)?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("Download interrupted")?;
        staging.write_all(&chunk)?;
        pb.inc(chunk.len() as u64);
    }
    staging.flush()?;
    pb.finish_with_message("Download complete");

    staging
        .persist(&target)
        .with_context(|| format!("Failed to move download to {}", target.display()))?;

    info!("Saved {}", target.display());
    Ok(target)
}

/// Name of the dump entry inside a GeoNames zip: `US.zip` holds `US.txt`
/// next to a readme.
pub fn zip_entry_name<R: Read + Seek>(archive: &ZipArchive<R>, path: &Path) -> Result<String> {
    let expected = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(|stem| format!("{}.txt", stem));

    let names: Vec<&str> = archive.file_names().collect();

    if let Some(ref expected) = expected {
        if names.iter().any(|n| *n == expected.as_str()) {
            return Ok(expected.clone());
        }
    }

    names
        .into_iter()
        .find(|n| n.ends_with(".txt") && !n.eq_ignore_ascii_case("readme.txt"))
        .map(String::from)
        .with_context(|| format!("No dump entry found in {}", path.display()))
}

/// Open a zip dump
pub fn open_zip(path: &Path) -> Result<ZipArchive<BufReader<File>>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    ZipArchive::new(BufReader::new(file))
        .with_context(|| format!("Failed to read zip archive {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use zip::write::SimpleFileOptions;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(DumpFormat::from_path(Path::new("allCountries.zip")), DumpFormat::Zip);
        assert_eq!(DumpFormat::from_path(Path::new("cities500.TXT")), DumpFormat::Text);
        assert_eq!(DumpFormat::from_path(Path::new("US.txt.gz")), DumpFormat::Gzip);
        assert_eq!(DumpFormat::from_path(Path::new("dump")), DumpFormat::Text);
    }

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(file_name_from_url(DEFAULT_DUMP_URL), "allCountries.zip");
        assert_eq!(
            file_name_from_url("http://download.geonames.org/export/dump/US.zip"),
            "US.zip"
        );
        assert_eq!(file_name_from_url("http://example.com/"), "allCountries.zip");
    }

    #[test]
    fn test_dump_source() {
        assert_eq!(dump_source(Path::new("data/US.zip")), "US");
        assert_eq!(dump_source(Path::new("allCountries.txt.gz")), "allCountries");
        assert_eq!(dump_source(Path::new("/tmp/cities500.txt")), "cities500");
        assert_eq!(dump_source(Path::new(".hidden")), "unknown");
    }

    #[test]
    fn test_zip_entry_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("AD.zip");

        let file = File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer.start_file("readme.txt", SimpleFileOptions::default()).unwrap();
        writer.write_all(b"readme").unwrap();
        writer.start_file("AD.txt", SimpleFileOptions::default()).unwrap();
        writer.write_all(b"3039168\t...").unwrap();
        writer.finish().unwrap();

        let archive = open_zip(&path).unwrap();
        assert_eq!(zip_entry_name(&archive, &path).unwrap(), "AD.txt");

        // Renamed archive falls back to the first non-readme text entry
        let renamed = dir.path().join("andorra.zip");
        std::fs::copy(&path, &renamed).unwrap();
        let archive = open_zip(&renamed).unwrap();
        assert_eq!(zip_entry_name(&archive, &renamed).unwrap(), "AD.txt");
    }
}
