//! Archive extraction (zip, tar, tar.gz, tar.bz2, tar.xz, 7z and optionally rar).
//!
//! Every format feeds its entries through one [`EntryWriter`], which decides per
//! entry whether it may be written at all: names that are absolute or climb out of
//! the destination are rejected, as are file types a stylesheet mod has no use for.
//! A bad entry is logged and skipped; the rest of the archive is still extracted.
//! The file-count and total-size caps are enforced while writing, so a hostile
//! archive stops extracting as soon as it crosses one.

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use super::validator::ValidationLimits;
use crate::error::{ModError, Result};

/// Extensions an archive entry must have to be written
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "css", "png", "jpg", "jpeg", "gif", "svg", "webp", "ttf", "otf", "woff", "woff2", "eot", "ico",
];

/// Supported archive types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveType {
    Zip,
    Tar,
    TarGz,
    TarBz2,
    TarXz,
    SevenZip,
    Rar,
}

impl ArchiveType {
    /// Detect archive type from file extension. Bare `.gz`/`.bz2`/`.xz` are taken as tarballs.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_lowercase();

        if name.ends_with(".zip") {
            Some(ArchiveType::Zip)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") || name.ends_with(".gz") {
            Some(ArchiveType::TarGz)
        } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") || name.ends_with(".bz2") {
            Some(ArchiveType::TarBz2)
        } else if name.ends_with(".tar.xz") || name.ends_with(".txz") || name.ends_with(".xz") {
            Some(ArchiveType::TarXz)
        } else if name.ends_with(".tar") {
            Some(ArchiveType::Tar)
        } else if name.ends_with(".7z") {
            Some(ArchiveType::SevenZip)
        } else if name.ends_with(".rar") {
            Some(ArchiveType::Rar)
        } else {
            None
        }
    }

    /// Detect archive type from a Content-Type header
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let ct = content_type.to_lowercase();

        if ct.contains("x-7z") {
            Some(ArchiveType::SevenZip)
        } else if ct.contains("rar") {
            Some(ArchiveType::Rar)
        } else if ct.contains("gzip") {
            Some(ArchiveType::TarGz)
        } else if ct.contains("bzip2") {
            Some(ArchiveType::TarBz2)
        } else if ct.contains("x-xz") {
            Some(ArchiveType::TarXz)
        } else if ct.contains("x-tar") {
            Some(ArchiveType::Tar)
        } else if ct.contains("zip") {
            Some(ArchiveType::Zip)
        } else {
            None
        }
    }

    fn backend(self) -> Option<Box<dyn ArchiveBackend>> {
        match self {
            ArchiveType::Zip => Some(Box::new(ZipBackend)),
            ArchiveType::Tar => Some(Box::new(TarBackend(Compression::None))),
            ArchiveType::TarGz => Some(Box::new(TarBackend(Compression::Gzip))),
            ArchiveType::TarBz2 => Some(Box::new(TarBackend(Compression::Bzip2))),
            ArchiveType::TarXz => Some(Box::new(TarBackend(Compression::Xz))),
            ArchiveType::SevenZip => Some(Box::new(SevenZipBackend)),
            #[cfg(feature = "rar")]
            ArchiveType::Rar => Some(Box::new(rar::RarBackend)),
            #[cfg(not(feature = "rar"))]
            ArchiveType::Rar => None,
        }
    }
}

/// Why an entry was not written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Absolute, drive-prefixed, empty or containing `..`
    UnsafePath,
    DisallowedExtension,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub name: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<SkippedEntry>,
}

/// Validate an entry name and turn it into a path relative to the destination
pub fn check_entry_name(name: &str) -> std::result::Result<PathBuf, SkipReason> {
    if name.starts_with('/') || name.starts_with('\\') {
        return Err(SkipReason::UnsafePath);
    }

    let mut relative = PathBuf::new();
    for (i, part) in name.split(['/', '\\']).enumerate() {
        match part {
            "" | "." => continue,
            ".." => return Err(SkipReason::UnsafePath),
            // Drive prefixes such as `C:`
            p if i == 0 && p.contains(':') => return Err(SkipReason::UnsafePath),
            p => relative.push(p),
        }
    }

    let file_name = relative.file_name().ok_or(SkipReason::UnsafePath)?;
    let allowed = Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()));
    if !allowed {
        return Err(SkipReason::DisallowedExtension);
    }

    Ok(relative)
}

/// Applies the entry policy and writes accepted entries below `dest`
pub(crate) struct EntryWriter<'a> {
    dest: &'a Path,
    limits: ValidationLimits,
    total_size: u64,
    /// Set once a cap is crossed; no further entries are written
    exceeded: Option<ModError>,
    report: ExtractionReport,
}

impl<'a> EntryWriter<'a> {
    fn new(dest: &'a Path, limits: ValidationLimits) -> Self {
        Self {
            dest,
            limits,
            total_size: 0,
            exceeded: None,
            report: ExtractionReport::default(),
        }
    }

    fn stopped(&self) -> bool {
        self.exceeded.is_some()
    }

    /// Check the file-count cap before another file is written
    fn reserve_file(&mut self) -> bool {
        if self.stopped() {
            return false;
        }
        if self.report.written.len() >= self.limits.max_files {
            self.exceeded = Some(ModError::TooManyFiles {
                count: self.report.written.len() + 1,
                limit: self.limits.max_files,
            });
            return false;
        }
        true
    }

    /// Account for `size` more bytes; false once the total cap is crossed
    fn add_size(&mut self, size: u64) -> bool {
        self.total_size += size;
        if self.total_size > self.limits.max_total_size {
            self.exceeded = Some(ModError::ArchiveTooLarge {
                size: self.total_size,
                limit: self.limits.max_total_size,
            });
            return false;
        }
        true
    }

    /// Target path for `name`, or `None` after recording why it was rejected
    fn accept(&mut self, name: &str) -> Option<PathBuf> {
        match check_entry_name(name) {
            Ok(relative) => Some(self.dest.join(relative)),
            Err(reason) => {
                log::warn!("Skipping archive entry {}: {:?}", name, reason);
                self.report.skipped.push(SkippedEntry {
                    name: name.to_string(),
                    reason,
                });
                None
            }
        }
    }

    /// Write one entry; returns whether it was written
    fn write<R: Read + ?Sized>(&mut self, name: &str, reader: &mut R) -> bool {
        let Some(target) = self.accept(name) else {
            return false;
        };
        if !self.reserve_file() {
            return false;
        }

        let remaining = self.limits.max_total_size.saturating_sub(self.total_size);
        match copy_to(&target, &mut reader.take(remaining.saturating_add(1))) {
            Ok(size) => {
                if !self.add_size(size) {
                    let _ = std::fs::remove_file(&target);
                    return false;
                }
                self.report.written.push(target);
                true
            }
            Err(e) => {
                let _ = std::fs::remove_file(&target);
                self.fail(name, e.to_string());
                false
            }
        }
    }

    fn fail(&mut self, name: &str, reason: String) {
        log::warn!("Failed to extract {}: {}", name, reason);
        self.report.skipped.push(SkippedEntry {
            name: name.to_string(),
            reason: SkipReason::Failed(reason),
        });
    }

    fn finish(self) -> Result<ExtractionReport> {
        match self.exceeded {
            Some(err) => Err(err),
            None => Ok(self.report),
        }
    }
}

fn copy_to<R: Read>(target: &Path, reader: &mut R) -> io::Result<u64> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut out = File::create(target)?;
    io::copy(reader, &mut out)
}

/// One archive format
pub(crate) trait ArchiveBackend {
    fn unpack(&self, archive_path: &Path, writer: &mut EntryWriter<'_>) -> Result<()>;
}

/// Archive extractor
pub struct ArchiveExtractor;

impl ArchiveExtractor {
    /// Extract an archive, detecting its type from the file name
    pub fn extract(archive_path: &Path, dest_dir: &Path) -> Result<ExtractionReport> {
        let archive_type = ArchiveType::from_path(archive_path).ok_or_else(|| {
            unsupported(archive_path, "unknown archive type")
        })?;

        Self::extract_with_type(archive_path, dest_dir, archive_type)
    }

    /// Extract an archive with explicit type under the default caps
    pub fn extract_with_type(
        archive_path: &Path,
        dest_dir: &Path,
        archive_type: ArchiveType,
    ) -> Result<ExtractionReport> {
        Self::extract_with_limits(archive_path, dest_dir, archive_type, ValidationLimits::default())
    }

    /// Extract an archive, failing with `TooManyFiles` or `ArchiveTooLarge` as soon as
    /// the written content crosses `limits`
    pub fn extract_with_limits(
        archive_path: &Path,
        dest_dir: &Path,
        archive_type: ArchiveType,
        limits: ValidationLimits,
    ) -> Result<ExtractionReport> {
        let backend = archive_type.backend().ok_or_else(|| {
            unsupported(archive_path, &format!("{:?} support is not enabled", archive_type))
        })?;

        std::fs::create_dir_all(dest_dir)?;
        log::debug!("Extracting {} ({:?}) to {}", archive_path.display(), archive_type, dest_dir.display());

        let mut writer = EntryWriter::new(dest_dir, limits);
        backend.unpack(archive_path, &mut writer)?;
        let report = writer.finish()?;

        log::debug!(
            "Extracted {} file(s), skipped {}",
            report.written.len(),
            report.skipped.len()
        );
        Ok(report)
    }
}

fn unsupported(path: &Path, reason: &str) -> ModError {
    ModError::UnsupportedArchive {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn open(archive_path: &Path) -> Result<BufReader<File>> {
    let file = File::open(archive_path).map_err(|e| unsupported(archive_path, &e.to_string()))?;
    Ok(BufReader::new(file))
}

struct ZipBackend;

impl ArchiveBackend for ZipBackend {
    fn unpack(&self, archive_path: &Path, writer: &mut EntryWriter<'_>) -> Result<()> {
        let mut archive = zip::ZipArchive::new(open(archive_path)?)
            .map_err(|e| unsupported(archive_path, &format!("failed to open zip: {}", e)))?;

        for i in 0..archive.len() {
            let mut file = match archive.by_index(i) {
                Ok(file) => file,
                Err(e) => {
                    writer.fail(&format!("entry #{}", i), e.to_string());
                    continue;
                }
            };

            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            writer.write(&name, &mut file);
            if writer.stopped() {
                break;
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Compression {
    None,
    Gzip,
    Bzip2,
    Xz,
}

struct TarBackend(Compression);

impl ArchiveBackend for TarBackend {
    fn unpack(&self, archive_path: &Path, writer: &mut EntryWriter<'_>) -> Result<()> {
        let reader = open(archive_path)?;
        let decoded: Box<dyn Read> = match self.0 {
            Compression::None => Box::new(reader),
            Compression::Gzip => Box::new(GzDecoder::new(reader)),
            Compression::Bzip2 => Box::new(bzip2::read::BzDecoder::new(reader)),
            Compression::Xz => Box::new(xz2::read::XzDecoder::new(reader)),
        };

        let mut archive = tar::Archive::new(decoded);
        let entries = archive
            .entries()
            .map_err(|e| unsupported(archive_path, &format!("failed to read tar: {}", e)))?;

        let mut seen = 0usize;
        for entry in entries {
            let mut entry = match entry {
                Ok(entry) => entry,
                // Nothing readable at all: not a tarball (or a corrupt one)
                Err(e) if seen == 0 => {
                    return Err(unsupported(archive_path, &format!("failed to read tar: {}", e)))
                }
                // A damaged stream cannot be resynchronised
                Err(e) => {
                    writer.fail(&format!("entry #{}", seen), e.to_string());
                    break;
                }
            };
            seen += 1;

            let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
            let entry_type = entry.header().entry_type();
            if entry_type.is_dir() {
                continue;
            }
            if !entry_type.is_file() {
                log::debug!("Skipping non-regular tar entry {}", name);
                continue;
            }

            writer.write(&name, &mut entry);
            if writer.stopped() {
                break;
            }
        }

        Ok(())
    }
}

struct SevenZipBackend;

impl ArchiveBackend for SevenZipBackend {
    fn unpack(&self, archive_path: &Path, writer: &mut EntryWriter<'_>) -> Result<()> {
        let dest = writer.dest.to_path_buf();
        let result = sevenz_rust::decompress_file_with_extract_fn(archive_path, &dest, |entry, reader, _| {
            if entry.is_directory() {
                return Ok(true);
            }
            if !writer.write(entry.name(), reader) {
                if writer.stopped() {
                    return Ok(false);
                }
                // Solid blocks must be consumed for the next entry to line up
                let _ = io::copy(reader, &mut io::sink());
            }
            Ok(true)
        });
        if writer.stopped() {
            return Ok(());
        }
        result.map_err(|e| unsupported(archive_path, &format!("failed to read 7z: {}", e)))
    }
}

#[cfg(feature = "rar")]
mod rar {
    use super::{unsupported, ArchiveBackend, EntryWriter};
    use crate::error::Result;
    use std::path::Path;

    pub(super) struct RarBackend;

    impl ArchiveBackend for RarBackend {
        fn unpack(&self, archive_path: &Path, writer: &mut EntryWriter<'_>) -> Result<()> {
            let mut at_header = unrar::Archive::new(archive_path)
                .open_for_processing()
                .map_err(|e| unsupported(archive_path, &format!("failed to open rar: {}", e)))?;

            loop {
                let at_file = match at_header.read_header() {
                    Ok(Some(at_file)) => at_file,
                    Ok(None) => break,
                    Err(e) => {
                        writer.fail("rar header", e.to_string());
                        break;
                    }
                };

                let header = at_file.entry();
                let name = header.filename.to_string_lossy().into_owned();
                let size = header.unpacked_size;
                let target = if header.is_directory() { None } else { writer.accept(&name) };

                let next = match target {
                    Some(target) => {
                        // Sizes come from the header so an oversized entry is never written
                        if !writer.reserve_file() || !writer.add_size(size) {
                            break;
                        }
                        if let Some(parent) = target.parent() {
                            if let Err(e) = std::fs::create_dir_all(parent) {
                                writer.fail(&name, e.to_string());
                            }
                        }
                        match at_file.extract_to(&target) {
                            Ok(next) => {
                                writer.report.written.push(target);
                                next
                            }
                            // The processor is consumed on failure; stop here
                            Err(e) => {
                                writer.fail(&name, e.to_string());
                                break;
                            }
                        }
                    }
                    None => match at_file.skip() {
                        Ok(next) => next,
                        Err(e) => {
                            writer.fail(&name, e.to_string());
                            break;
                        }
                    },
                };
                at_header = next;
            }

            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        for (name, data) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
    }

    fn write_tar_gz(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_archive_type_from_path() {
        assert_eq!(ArchiveType::from_path(Path::new("mod.zip")), Some(ArchiveType::Zip));
        assert_eq!(ArchiveType::from_path(Path::new("mod.tar.gz")), Some(ArchiveType::TarGz));
        assert_eq!(ArchiveType::from_path(Path::new("mod.tgz")), Some(ArchiveType::TarGz));
        assert_eq!(ArchiveType::from_path(Path::new("mod.gz")), Some(ArchiveType::TarGz));
        assert_eq!(ArchiveType::from_path(Path::new("mod.tar.bz2")), Some(ArchiveType::TarBz2));
        assert_eq!(ArchiveType::from_path(Path::new("mod.XZ")), Some(ArchiveType::TarXz));
        assert_eq!(ArchiveType::from_path(Path::new("mod.tar")), Some(ArchiveType::Tar));
        assert_eq!(ArchiveType::from_path(Path::new("mod.7z")), Some(ArchiveType::SevenZip));
        assert_eq!(ArchiveType::from_path(Path::new("mod.rar")), Some(ArchiveType::Rar));
        assert_eq!(ArchiveType::from_path(Path::new("mod.css")), None);
    }

    #[test]
    fn test_archive_type_from_content_type() {
        assert_eq!(ArchiveType::from_content_type("application/zip"), Some(ArchiveType::Zip));
        assert_eq!(ArchiveType::from_content_type("application/x-7z-compressed"), Some(ArchiveType::SevenZip));
        assert_eq!(ArchiveType::from_content_type("application/gzip"), Some(ArchiveType::TarGz));
        assert_eq!(ArchiveType::from_content_type("text/css"), None);
    }

    #[test]
    fn test_check_entry_name() {
        assert_eq!(check_entry_name("theme/userChrome.css"), Ok(PathBuf::from("theme/userChrome.css")));
        assert_eq!(check_entry_name("./icons\\tab.SVG"), Ok(PathBuf::from("icons/tab.SVG")));
        assert_eq!(check_entry_name("../../evil.css"), Err(SkipReason::UnsafePath));
        assert_eq!(check_entry_name("theme/../../evil.css"), Err(SkipReason::UnsafePath));
        assert_eq!(check_entry_name("/etc/evil.css"), Err(SkipReason::UnsafePath));
        assert_eq!(check_entry_name("\\evil.css"), Err(SkipReason::UnsafePath));
        assert_eq!(check_entry_name("C:\\evil.css"), Err(SkipReason::UnsafePath));
        assert_eq!(check_entry_name(""), Err(SkipReason::UnsafePath));
        assert_eq!(check_entry_name("theme/install.sh"), Err(SkipReason::DisallowedExtension));
        assert_eq!(check_entry_name("theme/README"), Err(SkipReason::DisallowedExtension));
    }

    #[test]
    fn test_extract_zip_skips_traversal_and_keeps_valid_entries() {
        let work = TempDir::new().unwrap();
        let archive = work.path().join("mod.zip");
        write_zip(
            &archive,
            &[
                ("../../evil.css", b"evil"),
                ("theme/userChrome.css", b"#nav-bar {}"),
                ("theme/run.exe", b"MZ"),
                ("theme/icons/tab.png", b"png"),
            ],
        );

        let dest = work.path().join("out").join("deep");
        let report = ArchiveExtractor::extract(&archive, &dest).unwrap();

        assert_eq!(report.written.len(), 2);
        assert_eq!(report.skipped.len(), 2);
        assert!(dest.join("theme/userChrome.css").exists());
        assert!(dest.join("theme/icons/tab.png").exists());
        assert!(!dest.join("theme/run.exe").exists());
        assert!(!work.path().join("evil.css").exists());
        assert!(!work.path().join("out").join("evil.css").exists());
    }

    fn small_limits(max_files: usize, max_total_size: u64) -> ValidationLimits {
        ValidationLimits {
            max_files,
            max_total_size,
            ..ValidationLimits::default()
        }
    }

    #[test]
    fn test_extraction_stops_at_file_cap() {
        let work = TempDir::new().unwrap();
        let archive = work.path().join("many.zip");
        let names: Vec<String> = (0..20).map(|i| format!("m/{}.css", i)).collect();
        let entries: Vec<(&str, &[u8])> = names.iter().map(|n| (n.as_str(), &b"x"[..])).collect();
        write_zip(&archive, &entries);

        let dest = work.path().join("out");
        let err = ArchiveExtractor::extract_with_limits(&archive, &dest, ArchiveType::Zip, small_limits(5, 1024))
            .unwrap_err();
        assert!(matches!(err, ModError::TooManyFiles { count: 6, limit: 5 }));

        let written = walkdir::WalkDir::new(&dest)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .count();
        assert_eq!(written, 5);
    }

    #[test]
    fn test_extraction_stops_at_size_cap() {
        let work = TempDir::new().unwrap();
        let archive = work.path().join("bomb.tar.gz");
        let big = vec![b'a'; 4096];
        write_tar_gz(&archive, &[("a.css", &big), ("b.css", &big), ("c.css", &big)]);

        let dest = work.path().join("out");
        let err = ArchiveExtractor::extract_with_limits(&archive, &dest, ArchiveType::TarGz, small_limits(100, 6000))
            .unwrap_err();
        match err {
            ModError::ArchiveTooLarge { size, limit } => {
                assert_eq!(limit, 6000);
                assert!(size > 6000 && size <= 4096 + 6000 + 1);
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(dest.join("a.css").exists());
        assert!(!dest.join("b.css").exists());
        assert!(!dest.join("c.css").exists());
    }

    #[test]
    fn test_extraction_within_caps() {
        let work = TempDir::new().unwrap();
        let archive = work.path().join("ok.zip");
        write_zip(&archive, &[("a.css", b"12345"), ("b.css", b"12345")]);

        let report =
            ArchiveExtractor::extract_with_limits(&archive, &work.path().join("out"), ArchiveType::Zip, small_limits(2, 10))
                .unwrap();
        assert_eq!(report.written.len(), 2);
    }

    #[test]
    fn test_extract_tar_gz() {
        let work = TempDir::new().unwrap();
        let archive = work.path().join("mod.tar.gz");
        write_tar_gz(
            &archive,
            &[("pkg/mod.css", b"a {}"), ("pkg/font.woff2", b"font"), ("pkg/notes.txt", b"x")],
        );

        let dest = work.path().join("out");
        let report = ArchiveExtractor::extract(&archive, &dest).unwrap();

        assert_eq!(report.written.len(), 2);
        assert_eq!(std::fs::read_to_string(dest.join("pkg/mod.css")).unwrap(), "a {}");
        assert_eq!(report.skipped[0].reason, SkipReason::DisallowedExtension);
    }

    #[test]
    fn test_extract_7z() {
        let work = TempDir::new().unwrap();
        let src = work.path().join("src");
        std::fs::create_dir_all(src.join("icons")).unwrap();
        std::fs::write(src.join("userChrome.css"), "tab {}").unwrap();
        std::fs::write(src.join("icons/a.svg"), "<svg/>").unwrap();
        std::fs::write(src.join("script.js"), "alert(1)").unwrap();

        let archive = work.path().join("mod.7z");
        sevenz_rust::compress_to_path(&src, &archive).unwrap();

        let dest = work.path().join("out");
        let report = ArchiveExtractor::extract(&archive, &dest).unwrap();

        let names: Vec<String> = walkdir::WalkDir::new(&dest)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(report.written.len(), 2);
        assert!(names.contains(&"userChrome.css".to_string()));
        assert!(names.contains(&"a.svg".to_string()));
        assert!(!names.contains(&"script.js".to_string()));
    }

    #[test]
    fn test_corrupt_archive_is_unsupported() {
        let work = TempDir::new().unwrap();
        for name in ["bad.zip", "bad.tar.gz", "bad.7z"] {
            let archive = work.path().join(name);
            std::fs::write(&archive, b"definitely not an archive").unwrap();

            let err = ArchiveExtractor::extract(&archive, &work.path().join("out")).unwrap_err();
            assert!(matches!(err, ModError::UnsupportedArchive { .. }), "{}", name);
        }
    }

    #[test]
    fn test_unknown_type_is_unsupported() {
        let work = TempDir::new().unwrap();
        let err = ArchiveExtractor::extract(&work.path().join("mod.doc"), work.path()).unwrap_err();
        assert!(matches!(err, ModError::UnsupportedArchive { .. }));
    }
}
