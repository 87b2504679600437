//! Static mime-type registry.
//!
//! Maps content types to file extensions with a supported-file flag. The
//! table is process-wide, populated at compile time and read-only; lookups
//! are pure functions that return `None` on a miss, never an error.
//!
//! Several extensions are registered under more than one content type
//! (`.xml`, `.mid`, `.3gp`, `.3g2`). Extension lookups resolve to the
//! first-registered row, so registration order is part of the contract.

/// One row of the registry: a content type with its known extensions.
///
/// The first extension is the canonical one and is what
/// [`Location::detect_mime_type`](crate::Location::detect_mime_type)
/// normalizes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MimeEntry {
    pub content_type: &'static str,
    pub description: &'static str,
    pub extensions: &'static [&'static str],
    /// If false, the file type is not supported by the system.
    pub supported: bool,
}

impl MimeEntry {
    /// Canonical extension for this content type.
    pub fn canonical_extension(&self) -> &'static str {
        self.extensions[0]
    }

    /// True if this row describes an image content type.
    pub fn is_image(&self) -> bool {
        self.content_type.contains("image")
    }

    fn has_extension(&self, extension: &str) -> bool {
        self.extensions.contains(&extension)
    }
}

const fn entry(
    content_type: &'static str,
    description: &'static str,
    extensions: &'static [&'static str],
    supported: bool,
) -> MimeEntry {
    MimeEntry {
        content_type,
        description,
        extensions,
        supported,
    }
}

/// Registration of the main mime types (needs to be updated if any are
/// needed that are not here).
///
/// See <https://developer.mozilla.org/en-US/docs/Web/HTTP/Basics_of_HTTP/MIME_types/Common_types>
pub const REGISTRY: &[MimeEntry] = &[
    // Images
    entry("image/bmp", "Windows OS/2 Bitmap Graphics", &[".bmp"], true),
    entry("image/gif", "Graphics Interchange Format (GIF)", &[".gif"], true),
    entry("image/jpeg", "JPEG images", &[".jpeg", ".jpg"], true),
    entry("image/png", "Portable Network Graphics", &[".png"], true),
    entry("image/tiff", "Tagged Image File Format (TIFF)", &[".tif", ".tiff"], false),
    entry("image/vnd.microsoft.icon", "Icon format", &[".ico"], false),
    entry("image/svg+xml", "Scalable Vector Graphics (SVG)", &[".svg"], false),
    entry("image/webp", "WEBP image", &[".webp"], false),
    // Documents
    entry("application/x-httpd-php", "Hypertext Preprocessor (Personal Home Page)", &[".php"], false),
    entry("application/pdf", "Adobe Portable Document Format (PDF)", &[".pdf"], true),
    entry("application/ogg", "OGG", &[".ogx"], false),
    entry("application/vnd.oasis.opendocument.text", "OpenDocument text document", &[".odt"], true),
    entry("application/vnd.oasis.opendocument.spreadsheet", "OpenDocument spreadsheet document", &[".ods"], true),
    entry("application/vnd.oasis.opendocument.presentation", "OpenDocument presentation document", &[".odp"], true),
    entry("application/vnd.apple.installer+xml", "Apple Installer Package", &[".mpkg"], false),
    entry("text/javascript", "JavaScript module", &[".mjs"], false),
    entry("application/ld+json", "JSON-LD format", &[".jsonld"], false),
    entry("application/json", "JSON format", &[".json"], true),
    entry("text/javascript", "JavaScript", &[".js"], false),
    entry("application/java-archive", "Java Archive (JAR)", &[".jar"], false),
    entry("text/calendar", "iCalendar format", &[".ics"], false),
    entry("text/html", "HyperText Markup Language (HTML)", &[".html", ".htm"], false),
    entry("application/gzip", "GZip Compressed Archive", &[".gz"], true),
    entry("application/epub+zip", "Electronic publication (EPUB)", &[".epub"], false),
    entry("application/vnd.ms-fontobject", "MS Embedded OpenType fonts", &[".eot"], false),
    entry("application/vnd.openxmlformats-officedocument.wordprocessingml.document", "Microsoft Word (OpenXML)", &[".docx"], true),
    entry("application/msword", "Microsoft Word", &[".doc"], true),
    entry("text/csv", "Comma-separated values (CSV)", &[".csv"], true),
    entry("text/css", "Cascading Style Sheets (CSS)", &[".css"], false),
    entry("application/x-csh", "C-Shell script", &[".csh"], false),
    entry("application/x-bzip2", "BZip2 archive", &[".bz2"], false),
    entry("application/x-bzip", "BZip archive", &[".bz"], false),
    entry("application/octet-stream", "Any kind of binary data", &[".bin"], false),
    entry("application/vnd.amazon.ebook", "Amazon Kindle eBook format", &[".azw"], false),
    entry("application/x-freearc", "Archive document (multiple files embedded)", &[".arc"], false),
    entry("application/x-abiword", "AbiWord document", &[".abw"], false),
    entry("application/x-7z-compressed", "7-zip archive", &[".7z"], true),
    entry("application/zip", "ZIP archive", &[".zip"], true),
    entry("application/vnd.mozilla.xul+xml", "XUL", &[".xul"], false),
    entry("application/xml", "XML if not readable from casual users (RFC 3023, section 3)", &[".xml"], false),
    entry("text/xml", "XML readable from casual users (RFC 3023, section 3)", &[".xml"], false),
    entry("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet", "Microsoft Excel (OpenXML)", &[".xlsx"], false),
    entry("application/vnd.ms-excel", "Microsoft Excel", &[".xls"], true),
    entry("application/xhtml+xml", "XHTML", &[".xhtml"], false),
    entry("application/vnd.visio", "Microsoft Visio", &[".vsd"], true),
    entry("text/plain", "Text, (generally ASCII or ISO 8859-n)", &[".txt"], true),
    entry("application/x-tar", "Tape Archive (TAR)", &[".tar"], false),
    entry("application/x-shockwave-flash", "Small web format (SWF) or Adobe Flash document", &[".swf"], false),
    entry("application/x-sh", "Bourne shell script", &[".sh"], false),
    entry("application/rtf", "Rich Text Format (RTF)", &[".rtf"], true),
    entry("application/vnd.rar", "RAR archive", &[".rar"], true),
    entry("application/vnd.openxmlformats-officedocument.presentationml.presentation", "Microsoft PowerPoint (OpenXML)", &[".pptx"], true),
    entry("application/vnd.ms-powerpoint", "Microsoft PowerPoint", &[".ppt"], true),
    // Audio / video
    entry("audio/aac", "AAC audio", &[".aac"], false),
    entry("audio/midi", "Musical Instrument Digital Interface (MIDI)", &[".mid", ".midi"], false),
    entry("audio/x-midi", "Musical Instrument Digital Interface (MIDI)", &[".mid", ".midi"], false),
    entry("audio/mpeg", "MP3 audio", &[".mp3"], true),
    entry("audio/ogg", "OGG audio", &[".oga"], false),
    entry("audio/opus", "Opus audio", &["opus"], false),
    entry("audio/wav", "Waveform Audio Format", &[".wav"], true),
    entry("audio/webm", "WEBM audio", &[".weba"], false),
    entry("video/mpeg", "MPEG Video", &[".mpeg"], true),
    entry("video/ogg", "OGG video", &[".ogv"], false),
    entry("video/mp2t", "MPEG transport stream", &[".ts"], false),
    entry("video/webm", "WEBM video", &[".webm"], false),
    entry("video/x-msvideo", "AVI: Audio Video Interleave", &[".avi"], false),
    // The 3GPP containers are deliberately ambiguous: the same extension
    // resolves to the audio-only row first because it is registered first.
    entry("audio/3gpp", "3GPP audio container if it doesn't contain video", &[".3gp"], false),
    entry("video/3gpp", "3GPP audio/video container", &[".3gp"], false),
    entry("video/3gpp2", "3GPP2 video container", &[".3g2"], false),
    entry("audio/3gpp2", "3GPP2 audio container if it doesn't contain video", &[".3g2"], false),
];

/// First registry row whose extension set contains `extension`.
pub fn mime_type_for_extension(extension: &str) -> Option<&'static MimeEntry> {
    REGISTRY.iter().find(|m| m.has_extension(extension))
}

/// First registry row whose content type equals `content_type` exactly
/// (case-sensitive).
pub fn mime_type_for_content_type(content_type: &str) -> Option<&'static MimeEntry> {
    REGISTRY.iter().find(|m| m.content_type == content_type)
}

/// First registry row matching both `extension` and `content_type` on the
/// same row.
pub fn get(extension: &str, content_type: &str) -> Option<&'static MimeEntry> {
    REGISTRY
        .iter()
        .find(|m| m.has_extension(extension) && m.content_type == content_type)
}

/// True iff a single registry row carries both `extension` and
/// `content_type`.
pub fn exists(extension: &str, content_type: &str) -> bool {
    get(extension, content_type).is_some()
}

/// Supported non-image content types.
pub fn supported_file_mime_types() -> Vec<&'static MimeEntry> {
    REGISTRY
        .iter()
        .filter(|m| !m.is_image() && m.supported)
        .collect()
}

/// Supported image content types.
pub fn supported_image_mime_types() -> Vec<&'static MimeEntry> {
    REGISTRY.iter().filter(|m| m.is_image() && m.supported).collect()
}

/// Extensions of all supported non-image content types.
pub fn supported_file_extensions() -> Vec<&'static str> {
    supported_file_mime_types()
        .iter()
        .flat_map(|m| m.extensions.iter().copied())
        .collect()
}

/// Extensions of all supported image content types.
pub fn supported_image_extensions() -> Vec<&'static str> {
    supported_image_mime_types()
        .iter()
        .flat_map(|m| m.extensions.iter().copied())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_extension() {
        let pdf = mime_type_for_extension(".pdf").unwrap();
        assert_eq!(pdf.content_type, "application/pdf");
        assert!(pdf.supported);

        let jpg = mime_type_for_extension(".jpg").unwrap();
        assert_eq!(jpg.content_type, "image/jpeg");
        assert_eq!(jpg.canonical_extension(), ".jpeg");

        assert!(mime_type_for_extension(".nope").is_none());
    }

    #[test]
    fn test_lookup_by_content_type_is_case_sensitive() {
        assert!(mime_type_for_content_type("application/pdf").is_some());
        assert!(mime_type_for_content_type("Application/PDF").is_none());
    }

    #[test]
    fn test_paired_lookup_requires_same_row() {
        assert!(exists(".pdf", "application/pdf"));
        // Both values resolve individually but not on the same row.
        assert!(!exists(".pdf", "image/png"));
        assert!(!exists(".zzz", "application/pdf"));
    }

    #[test]
    fn test_ambiguous_extension_resolves_to_first_row() {
        // .3gp is registered under audio/3gpp before video/3gpp.
        let three_gp = mime_type_for_extension(".3gp").unwrap();
        assert_eq!(three_gp.content_type, "audio/3gpp");

        // .xml: application/xml is registered before text/xml.
        let xml = mime_type_for_extension(".xml").unwrap();
        assert_eq!(xml.content_type, "application/xml");
        // Both rows are still reachable by content type.
        assert!(mime_type_for_content_type("text/xml").is_some());
    }

    #[test]
    fn test_lookups_are_deterministic() {
        for _ in 0..3 {
            assert_eq!(
                mime_type_for_extension(".3gp"),
                mime_type_for_extension(".3gp")
            );
            assert_eq!(
                mime_type_for_content_type("text/plain"),
                mime_type_for_content_type("text/plain")
            );
        }
    }

    #[test]
    fn test_supported_partitions() {
        let images = supported_image_mime_types();
        assert!(images.iter().all(|m| m.is_image() && m.supported));
        assert!(images.iter().any(|m| m.content_type == "image/png"));

        let files = supported_file_mime_types();
        assert!(files.iter().all(|m| !m.is_image() && m.supported));
        assert!(files.iter().any(|m| m.content_type == "application/pdf"));

        assert!(supported_image_extensions().contains(&".jpeg"));
        assert!(supported_file_extensions().contains(&".txt"));
        assert!(!supported_file_extensions().contains(&".png"));
    }
}
