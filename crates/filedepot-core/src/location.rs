//! Backend-agnostic path descriptor.
//!
//! A [`Location`] identifies one stored object: a root namespace (bucket,
//! container or directory), a path relative to it and the delimiter used to
//! render the canonical string form. It is a request parameter, built by the
//! caller for the duration of one operation, never persisted.

use std::fmt;

use crate::mime;

/// Default separator between the root and the relative path. Matches the
/// pattern used by remote object stores, which keeps downloads consistent
/// across backends.
pub const DEFAULT_DELIMITER: &str = "/";

/// Identifies one storage-addressable object.
///
/// `root` is the top-level namespace: the bucket on an object store, the
/// directory on a local filesystem. Remote backends may restrict namespace
/// naming (lowercase only); that constraint is enforced at the backend
/// boundary, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub root: String,
    pub relative_path: String,
    delimiter: String,
    /// Mime type of the file compliant with the IANA definition.
    ///
    /// See <https://www.iana.org/assignments/media-types/media-types.xhtml>
    pub content_type: Option<String>,
    /// File extension, including the leading dot.
    pub extension: Option<String>,
}

impl Location {
    pub fn new(root: impl Into<String>, relative_path: impl Into<String>) -> Self {
        Location {
            root: root.into(),
            relative_path: relative_path.into(),
            delimiter: DEFAULT_DELIMITER.to_string(),
            content_type: None,
            extension: None,
        }
    }

    pub fn with_delimiter(
        root: impl Into<String>,
        relative_path: impl Into<String>,
        delimiter: impl Into<String>,
    ) -> Self {
        Location {
            delimiter: delimiter.into(),
            ..Location::new(root, relative_path)
        }
    }

    /// Creates an otherwise empty location with mime information derived
    /// from a known extension. Root and path must still be filled in before
    /// the location is valid.
    pub fn from_extension(extension: impl Into<String>) -> Self {
        let mut location = Location::new("", "");
        location.extension = Some(extension.into());
        location.detect_mime_type();
        location
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// A location is valid when both the root and the relative path are
    /// non-blank. Mime resolvability is not required.
    pub fn is_valid(&self) -> bool {
        !self.root.trim().is_empty() && !self.relative_path.trim().is_empty()
    }

    /// Resolves mime information against the registry: lookup by extension
    /// first, falling back to the content type. On a hit both fields are
    /// overwritten with the registry's canonical values; on a miss both are
    /// left exactly as the caller set them.
    pub fn detect_mime_type(&mut self) {
        let mut matched = self
            .extension
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .and_then(mime::mime_type_for_extension);

        if matched.is_none() {
            matched = self
                .content_type
                .as_deref()
                .filter(|c| !c.trim().is_empty())
                .and_then(mime::mime_type_for_content_type);
        }

        if let Some(entry) = matched {
            self.extension = Some(entry.canonical_extension().to_string());
            self.content_type = Some(entry.content_type.to_string());
        }
    }

    /// True iff the registry has a single row carrying both this location's
    /// extension and its content type. Stricter than [`detect_mime_type`]:
    /// the pair must match together, not just one of the two.
    ///
    /// [`detect_mime_type`]: Location::detect_mime_type
    pub fn content_type_and_extension_is_valid(&self) -> bool {
        match (self.extension.as_deref(), self.content_type.as_deref()) {
            (Some(extension), Some(content_type)) => mime::exists(extension, content_type),
            _ => false,
        }
    }
}

impl fmt::Display for Location {
    /// Canonical storage path: `{root}{delimiter}{relative_path}`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.root, self.delimiter, self.relative_path)
    }
}

/// Delimiter-aware path segment joiner.
#[derive(Debug)]
pub struct PathBuilder {
    delimiter: String,
    buffer: String,
}

impl PathBuilder {
    pub fn new(delimiter: impl Into<String>) -> Self {
        PathBuilder {
            delimiter: delimiter.into(),
            buffer: String::new(),
        }
    }

    pub fn append(&mut self, segment: impl fmt::Display) {
        if !self.buffer.is_empty() {
            self.buffer.push_str(&self.delimiter);
        }
        self.buffer.push_str(&segment.to_string());
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

impl fmt::Display for PathBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.buffer)
    }
}
