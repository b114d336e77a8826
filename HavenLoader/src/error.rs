//! Error types for `HavenLoader`

use std::path::PathBuf;

use thiserror::Error;

/// The error type for `HavenLoader` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ==================== Core Library Errors ====================
    /// A logical target file is missing from the core install.
    #[error("core library file not found: {path}")]
    MissingCoreFile {
        /// The expected path of the core file.
        path: PathBuf,
    },

    /// The core textures document declares no numeric region.
    #[error("core textures document contains no numeric region declarations")]
    NoCoreRegions,

    // ==================== XML Errors ====================
    /// XML parsing error.
    #[error("XML parse error: {0}")]
    XmlError(#[from] quick_xml::Error),

    /// XML attribute error.
    #[error("XML attribute error: {0}")]
    XmlAttrError(String),

    /// A document could not be parsed.
    #[error("failed to parse {path}: {message}")]
    XmlParse {
        /// The file being parsed.
        path: PathBuf,
        /// The underlying parser message.
        message: String,
    },

    /// The document has no root element.
    #[error("XML document has no root element")]
    EmptyDocument,

    /// A selector expression could not be parsed.
    #[error("invalid selector '{selector}': {message}")]
    InvalidSelector {
        /// The offending expression.
        selector: String,
        /// What went wrong.
        message: String,
    },

    // ==================== Patch Errors ====================
    /// A patch instruction failed; wraps the underlying cause.
    #[error("patch application failed at {}:{position} (line {line}): {source}", file.display())]
    PatchFailed {
        /// The patch file containing the instruction.
        file: PathBuf,
        /// 1-based index of the instruction in the file.
        position: usize,
        /// Source line of the instruction element (0 if unknown).
        line: u32,
        /// The underlying failure.
        #[source]
        source: Box<Error>,
    },

    /// The patch `Class` is not one of the known operation kinds.
    #[error("unknown patch operation '{0}'")]
    UnknownPatchOperation(String),

    /// A patch instruction lacks a field its operation needs.
    #[error("patch instruction is missing its <{field}> element")]
    MissingPatchField {
        /// The missing child element name.
        field: &'static str,
    },

    /// `AttributeAdd` targeted a node that already has the attribute.
    #[error("attribute '{attribute}' already exists")]
    AttributeAlreadyPresent {
        /// The attribute name.
        attribute: String,
    },

    /// `AttributeRemove` targeted a node without the attribute.
    #[error("attribute '{attribute}' does not exist")]
    AttributeMissing {
        /// The attribute name.
        attribute: String,
    },

    /// `AttributeMath` with an unsupported `opType`.
    #[error("unknown math operator '{0}'")]
    UnknownMathOperator(String),

    /// `AttributeMath` division by zero.
    #[error("division by zero while updating attribute '{attribute}'")]
    DivideByZero {
        /// The attribute being updated.
        attribute: String,
    },

    /// A value could not be read as a number.
    #[error("not a number: '{value}'")]
    InvalidNumber {
        /// The offending text.
        value: String,
    },

    /// A structural operation matched a node without a parent element.
    #[error("node <{name}> has no parent element")]
    OrphanedNode {
        /// The element name of the matched node.
        name: String,
    },

    // ==================== Texture Errors ====================
    /// An animation reference uses a non-numeric `a` attribute without a `filename`.
    #[error("cannot specify a non-numerical 'a' attribute '{value}', use the 'filename' attribute instead")]
    NonNumericRegionReference {
        /// The offending attribute value.
        value: String,
    },

    /// The packer could not place every rectangle on the estimated page.
    #[error("unable to pack all {requested} regions into a {size}x{size} page, packed {packed}")]
    PackingOverflow {
        /// Number of rectangles to place.
        requested: usize,
        /// Number of rectangles placed before giving up.
        packed: usize,
        /// Side of the square page.
        size: u32,
    },

    /// A region refers to an atlas page that is neither in the core nor declared by a mod.
    #[error("atlas page '{page}' is not declared by the core install or any mod")]
    UnknownAtlasPage {
        /// The page ID.
        page: String,
    },

    /// The CIM container is malformed.
    #[error("invalid CIM container: {message}")]
    InvalidCim {
        /// Description of what is invalid.
        message: String,
    },

    /// The CIM pixel format is not supported.
    #[error("unsupported CIM pixel format: {format}")]
    UnsupportedCimFormat {
        /// The format code found in the header.
        format: i32,
    },

    /// Image decode/encode error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    // ==================== Registry / Config Errors ====================
    /// The registry has no namespace prefix for a mod.
    #[error("no namespace prefix registered for mod {}", mod_path.display())]
    ModPrefixNotFound {
        /// The mod directory.
        mod_path: PathBuf,
    },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    // ==================== Parsing Errors ====================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// UTF-8 conversion error.
    #[error("UTF-8 conversion error: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),

    // ==================== File System Errors ====================
    /// Directory traversal error.
    #[error("directory walk error: {0}")]
    WalkDirError(String),
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::XmlAttrError(err.to_string())
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        Error::WalkDirError(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error::Io(err.error)
    }
}

/// A specialized Result type for `HavenLoader` operations.
pub type Result<T> = std::result::Result<T, Error>;
