//! Copy option models, content models and top-level error types.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use crate::conf::C_TYPE_CONTAINER_PAGE;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Element handling policy for one page copy run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumCopyMode {
    /// Never copy elements; the copied page references the originals.
    Reuse,
    /// Copy elements whose type configuration or create-new flag asks for it.
    #[default]
    SmartCopy,
    /// Like [`EnumCopyMode::SmartCopy`], then move the locale of every new
    /// element copy from the source page locale to the target folder locale.
    SmartCopyAndChangeLocale,
}

impl EnumCopyMode {
    /// Stable identifier used by configuration files and callers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reuse => "reuse",
            Self::SmartCopy => "smartCopy",
            Self::SmartCopyAndChangeLocale => "smartCopyAndChangeLocale",
        }
    }
}

impl fmt::Display for EnumCopyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnumCopyMode {
    type Err = PageCopyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reuse" => Ok(Self::Reuse),
            "smartCopy" => Ok(Self::SmartCopy),
            "smartCopyAndChangeLocale" => Ok(Self::SmartCopyAndChangeLocale),
            other => Err(PageCopyError::InvalidCopyMode(other.to_string())),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ResourceModels

/// One resource as seen through the content repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecResource {
    /// Structure id (identity independent of path).
    pub id_structure: Uuid,
    /// Absolute root path. Folder paths end with `/`.
    pub path_root: String,
    /// Resource type id, resolved through the type registry.
    pub id_type: u32,
    /// Folder flag.
    pub if_folder: bool,
}

/// Resource type descriptor from the type registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecResourceType {
    /// Numeric type id.
    pub id_type: u32,
    /// Type name, e.g. `containerpage`.
    pub name_type: String,
    /// Whether resources of this type are folders.
    pub if_folder: bool,
}

/// Per-type element copy configuration, resolved for a target location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecTypeConfig {
    /// Resource type name this entry applies to.
    pub name_type: String,
    /// Copy elements of this type when duplicating pages.
    pub if_copy_in_models: bool,
    /// Folder for new element copies; `None` means the target page's folder.
    pub path_folder_content: Option<String>,
    /// File name pattern for new element copies, with one `%(number)`.
    pub name_pattern: String,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ContainerPageModels

/// Reference to a content resource placed in a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecContainerElement {
    /// Structure id of the referenced content resource.
    pub id_structure: Uuid,
    /// Formatter used to render the element.
    pub id_formatter: Option<Uuid>,
    /// Individual settings of this placement.
    pub settings: BTreeMap<String, String>,
    /// Marked upstream as "create a new element when copied".
    pub if_create_new: bool,
}

impl SpecContainerElement {
    /// Same placement (formatter, settings, flag) pointing at another resource.
    pub fn with_structure_id(&self, id_structure: Uuid) -> Self {
        Self {
            id_structure,
            id_formatter: self.id_formatter,
            settings: self.settings.clone(),
            if_create_new: self.if_create_new,
        }
    }
}

/// Named container holding an ordered element list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecContainer {
    /// Container name, unique within the page.
    pub name: String,
    /// Container type.
    pub type_container: String,
    /// Instance id of the element this container is nested in.
    pub id_parent_instance: Option<String>,
    /// Ordered elements.
    pub elements: Vec<SpecContainerElement>,
}

/// Parsed body of a container page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecContainerPage {
    /// Containers in document order.
    pub containers: Vec<SpecContainer>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Options

/// Input options for [`crate::copy::PageCopier`].
#[derive(Debug, Clone)]
pub struct SpecPageCopyOptions {
    /// Element handling policy.
    pub rule_copy_mode: EnumCopyMode,
    /// Type names accepted as container pages.
    pub l_types_page: Vec<String>,
    /// Explicit destination name; bypasses numbered name generation.
    pub name_target: Option<String>,
    /// When set, elements are resolved exclusively through this table.
    pub dict_replacements_custom: Option<HashMap<Uuid, Uuid>>,
}

impl Default for SpecPageCopyOptions {
    fn default() -> Self {
        Self {
            rule_copy_mode: EnumCopyMode::SmartCopy,
            l_types_page: vec![C_TYPE_CONTAINER_PAGE.to_string()],
            name_target: None,
            dict_replacements_custom: None,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Failures reported by a [`crate::repo::ContentRepository`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    /// No resource at this path.
    #[error("Resource not found: {0}")]
    NotFound(String),
    /// No resource with this structure id.
    #[error("Resource not found for structure id {0}")]
    NotFoundId(Uuid),
    /// Path is already taken.
    #[error("Resource already exists: {0}")]
    AlreadyExists(String),
    /// Lock held by another session.
    #[error("Resource is locked by another user: {0}")]
    LockedByOther(String),
    /// Write attempted without holding the lock.
    #[error("Resource is not locked: {0}")]
    NotLocked(String),
    /// Type registry has no entry for this id.
    #[error("Unknown resource type id {0}")]
    UnknownType(u32),
    /// Folder operation on a non-folder.
    #[error("Resource is not a folder: {0}")]
    NotAFolder(String),
}

/// Container page / element content XML failures.
#[derive(Debug, thiserror::Error)]
pub enum PageXmlError {
    /// Document is not well-formed.
    #[error("Malformed XML: {0}")]
    Parse(#[from] roxmltree::Error),
    /// Document is well-formed but does not have the expected shape.
    #[error("Invalid container page: {0}")]
    Structure(String),
    /// Serialization failed.
    #[error("Failed to write XML: {0}")]
    Write(String),
}

/// Top-level page copy failure.
#[derive(Debug, thiserror::Error)]
pub enum PageCopyError {
    /// Source is neither a container page nor a folder with one as default file.
    #[error("Not a valid container page: {0}")]
    InvalidPage(String),
    /// Folder source copied into itself.
    #[error("Source folder is the target folder: {0}")]
    SourceIsTarget(String),
    /// Explicit destination name is taken.
    #[error("Target already exists: {0}")]
    TargetExists(String),
    /// Custom replacement table has no entry for an element.
    #[error("No custom replacement for element {0}")]
    NoCustomReplacement(Uuid),
    /// Every numbered candidate name is taken.
    #[error("No free name for pattern {0}")]
    NameExhausted(String),
    /// Unrecognized copy mode identifier.
    #[error("Unknown copy mode: {0}")]
    InvalidCopyMode(String),
    /// Repository access failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    /// XML read/write failed.
    #[error(transparent)]
    Xml(#[from] PageXmlError),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{EnumCopyMode, PageCopyError};

    #[test]
    fn copy_mode_parses_caller_identifiers() {
        for enum_mode in [
            EnumCopyMode::Reuse,
            EnumCopyMode::SmartCopy,
            EnumCopyMode::SmartCopyAndChangeLocale,
        ] {
            let parsed: EnumCopyMode = enum_mode.as_str().parse().expect("parse mode");
            assert_eq!(parsed, enum_mode);
        }

        let err = "deepCopy".parse::<EnumCopyMode>().expect_err("must fail");
        assert!(matches!(err, PageCopyError::InvalidCopyMode(v) if v == "deepCopy"));
    }
}
