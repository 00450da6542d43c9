//! `contentkit_page_copy` v1:
//! Container page copy engine.
//!
//! Module layout:
//! - `copy`    : page copy orchestration and element replacement
//! - `spec`    : enums/models/options/errors
//! - `conf`    : constants and TOML type configuration
//! - `page`    : container page XML model
//! - `content` : locale blocks of element content
//! - `repo`    : repository/locale/type-config interfaces, lock guard
//! - `memory`  : in-memory repository
//! - `report`  : run-time report model
//! - `util`    : shared helper functions

pub mod conf;
pub mod content;
pub mod copy;
pub mod memory;
pub mod page;
pub mod repo;
pub mod report;
pub mod spec;
mod util;

pub use conf::{ConfTypeConfigs, ConfigError, SpecTypeConfigEntry};
pub use content::{EnumLocaleMove, list_locales, move_locale};
pub use copy::PageCopier;
pub use memory::MemoryRepository;
pub use page::{parse_container_page, write_container_page};
pub use repo::{ContentRepository, GuardLock, LocaleResolver, TypeConfigLookup};
pub use report::{ReportPageCopy, ReportPageCopyBuilder};
pub use spec::{
    EnumCopyMode, PageCopyError, PageXmlError, RepositoryError, SpecContainer,
    SpecContainerElement, SpecContainerPage, SpecPageCopyOptions, SpecResource,
    SpecResourceType, SpecTypeConfig,
};
pub use util::read_max_nav_pos;
