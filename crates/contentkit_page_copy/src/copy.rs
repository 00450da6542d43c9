//! Container page copy orchestration.

use std::collections::HashMap;

use uuid::Uuid;

use crate::conf::{C_PROPERTY_NAV_POS, C_TYPE_MODEL_GROUP, N_NAV_POS_STEP};
use crate::content::{EnumLocaleMove, move_locale};
use crate::page::{parse_container_page, write_container_page};
use crate::report::{ReportPageCopy, ReportPageCopyBuilder};
use crate::repo::{ContentRepository, GuardLock, LocaleResolver, TypeConfigLookup};
use crate::spec::{
    EnumCopyMode, PageCopyError, RepositoryError, SpecContainer, SpecContainerElement,
    SpecContainerPage, SpecPageCopyOptions, SpecResource, SpecTypeConfig,
};
use crate::util::{
    derive_copy_name_template, derive_new_name, derive_parent_path, derive_resource_name,
    format_nav_pos, join_path, read_max_nav_pos,
};

/// Copies one container page (or a folder whose default file is one) into a
/// target folder.
///
/// A copier is single-use: its element replacement map is scoped to one
/// [`PageCopier::run`] and guarantees that every occurrence of a source
/// element resolves to the same replacement.
pub struct PageCopier<'a> {
    repo: &'a dyn ContentRepository,
    lookup_type_config: &'a dyn TypeConfigLookup,
    resolver_locale: &'a dyn LocaleResolver,
    spec_options: SpecPageCopyOptions,
    dict_element_replacements: HashMap<Uuid, Uuid>,
    builder_report: ReportPageCopyBuilder,
    path_page_original: Option<String>,
    path_folder_target: Option<String>,
    res_folder_created: Option<SpecResource>,
    res_page_copied: Option<SpecResource>,
}

impl<'a> PageCopier<'a> {
    /// Create a copier for one run.
    pub fn new(
        repo: &'a dyn ContentRepository,
        lookup_type_config: &'a dyn TypeConfigLookup,
        resolver_locale: &'a dyn LocaleResolver,
        spec_options: SpecPageCopyOptions,
    ) -> Self {
        Self {
            repo,
            lookup_type_config,
            resolver_locale,
            spec_options,
            dict_element_replacements: HashMap::new(),
            builder_report: ReportPageCopyBuilder::default(),
            path_page_original: None,
            path_folder_target: None,
            res_folder_created: None,
            res_page_copied: None,
        }
    }

    /// Active copy mode.
    pub fn copy_mode(&self) -> EnumCopyMode {
        self.spec_options.rule_copy_mode
    }

    /// Folder created by the last run, for folder sources.
    pub fn id_folder_created(&self) -> Option<Uuid> {
        self.res_folder_created.as_ref().map(|r| r.id_structure)
    }

    /// Page created by the last run.
    pub fn id_page_copied(&self) -> Option<Uuid> {
        self.res_page_copied.as_ref().map(|r| r.id_structure)
    }

    /// Decisions taken so far: source element id -> replacement id.
    ///
    /// Reused elements map to themselves.
    pub fn element_replacements(&self) -> &HashMap<Uuid, Uuid> {
        &self.dict_element_replacements
    }

    /// Snapshot of the counters collected so far.
    pub fn report(&self) -> ReportPageCopy {
        self.builder_report.build(
            self.id_folder_created(),
            self.id_page_copied(),
            self.res_page_copied.as_ref().map(|r| r.path_root.clone()),
        )
    }

    /// Locale source/target used by [`PageCopier::adjust_locales_for_element`]
    /// when elements are replaced outside of [`PageCopier::run`].
    pub fn set_locale_context(&mut self, path_page_original: &str, path_folder_target: &str) {
        self.path_page_original = Some(path_page_original.to_string());
        self.path_folder_target = Some(path_folder_target.to_string());
    }

    /// Copy `source` into `target_folder`.
    ///
    /// Steps:
    /// 1. Resolve the source page and validate preconditions.
    /// 2. Scan the target folder for its highest navigation position.
    /// 3. Create the folder copy (folder source) and copy the page.
    /// 4. Replace the page's elements, then release all locks.
    ///
    /// Nothing is rolled back on failure: resources created before the error
    /// stay in the repository.
    pub fn run(
        &mut self,
        source: &SpecResource,
        target_folder: &SpecResource,
    ) -> Result<ReportPageCopy, PageCopyError> {
        let repo = self.repo;
        if source.if_folder
            && (source.id_structure == target_folder.id_structure
                || source.path_root == target_folder.path_root)
        {
            return Err(PageCopyError::SourceIsTarget(source.path_root.clone()));
        }
        let res_page_source = self.resolve_source_page(source)?;
        if !target_folder.if_folder {
            return Err(RepositoryError::NotAFolder(target_folder.path_root.clone()).into());
        }
        self.set_locale_context(&res_page_source.path_root, &target_folder.path_root);

        let nav_pos_new = read_max_nav_pos(repo, &target_folder.path_root)?
            .map(|nav_pos_max| nav_pos_max + N_NAV_POS_STEP);
        let path_target = self.derive_target_path(source, target_folder)?;

        if source.if_folder {
            let mut dict_props = repo.read_properties(&source.path_root)?;
            dict_props.remove(C_PROPERTY_NAV_POS);
            if let Some(nav_pos) = nav_pos_new {
                dict_props.insert(C_PROPERTY_NAV_POS.to_string(), format_nav_pos(nav_pos));
            }
            let res_folder = repo.create_folder(&path_target, source.id_type, &dict_props)?;
            self.res_folder_created = Some(res_folder.clone());
            let _guard_folder = GuardLock::acquire(repo, &res_folder.path_root)?;

            let path_page = join_path(
                &res_folder.path_root,
                derive_resource_name(&res_page_source.path_root),
                false,
            );
            let res_page = repo.copy_resource(&res_page_source.path_root, &path_page)?;
            self.res_page_copied = Some(res_page.clone());
            let _guard_page = GuardLock::acquire(repo, &res_page.path_root)?;
            self.replace_elements(&res_page)?;
        } else {
            let res_page = repo.copy_resource(&source.path_root, &path_target)?;
            self.res_page_copied = Some(res_page.clone());
            let _guard_page = GuardLock::acquire(repo, &res_page.path_root)?;
            match nav_pos_new {
                Some(nav_pos) => repo.write_property(
                    &res_page.path_root,
                    C_PROPERTY_NAV_POS,
                    &format_nav_pos(nav_pos),
                )?,
                None => repo.remove_property(&res_page.path_root, C_PROPERTY_NAV_POS)?,
            }
            self.replace_elements(&res_page)?;
        }

        let report = self.report();
        log::info!("{report}");
        Ok(report)
    }

    fn resolve_source_page(&self, source: &SpecResource) -> Result<SpecResource, PageCopyError> {
        let res_page = if source.if_folder {
            match self.repo.read_default_file(&source.path_root)? {
                Some(res_default) => res_default,
                None => return Err(PageCopyError::InvalidPage(source.path_root.clone())),
            }
        } else {
            source.clone()
        };

        let cfg_type = self.repo.resolve_type(res_page.id_type)?;
        if !self
            .spec_options
            .l_types_page
            .iter()
            .any(|c| *c == cfg_type.name_type)
        {
            return Err(PageCopyError::InvalidPage(source.path_root.clone()));
        }
        Ok(res_page)
    }

    fn derive_target_path(
        &self,
        source: &SpecResource,
        target_folder: &SpecResource,
    ) -> Result<String, PageCopyError> {
        if let Some(name_target) = &self.spec_options.name_target {
            let path_target = join_path(&target_folder.path_root, name_target, source.if_folder);
            if self.repo.exists(&path_target) {
                return Err(PageCopyError::TargetExists(path_target));
            }
            return Ok(path_target);
        }

        let name_template =
            derive_copy_name_template(derive_resource_name(&source.path_root), source.if_folder);
        let path_template = join_path(&target_folder.path_root, &name_template, source.if_folder);
        derive_new_name(self.repo, &path_template)
    }

    /// Rebuild the element structure of `copied_page` and write it back.
    ///
    /// `copied_page` must be locked by this session.
    pub fn replace_elements(&mut self, copied_page: &SpecResource) -> Result<(), PageCopyError> {
        let txt_page = self.repo.read_file(&copied_page.path_root)?;
        let page = parse_container_page(&txt_page)?;

        let mut l_containers = Vec::with_capacity(page.containers.len());
        for container in page.containers {
            let mut l_elements = Vec::with_capacity(container.elements.len());
            for element in &container.elements {
                l_elements.push(self.replace_container_element(copied_page, element)?);
            }
            l_containers.push(SpecContainer {
                name: container.name,
                type_container: container.type_container,
                id_parent_instance: container.id_parent_instance,
                elements: l_elements,
            });
        }

        let txt_new = write_container_page(&SpecContainerPage {
            containers: l_containers,
        })?;
        self.repo.write_file(&copied_page.path_root, &txt_new)?;
        Ok(())
    }

    /// Decide copy-or-reuse for one element occurrence.
    pub fn replace_container_element(
        &mut self,
        target_page: &SpecResource,
        original: &SpecContainerElement,
    ) -> Result<SpecContainerElement, PageCopyError> {
        let id_original = original.id_structure;
        self.builder_report.add_element();

        if let Some(dict_custom) = &self.spec_options.dict_replacements_custom {
            let Some(id_custom) = dict_custom.get(&id_original) else {
                return Err(PageCopyError::NoCustomReplacement(id_original));
            };
            log::debug!("Element {id_original} replaced by custom entry {id_custom}");
            return Ok(original.with_structure_id(*id_custom));
        }

        match self.spec_options.rule_copy_mode {
            EnumCopyMode::Reuse => {
                log::debug!("Reusing element {id_original}: copy mode is reuse");
                self.builder_report.add_reused();
                return Ok(original.clone());
            }
            EnumCopyMode::SmartCopy | EnumCopyMode::SmartCopyAndChangeLocale => {}
        }

        if let Some(id_cached) = self.dict_element_replacements.get(&id_original) {
            log::debug!("Element {id_original} already resolved to {id_cached}");
            if *id_cached == id_original {
                self.builder_report.add_reused();
            }
            return Ok(original.with_structure_id(*id_cached));
        }

        let res_original = self.repo.read_resource_by_id(id_original)?;
        let cfg_type = self.repo.resolve_type(res_original.id_type)?;
        let Some(cfg_type_config) = self
            .lookup_type_config
            .type_config(&target_page.path_root, &cfg_type.name_type)
        else {
            let warning = format!(
                "No type configuration for `{}` at {}; reusing {}",
                cfg_type.name_type, target_page.path_root, res_original.path_root
            );
            log::warn!("{warning}");
            self.builder_report.add_warning(warning);
            return Ok(self.record_reuse(original));
        };

        let if_copy = (original.if_create_new || cfg_type_config.if_copy_in_models)
            && cfg_type.name_type != C_TYPE_MODEL_GROUP;
        if !if_copy {
            log::debug!(
                "Reusing {}: type `{}` is not copied (create_new={}, copy_in_models={})",
                res_original.path_root,
                cfg_type.name_type,
                original.if_create_new,
                cfg_type_config.if_copy_in_models
            );
            return Ok(self.record_reuse(original));
        }

        let res_copy = self.create_element_copy(&res_original, &cfg_type_config, target_page)?;
        self.dict_element_replacements
            .insert(id_original, res_copy.id_structure);
        self.builder_report.add_copied();
        log::debug!(
            "Copied element {} to {}",
            res_original.path_root,
            res_copy.path_root
        );
        let element_new = original.with_structure_id(res_copy.id_structure);

        let _guard_copy = GuardLock::acquire(self.repo, &res_copy.path_root)?;
        match self.adjust_locales_for_element(&res_copy) {
            Ok(true) => self.builder_report.add_locale_adjusted(),
            Ok(false) => {}
            Err(e) => {
                let warning = format!(
                    "Locale adjustment failed for {}: {e}",
                    res_copy.path_root
                );
                log::info!("{warning}");
                self.builder_report.add_warning(warning);
            }
        }
        Ok(element_new)
    }

    fn record_reuse(&mut self, original: &SpecContainerElement) -> SpecContainerElement {
        self.dict_element_replacements
            .insert(original.id_structure, original.id_structure);
        self.builder_report.add_reused();
        original.clone()
    }

    fn create_element_copy(
        &self,
        res_original: &SpecResource,
        cfg_type_config: &SpecTypeConfig,
        target_page: &SpecResource,
    ) -> Result<SpecResource, PageCopyError> {
        let path_folder = match &cfg_type_config.path_folder_content {
            Some(path_folder) => path_folder.clone(),
            None => derive_parent_path(&target_page.path_root)
                .ok_or_else(|| RepositoryError::NotAFolder(target_page.path_root.clone()))?,
        };
        let path_template = join_path(&path_folder, &cfg_type_config.name_pattern, false);
        let path_new = derive_new_name(self.repo, &path_template)?;
        Ok(self.repo.copy_resource(&res_original.path_root, &path_new)?)
    }

    /// Move the locale block of a new element copy from the source page's
    /// locale to the target folder's locale.
    ///
    /// Only active in [`EnumCopyMode::SmartCopyAndChangeLocale`]. Returns
    /// whether the content was rewritten; inapplicable moves leave it as is.
    pub fn adjust_locales_for_element(
        &mut self,
        res_element: &SpecResource,
    ) -> Result<bool, PageCopyError> {
        match self.spec_options.rule_copy_mode {
            EnumCopyMode::SmartCopyAndChangeLocale => {}
            EnumCopyMode::Reuse | EnumCopyMode::SmartCopy => return Ok(false),
        }
        let (Some(path_page_original), Some(path_folder_target)) =
            (&self.path_page_original, &self.path_folder_target)
        else {
            log::debug!(
                "No locale context; leaving {} unchanged",
                res_element.path_root
            );
            return Ok(false);
        };

        let c_locale_old = self.resolver_locale.default_locale(path_page_original)?;
        let c_locale_new = self.resolver_locale.default_locale(path_folder_target)?;
        let txt_content = self.repo.read_file(&res_element.path_root)?;

        match move_locale(&txt_content, &c_locale_old, &c_locale_new)? {
            EnumLocaleMove::Moved(txt_new) => {
                self.repo.write_file(&res_element.path_root, &txt_new)?;
                log::debug!(
                    "Moved locale {c_locale_old} -> {c_locale_new} in {}",
                    res_element.path_root
                );
                Ok(true)
            }
            EnumLocaleMove::MissingSource => {
                log::info!(
                    "{} has no `{c_locale_old}` content; locale left unchanged",
                    res_element.path_root
                );
                Ok(false)
            }
            EnumLocaleMove::TargetExists => {
                log::info!(
                    "{} already has `{c_locale_new}` content; locale left unchanged",
                    res_element.path_root
                );
                Ok(false)
            }
            EnumLocaleMove::SameLocale => Ok(false),
        }
    }
}
