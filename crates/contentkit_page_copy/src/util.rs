use crate::conf::{C_NUMBER_PLACEHOLDER, C_PROPERTY_NAV_POS, N_NUMBER_DIGITS};
use crate::repo::ContentRepository;
use crate::spec::{PageCopyError, RepositoryError};

////////////////////////////////////////////////////////////////////////////////
// #region PathUtilities

/// Parent folder path (with trailing `/`), `None` for the root.
pub(crate) fn derive_parent_path(path_root: &str) -> Option<String> {
    let path_trimmed = path_root.strip_suffix('/').unwrap_or(path_root);
    if path_trimmed.is_empty() {
        return None;
    }
    let n_idx = path_trimmed.rfind('/')?;
    Some(path_trimmed[..=n_idx].to_string())
}

/// Last path segment without trailing `/`.
pub(crate) fn derive_resource_name(path_root: &str) -> &str {
    let path_trimmed = path_root.strip_suffix('/').unwrap_or(path_root);
    match path_trimmed.rfind('/') {
        Some(n_idx) => &path_trimmed[n_idx + 1..],
        None => path_trimmed,
    }
}

/// Split `name` into base and extension (extension keeps its dot).
///
/// A leading dot is part of the base name, so `.hidden` has no extension.
pub(crate) fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(n_idx) if n_idx > 0 => name.split_at(n_idx),
        _ => (name, ""),
    }
}

/// Join a folder path and a child name; `if_folder` appends the trailing `/`.
pub(crate) fn join_path(path_folder: &str, name: &str, if_folder: bool) -> String {
    let path_base = if path_folder.ends_with('/') {
        path_folder.to_string()
    } else {
        format!("{path_folder}/")
    };
    if if_folder {
        format!("{path_base}{name}/")
    } else {
        format!("{path_base}{name}")
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region NameGeneration

/// Numbered copy template for `name`: `<base>_%(number)<ext>`.
///
/// Folder names have no extension; the suffix always goes at the end.
pub(crate) fn derive_copy_name_template(name: &str, if_folder: bool) -> String {
    let (c_base, c_ext) = if if_folder {
        (name, "")
    } else {
        split_extension(name)
    };
    format!("{c_base}_{C_NUMBER_PLACEHOLDER}{c_ext}")
}

/// Resolve `%(number)` in `path_template` to the lowest free number.
///
/// Numbers start at 1 and are zero-padded to [`N_NUMBER_DIGITS`]; past
/// `9999` they simply grow wider.
pub(crate) fn derive_new_name(
    repo: &dyn ContentRepository,
    path_template: &str,
) -> Result<String, PageCopyError> {
    for n_number in 1..usize::MAX {
        let c_number = format!("{n_number:0width$}", width = N_NUMBER_DIGITS);
        let path_candidate = path_template.replacen(C_NUMBER_PLACEHOLDER, &c_number, 1);
        if !repo.exists(&path_candidate) {
            return Ok(path_candidate);
        }
    }
    Err(PageCopyError::NameExhausted(path_template.to_string()))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Navigation

/// Highest numeric `NavPos` among the immediate children of `path_folder`.
///
/// Missing and non-numeric values are skipped; `None` if no child has one.
pub fn read_max_nav_pos(
    repo: &dyn ContentRepository,
    path_folder: &str,
) -> Result<Option<f64>, RepositoryError> {
    let mut max_nav_pos: Option<f64> = None;
    for child in repo.read_children(path_folder)? {
        let dict_props = repo.read_properties(&child.path_root)?;
        let Some(c_nav_pos) = dict_props.get(C_PROPERTY_NAV_POS) else {
            continue;
        };
        let Ok(nav_pos) = c_nav_pos.trim().parse::<f64>() else {
            log::debug!(
                "Ignoring non-numeric {C_PROPERTY_NAV_POS} '{c_nav_pos}' on {}",
                child.path_root
            );
            continue;
        };
        if !nav_pos.is_finite() {
            continue;
        }
        max_nav_pos = Some(max_nav_pos.map_or(nav_pos, |m| m.max(nav_pos)));
    }
    Ok(max_nav_pos)
}

/// Render a navigation position the way it is stored as a property.
pub(crate) fn format_nav_pos(nav_pos: f64) -> String {
    format!("{nav_pos}")
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{
        derive_copy_name_template, derive_new_name, derive_parent_path, derive_resource_name,
        format_nav_pos, join_path, read_max_nav_pos, split_extension,
    };
    use crate::memory::MemoryRepository;

    #[test]
    fn path_helpers() {
        assert_eq!(derive_parent_path("/a/b/"), Some("/a/".to_string()));
        assert_eq!(derive_parent_path("/a/b.html"), Some("/a/".to_string()));
        assert_eq!(derive_parent_path("/a/"), Some("/".to_string()));
        assert_eq!(derive_parent_path("/"), None);

        assert_eq!(derive_resource_name("/a/b/"), "b");
        assert_eq!(derive_resource_name("/a/b.html"), "b.html");

        assert_eq!(split_extension("index.html"), ("index", ".html"));
        assert_eq!(split_extension("a"), ("a", ""));
        assert_eq!(split_extension(".hidden"), (".hidden", ""));
        assert_eq!(split_extension("a.b.xml"), ("a.b", ".xml"));

        assert_eq!(join_path("/b", "a", true), "/b/a/");
        assert_eq!(join_path("/b/", "x.html", false), "/b/x.html");
    }

    #[test]
    fn new_name_skips_taken_numbers() {
        let repo = MemoryRepository::new();
        repo.add_folder("/b/", &[]).expect("b");
        repo.add_file("/b/page_0001.html", "containerpage", "", &[])
            .expect("taken");
        repo.add_file("/b/page_0002.html", "containerpage", "", &[])
            .expect("taken");

        let template = format!("/b/{}", derive_copy_name_template("page.html", false));
        assert_eq!(template, "/b/page_%(number).html");
        let path_new = derive_new_name(&repo, &template).expect("name");
        assert_eq!(path_new, "/b/page_0003.html");
    }

    #[test]
    fn folder_template_keeps_dots_in_name() {
        assert_eq!(derive_copy_name_template("v1.2", true), "v1.2_%(number)");
        assert_eq!(derive_copy_name_template("v1.2", false), "v1_%(number).2");
    }

    #[test]
    fn new_name_widens_past_padding() {
        let repo = MemoryRepository::new();
        repo.add_folder("/b/", &[]).expect("b");
        for n_number in 1..=9999 {
            repo.add_folder(&format!("/b/a_{n_number:04}/"), &[])
                .expect("taken");
        }

        let path_new = derive_new_name(&repo, "/b/a_%(number)/").expect("name");
        assert_eq!(path_new, "/b/a_10000/");
    }

    #[test]
    fn max_nav_pos_ignores_invalid_values() {
        let repo = MemoryRepository::new();
        repo.add_folder("/b/", &[]).expect("b");
        repo.add_folder("/b/x/", &[("NavPos", "3")]).expect("x");
        repo.add_folder("/b/y/", &[("NavPos", "not a number")]).expect("y");
        repo.add_file("/b/z.html", "containerpage", "", &[("NavPos", "7.5")])
            .expect("z");
        repo.add_folder("/b/x/deep/", &[("NavPos", "99")]).expect("deep");

        let max_nav_pos = read_max_nav_pos(&repo, "/b/").expect("scan");
        assert_eq!(max_nav_pos, Some(7.5));

        repo.add_folder("/c/", &[]).expect("c");
        repo.add_folder("/c/q/", &[("NavPos", "")]).expect("q");
        assert_eq!(read_max_nav_pos(&repo, "/c/").expect("scan"), None);
    }

    #[test]
    fn nav_pos_format() {
        assert_eq!(format_nav_pos(20.0), "20");
        assert_eq!(format_nav_pos(17.5), "17.5");
    }
}
