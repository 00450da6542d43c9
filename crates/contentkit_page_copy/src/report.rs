//! Page copy report model and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;

use uuid::Uuid;

/// Counters and diagnostics for one page copy run.
#[derive(Debug, Default, Clone)]
pub struct ReportPageCopy {
    /// Folder created for a folder source.
    pub id_folder_created: Option<Uuid>,
    /// Copied page.
    pub id_page_copied: Option<Uuid>,
    /// Root path of the copied page.
    pub path_page_copied: Option<String>,
    /// Element occurrences visited.
    pub cnt_elements: u64,
    /// New element resources created.
    pub cnt_copied: u64,
    /// Element occurrences left pointing at their original resource.
    pub cnt_reused: u64,
    /// Element copies whose locale block was moved.
    pub cnt_locales_adjusted: u64,
    /// Non-fatal warnings collected during the run.
    pub warnings: Vec<String>,
}

impl ReportPageCopy {
    /// Number of collected warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_elements".to_string(), self.cnt_elements);
        dict_counts.insert("cnt_copied".to_string(), self.cnt_copied);
        dict_counts.insert("cnt_reused".to_string(), self.cnt_reused);
        dict_counts.insert(
            "cnt_locales_adjusted".to_string(),
            self.cnt_locales_adjusted,
        );
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let dict_counts = self.to_dict();
        format!(
            "{prefix} page={} elements={} copied={} reused={} locales={} warnings={}",
            self.path_page_copied.as_deref().unwrap_or("-"),
            dict_counts["cnt_elements"],
            dict_counts["cnt_copied"],
            dict_counts["cnt_reused"],
            dict_counts["cnt_locales_adjusted"],
            dict_counts["cnt_warnings"]
        )
    }
}

impl fmt::Display for ReportPageCopy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[PAGE-COPY]"))
    }
}

/// Mutable accumulator for page copy statistics.
#[derive(Debug, Default, Clone)]
pub struct ReportPageCopyBuilder {
    /// See [`ReportPageCopy::cnt_elements`].
    pub cnt_elements: u64,
    /// See [`ReportPageCopy::cnt_copied`].
    pub cnt_copied: u64,
    /// See [`ReportPageCopy::cnt_reused`].
    pub cnt_reused: u64,
    /// See [`ReportPageCopy::cnt_locales_adjusted`].
    pub cnt_locales_adjusted: u64,
    /// See [`ReportPageCopy::warnings`].
    pub warnings: Vec<String>,
}

impl ReportPageCopyBuilder {
    /// Increment visited element count by one.
    pub fn add_element(&mut self) {
        self.cnt_elements += 1;
    }

    /// Increment created copy count by one.
    pub fn add_copied(&mut self) {
        self.cnt_copied += 1;
    }

    /// Increment reused count by one.
    pub fn add_reused(&mut self) {
        self.cnt_reused += 1;
    }

    /// Increment adjusted locale count by one.
    pub fn add_locale_adjusted(&mut self) {
        self.cnt_locales_adjusted += 1;
    }

    /// Add warning message.
    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Finalize builder into an immutable report.
    pub fn build(
        &self,
        id_folder_created: Option<Uuid>,
        id_page_copied: Option<Uuid>,
        path_page_copied: Option<String>,
    ) -> ReportPageCopy {
        ReportPageCopy {
            id_folder_created,
            id_page_copied,
            path_page_copied,
            cnt_elements: self.cnt_elements,
            cnt_copied: self.cnt_copied,
            cnt_reused: self.cnt_reused,
            cnt_locales_adjusted: self.cnt_locales_adjusted,
            warnings: self.warnings.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ReportPageCopy;

    #[test]
    fn report_to_dict_and_format() {
        let report = ReportPageCopy {
            path_page_copied: Some("/site/b/a_0001/index.html".to_string()),
            cnt_elements: 5,
            cnt_copied: 2,
            cnt_reused: 3,
            cnt_locales_adjusted: 1,
            warnings: vec!["w".to_string()],
            ..ReportPageCopy::default()
        };

        let dict_counts = report.to_dict();
        assert_eq!(dict_counts["cnt_elements"], 5);
        assert_eq!(dict_counts["cnt_copied"], 2);
        assert_eq!(dict_counts["cnt_reused"], 3);
        assert_eq!(dict_counts["cnt_locales_adjusted"], 1);
        assert_eq!(dict_counts["cnt_warnings"], 1);

        let txt = report.format("[PAGE-COPY]");
        assert_eq!(
            txt,
            "[PAGE-COPY] page=/site/b/a_0001/index.html elements=5 copied=2 reused=3 locales=1 warnings=1"
        );
        assert_eq!(report.to_string(), txt);
    }
}
