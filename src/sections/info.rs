//! `>INFO` section: free text describing acquisition and processing.
//!
//! Text is kept in order. Phoenix MT-Editor writes two paragraphs side by
//! side once its "Run information" banner appears; those columns are split
//! and the right-hand column is appended after the left-hand one.

use crate::config::EdiConfig;
use crate::constants::{
    INFO_MARKER, PHOENIX_COLUMN_SPLIT, PHOENIX_INFO_TRIGGER, PHOENIX_MIN_SPLIT_LEN,
};
use crate::sections::scan::{find_simple_section, is_marker};
use tracing::{debug, warn};

/// Ordered lines of the information section
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Information {
    pub lines: Vec<String>,
}

impl Information {
    /// Read the `>INFO` section out of a full document
    pub fn from_lines(lines: &[&str]) -> Self {
        match find_simple_section(lines, INFO_MARKER) {
            Some(section) => Self::from_info_lines(&section.body),
            None => {
                warn!("No {} section found", INFO_MARKER);
                Self::default()
            }
        }
    }

    /// Build from the raw body lines of an information section
    pub fn from_info_lines(raw: &[&str]) -> Self {
        let mut left = Vec::new();
        let mut right = Vec::new();
        let mut two_column = false;

        for line in raw {
            if line.to_lowercase().contains(PHOENIX_INFO_TRIGGER) {
                two_column = true;
            }

            if two_column && line.chars().count() > PHOENIX_MIN_SPLIT_LEN {
                let first: String = line.chars().take(PHOENIX_COLUMN_SPLIT).collect();
                let second: String = line.chars().skip(PHOENIX_COLUMN_SPLIT + 1).collect();
                left.push(first);
                right.push(second);
            } else {
                left.push(line.to_string());
            }
        }

        if two_column {
            debug!("Split {} two-column information lines", right.len());
        }
        left.extend(right);

        let info = Self {
            lines: clean_info_lines(left),
        };
        if info.lines.is_empty() {
            warn!("Information section is empty");
        }
        info
    }

    /// Render the `>INFO` block
    pub fn write_info(&self, config: &EdiConfig) -> Vec<String> {
        let mut lines = vec![INFO_MARKER.to_string(), String::new()];
        lines.extend(
            self.lines
                .iter()
                .map(|line| format!("{}{}", config.indent, line)),
        );
        lines.push(String::new());
        lines
    }
}

/// Trim lines, dropping blanks and stray section markers
fn clean_info_lines<I, S>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .filter_map(|line| {
            let trimmed = line.as_ref().trim();
            if trimmed.len() > 1 && !is_marker(trimmed) {
                Some(trimmed.to_string())
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_info_is_order_preserving() {
        let doc = [
            ">HEAD",
            "    DATAID=a",
            ">INFO",
            "",
            "    Processed with robust remote reference",
            "    .",
            "    Coherency threshold 0.8",
            ">=DEFINEMEAS",
        ];
        let info = Information::from_lines(&doc);

        assert_eq!(
            info.lines,
            vec![
                "Processed with robust remote reference".to_string(),
                "Coherency threshold 0.8".to_string(),
            ]
        );
    }

    #[test]
    fn test_phoenix_columns_are_split() {
        let left_a = format!("{:<38}", "Run information:");
        let left_b = format!("{:<38}", "Survey: Curnamona");
        let raw = [
            "Phoenix MT-Editor export".to_string(),
            format!("{}Station information:", left_a),
            format!("{}Latitude 31:25:10", left_b),
        ];
        let raw: Vec<&str> = raw.iter().map(String::as_str).collect();
        let info = Information::from_info_lines(&raw);

        assert_eq!(
            info.lines,
            vec![
                "Phoenix MT-Editor export".to_string(),
                "Run information:".to_string(),
                "Survey: Curnamona".to_string(),
                "Station information:".to_string(),
                "Latitude 31:25:10".to_string(),
            ]
        );
    }

    #[test]
    fn test_missing_info_section() {
        let info = Information::from_lines(&[">HEAD", "DATAID=a"]);
        assert!(info.lines.is_empty());
    }

    #[test]
    fn test_write_info() {
        let info = Information {
            lines: vec!["line one".to_string(), "line two".to_string()],
        };
        let written = info.write_info(&EdiConfig::default());

        assert_eq!(
            written,
            vec![
                ">INFO".to_string(),
                String::new(),
                "    line one".to_string(),
                "    line two".to_string(),
                String::new(),
            ]
        );
    }
}
