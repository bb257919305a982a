//! Typed import errors and their rendering into one user-facing message.

use std::collections::{BTreeMap, BTreeSet};

/// Category of a validation problem; drives the rendered suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Required,
    Numeric,
    Dict,
    Hanzi,
    SpecFormat,
    Custom,
    Duplicate,
    DuplicateCheck,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Numeric => "numeric",
            Self::Dict => "dict",
            Self::Hanzi => "hanzi",
            Self::SpecFormat => "spec_format",
            Self::Custom => "custom",
            Self::Duplicate => "duplicate",
            Self::DuplicateCheck => "duplicate_check",
        }
    }
}

/// One problem found at a sheet row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub sheet: String,
    pub row: u32,
    /// Display label of the offending column
    pub field: String,
    pub kind: ErrorKind,
    pub detail: String,
}

impl FieldError {
    pub fn new(
        sheet: impl Into<String>,
        row: u32,
        field: impl Into<String>,
        kind: ErrorKind,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            sheet: sheet.into(),
            row,
            field: field.into(),
            kind,
            detail: detail.into(),
        }
    }
}

fn suffix(kind: ErrorKind, detail: &str) -> String {
    match kind {
        ErrorKind::Required => "为空".to_string(),
        ErrorKind::Numeric => "需为数字".to_string(),
        ErrorKind::Dict if detail.is_empty() => " 不在系统字典中".to_string(),
        ErrorKind::Dict => format!(" 不在系统字典中[{}]", detail),
        ErrorKind::Hanzi => " 仅允许输入汉字".to_string(),
        ErrorKind::SpecFormat => " 格式应为 数字*数字".to_string(),
        ErrorKind::Custom | ErrorKind::Duplicate | ErrorKind::DuplicateCheck => {
            if detail.is_empty() {
                "有误".to_string()
            } else {
                detail.to_string()
            }
        }
    }
}

/// Render errors as one message per sheet.
///
/// Sheets are sorted by name; inside a sheet errors sharing (field, kind,
/// detail) collapse into a single `field(rows)suffix` part.
pub fn format_sheet_messages(errors: &[FieldError]) -> Vec<String> {
    type Groups<'a> = BTreeMap<(&'a str, &'static str, &'a str), (ErrorKind, BTreeSet<u32>)>;

    let mut sheets: BTreeMap<&str, Groups<'_>> = BTreeMap::new();
    for err in errors {
        sheets
            .entry(err.sheet.as_str())
            .or_default()
            .entry((err.field.as_str(), err.kind.as_str(), err.detail.as_str()))
            .or_insert_with(|| (err.kind, BTreeSet::new()))
            .1
            .insert(err.row);
    }

    sheets
        .into_iter()
        .map(|(sheet, groups)| {
            let parts: Vec<String> = groups
                .into_iter()
                .map(|((field, _, detail), (kind, rows))| {
                    let rows: Vec<String> = rows.iter().map(|r| r.to_string()).collect();
                    format!("{}({}){}", field, rows.join(","), suffix(kind, detail))
                })
                .collect();
            format!("{}：{}", sheet, parts.join("\n        "))
        })
        .collect()
}

/// Render errors as a single string, sheets joined with `; `.
pub fn format_errors(errors: &[FieldError]) -> String {
    format_sheet_messages(errors).join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_rows_per_field_and_kind() {
        let errors = vec![
            FieldError::new("平台面单", 5, "货号", ErrorKind::Required, ""),
            FieldError::new("平台面单", 3, "货号", ErrorKind::Required, ""),
            FieldError::new("平台面单", 3, "货号", ErrorKind::Required, ""),
            FieldError::new("平台面单", 4, "规格", ErrorKind::SpecFormat, ""),
        ];
        assert_eq!(
            format_errors(&errors),
            "平台面单：规格(4) 格式应为 数字*数字\n        货号(3,5)为空"
        );
    }

    #[test]
    fn test_sheets_are_sorted_and_joined() {
        let errors = vec![
            FieldError::new("平台面单", 2, "发货仓库", ErrorKind::Dict, "XX9"),
            FieldError::new("工厂物流", 7, "用户邮箱", ErrorKind::Required, ""),
        ];
        let messages = format_sheet_messages(&errors);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], "工厂物流：用户邮箱(7)为空");
        assert_eq!(messages[1], "平台面单：发货仓库(2) 不在系统字典中[XX9]");
        assert_eq!(format_errors(&errors), messages.join("; "));
    }

    #[test]
    fn test_suffixes() {
        assert_eq!(suffix(ErrorKind::Numeric, ""), "需为数字");
        assert_eq!(suffix(ErrorKind::Dict, ""), " 不在系统字典中");
        assert_eq!(suffix(ErrorKind::Hanzi, ""), " 仅允许输入汉字");
        assert_eq!(suffix(ErrorKind::Custom, ""), "有误");
        assert_eq!(suffix(ErrorKind::Custom, "缺少列"), "缺少列");
        assert_eq!(
            suffix(ErrorKind::Duplicate, "平台面单[第3行]已有类似记录，请检查!"),
            "平台面单[第3行]已有类似记录，请检查!"
        );
    }

    #[test]
    fn test_empty_input_renders_nothing() {
        assert!(format_sheet_messages(&[]).is_empty());
        assert_eq!(format_errors(&[]), "");
    }
}
