//! Helpers shared by codecs to create and collapse parameter children.
//!
//! Parameters hold at most 255 rows, so long lists are split across
//! `LABELS`, `LABELS2`, `LABELS3`... [`create_child_values`] performs the split
//! and [`collapse_child_values`] joins them back.

use super::info::{MetaDataInfo, MetaDataValues};
use super::tree::MetaData;
use crate::error::Result;

/// Maximum number of values stored in a single child
pub const MAX_VALUES_PER_CHILD: usize = 255;

fn chunk_label(base: &str, chunk: usize) -> String {
    if chunk == 0 {
        base.to_string()
    } else {
        format!("{}{}", base, chunk + 1)
    }
}

/// Get the child `label`, creating an empty unlocked group if needed
pub fn create_child<'a>(parent: &'a mut MetaData, label: &str) -> &'a mut MetaData {
    parent.get_or_append_child(label)
}

/// Create the child `label` or replace its payload with `info`.
///
/// An existing child keeps its position; its description is cleared and it
/// becomes unlocked.
pub fn create_child_info(parent: &mut MetaData, label: &str, info: MetaDataInfo) {
    let child = create_child(parent, label);
    child.set_description("");
    child.set_unlocked(true);
    child.set_info(Some(info));
}

/// Store a list of values, splitting it across numbered children when it
/// exceeds [`MAX_VALUES_PER_CHILD`]. Stale numbered children left over from a
/// longer list are removed.
///
/// Text rows wider than 255 bytes are a format error; `parent` is left
/// unchanged then.
pub fn create_child_values(parent: &mut MetaData, label: &str, values: MetaDataValues) -> Result<()> {
    let chunks: Vec<MetaDataValues> = match values {
        MetaDataValues::Char(v) => split(v, MetaDataValues::Char),
        MetaDataValues::Byte(v) => split(v, MetaDataValues::Byte),
        MetaDataValues::Integer(v) => split(v, MetaDataValues::Integer),
        MetaDataValues::Real(v) => split(v, MetaDataValues::Real),
    };
    let infos = chunks
        .into_iter()
        .map(MetaDataInfo::from_values)
        .collect::<Result<Vec<_>>>()?;
    let used = infos.len();
    for (idx, info) in infos.into_iter().enumerate() {
        create_child_info(parent, &chunk_label(label, idx), info);
    }
    let mut stale = used;
    while parent.remove_child(&chunk_label(label, stale)) {
        stale += 1;
    }
    Ok(())
}

fn split<T: Clone>(values: Vec<T>, wrap: fn(Vec<T>) -> MetaDataValues) -> Vec<MetaDataValues> {
    if values.is_empty() {
        return vec![wrap(Vec::new())];
    }
    values
        .chunks(MAX_VALUES_PER_CHILD)
        .map(|c| wrap(c.to_vec()))
        .collect()
}

/// Concatenate the text values of `base`, `base2`, `base3`... under `parent`.
///
/// Rows are trimmed. When `target_len` is given the result is truncated or
/// extended to that length; missing rows become `{default_prefix}{n}` with
/// `n` the 1-based position (empty strings without a prefix).
pub fn collapse_child_values(
    parent: Option<&MetaData>,
    base: &str,
    target_len: Option<usize>,
    default_prefix: Option<&str>,
) -> Vec<String> {
    let mut target: Vec<String> = Vec::new();
    if let Some(parent) = parent {
        let mut chunk = 0;
        while let Some(child) = parent.find_child(&chunk_label(base, chunk)) {
            if let Some(info) = child.info() {
                target.extend(info.to_strings().into_iter().map(|s| s.trim().to_string()));
            }
            if matches!(target_len, Some(n) if target.len() >= n) {
                break;
            }
            chunk += 1;
        }
    }
    if let Some(n) = target_len {
        target.truncate(n);
        let collapsed = target.len();
        target.extend((collapsed..n).map(|i| match default_prefix {
            Some(prefix) => format!("{}{}", prefix, i + 1),
            None => String::new(),
        }));
    }
    target
}

/// Numeric counterpart of [`collapse_child_values`]; values that do not
/// convert are skipped.
pub fn collapse_child_doubles(
    parent: Option<&MetaData>,
    base: &str,
    target_len: Option<usize>,
    default_value: f64,
) -> Vec<f64> {
    let mut target: Vec<f64> = Vec::new();
    if let Some(parent) = parent {
        let mut chunk = 0;
        while let Some(child) = parent.find_child(&chunk_label(base, chunk)) {
            if let Some(info) = child.info() {
                target.extend((0..info.len()).filter_map(|i| info.to_double(i).ok()));
            }
            if matches!(target_len, Some(n) if target.len() >= n) {
                break;
            }
            chunk += 1;
        }
    }
    if let Some(n) = target_len {
        target.resize(n, default_value);
    }
    target
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_child_split_strings() {
        let mut point = MetaData::new("POINT");
        create_child_values(
            &mut point,
            "LABELS",
            MetaDataValues::Char(vec!["TESTS".to_string(); 1120]),
        )
        .unwrap();
        assert_eq!(point.child_number(), 5);
        assert_eq!(point.child_by_label("LABELS").unwrap().info().unwrap().len(), 255);
        assert_eq!(point.child_by_label("LABELS5").unwrap().info().unwrap().len(), 100);
        let values = collapse_child_values(Some(&point), "LABELS", None, None);
        assert_eq!(values.len(), 1120);
    }

    #[test]
    fn test_create_child_split_reals() {
        let mut analog = MetaData::new("ANALOG");
        create_child_values(&mut analog, "SCALE", MetaDataValues::Real(vec![0.5; 300])).unwrap();
        assert_eq!(analog.child_number(), 2);
        assert_eq!(analog.child_by_label("SCALE2").unwrap().info().unwrap().len(), 45);
    }

    #[test]
    fn test_shorter_list_removes_stale_children() {
        let mut analog = MetaData::new("ANALOG");
        create_child_values(&mut analog, "LABELS", MetaDataValues::Char(vec!["A".into(); 300])).unwrap();
        create_child_values(&mut analog, "LABELS", MetaDataValues::Char(vec!["B".into(); 3])).unwrap();
        assert_eq!(analog.child_number(), 1);
        assert_eq!(
            collapse_child_values(Some(&analog), "LABELS", None, None),
            vec!["B", "B", "B"]
        );
    }

    #[test]
    fn test_collapse_with_blank_replacement() {
        let mut point = MetaData::new("POINT");
        create_child_values(
            &mut point,
            "LABELS",
            MetaDataValues::Char(vec!["TESTS".to_string(); 125]),
        )
        .unwrap();
        let values = collapse_child_values(Some(&point), "LABELS", Some(150), Some("uname*"));
        assert_eq!(values.len(), 150);
        for (i, v) in values.iter().enumerate().skip(125) {
            assert_eq!(v, &format!("uname*{}", i + 1));
        }
    }

    #[test]
    fn test_collapse_without_parent() {
        let values = collapse_child_values(None, "LABELS", Some(2), Some("uname*"));
        assert_eq!(values, vec!["uname*1", "uname*2"]);
        assert!(collapse_child_values(None, "LABELS", None, None).is_empty());
    }

    #[test]
    fn test_collapse_doubles() {
        let mut analog = MetaData::new("ANALOG");
        create_child_values(&mut analog, "SCALE", MetaDataValues::Real(vec![2.0; 3])).unwrap();
        let scales = collapse_child_doubles(Some(&analog), "SCALE", Some(5), 1.0);
        assert_eq!(scales, vec![2.0, 2.0, 2.0, 1.0, 1.0]);
    }

    #[test]
    fn test_too_wide_rows_leave_parent_unchanged() {
        let mut point = MetaData::new("POINT");
        create_child_values(&mut point, "LABELS", MetaDataValues::Char(vec!["A".into()])).unwrap();
        let wide = MetaDataValues::Char(vec!["x".repeat(256)]);
        assert!(create_child_values(&mut point, "LABELS", wide).is_err());
        assert_eq!(
            collapse_child_values(Some(&point), "LABELS", None, None),
            vec!["A"]
        );
    }
}
