//! Line-level text diff used by the asset-only heuristic.
//!
//! Longest-common-subsequence over lines. Inputs are rendered state machine
//! definitions, so quadratic memory in the line count is acceptable.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineChange<'a> {
    Unchanged(&'a str),
    Added(&'a str),
    Removed(&'a str),
}

/// Diff two texts line by line
pub fn diff_lines<'a>(old: &'a str, new: &'a str) -> Vec<LineChange<'a>> {
    let a: Vec<&str> = old.lines().collect();
    let b: Vec<&str> = new.lines().collect();
    let (n, m) = (a.len(), b.len());

    // lcs[i][j] = LCS length of a[i..] and b[j..]
    let mut lcs = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if a[i] == b[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut out = Vec::with_capacity(n.max(m));
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if a[i] == b[j] {
            out.push(LineChange::Unchanged(a[i]));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            out.push(LineChange::Removed(a[i]));
            i += 1;
        } else {
            out.push(LineChange::Added(b[j]));
            j += 1;
        }
    }
    out.extend(a[i..].iter().copied().map(LineChange::Removed));
    out.extend(b[j..].iter().copied().map(LineChange::Added));
    out
}

fn render(value: Option<&Value>) -> String {
    let value = value.cloned().unwrap_or_else(|| Value::String(String::new()));
    serde_json::to_string_pretty(&value).unwrap_or_default()
}

/// True when every added or removed line of the rendered old/new values
/// contains `marker`, and at least one line changed.
pub fn only_asset_changes(old: Option<&Value>, new: Option<&Value>, marker: &str) -> bool {
    let old_text = render(old);
    let new_text = render(new);
    let changed: Vec<&str> = diff_lines(&old_text, &new_text)
        .into_iter()
        .filter_map(|change| match change {
            LineChange::Added(line) | LineChange::Removed(line) => Some(line.trim()),
            LineChange::Unchanged(_) => None,
        })
        .collect();

    !changed.is_empty() && changed.iter().all(|line| line.contains(marker))
}
