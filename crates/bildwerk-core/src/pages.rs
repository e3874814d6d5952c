// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page selection strings such as "1,3-5".

/// Parse a page selection like `"1,3-5"` into sorted, deduplicated 0-based
/// page indices.
///
/// Input is 1-based. A blank selection means every page. Malformed parts and
/// pages outside `1..=page_count` are dropped without error; a reversed
/// range (`"5-3"`) is read as `"3-5"`.
pub fn parse_page_selection(selection: &str, page_count: usize) -> Vec<usize> {
    if selection.trim().is_empty() {
        return (0..page_count).collect();
    }

    let in_range = |page: u64| page >= 1 && page <= page_count as u64;
    let mut pages = Vec::new();

    for part in selection.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if let Some((start, end)) = part.split_once('-') {
            let (Ok(start), Ok(end)) = (start.trim().parse::<u64>(), end.trim().parse::<u64>())
            else {
                continue;
            };
            let (low, high) = if start > end { (end, start) } else { (start, end) };
            // Clip before iterating so "1-999999999" stays cheap.
            let high = high.min(page_count as u64);
            pages.extend(
                (low..=high)
                    .filter(|&page| in_range(page))
                    .map(|page| (page - 1) as usize),
            );
        } else if let Ok(page) = part.parse::<u64>() {
            if in_range(page) {
                pages.push((page - 1) as usize);
            }
        }
    }

    pages.sort_unstable();
    pages.dedup();
    pages
}
