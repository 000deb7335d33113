#![forbid(unsafe_code)]

use super::{PatternCache, Removal};

const HTML_PATTERN: &str = r"<!--[\s\S]*?-->|</?[A-Za-z][A-Za-z0-9:-]*(?:\s[^<>]*)?/?>";

/// A span of text where tags are never touched: code and HTML.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExclusionRange {
    pub start: usize,
    pub end: usize,
}

impl ExclusionRange {
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

/// Fenced code, inline code and HTML tags, merged and sorted.
pub fn exclusion_ranges(
    text: &str,
    patterns: &mut PatternCache,
) -> Result<Vec<ExclusionRange>, regex::Error> {
    let fenced = fenced_code_ranges(text);
    let mut ranges = inline_code_ranges(text, &fenced);
    ranges.extend(fenced);

    let html = patterns.get("html", || HTML_PATTERN.to_string())?;
    ranges.extend(html.find_iter(text).map(|m| ExclusionRange {
        start: m.start(),
        end: m.end(),
    }));
    Ok(merge_ranges(ranges))
}

pub fn is_excluded(ranges: &[ExclusionRange], offset: usize) -> bool {
    let idx = ranges.partition_point(|range| range.end <= offset);
    ranges.get(idx).is_some_and(|range| range.contains(offset))
}

pub fn merge_ranges(mut ranges: Vec<ExclusionRange>) -> Vec<ExclusionRange> {
    ranges.retain(|range| range.start < range.end);
    ranges.sort_by_key(|range| (range.start, range.end));
    let mut merged: Vec<ExclusionRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.start <= last.end => last.end = last.end.max(range.end),
            _ => merged.push(range),
        }
    }
    merged
}

/// Moves `ranges` to where their bytes sit after `removals` were cut out of
/// the text. Both slices are in offset order.
pub fn shift_ranges(ranges: &mut [ExclusionRange], removals: &[Removal]) {
    let removed_before = |offset: usize| -> usize {
        removals
            .iter()
            .take_while(|removal| removal.start < offset)
            .map(|removal| removal.len.min(offset - removal.start))
            .sum()
    };
    for range in ranges.iter_mut() {
        let start = range.start - removed_before(range.start);
        let end = range.end - removed_before(range.end);
        *range = ExclusionRange { start, end };
    }
}

/// ``` and ~~~ fences indented by at most three spaces. An unclosed fence
/// runs to the end of the text.
pub fn fenced_code_ranges(text: &str) -> Vec<ExclusionRange> {
    let mut ranges = Vec::new();
    let mut open: Option<(usize, char, usize)> = None;
    let mut line_start = 0;

    for line in text.split_inclusive('\n') {
        let line_end = line_start + line.len();
        let content = line.trim_end_matches(['\n', '\r']);
        let indent = content.len() - content.trim_start_matches(' ').len();
        let fence = if indent <= 3 {
            fence_marker(&content[indent..])
        } else {
            None
        };

        match (open, fence) {
            (None, Some((ch, len, _))) => open = Some((line_start, ch, len)),
            (Some((start, open_ch, open_len)), Some((ch, len, rest)))
                if ch == open_ch && len >= open_len && rest.trim().is_empty() =>
            {
                ranges.push(ExclusionRange {
                    start,
                    end: line_end,
                });
                open = None;
            }
            _ => {}
        }
        line_start = line_end;
    }

    if let Some((start, _, _)) = open {
        ranges.push(ExclusionRange {
            start,
            end: text.len(),
        });
    }
    ranges
}

fn fence_marker(line: &str) -> Option<(char, usize, &str)> {
    let ch = line.chars().next().filter(|ch| matches!(ch, '`' | '~'))?;
    let len = line.len() - line.trim_start_matches(ch).len();
    if len < 3 {
        return None;
    }
    Some((ch, len, &line[len..]))
}

/// Backtick spans closed by a run of the same length, outside `fenced`.
pub fn inline_code_ranges(text: &str, fenced: &[ExclusionRange]) -> Vec<ExclusionRange> {
    let bytes = text.as_bytes();
    let mut ranges = Vec::new();

    let mut segments = Vec::new();
    let mut cursor = 0;
    for range in fenced {
        segments.push((cursor, range.start));
        cursor = range.end;
    }
    segments.push((cursor, text.len()));

    for (seg_start, seg_end) in segments {
        let mut idx = seg_start;
        while idx < seg_end {
            if bytes[idx] != b'`' {
                idx += 1;
                continue;
            }
            let open_len = run_length(bytes, idx, seg_end);
            let mut probe = idx + open_len;
            let mut closed = None;
            while probe < seg_end {
                if bytes[probe] != b'`' {
                    probe += 1;
                    continue;
                }
                let len = run_length(bytes, probe, seg_end);
                if len == open_len {
                    closed = Some(probe + len);
                    break;
                }
                probe += len;
            }
            match closed {
                Some(end) => {
                    ranges.push(ExclusionRange { start: idx, end });
                    idx = end;
                }
                None => idx += open_len,
            }
        }
    }
    ranges
}

fn run_length(bytes: &[u8], start: usize, end: usize) -> usize {
    bytes[start..end].iter().take_while(|b| **b == b'`').count()
}
