// ── Types ──────────────────────────────────────────────────────────────────

/// Half-open byte range `[start, end)` into the searched text covering one
/// case-insensitive occurrence of the snippet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
}

/// A run of text marked for rendering. Concatenating the segments returned by
/// [`highlight`] rebuilds the input text exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Plain(&'a str),
    Matched(&'a str),
}

impl<'a> Segment<'a> {
    pub fn text(&self) -> &'a str {
        match self {
            Segment::Plain(s) | Segment::Matched(s) => s,
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, Segment::Matched(_))
    }
}

// ── Matching ───────────────────────────────────────────────────────────────

fn fold(snippet: &str) -> Vec<char> {
    snippet.chars().flat_map(char::to_lowercase).collect()
}

/// Try to match the folded needle at byte offset `start` of `text`.
/// Returns the end offset on success. A match must end on a char boundary of
/// `text`, so a char whose lowercase form only partially covers the rest of
/// the needle does not count.
fn match_at(text: &str, start: usize, needle: &[char]) -> Option<usize> {
    let mut pos = 0;
    for (offset, c) in text[start..].char_indices() {
        if pos == needle.len() {
            return Some(start + offset);
        }
        for folded in c.to_lowercase() {
            if pos >= needle.len() || needle[pos] != folded {
                return None;
            }
            pos += 1;
        }
    }
    (pos == needle.len()).then_some(text.len())
}

/// Locate every case-insensitive occurrence of `snippet` in `text`, scanning
/// left to right and resuming at the end of each match, so spans never
/// overlap. The snippet is a literal: no character has pattern meaning.
pub fn match_spans(text: &str, snippet: &str) -> Vec<MatchSpan> {
    let needle = fold(snippet);
    let mut spans = Vec::new();
    if needle.is_empty() {
        return spans;
    }

    let mut cursor = 0;
    while cursor < text.len() {
        match match_at(text, cursor, &needle) {
            Some(end) => {
                spans.push(MatchSpan { start: cursor, end });
                cursor = end;
            }
            None => {
                // Step to the next char boundary
                cursor += text[cursor..].chars().next().map_or(1, char::len_utf8);
            }
        }
    }

    spans
}

/// Split `text` into plain and matched segments for `snippet`.
///
/// An empty snippet yields a single plain segment. Otherwise the result
/// alternates plain/matched, starting and ending with a plain segment that
/// may be empty. Matched segments keep the casing found in `text`.
pub fn highlight<'a>(text: &'a str, snippet: &str) -> Vec<Segment<'a>> {
    if snippet.is_empty() {
        return vec![Segment::Plain(text)];
    }

    let spans = match_spans(text, snippet);
    let mut segments = Vec::with_capacity(spans.len() * 2 + 1);
    let mut last = 0;
    for span in &spans {
        segments.push(Segment::Plain(&text[last..span.start]));
        segments.push(Segment::Matched(&text[span.start..span.end]));
        last = span.end;
    }
    segments.push(Segment::Plain(&text[last..]));
    segments
}

/// Filter predicate used by list views. An empty snippet matches everything.
pub fn contains_snippet(text: &str, snippet: &str) -> bool {
    snippet.is_empty() || !match_spans(text, snippet).is_empty()
}
