//! Page geometry and the table layout arithmetic.
//!
//! All measurement is deterministic: text width is estimated from character
//! counts at a fixed average glyph width, so the same record always wraps and
//! paginates identically.

/// A4 portrait, millimetres.
pub const PAGE_WIDTH: f32 = 210.0;
pub const PAGE_HEIGHT: f32 = 297.0;

pub const MARGIN_LEFT: f32 = 15.0;
pub const MARGIN_RIGHT: f32 = 15.0;
pub const CONTENT_WIDTH: f32 = PAGE_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;

/// First baseline below the page header chrome.
pub const CONTENT_TOP: f32 = PAGE_HEIGHT - 38.0;
/// Content must stay above the footer rule.
pub const CONTENT_BOTTOM: f32 = 25.0;

/// Test-table column widths (test, specification, result).
pub const COL_TEST: f32 = 60.0;
pub const COL_SPEC: f32 = 75.0;
pub const COL_RESULT: f32 = 45.0;
pub const TABLE_WIDTH: f32 = COL_TEST + COL_SPEC + COL_RESULT;

/// Fixed table line height in millimetres.
pub const LINE_HEIGHT: f32 = 5.0;
/// Table header row height.
pub const TABLE_HEADER_HEIGHT: f32 = 6.0;

pub const SUMMARY_FONT_SIZE: f32 = 8.0;
pub const TABLE_FONT_SIZE: f32 = 7.0;
pub const TABLE_HEADER_FONT_SIZE: f32 = 9.0;
pub const FOOTNOTE_FONT_SIZE: f32 = 7.0;

const PT_TO_MM: f32 = 0.352_778;
/// Average glyph advance as a fraction of the font size.
const AVG_GLYPH_EM: f32 = 0.5;

/// Estimated width of one character at `font_size` points, in millimetres.
pub fn char_width_mm(font_size: f32) -> f32 {
    font_size * PT_TO_MM * AVG_GLYPH_EM
}

/// Estimated width of a string at `font_size` points, in millimetres.
pub fn text_width_mm(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * char_width_mm(font_size)
}

/// How many characters fit on one line of `width_mm` at `font_size` points.
pub fn chars_per_line(width_mm: f32, font_size: f32) -> usize {
    let budget = (width_mm / char_width_mm(font_size)).floor();
    (budget as usize).max(1)
}

/// Greedy word wrap at a character budget.
///
/// Words longer than the budget are hard-split so no line ever exceeds it.
/// Blank input produces no lines.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        let current_len = current.chars().count();

        if current_len + word_len + 1 > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }

        if word_len > max_chars {
            // Hard-split an oversized word across as many lines as needed.
            let mut rest: Vec<char> = word.chars().collect();
            while rest.len() > max_chars {
                let head: String = rest.drain(..max_chars).collect();
                lines.push(head);
            }
            current = rest.into_iter().collect();
        } else {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// One table row measured for drawing: wrapped cell lines and total height.
#[derive(Debug, Clone)]
pub struct MeasuredRow {
    pub test_lines: Vec<String>,
    pub spec_lines: Vec<String>,
    pub result_lines: Vec<String>,
    pub height: f32,
}

/// Wraps the three cells at their column budgets and derives the row height:
/// the tallest cell's line count times the fixed line height, with a one-line
/// minimum.
pub fn measure_row(test: &str, spec: &str, result: &str) -> MeasuredRow {
    let test_lines = wrap_text(test, chars_per_line(COL_TEST, TABLE_FONT_SIZE));
    let spec_lines = wrap_text(spec, chars_per_line(COL_SPEC, TABLE_FONT_SIZE));
    let result_lines = wrap_text(result, chars_per_line(COL_RESULT, TABLE_FONT_SIZE));

    let line_count = test_lines
        .len()
        .max(spec_lines.len())
        .max(result_lines.len())
        .max(1);

    MeasuredRow {
        test_lines,
        spec_lines,
        result_lines,
        height: line_count as f32 * LINE_HEIGHT,
    }
}

/// Splits rows into page segments.
///
/// A row that would overflow the space remaining on its page goes, whole, to
/// the next page: the break happens before the row, never mid-row. Rows
/// taller than a full page still occupy one page alone rather than being
/// dropped.
pub fn paginate_rows(heights: &[f32], first_available: f32, page_available: f32) -> Vec<Vec<usize>> {
    let mut segments: Vec<Vec<usize>> = vec![Vec::new()];
    let mut remaining = first_available;

    for (index, &height) in heights.iter().enumerate() {
        let segment_is_empty = segments.last().is_some_and(Vec::is_empty);
        if height > remaining && !segment_is_empty {
            segments.push(Vec::new());
            remaining = page_available;
        }
        segments
            .last_mut()
            .expect("segments is never empty")
            .push(index);
        remaining -= height;
    }

    segments
}
