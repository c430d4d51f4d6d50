//! Markdown normalisation: make hand-written CV Markdown safe for Pandoc.
//!
//! People edit résumés as loose text: a heading directly followed by a
//! paragraph, a bullet list butted against a blockquote, a `**Role**` line
//! straight after the company name. Pandoc's Markdown reader then merges those
//! into one paragraph or swallows the heading. This pass inserts the blank
//! lines Pandoc needs and nothing else.
//!
//! ## Rules
//!
//! One left-to-right pass with a single line of look-behind:
//!
//! 1. `---` as the first line opens the leading metadata block; the next `---`
//!    closes it. A `---` directly after another emitted `---` is also kept
//!    verbatim and resets the look-behind, so an empty block (`---` twice)
//!    adds nothing. Delimiters never get a blank line inserted before them.
//! 2. Blank lines pass through and reset the look-behind.
//! 3. List / quote lines (`-`, `*`, `+`, `>`) get a blank line only when the
//!    marker changes; a run of the same marker stays tight.
//! 4. Headings (`#`) and plain text get a blank line after any non-blank line.
//!
//! Lines inside the metadata block are not special-cased: a YAML line that
//! starts with `-` or `#` goes through rules 3 and 4 like any other line.

const METADATA_DELIMITER: &str = "---";

/// Classification of a single trimmed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineClass {
    Empty,
    MetadataDelimiter,
    ListOrQuote(char),
    Heading,
    Text,
}

/// What the previously emitted non-blank line was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prev {
    None,
    Metadata,
    Marker(char),
    Heading,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MetadataBlock {
    NotOpened,
    Open,
    Closed,
}

fn classify(trimmed: &str) -> LineClass {
    if trimmed.is_empty() {
        return LineClass::Empty;
    }
    if trimmed == METADATA_DELIMITER {
        return LineClass::MetadataDelimiter;
    }
    match trimmed.chars().next() {
        Some(c @ ('-' | '*' | '+' | '>')) => LineClass::ListOrQuote(c),
        Some('#') => LineClass::Heading,
        _ => LineClass::Text,
    }
}

/// Normalise raw Markdown into the blank-line layout Pandoc parses reliably.
///
/// Total and deterministic: any input is accepted, and running the result
/// through `normalize` again returns it unchanged. The output always ends in
/// exactly one newline; whitespace-only input becomes `"\n"`.
///
/// ```rust
/// use cvpress::normalize;
///
/// assert_eq!(normalize("# Title\nSome text"), "# Title\n\nSome text\n");
/// assert_eq!(normalize("- a\n- b\n- c"), "- a\n- b\n- c\n");
/// ```
pub fn normalize(raw: &str) -> String {
    let mut out: Vec<&str> = Vec::with_capacity(raw.len() / 16 + 8);
    let mut prev = Prev::None;
    let mut metadata = MetadataBlock::NotOpened;

    for line in raw.lines() {
        let class = classify(line.trim());

        if class == LineClass::MetadataDelimiter {
            if out.is_empty() {
                metadata = MetadataBlock::Open;
                out.push(line);
                prev = Prev::None;
                continue;
            }
            if metadata == MetadataBlock::Open {
                metadata = MetadataBlock::Closed;
                // An empty block closes like any adjacent delimiter.
                prev = if out.last().is_some_and(|l| l.trim() == METADATA_DELIMITER) {
                    Prev::None
                } else {
                    Prev::Metadata
                };
                out.push(line);
                continue;
            }
            if out.last().is_some_and(|l| l.trim() == METADATA_DELIMITER) {
                out.push(line);
                prev = Prev::None;
                continue;
            }
        }

        prev = match class {
            LineClass::Empty => {
                out.push(line);
                Prev::None
            }
            // A stray `---` outside the leading block is a bullet-ish line.
            LineClass::MetadataDelimiter | LineClass::ListOrQuote(_) => {
                let marker = match class {
                    LineClass::ListOrQuote(c) => c,
                    _ => '-',
                };
                if prev != Prev::None && prev != Prev::Marker(marker) {
                    out.push("");
                }
                out.push(line);
                Prev::Marker(marker)
            }
            LineClass::Heading => {
                if prev != Prev::None {
                    out.push("");
                }
                out.push(line);
                Prev::Heading
            }
            LineClass::Text => {
                if prev != Prev::None {
                    out.push("");
                }
                out.push(line);
                Prev::Text
            }
        };
    }

    while out.last().is_some_and(|l| l.trim().is_empty()) {
        out.pop();
    }

    if out.is_empty() {
        return String::from("\n");
    }

    let mut result = out.join("\n");
    result.push('\n');
    result
}
