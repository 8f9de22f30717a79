//! Heading-delimited sections of a markdown document.
//!
//! Used to regenerate one section of a post in place: find the section
//! under a heading, then swap its body while keeping the rest verbatim.
//! A section runs until the next heading of the same or a higher level.

use std::ops::Range;

use pulldown_cmark::{Event, Parser, Tag, TagEnd};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionHeading {
    pub level: u8,
    pub text: String,
    /// From the start of the heading's line to the start of its body.
    pub range: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section<'a> {
    pub heading: SectionHeading,
    pub body: &'a str,
    pub body_range: Range<usize>,
}

/// Every heading in document order. Headings inside code blocks are not headings.
pub fn list_sections(markdown: &str) -> Vec<SectionHeading> {
    let mut headings = Vec::new();
    let mut open: Option<(u8, Range<usize>, String)> = None;

    for (event, range) in Parser::new(markdown).into_offset_iter() {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                open = Some((level as u8, range, String::new()));
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, _, buffer)) = open.as_mut() {
                    buffer.push_str(&text);
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if let Some((_, _, buffer)) = open.as_mut() {
                    buffer.push(' ');
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((level, range, text)) = open.take() {
                    headings.push(SectionHeading {
                        level,
                        text: text.trim().to_string(),
                        range: line_start(markdown, range.start)..after_line(markdown, range.end),
                    });
                }
            }
            _ => {}
        }
    }
    headings
}

/// The first section whose heading text matches `heading`.
///
/// Matching ignores case and surrounding whitespace. The query may carry
/// its ATX marker (`## Usage`); the heading text itself is taken literally.
pub fn extract_section<'a>(markdown: &'a str, heading: &str) -> Option<Section<'a>> {
    let wanted = normalize(strip_marker(heading));
    let headings = list_sections(markdown);
    let index = headings
        .iter()
        .position(|candidate| normalize(&candidate.text) == wanted)?;
    let target = headings[index].clone();

    let end = headings[index + 1..]
        .iter()
        .find(|next| next.level <= target.level)
        .map(|next| next.range.start)
        .unwrap_or(markdown.len());
    let start = target.range.end.min(end);

    Some(Section {
        heading: target,
        body: &markdown[start..end],
        body_range: start..end,
    })
}

/// Replace the body under `heading`, keeping the heading line and everything
/// outside the section. Returns `None` when no such heading exists.
pub fn replace_section(markdown: &str, heading: &str, new_body: &str) -> Option<String> {
    let section = extract_section(markdown, heading)?;
    let body = new_body.trim_matches(|c: char| c == '\n' || c == '\r');
    let rest = &markdown[section.body_range.end..];

    let mut output = String::with_capacity(markdown.len() + body.len());
    output.push_str(&markdown[..section.body_range.start]);
    if !output.ends_with('\n') {
        output.push('\n');
    }
    if !body.is_empty() {
        output.push('\n');
        output.push_str(body);
        output.push('\n');
    }
    if !rest.is_empty() {
        output.push('\n');
        output.push_str(rest);
    }
    Some(output)
}

fn strip_marker(query: &str) -> &str {
    let query = query.trim();
    let rest = query.trim_start_matches('#');
    if rest.len() < query.len() && (rest.is_empty() || rest.starts_with(char::is_whitespace)) {
        rest
    } else {
        query
    }
}

fn normalize(heading: &str) -> String {
    heading.trim().to_lowercase()
}

fn line_start(markdown: &str, offset: usize) -> usize {
    markdown[..offset].rfind('\n').map_or(0, |index| index + 1)
}

fn after_line(markdown: &str, offset: usize) -> usize {
    if offset > 0 && markdown.as_bytes()[offset - 1] == b'\n' {
        return offset;
    }
    markdown[offset..]
        .find('\n')
        .map_or(markdown.len(), |index| offset + index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUIDE: &str = "# Guide\n\nIntro text.\n\n## Setup\n\nInstall things.\n\n### Details\n\nFine print.\n\n## Usage\n\nRun it.\n";

    fn outline(markdown: &str) -> Vec<(u8, String)> {
        list_sections(markdown)
            .into_iter()
            .map(|heading| (heading.level, heading.text))
            .collect()
    }

    #[test]
    fn lists_headings_in_order() {
        assert_eq!(
            outline(GUIDE),
            vec![
                (1, "Guide".to_string()),
                (2, "Setup".to_string()),
                (3, "Details".to_string()),
                (2, "Usage".to_string()),
            ]
        );
    }

    #[test]
    fn section_includes_deeper_headings() {
        let section = extract_section(GUIDE, "setup").expect("section");
        assert_eq!(section.heading.level, 2);
        assert_eq!(section.body.trim(), "Install things.\n\n### Details\n\nFine print.");
        assert_eq!(&GUIDE[section.heading.range.clone()], "## Setup\n");
    }

    #[test]
    fn last_section_runs_to_end() {
        let section = extract_section(GUIDE, "## Usage").expect("section");
        assert_eq!(section.body.trim(), "Run it.");
        assert_eq!(section.body_range.end, GUIDE.len());
    }

    #[test]
    fn top_level_section_spans_document() {
        let section = extract_section(GUIDE, "Guide").expect("section");
        assert!(section.body.contains("## Usage"));
    }

    #[test]
    fn missing_heading() {
        assert!(extract_section(GUIDE, "Conclusion").is_none());
        assert!(replace_section(GUIDE, "Conclusion", "text").is_none());
    }

    #[test]
    fn fenced_code_is_not_a_heading() {
        let doc = "# A\n\n```\n# not a heading\n```\n\n# B\n\ntail\n";
        assert_eq!(outline(doc), vec![(1, "A".to_string()), (1, "B".to_string())]);
        let section = extract_section(doc, "A").expect("section");
        assert!(section.body.contains("# not a heading"));
    }

    #[test]
    fn inline_code_in_heading_text() {
        let doc = "## Using `cargo` well\n\nbody\n";
        assert_eq!(outline(doc), vec![(2, "Using cargo well".to_string())]);
    }

    #[test]
    fn replaces_middle_section() {
        let updated = replace_section(GUIDE, "Setup", "\nNew steps.\n\n").expect("replaced");
        assert_eq!(
            updated,
            "# Guide\n\nIntro text.\n\n## Setup\n\nNew steps.\n\n## Usage\n\nRun it.\n"
        );
    }

    #[test]
    fn replaces_last_section() {
        let updated = replace_section(GUIDE, "Usage", "Different.").expect("replaced");
        assert!(updated.ends_with("## Usage\n\nDifferent.\n"));
        assert!(updated.starts_with("# Guide\n\nIntro text.\n\n## Setup\n"));
    }

    #[test]
    fn replaces_body_of_trailing_heading() {
        assert_eq!(replace_section("# T", "T", "x").expect("replaced"), "# T\n\nx\n");
    }

    #[test]
    fn empty_body_removes_section_content() {
        let updated = replace_section(GUIDE, "Details", "").expect("replaced");
        assert!(updated.contains("### Details\n\n## Usage"));
        assert!(!updated.contains("Fine print."));
    }

    const SETEXT: &str = "Intro\n=====\n\nText.\n\nSetup\n-----\n\nSteps.\n\nUsage\n-----\n\nRun.\n";

    #[test]
    fn setext_headings_are_sections() {
        assert_eq!(
            outline(SETEXT),
            vec![
                (1, "Intro".to_string()),
                (2, "Setup".to_string()),
                (2, "Usage".to_string()),
            ]
        );

        let section = extract_section(SETEXT, "setup").expect("section");
        assert_eq!(&SETEXT[section.heading.range.clone()], "Setup\n-----\n");
        assert_eq!(section.body.trim(), "Steps.");
    }

    #[test]
    fn replaces_setext_section() {
        let updated = replace_section(SETEXT, "Setup", "New steps.").expect("replaced");
        assert_eq!(
            updated,
            "Intro\n=====\n\nText.\n\nSetup\n-----\n\nNew steps.\n\nUsage\n-----\n\nRun.\n"
        );
    }

    #[test]
    fn hash_in_heading_text_is_literal() {
        let doc = "## #1 Tip\n\nbody\n";
        assert!(extract_section(doc, "1 Tip").is_none());
        assert_eq!(extract_section(doc, "#1 tip").expect("section").body.trim(), "body");
        assert!(extract_section(doc, "## #1 Tip").is_some());
    }
}
