// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Markup to text — decoder HTML flattened with `html2text` into the
// markdown-flavoured lines the text layout understands.

/// Render `html` as wrapped text at `width` columns.
///
/// Headings come out as `# ` / `## ` lines (deeper levels fold into `## `),
/// list items as `* ` lines. Table rules are redrawn in ASCII, since the
/// built-in PDF fonts have no box-drawing glyphs. Runs of blank lines
/// collapse to one.
pub fn html_to_text(html: &str, width: usize) -> String {
    let rendered = html2text::from_read(html.as_bytes(), width.max(20));

    let mut out = String::with_capacity(rendered.len());
    let mut blank_run = 0;
    for line in rendered.lines() {
        let line = ascii_rules(line.trim_end());
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(&fold_heading(&line));
        out.push('\n');
    }
    out.trim().to_string()
}

fn ascii_rules(line: &str) -> String {
    line.chars()
        .map(|c| match c {
            '\u{2500}' | '\u{2501}' | '\u{2550}' => '-',
            '\u{2502}' | '\u{2503}' | '\u{2551}' => '|',
            '\u{2500}'..='\u{257F}' => '+',
            other => other,
        })
        .collect()
}

fn fold_heading(line: &str) -> String {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    if hashes > 2 && line[hashes..].starts_with(' ') {
        format!("##{}", &line[hashes..])
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paragraphs_survive_as_text() {
        let text = html_to_text("<html><body><p>Hello world</p><p>Second</p></body></html>", 80);
        assert!(text.contains("Hello world"));
        assert!(text.contains("Second"));
        assert!(!text.contains("<p>"));
    }

    #[test]
    fn deep_headings_fold_to_level_two() {
        assert_eq!(fold_heading("#### Deep"), "## Deep");
        assert_eq!(fold_heading("# Top"), "# Top");
        assert_eq!(fold_heading("#hashtag"), "#hashtag");
    }

    #[test]
    fn table_rules_become_ascii() {
        assert_eq!(ascii_rules("\u{2500}\u{253C}\u{2500}"), "-+-");
        assert_eq!(ascii_rules("a\u{2502}b"), "a|b");
    }

    #[test]
    fn blank_runs_collapse() {
        let text = html_to_text("<p>a</p><br><br><br><p>b</p>", 80);
        assert!(!text.contains("\n\n\n"));
    }
}
