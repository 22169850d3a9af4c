//! XML result document output.

use std::io::{self, Write};

use move_quality::UciGame;

use crate::analyser::AnalysedMove;

/// Search settings recorded on the `<analysis>` element.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSettings<'a> {
    pub engine: &'a str,
    pub search_depth: u32,
    pub book_depth: u32,
    pub variations: u32,
}

/// Write the result document for one game.
pub fn write_document<W: Write>(
    out: &mut W,
    game: &UciGame,
    settings: &AnalysisSettings<'_>,
    analysed: &[AnalysedMove],
) -> io::Result<()> {
    writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(out, "<gamelist>")?;
    writeln!(out, "  <game>")?;

    writeln!(out, "    <tags>")?;
    for (name, value) in &game.headers {
        writeln!(
            out,
            r#"      <tag name="{}" value="{}"/>"#,
            escape(name),
            escape(value)
        )?;
    }
    writeln!(out, "    </tags>")?;
    writeln!(out, "    <moves>{}</moves>", escape(&game.moves.join(" ")))?;

    writeln!(
        out,
        r#"    <analysis engine="{}" searchdepth="{}" bookdepth="{}" variations="{}">"#,
        escape(settings.engine),
        settings.search_depth,
        settings.book_depth,
        settings.variations
    )?;
    for mv in analysed {
        writeln!(out, r#"      <move ply="{}">"#, mv.ply)?;
        writeln!(out, "        <played>{}</played>", escape(&mv.played))?;
        for candidate in &mv.evaluations {
            writeln!(
                out,
                r#"        <evaluation move="{}" value="{}"/>"#,
                escape(&candidate.move_id),
                candidate.score
            )?;
        }
        writeln!(out, "      </move>")?;
    }
    writeln!(out, "    </analysis>")?;

    writeln!(out, "  </game>")?;
    writeln!(out, "</gamelist>")?;
    Ok(())
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
