//! Hint presentation. Rendering hints next to the editor is up to the front end;
//! the core only hands over the list and offers a plain-text layout for terminals.

/// Receives the hint list of a pass that follows a script change.
pub trait HintSink {
    fn show(&mut self, hints: &[String]);
}

impl<F> HintSink for F
where
    F: FnMut(&[String]),
{
    fn show(&mut self, hints: &[String]) {
        self(hints);
    }
}

/// Interleave source lines with their hints. Each non-empty hint goes on its own
/// line below the source line it belongs to, the way the editor overlay places it.
pub fn annotate(source: &str, hints: &[String]) -> String {
    let mut out = String::new();
    for (index, line) in source.split('\n').enumerate() {
        out.push_str(line.trim_end());
        out.push('\n');
        if let Some(hint) = hints.get(index).filter(|h| !h.is_empty()) {
            out.push_str("    ");
            out.push_str(hint);
            out.push('\n');
        }
    }
    out
}
