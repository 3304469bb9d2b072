/// Turn free text into an FTS5 MATCH expression: every alphanumeric token is
/// quoted and the tokens are OR-ed, so punctuation and FTS5 operators in user
/// input are never interpreted. `None` when nothing searchable remains.
pub fn fts_match_expression(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{t}\""))
        .collect();
    (!terms.is_empty()).then(|| terms.join(" OR "))
}
