//! `recipe-name` templates: `{project}`, `{branch}` and `{track}` placeholders.

const PLACEHOLDERS: [&str; 3] = ["project", "branch", "track"];

/// Substitute the three placeholders of a recipe-name template.
///
/// Substitution is a single left-to-right pass, so braces inside a
/// substituted value are copied as-is. Unknown or unterminated `{...}`
/// sequences are kept literally; [`validate_template`] rejects them earlier.
pub fn format_recipe_name(template: &str, project: &str, branch: &str, track: &str) -> String {
    let mut out = String::with_capacity(template.len() + project.len() + branch.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let value = match &after[..close] {
                "project" => project,
                "branch" => branch,
                "track" => track,
                _ => return None,
            };
            Some((value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Check that every `{...}` in `template` is a known placeholder.
///
/// Returns a human-readable reason on failure.
pub fn validate_template(template: &str) -> Result<(), String> {
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            return Err("unterminated '{'".to_owned());
        };
        let key = &after[..close];
        if !PLACEHOLDERS.contains(&key) {
            return Err(format!(
                "unknown placeholder '{{{key}}}'; expected one of {{project}}, {{branch}}, {{track}}"
            ));
        }
        rest = &after[close + 1..];
    }
    if rest.contains('}') {
        return Err("unmatched '}'".to_owned());
    }
    Ok(())
}
