//! `{name}` placeholder interpolation for schema URL templates.
//!
//! `{{` and `}}` produce literal braces. Any other brace that does not form a
//! `{name}` placeholder is an error, as is a placeholder with no value.

use crate::error::TemplateError;

/// Render `template`, looking placeholder names up with `lookup`.
pub fn render<'a, F>(template: &str, lookup: F) -> Result<String, TemplateError>
where
    F: Fn(&str) -> Option<&'a str>,
{
    let unbalanced = || TemplateError::UnbalancedBrace {
        template: template.to_string(),
    };

    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if let Some(after) = tail.strip_prefix("{{") {
            out.push('{');
            rest = after;
        } else if let Some(after) = tail.strip_prefix("}}") {
            out.push('}');
            rest = after;
        } else if let Some(after) = tail.strip_prefix('{') {
            let end = after.find('}').ok_or_else(unbalanced)?;
            let name = &after[..end];
            if name.contains('{') {
                return Err(unbalanced());
            }
            let value = lookup(name).ok_or_else(|| TemplateError::UnknownPlaceholder {
                name: name.to_string(),
                template: template.to_string(),
            })?;
            out.push_str(value);
            rest = &after[end + 1..];
        } else {
            return Err(unbalanced());
        }
    }

    out.push_str(rest);
    Ok(out)
}
