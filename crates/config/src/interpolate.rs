/// Replace `{{ VAR }}` placeholders with values from the process environment.
///
/// Unresolvable variables are left as-is.
pub fn interpolate_env(input: &str) -> String {
    interpolate_with(input, |name| std::env::var(name).ok())
}

/// Replace `{{ VAR }}` placeholders using a custom lookup function.
///
/// Whitespace inside the braces is ignored and any `{` or `$` in the name is
/// dropped, so `{{VAR}}`, `{{ VAR }}`, `{{ $VAR }}` and `{{{ VAR }}` are
/// equivalent. Substituted values are emitted verbatim and never re-scanned.
pub fn interpolate_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("{{") {
        result.push_str(&rest[..start]);
        let inner_start = start + 2;
        let after_open = &rest[inner_start..];
        let inner_len = after_open.find('}').unwrap_or(after_open.len());

        if inner_len == 0 || !after_open[inner_len..].starts_with("}}") {
            // Not a placeholder — emit the braces literally and keep scanning.
            result.push_str("{{");
            rest = after_open;
            continue;
        }

        let token_end = inner_start + inner_len + 2;
        let token = &rest[start..token_end];
        match variable_name(&after_open[..inner_len]).and_then(|name| lookup(&name)) {
            Some(value) => result.push_str(&value),
            None => result.push_str(token),
        }
        rest = &rest[token_end..];
    }

    result.push_str(rest);
    result
}

fn variable_name(inner: &str) -> Option<String> {
    let name = inner.replace(['{', '$'], "");
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}
