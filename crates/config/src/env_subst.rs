/// Replace `${ENV_VAR}` placeholders in config string values.
///
/// Unresolvable variables are left as-is so the parse error (if any)
/// points at the original placeholder.
pub fn substitute_env(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) if end > 0 => {
                let name = &after[..end];
                match std::env::var(name) {
                    Ok(value) => out.push_str(&value),
                    Err(_) => {
                        // Leave unresolved placeholder as-is.
                        out.push_str("${");
                        out.push_str(name);
                        out.push('}');
                    },
                }
                rest = &after[end + 1..];
            },
            _ => {
                // Malformed — emit literal and continue past the opener.
                out.push_str("${");
                rest = after;
            },
        }
    }

    out.push_str(rest);
    out
}
