//! Formatting helpers shared by the node compilers and the assembler.

/// Format a float literal independent of locale, always keeping a fractional digit.
pub fn fmt_f32(v: f32) -> String {
    if !v.is_finite() {
        return "0.0".to_string();
    }
    let s = format!("{v}");
    if s.contains('.') { s } else { format!("{s}.0") }
}

/// Sanitize a string to be a valid identifier.
pub fn sanitize_ident(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() {
        out.push('_');
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Base name for a local variable derived from a node's display name:
/// lower-cased, spaces removed, then sanitized. Empty names fall back to `fallback`.
pub fn variable_base(name: &str, fallback: &str) -> String {
    let squashed: String = name
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    if squashed.is_empty() {
        return sanitize_ident(fallback);
    }
    sanitize_ident(&squashed)
}

/// True when `expr` is a single identifier, literal or member access and can be
/// substituted without parentheses.
pub fn is_simple_expr(expr: &str) -> bool {
    !expr.is_empty()
        && expr
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// Whether the `(` at byte `open` is closed by the last character of `expr`.
fn closes_at_end(expr: &str, open: usize) -> bool {
    let mut depth = 0usize;
    for (i, c) in expr[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return open + i + 1 == expr.len();
                }
            }
            _ => {}
        }
    }
    false
}

/// True when `expr` binds as one operand: a simple operand, a fully parenthesized
/// expression or a single call such as `float2(1.0, 0.0)`.
pub fn is_atomic_expr(expr: &str) -> bool {
    if is_simple_expr(expr) {
        return true;
    }
    let Some(open) = expr.find('(') else {
        return false;
    };
    let callee = &expr[..open];
    (callee.is_empty() || is_simple_expr(callee)) && closes_at_end(expr, open)
}

/// Wrap `expr` in parentheses unless it already binds as one operand.
pub fn parenthesize(expr: &str) -> String {
    if is_atomic_expr(expr) {
        expr.to_string()
    } else {
        format!("({expr})")
    }
}
