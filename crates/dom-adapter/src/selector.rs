//! Minimal CSS selector support for the fake page.
//!
//! Covers the grammar the selector catalogue actually uses: an optional tag,
//! `.class` / `#id` steps, and attribute tests `[name]`, `[name="v"]`,
//! `[name*="v"]` with the optional `i` case flag. Combinators and
//! pseudo-classes are rejected; the catalogue expresses containment checks
//! as marker-selector scans instead.

#[derive(Debug, Default, Clone)]
pub(crate) struct SimpleSelector {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<AttrTest>,
}

#[derive(Debug, Clone)]
pub(crate) struct AttrTest {
    pub name: String,
    pub op: AttrOp,
    pub value: String,
    pub case_insensitive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AttrOp {
    Exists,
    Equals,
    Contains,
}

pub(crate) fn parse(selector: &str) -> Result<SimpleSelector, String> {
    let mut out = SimpleSelector::default();
    let mut chars = selector.trim().chars().peekable();

    let mut tag = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_alphanumeric() || c == '-' {
            tag.push(c);
            chars.next();
        } else {
            break;
        }
    }
    if !tag.is_empty() {
        out.tag = Some(tag.to_ascii_lowercase());
    }

    while let Some(c) = chars.next() {
        match c {
            '.' | '#' => {
                let mut name = String::new();
                while let Some(&n) = chars.peek() {
                    if n.is_ascii_alphanumeric() || n == '-' || n == '_' {
                        name.push(n);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if name.is_empty() {
                    return Err(format!("empty step in selector: {selector}"));
                }
                if c == '.' {
                    out.classes.push(name);
                } else {
                    out.id = Some(name);
                }
            }
            '[' => {
                let mut name = String::new();
                let mut op = AttrOp::Exists;
                while let Some(&n) = chars.peek() {
                    match n {
                        '*' => {
                            chars.next();
                            if chars.next() != Some('=') {
                                return Err(format!("bad attribute op in: {selector}"));
                            }
                            op = AttrOp::Contains;
                            break;
                        }
                        '=' => {
                            chars.next();
                            op = AttrOp::Equals;
                            break;
                        }
                        ']' => break,
                        _ => {
                            name.push(n);
                            chars.next();
                        }
                    }
                }
                let mut value = String::new();
                let mut case_insensitive = false;
                if op != AttrOp::Exists {
                    let quote = chars.next();
                    if quote != Some('"') && quote != Some('\'') {
                        return Err(format!("unquoted attribute value in: {selector}"));
                    }
                    let quote = quote.unwrap_or('"');
                    for n in chars.by_ref() {
                        if n == quote {
                            break;
                        }
                        value.push(n);
                    }
                }
                // trailing " i" flag and closing bracket
                loop {
                    match chars.next() {
                        Some(']') => break,
                        Some('i') | Some('I') => case_insensitive = true,
                        Some(n) if n.is_whitespace() => {}
                        Some(n) => return Err(format!("unexpected '{n}' in: {selector}")),
                        None => return Err(format!("unterminated attribute in: {selector}")),
                    }
                }
                if name.trim().is_empty() {
                    return Err(format!("empty attribute name in: {selector}"));
                }
                out.attrs.push(AttrTest {
                    name: name.trim().to_string(),
                    op,
                    value,
                    case_insensitive,
                });
            }
            ':' | ' ' | '>' | ',' => {
                return Err(format!("unsupported selector syntax: {selector}"));
            }
            other => return Err(format!("unexpected '{other}' in selector: {selector}")),
        }
    }

    Ok(out)
}

pub(crate) fn matches<F>(sel: &SimpleSelector, tag: &str, attr: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(want) = &sel.tag {
        if !tag.eq_ignore_ascii_case(want) {
            return false;
        }
    }
    if let Some(id) = &sel.id {
        if attr("id").as_deref() != Some(id.as_str()) {
            return false;
        }
    }
    if !sel.classes.is_empty() {
        let class_attr = attr("class").unwrap_or_default();
        let classes: Vec<&str> = class_attr.split_whitespace().collect();
        if !sel.classes.iter().all(|c| classes.contains(&c.as_str())) {
            return false;
        }
    }
    for test in &sel.attrs {
        let actual = attr(&test.name);
        let ok = match (&test.op, actual) {
            (AttrOp::Exists, actual) => actual.is_some(),
            (_, None) => false,
            (AttrOp::Equals, Some(actual)) => {
                if test.case_insensitive {
                    actual.eq_ignore_ascii_case(&test.value)
                } else {
                    actual == test.value
                }
            }
            (AttrOp::Contains, Some(actual)) => {
                if test.case_insensitive {
                    actual.to_lowercase().contains(&test.value.to_lowercase())
                } else {
                    actual.contains(&test.value)
                }
            }
        };
        if !ok {
            return false;
        }
    }
    true
}
