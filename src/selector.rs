use crate::dom::{Dom, NodeId};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AttrCondition {
    Exists { key: String },
    Eq { key: String, value: String },
    Contains { key: String, value: String },
    StartsWith { key: String, value: String },
    EndsWith { key: String, value: String },
    Includes { key: String, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SelectorStep {
    pub(crate) tag: Option<String>,
    pub(crate) id: Option<String>,
    pub(crate) classes: Vec<String>,
    pub(crate) attrs: Vec<AttrCondition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SelectorPart {
    pub(crate) step: SelectorStep,
    // Relation to the previous (left) part.
    pub(crate) combinator: Option<Combinator>,
}

/// A comma-separated selector list, compiled once and matched many times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Selector {
    groups: Vec<Vec<SelectorPart>>,
}

impl Selector {
    pub(crate) fn parse(selector: &str) -> Result<Self> {
        let mut groups = Vec::new();
        for group in selector.split(',') {
            let group = group.trim();
            if group.is_empty() {
                return Err(Error::UnsupportedSelector(selector.into()));
            }
            groups.push(parse_chain(group)?);
        }
        if groups.is_empty() {
            return Err(Error::UnsupportedSelector(selector.into()));
        }
        Ok(Self { groups })
    }

    pub(crate) fn matches(&self, dom: &Dom, node: NodeId) -> bool {
        self.groups
            .iter()
            .any(|parts| matches_chain(dom, node, parts))
    }

    /// First attached match in document order, or `None`.
    pub(crate) fn query(&self, dom: &Dom) -> Option<NodeId> {
        dom.all_element_nodes()
            .into_iter()
            .find(|node| self.matches(dom, *node))
    }

    pub(crate) fn query_all(&self, dom: &Dom) -> Vec<NodeId> {
        dom.all_element_nodes()
            .into_iter()
            .filter(|node| self.matches(dom, *node))
            .collect()
    }

    /// First match among the descendants of `scope`, in document order.
    pub(crate) fn query_within(&self, dom: &Dom, scope: NodeId) -> Option<NodeId> {
        dom.element_nodes_within(scope)
            .into_iter()
            .find(|node| self.matches(dom, *node))
    }
}

fn parse_chain(group: &str) -> Result<Vec<SelectorPart>> {
    let tokens = tokenize(group)?;
    let mut parts = Vec::new();
    let mut pending: Option<Combinator> = None;

    for token in tokens {
        if token == ">" {
            if pending.is_some() || parts.is_empty() {
                return Err(Error::UnsupportedSelector(group.into()));
            }
            pending = Some(Combinator::Child);
            continue;
        }
        let step = parse_step(&token, group)?;
        let combinator = if parts.is_empty() {
            None
        } else {
            Some(pending.take().unwrap_or(Combinator::Descendant))
        };
        parts.push(SelectorPart { step, combinator });
    }

    if parts.is_empty() || pending.is_some() {
        return Err(Error::UnsupportedSelector(group.into()));
    }
    Ok(parts)
}

fn tokenize(group: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_brackets = false;

    for ch in group.chars() {
        match ch {
            '[' if in_brackets => return Err(Error::UnsupportedSelector(group.into())),
            '[' => {
                in_brackets = true;
                current.push(ch);
            }
            ']' if !in_brackets => return Err(Error::UnsupportedSelector(group.into())),
            ']' => {
                in_brackets = false;
                current.push(ch);
            }
            '>' if !in_brackets => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                tokens.push(">".into());
            }
            ch if ch.is_whitespace() && !in_brackets => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            ch => current.push(ch),
        }
    }
    if in_brackets {
        return Err(Error::UnsupportedSelector(group.into()));
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

fn parse_step(token: &str, group: &str) -> Result<SelectorStep> {
    let mut step = SelectorStep::default();
    let chars = token.chars().collect::<Vec<_>>();
    let mut i = 0usize;

    let read_name = |chars: &[char], mut i: usize| {
        let mut name = String::new();
        while i < chars.len() && !matches!(chars[i], '#' | '.' | '[' | ':') {
            name.push(chars[i]);
            i += 1;
        }
        (name, i)
    };

    if i < chars.len() && !matches!(chars[i], '#' | '.' | '[' | ':') {
        let (name, next) = read_name(&chars, i);
        if name == "*" {
            // Universal: match any tag.
        } else {
            step.tag = Some(name.to_ascii_lowercase());
        }
        i = next;
    }

    while i < chars.len() {
        match chars[i] {
            '#' => {
                let (name, next) = read_name(&chars, i + 1);
                if name.is_empty() {
                    return Err(Error::UnsupportedSelector(group.into()));
                }
                step.id = Some(name);
                i = next;
            }
            '.' => {
                let (name, next) = read_name(&chars, i + 1);
                if name.is_empty() {
                    return Err(Error::UnsupportedSelector(group.into()));
                }
                step.classes.push(name);
                i = next;
            }
            '[' => {
                let close = chars[i..]
                    .iter()
                    .position(|ch| *ch == ']')
                    .ok_or_else(|| Error::UnsupportedSelector(group.into()))?;
                let body = chars[i + 1..i + close].iter().collect::<String>();
                step.attrs.push(parse_attr_condition(&body, group)?);
                i += close + 1;
            }
            _ => return Err(Error::UnsupportedSelector(group.into())),
        }
    }

    Ok(step)
}

fn parse_attr_condition(body: &str, group: &str) -> Result<AttrCondition> {
    let body = body.trim();
    if let Some((at, op, op_len)) = find_attr_operator(body) {
        // Reject `[*=v]`: the key position must not be empty.
        if at == 0 {
            return Err(Error::UnsupportedSelector(group.into()));
        }
        let key = body[..at].trim().to_ascii_lowercase();
        let raw = body[at + op_len..].trim();
        let value = raw
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
            .or_else(|| raw.strip_prefix('\'').and_then(|rest| rest.strip_suffix('\'')))
            .unwrap_or(raw)
            .to_string();
        return Ok(match op {
            "*=" => AttrCondition::Contains { key, value },
            "^=" => AttrCondition::StartsWith { key, value },
            "$=" => AttrCondition::EndsWith { key, value },
            "~=" => AttrCondition::Includes { key, value },
            _ => AttrCondition::Eq { key, value },
        });
    }
    if body.is_empty() {
        return Err(Error::UnsupportedSelector(group.into()));
    }
    Ok(AttrCondition::Exists {
        key: body.to_ascii_lowercase(),
    })
}

/// First comparison operator outside any quoted section, so operator
/// characters inside a quoted value stay literal.
fn find_attr_operator(body: &str) -> Option<(usize, &'static str, usize)> {
    let mut quote: Option<char> = None;
    for (at, ch) in body.char_indices() {
        match quote {
            Some(open) => {
                if ch == open {
                    quote = None;
                }
            }
            None => match ch {
                '"' | '\'' => quote = Some(ch),
                '=' => return Some((at, "=", 1)),
                '*' | '^' | '$' | '~' => {
                    if body[at + ch.len_utf8()..].starts_with('=') {
                        let op = match ch {
                            '*' => "*=",
                            '^' => "^=",
                            '$' => "$=",
                            _ => "~=",
                        };
                        return Some((at, op, 2));
                    }
                }
                _ => {}
            },
        }
    }
    None
}

fn matches_chain(dom: &Dom, node: NodeId, parts: &[SelectorPart]) -> bool {
    let Some((last, rest)) = parts.split_last() else {
        return false;
    };
    if !matches_step(dom, node, &last.step) {
        return false;
    }
    match last.combinator {
        None => true,
        Some(Combinator::Child) => dom
            .parent(node)
            .map(|parent| matches_chain(dom, parent, rest))
            .unwrap_or(false),
        Some(Combinator::Descendant) => {
            let mut cursor = dom.parent(node);
            while let Some(ancestor) = cursor {
                if matches_chain(dom, ancestor, rest) {
                    return true;
                }
                cursor = dom.parent(ancestor);
            }
            false
        }
    }
}

fn matches_step(dom: &Dom, node: NodeId, step: &SelectorStep) -> bool {
    let Some(element) = dom.element(node) else {
        return false;
    };
    if let Some(tag) = &step.tag {
        if !element.tag_name.eq_ignore_ascii_case(tag) {
            return false;
        }
    }
    if let Some(id) = &step.id {
        if element.attrs.get("id") != Some(id) {
            return false;
        }
    }
    for class in &step.classes {
        if !dom.has_class(node, class) {
            return false;
        }
    }
    for condition in &step.attrs {
        if !matches_attr(element_attr(dom, node, condition), condition) {
            return false;
        }
    }
    true
}

fn element_attr(dom: &Dom, node: NodeId, condition: &AttrCondition) -> Option<String> {
    let key = match condition {
        AttrCondition::Exists { key }
        | AttrCondition::Eq { key, .. }
        | AttrCondition::Contains { key, .. }
        | AttrCondition::StartsWith { key, .. }
        | AttrCondition::EndsWith { key, .. }
        | AttrCondition::Includes { key, .. } => key,
    };
    dom.attr(node, key)
}

fn matches_attr(actual: Option<String>, condition: &AttrCondition) -> bool {
    let Some(actual) = actual else {
        return false;
    };
    match condition {
        AttrCondition::Exists { .. } => true,
        AttrCondition::Eq { value, .. } => actual == *value,
        AttrCondition::Contains { value, .. } => !value.is_empty() && actual.contains(value),
        AttrCondition::StartsWith { value, .. } => {
            !value.is_empty() && actual.starts_with(value)
        }
        AttrCondition::EndsWith { value, .. } => !value.is_empty() && actual.ends_with(value),
        AttrCondition::Includes { value, .. } => {
            actual.split_ascii_whitespace().any(|word| word == value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::parse_html;

    fn page() -> Dom {
        parse_html(
            r#"
            <div class="alert alert-success alert-dismissible">
              saved
              <button type="button" class="btn-close"></button>
            </div>
            <form action="/parking/5/checkin" method="post">
              <input type="text" name="licensePlate" id="plate">
              <button type="submit">Check in</button>
            </form>
            <a href="/vehicles/9/delete" data-confirm="Delete this vehicle?">remove</a>
            "#,
        )
        .expect("fixture parses")
    }

    fn query(dom: &Dom, selector: &str) -> Option<NodeId> {
        Selector::parse(selector).expect("selector parses").query(dom)
    }

    #[test]
    fn substring_attribute_match_finds_the_checkin_form() {
        let dom = page();
        let form = query(&dom, r#"form[action*="/checkin"]"#).expect("form matches");
        assert_eq!(dom.tag_name(form), Some("form"));
        assert!(query(&dom, r#"form[action*="/reserve"]"#).is_none());
    }

    #[test]
    fn grouped_selector_matches_either_branch() {
        let dom = page();
        let selector = Selector::parse("button[data-confirm], a[data-confirm]")
            .expect("selector parses");
        let matches = selector.query_all(&dom);
        assert_eq!(matches.len(), 1);
        assert_eq!(dom.tag_name(matches[0]), Some("a"));
    }

    #[test]
    fn scoped_query_stays_inside_the_subtree() {
        let dom = page();
        let alert = query(&dom, ".alert-dismissible").expect("alert matches");
        let selector = Selector::parse(".btn-close").expect("selector parses");
        assert!(selector.query_within(&dom, alert).is_some());

        let form = query(&dom, "form").expect("form matches");
        assert!(selector.query_within(&dom, form).is_none());
    }

    #[test]
    fn attribute_equality_honors_quoting() {
        let dom = page();
        assert!(query(&dom, r#"input[name="licensePlate"]"#).is_some());
        assert!(query(&dom, "input[name='licensePlate']").is_some());
        assert!(query(&dom, "input[name=licensePlate]").is_some());
        assert!(query(&dom, "input[name=plate]").is_none());
    }

    #[test]
    fn operator_characters_inside_quoted_values_stay_literal() {
        let dom = parse_html(r#"<div id="d" title="a*=b"></div>"#).expect("fixture parses");
        assert_eq!(
            Selector::parse(r#"[title="a*=b"]"#)
                .expect("selector parses")
                .query(&dom),
            dom.get_element_by_id("d")
        );
        assert!(query(&dom, r#"[title*="*="]"#).is_some());
        assert!(query(&dom, r#"[title^="a*"]"#).is_some());
        assert!(query(&dom, r#"[title="a"]"#).is_none());
    }

    #[test]
    fn child_combinator_requires_direct_parentage() {
        let dom = page();
        assert!(query(&dom, "form > input").is_some());
        assert!(query(&dom, "div > form").is_none());
    }

    #[test]
    fn unsupported_syntax_is_rejected() {
        assert!(matches!(
            Selector::parse("div:nth-child(2)"),
            Err(Error::UnsupportedSelector(_))
        ));
        assert!(matches!(
            Selector::parse("[unclosed"),
            Err(Error::UnsupportedSelector(_))
        ));
        assert!(matches!(
            Selector::parse(""),
            Err(Error::UnsupportedSelector(_))
        ));
    }
}
