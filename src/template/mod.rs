//! URI templates: expansion and reverse matching.
//!
//! Operations declare their endpoints as URI templates such as
//! `https://um.example.com/v20140601/organizations/{organization_ids}` or
//! `/v2021/bicycles/{bicycle_ids}/activities{?page,per}`. Two directions are
//! supported:
//!
//! - [`UriTemplate::expand`] fills the template from parameter values.
//! - [`UriTemplate::match_uri`] recovers variable values from a concrete URI,
//!   the operation the resolver relies on to turn stored references back into
//!   bulk request parameters.
//!
//! The supported expression operators are simple (`{var}`), reserved
//! (`{+var}`), path segment (`{/var}`), label (`{.var}`), form query (`{?a,b}`)
//! and query continuation (`{&a}`). Multiple values are joined with commas on
//! expansion and split on commas when matching.
//!
//! # Examples
//!
//! ```rust,no_run
//! use linkgraph::template::UriTemplate;
//!
//! let template = UriTemplate::parse("https://api.example.com/organizations/{organization_ids}").unwrap();
//! let values = template.match_uri("https://api.example.com/organizations/104,105").unwrap();
//! assert_eq!(values["organization_ids"], vec!["104", "105"]);
//! ```

use crate::core::{ResolveError, Result};
use regex::Regex;
use std::collections::BTreeMap;

/// Values recovered for template variables.
pub type TemplateValues = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Simple,
    Reserved,
    Path,
    Label,
    Query,
    QueryContinuation,
}

impl Operator {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Self::Reserved),
            '/' => Some(Self::Path),
            '.' => Some(Self::Label),
            '?' => Some(Self::Query),
            '&' => Some(Self::QueryContinuation),
            _ => None,
        }
    }

    const fn is_query(self) -> bool {
        matches!(self, Self::Query | Self::QueryContinuation)
    }
}

#[derive(Debug, Clone)]
enum Part {
    Literal(String),
    Expression {
        operator: Operator,
        variables: Vec<String>,
    },
}

/// A parsed URI template.
#[derive(Debug, Clone)]
pub struct UriTemplate {
    source: String,
    parts: Vec<Part>,
    matcher: Regex,
}

impl UriTemplate {
    /// Parse a template string.
    pub fn parse(template: &str) -> Result<Self> {
        let invalid = |reason: &str| ResolveError::InvalidTemplate {
            template: template.to_string(),
            reason: reason.to_string(),
        };

        let mut parts = Vec::new();
        let mut rest = template;
        while let Some(start) = rest.find('{') {
            if rest[..start].contains('}') {
                return Err(invalid("unmatched '}'"));
            }
            if start > 0 {
                parts.push(Part::Literal(rest[..start].to_string()));
            }
            let end = rest[start..].find('}').ok_or_else(|| invalid("unclosed '{'"))? + start;
            let body = &rest[start + 1..end];

            let mut chars = body.chars();
            let (operator, names) = match chars.next().and_then(Operator::from_char) {
                Some(operator) => (operator, chars.as_str()),
                None => (Operator::Simple, body),
            };
            let variables: Vec<String> = names
                .split(',')
                .map(|name| name.trim().trim_end_matches('*').to_string())
                .filter(|name| !name.is_empty())
                .collect();
            if variables.is_empty() {
                return Err(invalid("empty expression"));
            }
            if variables.iter().any(|name| !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')) {
                return Err(invalid("invalid variable name"));
            }

            parts.push(Part::Expression {
                operator,
                variables,
            });
            rest = &rest[end + 1..];
        }
        if rest.contains('}') {
            return Err(invalid("unmatched '}'"));
        }
        if !rest.is_empty() {
            parts.push(Part::Literal(rest.to_string()));
        }

        let matcher = Regex::new(&build_pattern(&parts)).map_err(|e| invalid(&e.to_string()))?;

        Ok(Self {
            source: template.to_string(),
            parts,
            matcher,
        })
    }

    /// The original template string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the template is relative (does not start with a scheme).
    #[must_use]
    pub fn is_relative(&self) -> bool {
        !self.source.starts_with("http://") && !self.source.starts_with("https://")
    }

    /// Variables of simple `{var}` expressions, the ones a request cannot omit.
    #[must_use]
    pub fn required_variables(&self) -> Vec<&str> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::Expression {
                    operator: Operator::Simple,
                    variables,
                } => Some(variables.iter().map(String::as_str)),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Every variable name in the template.
    #[must_use]
    pub fn variables(&self) -> Vec<&str> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::Expression { variables, .. } => Some(variables.iter().map(String::as_str)),
                Part::Literal(_) => None,
            })
            .flatten()
            .collect()
    }

    /// Expand the template. Undefined or empty variables are omitted.
    #[must_use]
    pub fn expand(&self, params: &TemplateValues) -> String {
        let mut uri = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(literal) => uri.push_str(literal),
                Part::Expression {
                    operator,
                    variables,
                } => expand_expression(&mut uri, *operator, variables, params),
            }
        }
        uri
    }

    /// Recover variable values from `uri`, or `None` if it does not fit.
    ///
    /// A relative template is matched against the path of an absolute URI.
    #[must_use]
    pub fn match_uri(&self, uri: &str) -> Option<TemplateValues> {
        let candidate = if self.is_relative() { strip_origin(uri) } else { uri };
        let has_query_expression = self.parts.iter().any(|part| {
            matches!(part, Part::Expression { operator, .. } if operator.is_query())
        });
        // Query strings the template does not describe are ignored.
        let path = if has_query_expression {
            candidate
        } else {
            candidate.split_once('?').map_or(candidate, |(path, _)| path)
        };

        let captures = self.matcher.captures(path)?;
        let mut values = TemplateValues::new();

        let mut group = 1;
        for part in &self.parts {
            let Part::Expression {
                operator,
                variables,
            } = part
            else {
                continue;
            };

            let Some(raw) = captures.get(group).map(|m| m.as_str()) else {
                group += 1;
                continue;
            };
            group += 1;

            if operator.is_query() {
                collect_query(raw, variables, &mut values);
            } else {
                let separator = match operator {
                    Operator::Path => '/',
                    Operator::Label => '.',
                    _ => ',',
                };
                let raw = raw.trim_start_matches(['/', '.']);
                if variables.len() == 1 {
                    insert_values(&mut values, &variables[0], raw, ',');
                } else {
                    for (name, chunk) in variables.iter().zip(raw.split(separator)) {
                        insert_values(&mut values, name, chunk, ',');
                    }
                }
            }
        }

        Some(values)
    }
}

fn build_pattern(parts: &[Part]) -> String {
    let mut pattern = String::from("^");
    for part in parts {
        match part {
            Part::Literal(literal) => pattern.push_str(&regex::escape(literal)),
            Part::Expression { operator, .. } => pattern.push_str(match operator {
                Operator::Simple => "([^/?#&]*)",
                Operator::Reserved => "([^?#]*)",
                Operator::Path => "((?:/[^/?#]*)*)",
                Operator::Label => "((?:\\.[^/?#.]*)*)",
                Operator::Query => "(\\?[^#]*)?",
                Operator::QueryContinuation => "(&[^#]*)?",
            }),
        }
    }
    pattern.push('$');
    pattern
}

fn insert_values(values: &mut TemplateValues, name: &str, raw: &str, separator: char) {
    let decoded: Vec<String> = raw
        .split(separator)
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| urlencoding::decode(chunk).map_or_else(|_| chunk.to_string(), |d| d.into_owned()))
        .collect();
    if !decoded.is_empty() {
        values.entry(name.to_string()).or_default().extend(decoded);
    }
}

fn collect_query(raw: &str, variables: &[String], values: &mut TemplateValues) {
    for pair in raw.trim_start_matches(['?', '&']).split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        if variables.iter().any(|name| name == key) {
            insert_values(values, key, value, ',');
        }
    }
}

fn strip_origin(uri: &str) -> &str {
    let Some(scheme_end) = uri.find("://") else {
        return uri;
    };
    let after_scheme = &uri[scheme_end + 3..];
    after_scheme.find('/').map_or("", |slash| &after_scheme[slash..])
}

fn encode(value: &str, reserved: bool) -> String {
    if reserved {
        // Reserved expansion keeps URI delimiters intact.
        value
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/")
    } else {
        urlencoding::encode(value).into_owned()
    }
}

fn expand_expression(uri: &mut String, operator: Operator, variables: &[String], params: &TemplateValues) {
    let defined: Vec<(&String, &Vec<String>)> = variables
        .iter()
        .filter_map(|name| params.get(name).filter(|values| !values.is_empty()).map(|values| (name, values)))
        .collect();
    if defined.is_empty() {
        return;
    }

    let joined = |values: &Vec<String>| {
        values
            .iter()
            .map(|value| encode(value, operator == Operator::Reserved))
            .collect::<Vec<_>>()
            .join(",")
    };

    match operator {
        Operator::Simple | Operator::Reserved => {
            let rendered: Vec<String> = defined.iter().map(|(_, values)| joined(values)).collect();
            uri.push_str(&rendered.join(","));
        }
        Operator::Path | Operator::Label => {
            let prefix = if operator == Operator::Path { '/' } else { '.' };
            for (_, values) in defined {
                uri.push(prefix);
                uri.push_str(&joined(values));
            }
        }
        Operator::Query | Operator::QueryContinuation => {
            let mut first = operator == Operator::Query;
            for (name, values) in defined {
                uri.push(if first { '?' } else { '&' });
                first = false;
                uri.push_str(name);
                uri.push('=');
                uri.push_str(&joined(values));
            }
        }
    }
}
