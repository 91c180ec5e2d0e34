//! Text replacement for the widget document.
//!
//! Rules come from repeatable `rep` query parameters of the form
//! `LEFT=>RIGHT`. A `LEFT` starting with `re:` is a regular expression and
//! `RIGHT` may then use `$1`/`${name}` expansion; otherwise `LEFT` is an exact
//! substring and `RIGHT` is inserted verbatim. Rules run in the order given,
//! each on the output of the previous one.

use std::sync::LazyLock;

use aho_corasick::AhoCorasick;
use regex::bytes::Regex;
use thiserror::Error;

/// Query parameter carrying replacement rules.
pub const REP_PARAM: &str = "rep";

const SEPARATOR: &str = "=>";
const REGEX_PREFIX: &str = "re:";

/// Attribution footer variants removed from every widget response, in order.
const FOOTER_VARIANTS: [&str; 3] = [
    "\u{2013} powered by \\u003ca\\u003egiscus\\u003c/a\\u003e",
    "\u{2013} powered by <a>giscus</a>",
    "- powered by <a>giscus</a>",
];

static FOOTER_MATCHERS: LazyLock<Vec<AhoCorasick>> = LazyLock::new(|| {
    FOOTER_VARIANTS
        .iter()
        .filter_map(|variant| match AhoCorasick::new([variant]) {
            Ok(ac) => Some(ac),
            Err(e) => {
                tracing::warn!(variant, error = %e, "Failed to compile footer matcher");
                None
            }
        })
        .collect()
});

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("bad rep value {0:?} (use LEFT=>RIGHT)")]
    Malformed(String),

    #[error("regex compile failed for {pattern:?}: {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("literal compile failed for {needle:?}: {source}")]
    Literal {
        needle: String,
        #[source]
        source: aho_corasick::BuildError,
    },
}

/// Left side of a rule.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Exact substring, scanned left to right without overlaps.
    ///
    /// `None` for an empty left side, which matches nothing rather than
    /// inserting the replacement between every character.
    Literal(Option<AhoCorasick>),
    Pattern(Regex),
}

/// One `rep` rule.
#[derive(Debug, Clone)]
pub struct ReplacementRule {
    pub matcher: Matcher,
    pub replacement: String,
}

impl ReplacementRule {
    /// Parse a single `LEFT=>RIGHT` value, splitting on the first `=>`.
    pub fn parse(raw: &str) -> Result<Self, RuleError> {
        let (left, right) = raw
            .split_once(SEPARATOR)
            .ok_or_else(|| RuleError::Malformed(raw.to_string()))?;

        let matcher = match left.strip_prefix(REGEX_PREFIX) {
            Some(pattern) => Matcher::Pattern(Regex::new(pattern).map_err(|source| {
                RuleError::Regex {
                    pattern: pattern.to_string(),
                    source,
                }
            })?),
            None if left.is_empty() => Matcher::Literal(None),
            None => Matcher::Literal(Some(AhoCorasick::new([left]).map_err(|source| {
                RuleError::Literal {
                    needle: left.to_string(),
                    source,
                }
            })?)),
        };

        Ok(Self {
            matcher,
            replacement: right.to_string(),
        })
    }

    /// Apply the rule to every occurrence in `body`.
    pub fn apply(&self, body: &[u8]) -> Vec<u8> {
        match &self.matcher {
            Matcher::Literal(Some(ac)) => ac.replace_all_bytes(body, &[self.replacement.as_bytes()]),
            Matcher::Literal(None) => body.to_vec(),
            Matcher::Pattern(re) => re.replace_all(body, self.replacement.as_bytes()).into_owned(),
        }
    }
}

/// Parse all rules from a query's `(key, value)` pairs.
///
/// Any bad rule fails the whole set.
pub fn parse_rules<'a, I>(pairs: I) -> Result<Vec<ReplacementRule>, RuleError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .filter(|(key, _)| *key == REP_PARAM)
        .map(|(_, value)| ReplacementRule::parse(value))
        .collect()
}

/// Apply `rules` left to right, each seeing the previous output.
pub fn apply_rules(body: Vec<u8>, rules: &[ReplacementRule]) -> Vec<u8> {
    rules.iter().fold(body, |acc, rule| rule.apply(&acc))
}

/// Strip the attribution footer in all its encodings.
pub fn remove_footer(body: Vec<u8>) -> Vec<u8> {
    FOOTER_MATCHERS
        .iter()
        .fold(body, |acc, ac| ac.replace_all_bytes(&acc, &[""]))
}
