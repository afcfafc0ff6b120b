//! Combination expression parsing
//!
//! `USE_CONFIG_DYNAMIC_VALUES` holds a list of provider kinds separated by
//! commas or whitespace, each optionally carrying an explicit position:
//!
//! ```text
//! local_file,remote_kv            # local_file first, remote_kv last (wins)
//! remote_kv:2, local_file:1       # same order, explicit
//! ```
//!
//! Later entries win when keys collide. Entries without a position take their
//! place in the list; ties are broken by [`ProviderKind::default_rank`].

use crate::providers::ProviderKind;
use log::warn;
use regex::Regex;
use std::sync::LazyLock;

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<kind>[A-Za-z][A-Za-z_-]*)(?::(?P<pos>\d+))?$").expect("valid token regex")
});

/// One selected provider kind with its resolved position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecipeEntry {
    pub kind: ProviderKind,
    pub precedence: usize,
}

/// Ordered, deduplicated provider selection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recipe {
    entries: Vec<RecipeEntry>,
    ignored: Vec<String>,
}

impl Recipe {
    /// Parse a combination expression.
    ///
    /// Never fails: unknown kinds and malformed tokens are skipped with a
    /// warning and reported through [`Recipe::ignored`].
    #[must_use]
    pub fn parse(expression: &str) -> Self {
        let mut entries: Vec<RecipeEntry> = Vec::new();
        let mut ignored = Vec::new();

        let tokens = expression
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty());

        for (index, token) in tokens.enumerate() {
            let Some(caps) = TOKEN_RE.captures(token) else {
                warn!("Ignoring malformed config recipe token '{token}'");
                ignored.push(token.to_string());
                continue;
            };

            let Ok(kind) = caps["kind"].parse::<ProviderKind>() else {
                warn!("Ignoring unknown provider kind '{token}' in config recipe");
                ignored.push(token.to_string());
                continue;
            };

            let precedence = match caps.name("pos") {
                Some(pos) => match pos.as_str().parse::<usize>() {
                    Ok(pos) => pos,
                    Err(_) => {
                        warn!("Ignoring config recipe token '{token}' with out-of-range position");
                        ignored.push(token.to_string());
                        continue;
                    }
                },
                None => index + 1,
            };

            if entries.iter().any(|e| e.kind == kind) {
                warn!("Provider kind '{kind}' listed more than once, keeping the first");
                continue;
            }

            entries.push(RecipeEntry { kind, precedence });
        }

        entries.sort_by_key(|e| (e.precedence, e.kind.default_rank()));

        Self { entries, ignored }
    }

    /// Entries in merge order (earliest first, last one wins)
    #[must_use]
    pub fn entries(&self) -> &[RecipeEntry] {
        &self.entries
    }

    /// Selected kinds in merge order
    pub fn kinds(&self) -> impl Iterator<Item = ProviderKind> + '_ {
        self.entries.iter().map(|e| e.kind)
    }

    /// Tokens that were dropped while parsing
    #[must_use]
    pub fn ignored(&self) -> &[String] {
        &self.ignored
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ProviderKind::*;

    fn kinds(expr: &str) -> Vec<ProviderKind> {
        Recipe::parse(expr).kinds().collect()
    }

    #[test]
    fn test_empty_expression() {
        assert!(Recipe::parse("").is_empty());
        assert!(Recipe::parse("  , ,").is_empty());
    }

    #[test]
    fn test_listed_order_is_kept() {
        assert_eq!(kinds("remote_kv,local_file"), vec![RemoteKv, LocalFile]);
        assert_eq!(kinds("local_file remote_kv"), vec![LocalFile, RemoteKv]);
    }

    #[test]
    fn test_explicit_positions_win() {
        assert_eq!(
            kinds("remote_kv:1,local_file:3,remote_db:2"),
            vec![RemoteKv, RemoteDb, LocalFile]
        );
        // explicit position moves an entry ahead of the listed ones
        assert_eq!(kinds("local_file,remote_kv,local_string_var:0"), vec![
            LocalStringVar,
            LocalFile,
            RemoteKv
        ]);
    }

    #[test]
    fn test_ties_use_default_order() {
        assert_eq!(
            kinds("remote_kv:1,remote_secret_manager:1,local_file:1"),
            vec![LocalFile, RemoteSecretManager, RemoteKv]
        );
    }

    #[test]
    fn test_duplicates_keep_first() {
        let recipe = Recipe::parse("local_file:5,remote_kv,local_file:1");
        assert_eq!(recipe.entries().len(), 2);
        assert_eq!(recipe.entries()[0], RecipeEntry {
            kind: RemoteKv,
            precedence: 2
        });
        assert_eq!(recipe.entries()[1].precedence, 5);
    }

    #[test]
    fn test_unknown_tokens_are_ignored() {
        let recipe = Recipe::parse("local_file,remote_vault,remote_kv:x,Remote-KV");
        assert_eq!(recipe.kinds().collect::<Vec<_>>(), vec![LocalFile, RemoteKv]);
        assert_eq!(recipe.ignored(), &["remote_vault", "remote_kv:x"]);
    }

    #[test]
    fn test_out_of_range_position_is_ignored() {
        let recipe = Recipe::parse("local_file:99999999999999999999999,remote_kv");
        assert_eq!(recipe.kinds().collect::<Vec<_>>(), vec![RemoteKv]);
        assert_eq!(recipe.ignored(), &["local_file:99999999999999999999999"]);
    }
}
