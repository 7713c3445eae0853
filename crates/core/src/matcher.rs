//! Slug matching: resolve a short identifier to one candidate.
//!
//! Comparison is a substring test after [`normalize_label`], so `_` and `-`
//! are interchangeable. Under [`MatchPolicy::FirstMatch`] the first candidate
//! in caller order wins even when others also match; the extra matches are
//! logged but not rejected. [`MatchPolicy::RejectAmbiguous`] turns that case
//! into [`SlugMatch::Ambiguous`].

use tracing::warn;

use crate::helpers::normalize_label;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchPolicy {
    #[default]
    FirstMatch,
    RejectAmbiguous,
}

#[derive(Debug, PartialEq, Eq)]
pub enum SlugMatch<'a, T> {
    Found(&'a T),
    Ambiguous(Vec<&'a T>),
    NotFound,
}

impl<'a, T> SlugMatch<'a, T> {
    pub fn found(self) -> Option<&'a T> {
        match self {
            SlugMatch::Found(candidate) => Some(candidate),
            SlugMatch::Ambiguous(_) | SlugMatch::NotFound => None,
        }
    }
}

fn resolve<'a, T, F, P>(subject: &str, candidates: &'a [T], key: F, is_match: P, policy: MatchPolicy) -> SlugMatch<'a, T>
where
    F: Fn(&T) -> &str,
    P: Fn(&str) -> bool,
{
    let matches: Vec<&'a T> = candidates
        .iter()
        .filter(|candidate| is_match(&normalize_label(key(*candidate))))
        .collect();

    match (matches.len(), policy) {
        (0, _) => SlugMatch::NotFound,
        (1, _) | (_, MatchPolicy::FirstMatch) => {
            if matches.len() > 1 {
                let others: Vec<&str> = matches[1..].iter().map(|c| key(*c)).collect();
                warn!(
                    subject,
                    chosen = key(matches[0]),
                    others = %others.join(", "),
                    "several candidates match, using the first"
                );
            }
            SlugMatch::Found(matches[0])
        }
        (_, MatchPolicy::RejectAmbiguous) => SlugMatch::Ambiguous(matches),
    }
}

/// Find the candidate whose key contains `slug`.
pub fn match_slug<'a, T, F>(slug: &str, candidates: &'a [T], key: F, policy: MatchPolicy) -> SlugMatch<'a, T>
where
    F: Fn(&T) -> &str,
{
    let needle = normalize_label(slug);
    resolve(slug, candidates, key, |candidate| candidate.contains(&needle), policy)
}

/// Find the candidate whose key is contained in `name`.
///
/// The reverse of [`match_slug`]: used to pair a file name with the prompt
/// entry whose slug appears in it.
pub fn match_containing<'a, T, F>(name: &str, candidates: &'a [T], key: F, policy: MatchPolicy) -> SlugMatch<'a, T>
where
    F: Fn(&T) -> &str,
{
    let haystack = normalize_label(name);
    resolve(name, candidates, key, |candidate| haystack.contains(candidate), policy)
}
