use crate::domain::query::cache_key;
use crate::ingest::source::ListingCandidate;

const CORPORATE_SUFFIXES: [&str; 4] = ["ltd", "limited", "pvt", "private"];

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedListing<'a> {
    pub candidate: &'a ListingCandidate,
    pub similarity: f64,
    pub exact: bool,
}

/// Picks the listing a free-text name refers to.
///
/// An exact case-insensitive name match wins outright. Otherwise the candidate with the highest
/// similarity at or above `threshold` is chosen; on a tie the earlier candidate (upstream
/// relevance order) wins.
pub fn resolve<'a>(
    query: &str,
    candidates: &'a [ListingCandidate],
    threshold: f64,
) -> Option<ResolvedListing<'a>> {
    let wanted = cache_key(query);
    if let Some(candidate) = candidates
        .iter()
        .find(|c| cache_key(&c.display_name) == wanted)
    {
        return Some(ResolvedListing {
            candidate,
            similarity: 1.0,
            exact: true,
        });
    }

    let folded_query = fold_name(query);
    let mut best: Option<ResolvedListing<'a>> = None;
    for candidate in candidates {
        let score = similarity(&folded_query, &fold_name(&candidate.display_name));
        if best.as_ref().map_or(true, |b| score > b.similarity) {
            best = Some(ResolvedListing {
                candidate,
                similarity: score,
                exact: false,
            });
        }
    }

    best.filter(|b| b.similarity >= threshold)
}

/// Lowercased name without punctuation and trailing corporate suffixes ("Infosys Ltd." ->
/// "infosys").
pub fn fold_name(name: &str) -> String {
    let cleaned: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '&' { c } else { ' ' })
        .collect();
    let mut tokens: Vec<&str> = cleaned.split_whitespace().collect();
    while tokens.len() > 1
        && tokens
            .last()
            .is_some_and(|t| CORPORATE_SUFFIXES.contains(t))
    {
        tokens.pop();
    }
    tokens.join(" ")
}

pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(&a, &b) as f64 / longest as f64
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            cur[j + 1] = substitution.min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}
