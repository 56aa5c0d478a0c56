//! arXiv `search_query` composition and request parameters.

use crate::config::Config;
use crate::models::SearchRequest;

/// Compose the boolean `search_query` expression.
///
/// Terms are OR'ed together (`all:` prefix, multi-word terms quoted) and the
/// result is AND'ed with the classification set.
#[must_use]
pub fn build_search_query(terms: &[String], categories: &[String]) -> String {
    let term_clauses: Vec<String> = terms
        .iter()
        .map(|t| t.replace('"', ""))
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|t| !t.is_empty())
        .map(|t| if t.contains(' ') { format!("all:\"{t}\"") } else { format!("all:{t}") })
        .collect();

    let cat_clauses: Vec<String> = categories
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(|c| format!("cat:{c}"))
        .collect();

    let parts: Vec<String> =
        [group(term_clauses), group(cat_clauses)].into_iter().flatten().collect();

    if parts.is_empty() { "all:*".to_string() } else { parts.join(" AND ") }
}

fn group(clauses: Vec<String>) -> Option<String> {
    match clauses.len() {
        0 => None,
        1 => clauses.into_iter().next(),
        _ => Some(format!("({})", clauses.join(" OR "))),
    }
}

/// Classifications a request is restricted to: the pinned one, or the defaults.
#[must_use]
pub fn effective_categories(request: &SearchRequest, defaults: &[String]) -> Vec<String> {
    match request.category.as_deref().map(str::trim) {
        Some(pinned) if !pinned.is_empty() => vec![pinned.to_string()],
        _ => defaults.to_vec(),
    }
}

/// Full query parameter list for a search request.
#[must_use]
pub fn search_params(request: &SearchRequest, categories: &[String]) -> Vec<(String, String)> {
    vec![
        ("search_query".to_string(), build_search_query(&request.terms, categories)),
        ("start".to_string(), request.offset.to_string()),
        ("max_results".to_string(), Config::page_size(request.limit).to_string()),
        ("sortBy".to_string(), request.sort_by.as_str().to_string()),
        ("sortOrder".to_string(), request.sort_order.as_str().to_string()),
    ]
}

/// Query parameter list for an id lookup.
#[must_use]
pub fn id_params(id: &str) -> Vec<(String, String)> {
    vec![
        ("id_list".to_string(), id.trim().to_string()),
        ("max_results".to_string(), "1".to_string()),
    ]
}

/// Generate a cache key from the serialized parameter set.
#[must_use]
pub fn cache_key(params: &[(String, String)]) -> String {
    use md5::{Digest, Md5};

    let mut hasher = Md5::new();
    for (k, v) in params {
        hasher.update(k.as_bytes());
        hasher.update(b"=");
        hasher.update(v.as_bytes());
        hasher.update(b"&");
    }

    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SortBy, SortOrder};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_single_term_single_category() {
        let q = build_search_query(&strings(&["transformer"]), &strings(&["cs.CL"]));
        assert_eq!(q, "all:transformer AND cat:cs.CL");
    }

    #[test]
    fn test_terms_or_categories_and() {
        let q = build_search_query(
            &strings(&["diffusion models", "rlhf"]),
            &strings(&["cs.AI", "cs.LG"]),
        );
        assert_eq!(q, "(all:\"diffusion models\" OR all:rlhf) AND (cat:cs.AI OR cat:cs.LG)");
    }

    #[test]
    fn test_categories_only_and_empty() {
        assert_eq!(build_search_query(&[], &strings(&["cs.AI", "cs.CV"])), "(cat:cs.AI OR cat:cs.CV)");
        assert_eq!(build_search_query(&strings(&["  "]), &[]), "all:*");
    }

    #[test]
    fn test_quotes_and_whitespace_are_normalized() {
        let q = build_search_query(&strings(&["  \"graph   neural\" "]), &[]);
        assert_eq!(q, "all:\"graph neural\"");
    }

    #[test]
    fn test_pinned_category_replaces_defaults() {
        let defaults = strings(&["cs.AI", "cs.LG"]);
        let req = SearchRequest::from_query("x").in_category("cs.RO");
        assert_eq!(effective_categories(&req, &defaults), vec!["cs.RO"]);

        let req = SearchRequest::from_query("x");
        assert_eq!(effective_categories(&req, &defaults), defaults);
    }

    #[test]
    fn test_search_params_cap_page_size() {
        let req = SearchRequest::from_query("x")
            .page(20, 50)
            .sorted(SortBy::SubmittedDate, SortOrder::Ascending);
        let params = search_params(&req, &strings(&["cs.AI"]));

        let lookup = |k: &str| params.iter().find(|(key, _)| key == k).map(|(_, v)| v.as_str());
        assert_eq!(lookup("start"), Some("20"));
        assert_eq!(lookup("max_results"), Some("10"));
        assert_eq!(lookup("sortBy"), Some("submittedDate"));
        assert_eq!(lookup("sortOrder"), Some("ascending"));
    }

    #[test]
    fn test_cache_key_depends_on_every_parameter() {
        let req = SearchRequest::from_query("x");
        let a = cache_key(&search_params(&req, &strings(&["cs.AI"])));
        let b = cache_key(&search_params(&req.clone().page(10, 10), &strings(&["cs.AI"])));
        let c = cache_key(&search_params(&req, &strings(&["cs.LG"])));
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, cache_key(&search_params(&req, &strings(&["cs.AI"]))));
    }
}
