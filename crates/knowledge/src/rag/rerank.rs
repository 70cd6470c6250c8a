//! Okapi BM25 reranking over the candidate set of one query.

use crate::types::CandidateDocument;
use std::collections::HashMap;

const K1: f32 = 1.5;
const B: f32 = 0.75;
/// Floor for negative IDF, as a fraction of the average IDF.
const EPSILON: f32 = 0.25;

/// BM25 statistics computed over a single candidate set.
struct Bm25<'a> {
    doc_freqs: Vec<HashMap<&'a str, u32>>,
    doc_lens: Vec<usize>,
    avgdl: f32,
    idf: HashMap<&'a str, f32>,
}

impl<'a> Bm25<'a> {
    fn new(corpus: &'a [Vec<&'a str>]) -> Self {
        let n_docs = corpus.len() as f32;
        let mut doc_freqs = Vec::with_capacity(corpus.len());
        let mut doc_lens = Vec::with_capacity(corpus.len());
        let mut df: HashMap<&str, u32> = HashMap::new();

        for tokens in corpus {
            let mut freqs: HashMap<&str, u32> = HashMap::new();
            for token in tokens {
                *freqs.entry(token).or_insert(0) += 1;
            }
            for token in freqs.keys() {
                *df.entry(token).or_insert(0) += 1;
            }
            doc_lens.push(tokens.len());
            doc_freqs.push(freqs);
        }

        let total: usize = doc_lens.iter().sum();
        let avgdl = total as f32 / n_docs;

        let mut idf = HashMap::with_capacity(df.len());
        let mut idf_sum = 0.0f32;
        let mut negative = Vec::new();
        for (token, freq) in df {
            let value = (n_docs - freq as f32 + 0.5).ln() - (freq as f32 + 0.5).ln();
            idf_sum += value;
            if value < 0.0 {
                negative.push(token);
            }
            idf.insert(token, value);
        }

        if !idf.is_empty() {
            let floor = EPSILON * (idf_sum / idf.len() as f32);
            for token in negative {
                idf.insert(token, floor);
            }
        }

        Self {
            doc_freqs,
            doc_lens,
            avgdl,
            idf,
        }
    }

    fn scores(&self, query: &[&str]) -> Vec<f32> {
        self.doc_freqs
            .iter()
            .zip(&self.doc_lens)
            .map(|(freqs, &len)| {
                let norm = K1 * (1.0 - B + B * len as f32 / self.avgdl);
                query
                    .iter()
                    .map(|token| {
                        let tf = freqs.get(token).copied().unwrap_or(0) as f32;
                        let idf = self.idf.get(token).copied().unwrap_or(0.0);
                        idf * (tf * (K1 + 1.0)) / (tf + norm)
                    })
                    .sum()
            })
            .collect()
    }
}

/// Reorder `candidates` by BM25 score against `query` and keep `top_k`.
///
/// Tokens are whitespace-separated and case-sensitive. Ties keep their
/// original order. If scoring produces a non-finite value, the first `top_k`
/// candidates are returned unchanged.
pub fn rerank(
    candidates: Vec<CandidateDocument>,
    query: &str,
    top_k: usize,
) -> Vec<CandidateDocument> {
    if candidates.is_empty() || top_k == 0 {
        return Vec::new();
    }

    let corpus: Vec<Vec<&str>> = candidates
        .iter()
        .map(|c| c.content.split_whitespace().collect())
        .collect();
    let query_tokens: Vec<&str> = query.split_whitespace().collect();

    let scores = Bm25::new(&corpus).scores(&query_tokens);
    if scores.iter().any(|s| !s.is_finite()) {
        tracing::warn!("BM25 produced non-finite scores, keeping retrieval order");
        return candidates.into_iter().take(top_k).collect();
    }

    let mut scored: Vec<(f32, CandidateDocument)> = scores.into_iter().zip(candidates).collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    scored
        .into_iter()
        .take(top_k)
        .map(|(score, mut candidate)| {
            candidate.score = Some(score);
            candidate
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Metadata;
    use proptest::prelude::*;

    fn doc(content: &str) -> CandidateDocument {
        CandidateDocument::new(content, Metadata::new())
    }

    fn contents(docs: &[CandidateDocument]) -> Vec<&str> {
        docs.iter().map(|d| d.content.as_str()).collect()
    }

    #[test]
    fn test_matching_terms_rank_first() {
        let docs = vec![
            doc("pasta boils in salted water"),
            doc("passport renewal takes two weeks"),
            doc("the weather is mild"),
            doc("visa forms are online"),
        ];

        let ranked = rerank(docs, "passport renewal", 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].content, "passport renewal takes two weeks");
        assert!(ranked[0].score.unwrap() > ranked[1].score.unwrap());
    }

    #[test]
    fn test_ties_keep_original_order() {
        let docs = vec![doc("alpha"), doc("beta"), doc("gamma")];
        let ranked = rerank(docs, "unrelated", 3);
        assert_eq!(contents(&ranked), vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_case_sensitive_tokens() {
        let docs = vec![doc("rust is fast"), doc("Rust is fast"), doc("go is simple")];
        let ranked = rerank(docs, "Rust", 1);
        assert_eq!(ranked[0].content, "Rust is fast");
    }

    #[test]
    fn test_term_in_every_doc_uses_idf_floor() {
        // "common" has negative raw IDF; it must not push matching docs down.
        let docs = vec![
            doc("common filler"),
            doc("common target"),
            doc("common filler"),
            doc("common other"),
        ];
        let ranked = rerank(docs, "common target", 4);
        assert_eq!(ranked[0].content, "common target");
        assert!(ranked.iter().all(|d| d.score.unwrap().is_finite()));
    }

    #[test]
    fn test_empty_documents_fall_back_to_original_order() {
        let docs = vec![doc(""), doc("   "), doc("")];
        let ranked = rerank(docs, "anything", 2);
        assert_eq!(ranked.len(), 2);
        assert!(ranked.iter().all(|d| d.score.is_none()));
    }

    #[test]
    fn test_empty_input() {
        assert!(rerank(Vec::new(), "q", 8).is_empty());
    }

    proptest! {
        #[test]
        fn prop_rerank_length_is_min_of_top_k_and_input(
            texts in prop::collection::vec("[a-d ]{0,20}", 0..20),
            query in "[a-d ]{0,10}",
            top_k in 0usize..12,
        ) {
            let docs: Vec<_> = texts.iter().map(|t| doc(t)).collect();
            let len = docs.len();
            let ranked = rerank(docs, &query, top_k);
            prop_assert_eq!(ranked.len(), top_k.min(len));
        }
    }
}
