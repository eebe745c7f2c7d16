//! Okapi BM25
//!
//! `idf(t) = ln((N - df + 0.5) / (df + 0.5) + 1)`
//! `tfNorm(t,d) = tf * (k1 + 1) / (tf + k1 * (1 - b + b * docLen / Lavg))`
//!
//! `k1` saturates raw term frequency so that very frequent terms cannot
//! dominate; `b` normalises against document length. The `+ 1` inside the
//! logarithm keeps idf positive even when a term appears in most documents.

/// Scores one (term, document) pair.
///
/// `avg_doc_len` must be positive; callers clamp their estimate before
/// scoring. A pair with zero term frequency or zero document frequency
/// contributes nothing.
pub fn score(
    tf: u32,
    doc_len: u64,
    avg_doc_len: f64,
    doc_freq: u64,
    total_docs: u64,
    k1: f64,
    b: f64,
) -> f64 {
    if tf == 0 || doc_freq == 0 {
        return 0.0;
    }

    let tf = tf as f64;
    let df = doc_freq as f64;
    let n = total_docs as f64;

    let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
    let tf_norm = tf * (k1 + 1.0) / (tf + k1 * (1.0 - b + b * (doc_len as f64 / avg_doc_len)));

    idf * tf_norm
}
