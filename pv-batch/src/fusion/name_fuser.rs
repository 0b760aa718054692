// Name Fuser - Most Frequent Candidate
//
// Candidates are considered in the fixed source order below. The winner is
// the value with the highest occurrence count; ties go to the value seen
// first in that order, so the result never depends on hashing.

/// Name sources in priority order
pub const NAME_SOURCES: [&str; 3] = ["validation", "enrichment", "document"];

/// One source's name candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameCandidate<'a> {
    pub source: &'static str,
    pub value: Option<&'a str>,
}

/// Result of name fusion
#[derive(Debug, Clone, PartialEq)]
pub struct NameFusion {
    /// Winning value, `None` if every candidate was absent
    pub value: Option<String>,
    /// Occurrences of the winner
    pub votes: usize,
    /// Non-null candidates considered
    pub candidates: usize,
}

impl NameFusion {
    /// Share of non-null candidates agreeing with the winner (0.0 if none)
    pub fn agreement(&self) -> f64 {
        if self.candidates == 0 {
            0.0
        } else {
            self.votes as f64 / self.candidates as f64
        }
    }
}

/// Select the most frequent non-null candidate.
///
/// Values are compared after trimming; blank strings count as absent.
pub fn fuse_name(candidates: &[NameCandidate<'_>]) -> NameFusion {
    // (value, count) in first-seen order
    let mut tally: Vec<(&str, usize)> = Vec::new();
    let mut non_null = 0;

    for candidate in candidates {
        let Some(value) = candidate.value.map(str::trim).filter(|v| !v.is_empty()) else {
            continue;
        };
        non_null += 1;
        match tally.iter_mut().find(|(v, _)| *v == value) {
            Some(entry) => entry.1 += 1,
            None => tally.push((value, 1)),
        }
    }

    // Strictly-greater comparison keeps the earliest value on ties
    let mut best: Option<(&str, usize)> = None;
    for (value, count) in tally {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((value, count));
        }
    }

    NameFusion {
        value: best.map(|(v, _)| v.to_string()),
        votes: best.map_or(0, |(_, c)| c),
        candidates: non_null,
    }
}
