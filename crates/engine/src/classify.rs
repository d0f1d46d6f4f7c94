use std::collections::HashSet;

use crate::error::EngineError;
use crate::model::{Classification, NumberingState, Post};

/// Sort posts into canonical order: created_at ascending, id breaking
/// ties so equal timestamps fall back to insertion order.
pub fn sort_canonical(posts: &mut [Post]) {
    posts.sort_by_key(Post::canonical_key);
}

/// Classify one thread's posts.
///
/// Accepts the posts in any order and partitions them into numbered and
/// unnumbered, both canonically sorted. The disorder walk checks that
/// numbers read in creation order are non-decreasing; equal adjacent
/// numbers are left to the duplicate flag.
pub fn classify(posts: Vec<Post>) -> Result<Classification, EngineError> {
    let mut numbered = Vec::new();
    let mut unnumbered = Vec::new();
    for post in posts {
        match post.number {
            Some(0) => {
                // 0 is the disorder walk's sentinel; an assigned 0 means
                // the store is corrupt beyond the anomaly taxonomy.
                return Err(EngineError::Invariant(format!(
                    "post {} carries number 0",
                    post.id
                )));
            }
            Some(_) => numbered.push(post),
            None => unnumbered.push(post),
        }
    }
    sort_canonical(&mut numbered);
    sort_canonical(&mut unnumbered);

    let state = if unnumbered.is_empty() && !numbered.is_empty() {
        NumberingState::Complete
    } else if !numbered.is_empty() {
        NumberingState::Partial
    } else {
        NumberingState::Missing
    };

    let distinct: HashSet<u32> = numbered.iter().filter_map(|p| p.number).collect();
    let has_duplicates = distinct.len() < numbered.len();

    let mut has_disorder = false;
    let mut previous = 0u32;
    for post in &numbered {
        let number = post.number.unwrap_or(0);
        if number < previous {
            has_disorder = true;
        }
        previous = number;
    }

    let max_number = distinct.iter().copied().max().unwrap_or(0);

    Ok(Classification {
        state,
        has_duplicates,
        has_disorder,
        numbered,
        unnumbered,
        max_number,
    })
}
