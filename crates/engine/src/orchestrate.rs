use crate::classify::{classify, sort_canonical};
use crate::error::EngineError;
use crate::model::{AnomalyKind, NumberingState, RepairPolicy, Thread};
use crate::renumber::renumber;
use crate::report::{LinkReporter, Progress, RunMeta, RunReport, RunTotals, ThreadFailure};
use crate::store::{PostFilter, Store, ThreadCursor};

/// One reconciliation pass over every thread in the store.
///
/// Streams threads through a forward-only cursor, classifies each,
/// applies the repair policy, and accumulates category counters. A store
/// failure on one thread rolls that thread back, lands in the report's
/// failure list, and the pass moves on; invariant violations abort the
/// run.
pub fn run(
    store: &dyn Store,
    policy: &RepairPolicy,
    progress: &mut dyn Progress,
    links: &mut dyn LinkReporter,
) -> Result<RunReport, EngineError> {
    let thread_count = store.count_threads()?;

    let mut totals = RunTotals::default();
    let mut threads_updated = 0u64;
    let mut posts_updated = 0u64;
    let mut failures = Vec::new();

    let mut cursor = ThreadCursor::new(store);
    while let Some(thread) = cursor.next_thread()? {
        match process_thread(store, policy, links, &thread, &mut totals) {
            Ok(Some(updated)) => {
                threads_updated += 1;
                posts_updated += updated;
            }
            Ok(None) => {}
            Err(EngineError::Store(err)) => failures.push(ThreadFailure {
                thread: thread.id,
                error: err.to_string(),
            }),
            Err(fatal) => return Err(fatal),
        }
        progress.advance();
    }
    progress.finish();

    Ok(RunReport {
        meta: RunMeta::stamp(),
        thread_count,
        totals,
        threads_updated,
        posts_updated,
        failures,
    })
}

/// Classify one thread and apply the policy's decision table. Returns
/// the number of posts mutated, or `None` when no repair ran.
fn process_thread(
    store: &dyn Store,
    policy: &RepairPolicy,
    links: &mut dyn LinkReporter,
    thread: &Thread,
    totals: &mut RunTotals,
) -> Result<Option<u64>, EngineError> {
    let posts = store.posts_of(thread.id, PostFilter::All)?;
    let verdict = classify(posts)?;

    let mut emit = |kind: AnomalyKind| {
        if policy.enumerate {
            links.anomaly(kind, thread);
        }
    };

    match verdict.state {
        NumberingState::Complete => {
            totals.good += 1;
            if verdict.has_duplicates {
                totals.good_with_duplicates += 1;
                emit(AnomalyKind::Duplicate);
            }
            if verdict.has_disorder {
                totals.good_with_disorder += 1;
                emit(AnomalyKind::Disorder);
            }

            if policy.all
                || (verdict.has_duplicates && policy.fix_duplicates && !policy.partial)
                || (verdict.has_disorder && policy.fix_disorder && !policy.partial)
            {
                let count = verdict.numbered.len() as u64;
                renumber(store, thread, &verdict.numbered, true, 0)?;
                return Ok(Some(count));
            }
            Ok(None)
        }
        NumberingState::Missing => {
            totals.missing += 1;
            emit(AnomalyKind::Missing);

            if policy.all || policy.missing {
                let count = verdict.unnumbered.len() as u64;
                renumber(store, thread, &verdict.unnumbered, false, 0)?;
                return Ok(Some(count));
            }
            Ok(None)
        }
        NumberingState::Partial => {
            totals.partial += 1;
            emit(AnomalyKind::Partial);
            if verdict.has_duplicates {
                totals.partial_with_duplicates += 1;
                emit(AnomalyKind::Duplicate);
            }
            if verdict.has_disorder {
                totals.partial_with_disorder += 1;
                emit(AnomalyKind::Disorder);
            }

            if policy.all
                || (verdict.has_duplicates && policy.fix_duplicates && policy.partial)
                || (verdict.has_disorder && policy.fix_disorder && policy.partial)
            {
                // Full renumber across every post, numbered or not.
                let mut all = verdict.numbered;
                all.extend(verdict.unnumbered);
                sort_canonical(&mut all);
                let count = all.len() as u64;
                renumber(store, thread, &all, true, 0)?;
                Ok(Some(count))
            } else if policy.partial {
                // Fill in the gaps, continuing after the existing max.
                let count = verdict.unnumbered.len() as u64;
                renumber(store, thread, &verdict.unnumbered, false, verdict.max_number)?;
                Ok(Some(count))
            } else {
                Ok(None)
            }
        }
    }
}
