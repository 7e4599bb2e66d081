use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

use anyhow::Context;
use indicatif::ProgressBar;

use crate::orcid::{OrcidApi, Work, Works, work_paths};

/// Fetch every work detail in `paths` with at most `limit` requests in flight.
///
/// Results come back in the order of `paths`, not in completion order. The first failing request
/// stops the workers from picking up anything new and is returned; requests already in flight
/// run to completion and are discarded.
pub fn fetch_all<A: OrcidApi + ?Sized>(
    api: &A,
    paths: &[String],
    limit: usize,
    progress: &ProgressBar,
) -> anyhow::Result<Vec<Work>> {
    let workers = limit.max(1).min(paths.len());
    let next = AtomicUsize::new(0);
    let cancelled = AtomicBool::new(false);

    let outcomes = thread::scope(|scope| {
        let (next, cancelled) = (&next, &cancelled);
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                scope.spawn(move || -> anyhow::Result<Vec<(usize, Work)>> {
                    let mut done = Vec::new();
                    while !cancelled.load(Ordering::Relaxed) {
                        let idx = next.fetch_add(1, Ordering::Relaxed);
                        let Some(path) = paths.get(idx) else { break };
                        match fetch_work(api, path) {
                            Ok(work) => {
                                done.push((idx, work));
                                progress.inc(1);
                            }
                            Err(e) => {
                                cancelled.store(true, Ordering::Relaxed);
                                return Err(e);
                            }
                        }
                    }
                    Ok(done)
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .collect::<Vec<_>>()
    });

    let mut slots: Vec<Option<Work>> = paths.iter().map(|_| None).collect();
    for outcome in outcomes {
        for (idx, work) in outcome? {
            slots[idx] = Some(work);
        }
    }
    slots
        .into_iter()
        .zip(paths)
        .map(|(slot, path)| slot.ok_or_else(|| anyhow::anyhow!("no response for {path}")))
        .collect()
}

fn fetch_work<A: OrcidApi + ?Sized>(api: &A, path: &str) -> anyhow::Result<Work> {
    let body = api.get(path)?;
    serde_json::from_str(&body).with_context(|| format!("invalid work JSON from {path}"))
}

/// What one run pulled out of ORCID.
#[derive(Debug, Default)]
pub struct Harvest {
    /// Raw BibTeX citations, in work-list order.
    pub citations: Vec<String>,
    /// Works whose citation was missing or not BibTeX.
    pub skipped: usize,
}

/// List the works of `orcid`, fetch each one's detail record and keep the BibTeX citations.
pub fn fetch_citations<A: OrcidApi + ?Sized>(
    api: &A,
    orcid: &str,
    limit: usize,
    progress: &ProgressBar,
) -> anyhow::Result<Harvest> {
    let body = api.get(&format!("{orcid}/works"))?;
    let works: Works = serde_json::from_str(&body)
        .with_context(|| format!("invalid works list JSON for {orcid}"))?;
    let paths = work_paths(&works)?;
    tracing::info!(orcid, works = paths.len(), "fetching work details");

    progress.set_length(paths.len() as u64);
    let details = fetch_all(api, &paths, limit, progress)?;
    progress.finish_and_clear();

    let mut harvest = Harvest::default();
    for work in &details {
        match work.bibtex() {
            Some(bib) => harvest.citations.push(bib.to_string()),
            None => harvest.skipped += 1,
        }
    }
    tracing::info!(
        bibtex = harvest.citations.len(),
        skipped = harvest.skipped,
        "collected citations"
    );
    Ok(harvest)
}
