use std::collections::{HashSet, VecDeque};
use tracing::debug;
use url::Url;

/// Visited set plus FIFO queue of `(url, depth)` pairs.
///
/// A URL is marked visited when it is dequeued and is never queued again.
/// The queue never holds a visited URL and never holds the same URL twice.
#[derive(Debug, Default)]
pub struct FrontierState {
    visited: HashSet<String>,
    queued: HashSet<String>,
    queue: VecDeque<(String, usize)>,
    pages_crawled: usize,
}

/// Canonical form used for dedup: parsed, fragment dropped.
pub fn normalize_url(url: &str) -> Option<String> {
    let mut parsed = Url::parse(url.trim()).ok()?;
    parsed.set_fragment(None);
    Some(parsed.to_string())
}

impl FrontierState {
    /// Seed the frontier at depth 0. Unparseable and duplicate seeds are dropped.
    pub fn with_seeds<I, S>(seeds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut frontier = Self::default();
        for seed in seeds {
            frontier.enqueue(seed.as_ref(), 0);
        }
        frontier
    }

    /// Queue `url` at `depth` unless it was already visited or queued.
    pub fn enqueue(&mut self, url: &str, depth: usize) -> bool {
        let Some(normalized) = normalize_url(url) else {
            debug!("Dropping unparseable URL {}", url);
            return false;
        };
        if self.visited.contains(&normalized) || self.queued.contains(&normalized) {
            return false;
        }
        self.queued.insert(normalized.clone());
        self.queue.push_back((normalized, depth));
        true
    }

    /// Queue children found at `parent_depth`, respecting `max_depth`.
    ///
    /// Returns how many were actually queued.
    pub fn offer_children<'a, I>(&mut self, links: I, parent_depth: usize, max_depth: usize) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        if parent_depth >= max_depth {
            return 0;
        }
        links
            .into_iter()
            .filter(|link| self.enqueue(link, parent_depth + 1))
            .count()
    }

    /// Pop the next unvisited URL and mark it visited.
    pub fn next_url(&mut self) -> Option<(String, usize)> {
        while let Some((url, depth)) = self.queue.pop_front() {
            self.queued.remove(&url);
            if self.visited.insert(url.clone()) {
                return Some((url, depth));
            }
        }
        None
    }

    pub fn record_page(&mut self) {
        self.pages_crawled += 1;
    }

    pub fn pages_crawled(&self) -> usize {
        self.pages_crawled
    }

    pub fn is_visited(&self, url: &str) -> bool {
        normalize_url(url).is_some_and(|u| self.visited.contains(&u))
    }

    pub fn is_queued(&self, url: &str) -> bool {
        normalize_url(url).is_some_and(|u| self.queued.contains(&u))
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn visited_len(&self) -> usize {
        self.visited.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.queue.is_empty()
    }

    /// Snapshot of the pending queue, head first.
    pub fn pending(&self) -> Vec<(String, usize)> {
        self.queue.iter().cloned().collect()
    }
}
