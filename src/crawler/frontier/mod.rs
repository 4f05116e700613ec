
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet, VecDeque};
use tracing::debug;
use url::Url;

use super::topic::Topic;

/// Canonical string form of a URL so blacklist entries and extracted links compare equal
#[inline]
pub fn normalize_url(raw: &str) -> String {
    Url::parse(raw.trim()).map_or_else(|_| raw.trim().to_string(), String::from)
}

/// URLs waiting to be fetched plus everything already seen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlFrontier {
    to_visit: VecDeque<String>,
    visited: HashSet<String>,
    blacklist: HashSet<String>,
}

impl CrawlFrontier {
    /// Start from `seed`; the visited set begins as a copy of the blacklist
    #[inline]
    pub fn new<I, S>(seed: &str, blacklist: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let blacklist: HashSet<String> = blacklist
            .into_iter()
            .map(|url| normalize_url(url.as_ref()))
            .collect();

        Self {
            to_visit: VecDeque::from([normalize_url(seed)]),
            visited: blacklist.clone(),
            blacklist,
        }
    }

    /// Take the next URL: the head of the queue, or on every `jump_frequency`-th iteration
    /// a uniformly random entry when more than one is queued
    #[inline]
    pub fn next<R: Rng + ?Sized>(
        &mut self,
        iteration: usize,
        jump_frequency: usize,
        rng: &mut R,
    ) -> Option<String> {
        if jump_frequency > 0 && iteration % jump_frequency == 0 && self.to_visit.len() > 1 {
            let index = rng.random_range(0..self.to_visit.len());
            let url = self.to_visit.remove(index)?;
            debug!("Random jump to {} (index {})", url, index);
            return Some(url);
        }

        self.to_visit.pop_front()
    }

    /// True when the URL must not be fetched
    #[inline]
    pub fn should_skip(&self, url: &str) -> bool {
        self.visited.contains(url) || self.blacklist.contains(url)
    }

    #[inline]
    pub fn mark_visited(&mut self, url: &str) {
        self.visited.insert(url.to_string());
    }

    /// Append discovered links to the tail of the queue
    #[inline]
    pub fn extend<I: IntoIterator<Item = String>>(&mut self, links: I) {
        self.to_visit.extend(links);
    }

    #[inline]
    pub fn visited(&self) -> &HashSet<String> {
        &self.visited
    }

    #[inline]
    pub fn into_visited(self) -> HashSet<String> {
        self.visited
    }

    #[inline]
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.to_visit.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.to_visit.is_empty()
    }

    /// Add blacklist entries to an existing frontier, e.g. one restored from a checkpoint
    #[inline]
    pub fn extend_blacklist<I, S>(&mut self, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for url in urls {
            let url = normalize_url(url.as_ref());
            self.visited.insert(url.clone());
            self.blacklist.insert(url);
        }
    }

    #[inline]
    pub fn is_blacklisted(&self, url: &str) -> bool {
        self.blacklist.contains(url)
    }
}

/// Successfully extracted pages per topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicCounters(BTreeMap<Topic, usize>);

impl Default for TopicCounters {
    #[inline]
    fn default() -> Self {
        Self(Topic::ALL.into_iter().map(|topic| (topic, 0)).collect())
    }
}

impl TopicCounters {
    #[inline]
    pub fn get(&self, topic: Topic) -> usize {
        self.0.get(&topic).copied().unwrap_or(0)
    }

    #[inline]
    pub fn increment(&mut self, topic: Topic) {
        *self.0.entry(topic).or_default() += 1;
    }

    #[inline]
    pub fn is_reached(&self, topic: Topic, quota: usize) -> bool {
        self.get(topic) >= quota
    }

    /// True once every topic has reached `quota`
    #[inline]
    pub fn all_reached(&self, quota: usize) -> bool {
        Topic::ALL
            .into_iter()
            .all(|topic| self.is_reached(topic, quota))
    }

    #[inline]
    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (Topic, usize)> + '_ {
        self.0.iter().map(|(topic, count)| (*topic, *count))
    }
}

/// All mutable state of one crawl
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlSession {
    pub seed_url: String,
    pub frontier: CrawlFrontier,
    pub counters: TopicCounters,
    /// Loop iterations so far, including skipped URLs
    pub iteration: usize,
    /// Pages fetched and handled
    pub processed: usize,
}

impl CrawlSession {
    #[inline]
    pub fn new<I, S>(seed_url: &str, blacklist: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            seed_url: normalize_url(seed_url),
            frontier: CrawlFrontier::new(seed_url, blacklist),
            counters: TopicCounters::default(),
            iteration: 0,
            processed: 0,
        }
    }
}
