
use std::fmt;

use super::frontier::{CrawlSession, TopicCounters};
use super::topic::Topic;
use crate::config::{CrawlerConfig, PolicyKind};

/// What to do with a fetched, non-sitemap page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Extract the page; a known topic is counted once extraction succeeds
    Extract(Option<Topic>),
    /// Skip extraction but still follow the page's links
    Skip(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Unclassified,
    QuotaReached(Topic),
}

impl fmt::Display for SkipReason {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unclassified => f.write_str("no valid topic identified"),
            Self::QuotaReached(topic) => write!(f, "topic limit reached for {}", topic),
        }
    }
}

/// Stop rule and admission rule of a crawl
pub trait CrawlPolicy: Send {
    /// Checked before every iteration; the crawl also ends when the frontier is empty
    fn should_continue(&self, session: &CrawlSession) -> bool;

    fn admit(&self, topic: Option<Topic>, counters: &TopicCounters) -> Admission;

    fn describe(&self) -> String;
}

impl<P: CrawlPolicy + ?Sized> CrawlPolicy for Box<P> {
    #[inline]
    fn should_continue(&self, session: &CrawlSession) -> bool {
        (**self).should_continue(session)
    }

    #[inline]
    fn admit(&self, topic: Option<Topic>, counters: &TopicCounters) -> Admission {
        (**self).admit(topic, counters)
    }

    #[inline]
    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Extract only classified pages, at most `quota` per topic; stop when every topic is full
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicQuotaPolicy {
    pub quota: usize,
}

impl CrawlPolicy for TopicQuotaPolicy {
    #[inline]
    fn should_continue(&self, session: &CrawlSession) -> bool {
        !session.counters.all_reached(self.quota)
    }

    #[inline]
    fn admit(&self, topic: Option<Topic>, counters: &TopicCounters) -> Admission {
        match topic {
            None => Admission::Skip(SkipReason::Unclassified),
            Some(topic) if counters.is_reached(topic, self.quota) => {
                Admission::Skip(SkipReason::QuotaReached(topic))
            }
            Some(topic) => Admission::Extract(Some(topic)),
        }
    }

    #[inline]
    fn describe(&self) -> String {
        format!("topic quota of {} pages", self.quota)
    }
}

/// Extract every page until `max_pages` URLs have been visited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimitPolicy {
    pub max_pages: usize,
}

impl CrawlPolicy for PageLimitPolicy {
    #[inline]
    fn should_continue(&self, session: &CrawlSession) -> bool {
        session.frontier.visited_count() < self.max_pages
    }

    #[inline]
    fn admit(&self, topic: Option<Topic>, _counters: &TopicCounters) -> Admission {
        Admission::Extract(topic)
    }

    #[inline]
    fn describe(&self) -> String {
        format!("page limit of {} visited URLs", self.max_pages)
    }
}

/// Policy selected by the crawler configuration
#[inline]
pub fn policy_from_config(config: &CrawlerConfig) -> Box<dyn CrawlPolicy> {
    match config.policy {
        PolicyKind::TopicQuota => Box::new(TopicQuotaPolicy {
            quota: config.topic_quota,
        }),
        PolicyKind::PageLimit => Box::new(PageLimitPolicy {
            max_pages: config.max_pages,
        }),
    }
}
