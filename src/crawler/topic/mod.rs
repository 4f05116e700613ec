
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static CATEGORY_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.category").expect("valid selector"));

/// The six top-level topics of the site
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Topic {
    Circuits,
    Workshop,
    Craft,
    Cooking,
    Living,
    Teachers,
}

impl Topic {
    pub const ALL: [Self; 6] = [
        Self::Circuits,
        Self::Workshop,
        Self::Craft,
        Self::Cooking,
        Self::Living,
        Self::Teachers,
    ];

    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Circuits => "Circuits",
            Self::Workshop => "Workshop",
            Self::Craft => "Craft",
            Self::Cooking => "Cooking",
            Self::Living => "Living",
            Self::Teachers => "Teachers",
        }
    }
}

impl fmt::Display for Topic {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = UnknownTopic;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|topic| topic.as_str() == s)
            .ok_or_else(|| UnknownTopic(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown topic: {0:?}")]
pub struct UnknownTopic(pub String);

/// Topic named by the page's first `a.category` link, if it is one of [`Topic::ALL`]
#[inline]
pub fn classify_topic(html: &str) -> Option<Topic> {
    classify_document(&Html::parse_document(html))
}

#[inline]
pub fn classify_document(document: &Html) -> Option<Topic> {
    let category = document.select(&CATEGORY_SELECTOR).next()?;
    category.text().collect::<String>().trim().parse().ok()
}
