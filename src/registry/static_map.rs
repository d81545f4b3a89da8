//! Compiled-in category map.

use url::Url;

use crate::models::{CategoryMap, SourceDescriptor};

const FEEDS: &[(&str, &[(&str, &str)])] = &[
    (
        "general",
        &[
            ("New York Times", "https://rss.nytimes.com/services/xml/rss/nyt/HomePage.xml"),
            ("BBC News", "https://feeds.bbci.co.uk/news/rss.xml"),
            ("Al Jazeera", "https://www.aljazeera.com/xml/rss/all.xml"),
        ],
    ),
    (
        "sports",
        &[
            ("BBC Sport", "https://feeds.bbci.co.uk/sport/rss.xml"),
            ("New York Times Sports", "https://rss.nytimes.com/services/xml/rss/nyt/Sports.xml"),
            ("ESPN", "https://www.espn.com/espn/rss/news"),
        ],
    ),
    (
        "business",
        &[
            ("BBC Business", "https://feeds.bbci.co.uk/news/business/rss.xml"),
            ("New York Times Business", "https://rss.nytimes.com/services/xml/rss/nyt/Business.xml"),
            (
                "CNBC",
                "https://search.cnbc.com/rs/search/combinedcms/view.xml?partnerId=wrss01&id=100003114",
            ),
        ],
    ),
    (
        "technology",
        &[
            ("BBC Technology", "https://feeds.bbci.co.uk/news/technology/rss.xml"),
            ("New York Times Technology", "https://rss.nytimes.com/services/xml/rss/nyt/Technology.xml"),
            ("MIT Technology Review", "https://www.technologyreview.com/feed/"),
        ],
    ),
];

/// The built-in map: `general`, `sports`, `business` and `technology`, all feeds.
pub fn static_map() -> CategoryMap {
    let mut map = CategoryMap::new();
    for (category, feeds) in FEEDS {
        let sources = feeds
            .iter()
            .filter_map(|(name, address)| Some(SourceDescriptor::feed(*name, Url::parse(address).ok()?)))
            .collect();
        map.insert(*category, sources);
    }
    map
}
