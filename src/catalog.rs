use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::trace;

/// One video card on the channel page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Video {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub published: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Link {
    pub label: String,
    pub url: String,
}

/// Channel identity shown in the header and the About tab.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Channel {
    pub name: String,
    pub handle: String,
    #[serde(default)]
    pub tagline: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub subscribers: u64,
    #[serde(default)]
    pub total_views: u64,
    #[serde(default)]
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Catalog {
    pub channel: Channel,
    #[serde(default)]
    pub videos: Vec<Video>,
}

impl Catalog {
    /// Loads the catalog from a YAML file, or falls back to the built-in
    /// channel content. Cards missing an id or title are dropped.
    pub fn load(path: Option<&Path>) -> Result<Catalog> {
        let mut catalog = match path {
            Some(path) => {
                let data = fs::read_to_string(path)
                    .with_context(|| format!("read catalog file at {}", path.display()))?;
                serde_yaml::from_str(&data)
                    .with_context(|| format!("parse catalog file at {}", path.display()))?
            }
            None => default_catalog(),
        };
        let dropped = catalog.sanitize();
        if dropped > 0 {
            trace::debug_log(format!("catalog: dropped {dropped} incomplete video cards"));
        }
        Ok(catalog)
    }

    /// Removes cards that cannot be opened (empty id or title). Returns the
    /// number of dropped cards.
    pub fn sanitize(&mut self) -> usize {
        let before = self.videos.len();
        self.videos
            .retain(|video| !video.id.trim().is_empty() && !video.title.trim().is_empty());
        before - self.videos.len()
    }

    pub fn video(&self, id: &str) -> Option<&Video> {
        self.videos.iter().find(|video| video.id == id)
    }
}

/// Compact view-count label, matching the style of the channel page.
pub fn format_views(views: u64) -> String {
    match views {
        v if v >= 1_000_000 => format!("{:.1}M views", v as f64 / 1_000_000.0),
        v if v >= 1_000 => format!("{:.1}K views", v as f64 / 1_000.0),
        1 => "1 view".to_string(),
        v => format!("{v} views"),
    }
}

/// The channel content shipped with the binary.
pub fn default_catalog() -> Catalog {
    Catalog {
        channel: Channel {
            name: "Dark Kokan".to_string(),
            handle: "@DarkKokan".to_string(),
            tagline: "Stories from the Konkan coast".to_string(),
            description: "Dark Kokan takes you off the highway and into the \
                          Konkan you don't see from the bus window: moonlit \
                          beaches, monsoon waterfalls, forgotten sea forts and \
                          the people who still live by the tide. New journeys \
                          every month."
                .to_string(),
            subscribers: 128_000,
            total_views: 9_400_000,
            links: vec![Link {
                label: "YouTube".to_string(),
                url: crate::player::CHANNEL_URL.to_string(),
            }],
        },
        videos: vec![
            Video {
                id: "dk9XbV4kqA0".to_string(),
                title: "Hidden Beaches of Kokan Nobody Talks About".to_string(),
                description: "Four beaches south of Dapoli you won't find on a \
                              map pin, reached by foot, ferry and one very \
                              tired scooter."
                    .to_string(),
                views: 1_240_000,
                duration: "18:42".to_string(),
                published: "2024-03-18".to_string(),
            },
            Video {
                id: "mQ2wPzR7sLk".to_string(),
                title: "Monsoon Night at a Konkan Sea Fort".to_string(),
                description: "We waited out a storm inside Suvarnadurg with a \
                              fisherman who knows every stone of the ramparts."
                    .to_string(),
                views: 860_000,
                duration: "24:10".to_string(),
                published: "2024-07-02".to_string(),
            },
            Video {
                id: "t5HgN1cYe8w".to_string(),
                title: "Konkan Village Food: Cooked on a Wood Fire".to_string(),
                description: "Sol kadhi, bharleli vangi and fresh bangda, made \
                              the way three generations have made them."
                    .to_string(),
                views: 2_030_000,
                duration: "15:27".to_string(),
                published: "2023-11-09".to_string(),
            },
            Video {
                id: "zR8kWq3vT2M".to_string(),
                title: "The Last Ferryman of the Jaigad Creek".to_string(),
                description: "A bridge made his route obsolete. He still rows \
                              it every morning. We asked him why."
                    .to_string(),
                views: 540_000,
                duration: "21:05".to_string(),
                published: "2024-01-26".to_string(),
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_is_complete() {
        let catalog = default_catalog();
        assert!(!catalog.videos.is_empty());
        assert!(catalog
            .videos
            .iter()
            .all(|v| !v.id.is_empty() && !v.title.is_empty()));
        assert_eq!(catalog.channel.name, "Dark Kokan");
    }

    #[test]
    fn sanitize_drops_incomplete_cards() {
        let mut catalog = default_catalog();
        catalog.videos.push(Video {
            id: String::new(),
            title: "No id".to_string(),
            description: String::new(),
            views: 0,
            duration: String::new(),
            published: String::new(),
        });
        catalog.videos.push(Video {
            id: "hasid123".to_string(),
            title: "  ".to_string(),
            description: String::new(),
            views: 0,
            duration: String::new(),
            published: String::new(),
        });
        let kept = default_catalog().videos.len();
        assert_eq!(catalog.sanitize(), 2);
        assert_eq!(catalog.videos.len(), kept);
    }

    #[test]
    fn looks_up_videos_by_id() {
        let catalog = default_catalog();
        let first = &catalog.videos[0];
        assert_eq!(catalog.video(&first.id), Some(first));
        assert!(catalog.video("missing").is_none());
    }

    #[test]
    fn loads_catalog_from_yaml() {
        use std::io::Write;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            "channel:\n  name: Test\n  handle: '@test'\nvideos:\n  - id: abc123\n    title: First\n  - id: ''\n    title: Dropped\n"
        )
        .unwrap();

        let catalog = Catalog::load(Some(&path)).unwrap();
        assert_eq!(catalog.channel.name, "Test");
        assert_eq!(catalog.videos.len(), 1);
        assert_eq!(catalog.videos[0].id, "abc123");
    }

    #[test]
    fn formats_view_counts() {
        assert_eq!(format_views(17), "17 views");
        assert_eq!(format_views(1), "1 view");
        assert_eq!(format_views(5_400), "5.4K views");
        assert_eq!(format_views(1_240_000), "1.2M views");
    }
}
