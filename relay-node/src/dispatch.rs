//! Static link dispatch table.
//!
//! A fixed list of (platform, keyword, pattern, extractor) routes built
//! once at startup, filtered by the enabled-platform list and sorted
//! longest-keyword-first so short keywords cannot shadow longer ones.
//! Matching is a cheap keyword containment check followed by the regex.

use regex::{Captures, Regex};
use tracing::debug;

use crate::error::{RelayError, Result};

type Extractor = fn(&Captures) -> Option<String>;

struct RouteSpec {
    platform: &'static str,
    keyword: &'static str,
    pattern: &'static str,
    extract: Extractor,
}

/// Default extractor: the `id` capture group is the resource identity.
fn extract_id(caps: &Captures) -> Option<String> {
    caps.name("id").map(|m| m.as_str().to_string())
}

/// Some links only identify a resource together with its scope (a status
/// author, a channel, a chat peer); keep both in the resource identity
/// so forwards dedupe per resource, not per scope.
fn extract_scoped(caps: &Captures) -> Option<String> {
    let scope = caps.name("scope")?.as_str();
    let id = caps.name("id")?.as_str();
    Some(format!("{scope}/{id}"))
}

/// The complete route table. Compiled (not consulted) only for platforms
/// the configuration enables.
const ROUTE_SPECS: &[RouteSpec] = &[
    RouteSpec {
        platform: "bilibili",
        keyword: "bilibili.com",
        pattern: r"bilibili\.com/video/(?P<id>BV[0-9A-Za-z]{10}|av\d+)",
        extract: extract_id,
    },
    RouteSpec {
        platform: "bilibili",
        keyword: "b23.tv",
        pattern: r"b23\.tv/(?P<id>[0-9A-Za-z]+)",
        extract: extract_id,
    },
    RouteSpec {
        platform: "douyin",
        keyword: "v.douyin.com",
        pattern: r"v\.douyin\.com/(?P<id>[0-9A-Za-z]+)",
        extract: extract_id,
    },
    RouteSpec {
        platform: "douyin",
        keyword: "douyin.com/video",
        pattern: r"douyin\.com/video/(?P<id>\d+)",
        extract: extract_id,
    },
    RouteSpec {
        platform: "twitter",
        keyword: "x.com",
        pattern: r"x\.com/(?P<scope>\w+)/status/(?P<id>\d+)",
        extract: extract_scoped,
    },
    RouteSpec {
        platform: "twitter",
        keyword: "twitter.com",
        pattern: r"twitter\.com/(?P<scope>\w+)/status/(?P<id>\d+)",
        extract: extract_scoped,
    },
    RouteSpec {
        platform: "youtube",
        keyword: "youtube.com",
        pattern: r"youtube\.com/watch\?v=(?P<id>[\w-]{11})",
        extract: extract_id,
    },
    RouteSpec {
        platform: "youtube",
        keyword: "youtu.be",
        pattern: r"youtu\.be/(?P<id>[\w-]{11})",
        extract: extract_id,
    },
    RouteSpec {
        platform: "xiaohongshu",
        keyword: "xiaohongshu.com",
        pattern: r"xiaohongshu\.com/(?:explore|discovery/item)/(?P<id>[0-9a-f]+)",
        extract: extract_id,
    },
    RouteSpec {
        platform: "xiaohongshu",
        keyword: "xhslink.com",
        pattern: r"xhslink\.com/(?P<id>[0-9A-Za-z/]+)",
        extract: extract_id,
    },
    RouteSpec {
        platform: "kuaishou",
        keyword: "v.kuaishou.com",
        pattern: r"v\.kuaishou\.com/(?P<id>[0-9A-Za-z]+)",
        extract: extract_id,
    },
    RouteSpec {
        platform: "kuaishou",
        keyword: "kuaishou.com",
        pattern: r"kuaishou\.com/short-video/(?P<id>\w+)",
        extract: extract_id,
    },
    RouteSpec {
        platform: "tiktok",
        keyword: "tiktok.com",
        pattern: r"(?:vm|vt)\.tiktok\.com/(?P<id>[0-9A-Za-z]+)",
        extract: extract_id,
    },
    RouteSpec {
        platform: "tiktok",
        keyword: "tiktok.com",
        pattern: r"tiktok\.com/@(?P<scope>[\w.]+)/video/(?P<id>\d+)",
        extract: extract_scoped,
    },
    RouteSpec {
        platform: "weibo",
        keyword: "video.weibo.com",
        pattern: r"video\.weibo\.com/show\?fid=(?P<id>\d+:\d+)",
        extract: extract_id,
    },
    RouteSpec {
        platform: "weibo",
        keyword: "m.weibo.cn",
        pattern: r"m\.weibo\.cn/(?:status|detail)/(?P<id>\d+)",
        extract: extract_id,
    },
    RouteSpec {
        platform: "weibo",
        keyword: "weibo.com",
        pattern: r"weibo\.com/\d+/(?P<id>[0-9A-Za-z]+)",
        extract: extract_id,
    },
    RouteSpec {
        platform: "acfun",
        keyword: "acfun.cn",
        pattern: r"acfun\.cn/(?:v/)?ac(?P<id>\d+)",
        extract: extract_id,
    },
    RouteSpec {
        platform: "ncm",
        keyword: "163cn.tv",
        pattern: r"163cn\.tv/(?P<id>\w+)",
        extract: extract_id,
    },
    RouteSpec {
        platform: "ncm",
        keyword: "music.163.com",
        pattern: r"music\.163\.com/(?:#/)?song\?\S*?id=(?P<id>\d+)",
        extract: extract_id,
    },
    RouteSpec {
        platform: "telegram",
        keyword: "t.me/c",
        pattern: r"t\.me/c/(?P<scope>\d+)/(?P<id>\d+)",
        extract: extract_scoped,
    },
    RouteSpec {
        platform: "telegram",
        keyword: "t.me",
        pattern: r"t\.me/(?:s/)?(?P<scope>[^/?#\s]+)/(?P<id>\d+)",
        extract: extract_scoped,
    },
    RouteSpec {
        platform: "nga",
        keyword: "ngabbs.com",
        pattern: r"tid=(?P<id>\d+)",
        extract: extract_id,
    },
    RouteSpec {
        platform: "nga",
        keyword: "bbs.nga.cn",
        pattern: r"tid=(?P<id>\d+)",
        extract: extract_id,
    },
    RouteSpec {
        platform: "nga",
        keyword: "nga.178.com",
        pattern: r"tid=(?P<id>\d+)",
        extract: extract_id,
    },
    RouteSpec {
        platform: "instagram",
        keyword: "instagram.com",
        pattern: r"instagram\.com/(?:p|reel|reels|tv|share)/(?P<id>[0-9A-Za-z_-]+)",
        extract: extract_id,
    },
    RouteSpec {
        platform: "instagram",
        keyword: "instagr.am",
        pattern: r"instagr\.am/(?:p|reel|reels|tv)/(?P<id>[0-9A-Za-z_-]+)",
        extract: extract_id,
    },
];

/// A matched link, ready for the debounce and reply stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkHit {
    pub platform: &'static str,
    /// The full matched link text.
    pub link: String,
    /// Canonical `platform:id` resource identity.
    pub resource: String,
}

struct Route {
    platform: &'static str,
    keyword: &'static str,
    pattern: Regex,
    extract: Extractor,
}

/// Startup-built dispatcher over the static route table.
pub struct Dispatcher {
    routes: Vec<Route>,
}

impl Dispatcher {
    pub fn new(enabled_platforms: &[String]) -> Result<Self> {
        let mut routes = Vec::new();

        for spec in ROUTE_SPECS {
            if !enabled_platforms.iter().any(|p| p == spec.platform) {
                continue;
            }
            let pattern = Regex::new(spec.pattern).map_err(|e| {
                RelayError::Dispatch(format!("invalid pattern for {}: {e}", spec.platform))
            })?;
            routes.push(Route {
                platform: spec.platform,
                keyword: spec.keyword,
                pattern,
                extract: spec.extract,
            });
        }

        // Longest keyword wins when several are contained in the text.
        routes.sort_by_key(|r| std::cmp::Reverse(r.keyword.len()));

        debug!(
            routes = routes.len(),
            platforms = ?enabled_platforms,
            "dispatch table built"
        );
        Ok(Self { routes })
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Find the first route whose keyword appears in the text and whose
    /// pattern matches.
    pub fn matched(&self, text: &str) -> Option<LinkHit> {
        for route in &self.routes {
            if !text.contains(route.keyword) {
                continue;
            }
            let Some(caps) = route.pattern.captures(text) else {
                continue;
            };
            let Some(id) = (route.extract)(&caps) else {
                continue;
            };
            return Some(LinkHit {
                platform: route.platform,
                link: caps.get(0).map(|m| m.as_str().to_string())?,
                resource: format!("{}:{}", route.platform, id),
            });
        }
        None
    }
}
