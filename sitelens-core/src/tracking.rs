// Inventory of interactive elements worth instrumenting with analytics events

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use url::Url;

macro_rules! selector {
    ($css:expr) => {
        LazyLock::new(|| Selector::parse($css).expect("static selector"))
    };
}

static CTA: LazyLock<Selector> = selector!(
    r#"button:not([type="submit"]), [role="button"], a.btn, a.button, [class*="btn-"], [class*="cta"]"#
);
static FORM: LazyLock<Selector> = selector!("form");
static FORM_INPUTS: LazyLock<Selector> = selector!("input, select, textarea");
static EMAIL_INPUT: LazyLock<Selector> = selector!(r#"[type="email"]"#);
static PASSWORD_INPUT: LazyLock<Selector> = selector!(r#"[type="password"]"#);
static VIDEO: LazyLock<Selector> =
    selector!(r#"video, iframe[src*="youtube"], iframe[src*="vimeo"]"#);
static ANCHOR: LazyLock<Selector> = selector!("a[href]");
static ABSOLUTE_ANCHOR: LazyLock<Selector> = selector!(r#"a[href^="http"]"#);
static ECOMMERCE: LazyLock<Selector> =
    selector!(r#"[class*="cart"], [class*="buy"], [class*="checkout"]"#);
static SEARCH: LazyLock<Selector> =
    selector!(r#"input[type="search"], [class*="search"] input"#);
static SOCIAL: LazyLock<Selector> = selector!(
    r#"a[href*="facebook"], a[href*="twitter"], a[href*="instagram"], a[href*="youtube"], [class*="share"]"#
);
static CLICKABLE: LazyLock<Selector> = selector!("a, button");
static SECTIONS: LazyLock<Selector> = selector!("section, article");
static SECTION_HEADING: LazyLock<Selector> = selector!("h1, h2, h3");

const DOWNLOAD_EXTENSIONS: &[&str] = &[
    ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".zip", ".mp3", ".mp4",
];
const LOGIN_WORDS: &[&str] = &["login", "log in", "sign in"];
const REGISTER_WORDS: &[&str] = &["register", "signup", "sign up"];

const TEXT_CAP: usize = 50;
const SCROLL_SECTION_CAP: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CtaElement {
    pub text: String,
    pub tag: String,
    pub classes: String,
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormElement {
    pub id: Option<String>,
    pub action: Option<String>,
    pub input_count: usize,
    pub has_email: bool,
    pub has_password: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoElement {
    /// `native` or `embed`
    #[serde(rename = "type")]
    pub kind: String,
    pub platform: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadLink {
    pub text: String,
    pub extension: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundLink {
    pub text: String,
    pub domain: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcommerceElement {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchInput {
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialElement {
    pub platform: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthElement {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrollSection {
    pub id: Option<String>,
    pub heading: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingElements {
    pub cta: Vec<CtaElement>,
    pub forms: Vec<FormElement>,
    pub videos: Vec<VideoElement>,
    pub downloads: Vec<DownloadLink>,
    pub outbound_links: Vec<OutboundLink>,
    pub ecommerce: Vec<EcommerceElement>,
    pub search: Vec<SearchInput>,
    pub social: Vec<SocialElement>,
    pub auth: Vec<AuthElement>,
    pub scroll_sections: Vec<ScrollSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingSummary {
    #[serde(rename = "totalCTA")]
    pub total_cta: usize,
    pub total_forms: usize,
    pub total_videos: usize,
    pub total_downloads: usize,
    pub total_outbound_links: usize,
    pub has_ecommerce: bool,
    pub has_search: bool,
    pub has_social: bool,
    pub has_auth: bool,
    pub scroll_sections: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedEvent {
    pub name: String,
    pub priority: Priority,
    pub description: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingReport {
    pub elements: TrackingElements,
    pub summary: TrackingSummary,
    pub recommended_events: Vec<RecommendedEvent>,
}

fn clipped_text(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<String>()
        .trim()
        .chars()
        .take(TEXT_CAP)
        .collect::<String>()
        .trim_end()
        .to_string()
}

fn attr(el: ElementRef<'_>, name: &str) -> Option<String> {
    el.value()
        .attr(name)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn first_classes(el: ElementRef<'_>) -> String {
    el.value()
        .attr("class")
        .unwrap_or_default()
        .split_whitespace()
        .take(3)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn analyze(markup: &str, base: &Url) -> TrackingReport {
    let document = Html::parse_document(markup);
    analyze_document(&document, base)
}

pub fn analyze_document(document: &Html, base: &Url) -> TrackingReport {
    let base_host = base.host_str().unwrap_or_default();
    let mut elements = TrackingElements::default();

    for el in document.select(&CTA) {
        let text = clipped_text(el);
        if text.is_empty() || elements.cta.iter().any(|c| c.text == text) {
            continue;
        }
        elements.cta.push(CtaElement {
            text,
            tag: el.value().name().to_lowercase(),
            classes: first_classes(el),
            id: attr(el, "id"),
        });
    }

    for form in document.select(&FORM) {
        elements.forms.push(FormElement {
            id: attr(form, "id"),
            action: attr(form, "action"),
            input_count: form.select(&FORM_INPUTS).count(),
            has_email: form.select(&EMAIL_INPUT).next().is_some(),
            has_password: form.select(&PASSWORD_INPUT).next().is_some(),
        });
    }

    for el in document.select(&VIDEO) {
        let src = el.value().attr("src").unwrap_or_default();
        let platform = if src.contains("youtube") {
            "YouTube"
        } else if src.contains("vimeo") {
            "Vimeo"
        } else {
            "Other"
        };
        elements.videos.push(VideoElement {
            kind: if el.value().name() == "video" { "native" } else { "embed" }.to_string(),
            platform: platform.to_string(),
        });
    }

    for a in document.select(&ANCHOR) {
        let href = a.value().attr("href").unwrap_or_default().to_lowercase();
        if let Some(ext) = DOWNLOAD_EXTENSIONS.iter().find(|ext| href.ends_with(*ext)) {
            let text = clipped_text(a);
            elements.downloads.push(DownloadLink {
                text: if text.is_empty() { "Download".to_string() } else { text },
                extension: ext.trim_start_matches('.').to_string(),
            });
        }
    }

    for a in document.select(&ABSOLUTE_ANCHOR) {
        let Some(domain) = a
            .value()
            .attr("href")
            .and_then(|href| Url::parse(href).ok())
            .and_then(|u| u.host_str().map(str::to_string))
        else {
            continue;
        };
        if !base_host.is_empty() && domain != base_host {
            let text = clipped_text(a);
            elements.outbound_links.push(OutboundLink {
                text: if text.is_empty() { domain.clone() } else { text },
                domain,
            });
        }
    }

    for el in document.select(&ECOMMERCE) {
        let class = el.value().attr("class").unwrap_or_default();
        elements.ecommerce.push(EcommerceElement {
            text: clipped_text(el),
            kind: if class.contains("cart") { "cart" } else { "buy" }.to_string(),
        });
    }

    for el in document.select(&SEARCH) {
        elements.search.push(SearchInput { id: attr(el, "id") });
    }

    for el in document.select(&SOCIAL) {
        let href = el.value().attr("href").unwrap_or_default();
        let platform = ["facebook", "twitter", "instagram", "youtube"]
            .iter()
            .zip(["Facebook", "Twitter", "Instagram", "YouTube"])
            .find(|(needle, _)| href.contains(*needle))
            .map(|(_, name)| name)
            .unwrap_or("Other");
        let class = el.value().attr("class").unwrap_or_default();
        elements.social.push(SocialElement {
            platform: platform.to_string(),
            kind: if class.contains("share") { "share" } else { "follow" }.to_string(),
        });
    }

    for el in document.select(&CLICKABLE) {
        let raw = el.text().collect::<String>();
        let lowered = raw.to_lowercase();
        for (kind, words) in [("login", LOGIN_WORDS), ("register", REGISTER_WORDS)] {
            if words.iter().any(|w| lowered.contains(w))
                && !elements.auth.iter().any(|a| a.kind == kind)
            {
                elements.auth.push(AuthElement {
                    kind: kind.to_string(),
                    text: raw.trim().to_string(),
                });
            }
        }
    }

    for el in document.select(&SECTIONS).take(SCROLL_SECTION_CAP) {
        elements.scroll_sections.push(ScrollSection {
            id: attr(el, "id"),
            heading: el
                .select(&SECTION_HEADING)
                .next()
                .map(clipped_text)
                .filter(|h| !h.is_empty()),
        });
    }

    let summary = TrackingSummary {
        total_cta: elements.cta.len(),
        total_forms: elements.forms.len(),
        total_videos: elements.videos.len(),
        total_downloads: elements.downloads.len(),
        total_outbound_links: elements.outbound_links.len(),
        has_ecommerce: !elements.ecommerce.is_empty(),
        has_search: !elements.search.is_empty(),
        has_social: !elements.social.is_empty(),
        has_auth: !elements.auth.is_empty(),
        scroll_sections: elements.scroll_sections.len(),
    };
    let recommended_events = recommend(&summary, &elements);

    TrackingReport {
        elements,
        summary,
        recommended_events,
    }
}

fn recommend(summary: &TrackingSummary, elements: &TrackingElements) -> Vec<RecommendedEvent> {
    let candidates = [
        ("cta_click", Priority::High, "Track call-to-action clicks", summary.total_cta),
        ("form_submit", Priority::High, "Track form submissions", summary.total_forms),
        ("video_start", Priority::Medium, "Track video plays", summary.total_videos),
        ("file_download", Priority::Medium, "Track file downloads", summary.total_downloads),
        ("add_to_cart", Priority::High, "Track shopping actions", elements.ecommerce.len()),
        ("search", Priority::Medium, "Track on-site search", elements.search.len()),
        ("share", Priority::Low, "Track social interactions", elements.social.len()),
    ];
    candidates
        .into_iter()
        .filter(|(_, _, _, count)| *count > 0)
        .map(|(name, priority, description, count)| RecommendedEvent {
            name: name.to_string(),
            priority,
            description: description.to_string(),
            count,
        })
        .collect()
}
