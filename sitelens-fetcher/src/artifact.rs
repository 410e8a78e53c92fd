use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::time::Duration;

/// Everything captured from one navigation. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageArtifact {
    pub url: String,
    pub title: String,
    pub markup: String,
    pub scripts: Vec<ScriptTag>,
    pub framework_hints: FrameworkHints,
    /// Base64-encoded viewport screenshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    pub links: Vec<LinkRecord>,
    #[serde(skip)]
    pub load_time: Duration,
}

impl PageArtifact {
    pub fn new(url: String) -> Self {
        Self {
            url,
            title: String::new(),
            markup: String::new(),
            scripts: Vec::new(),
            framework_hints: FrameworkHints::default(),
            screenshot: None,
            links: Vec::new(),
            load_time: Duration::from_secs(0),
        }
    }
}

/// A resolved outbound anchor. Two records are equal when their URLs are.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkRecord {
    pub url: String,
    pub text: String,
    pub path: String,
}

impl PartialEq for LinkRecord {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for LinkRecord {}

impl Hash for LinkRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.url.hash(state);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptTag {
    pub src: String,
    #[serde(rename = "type")]
    pub script_type: String,
    #[serde(rename = "async")]
    pub is_async: bool,
    pub defer: bool,
}

/// Client-side framework markers found on the page. Several may be set at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkHints {
    pub react: bool,
    pub vue: bool,
    pub angular: bool,
    pub nextjs: bool,
    pub nuxt: bool,
}

impl FrameworkHints {
    pub fn merge(self, other: FrameworkHints) -> Self {
        Self {
            react: self.react || other.react,
            vue: self.vue || other.vue,
            angular: self.angular || other.angular,
            nextjs: self.nextjs || other.nextjs,
            nuxt: self.nuxt || other.nuxt,
        }
    }

    pub fn any(&self) -> bool {
        self.react || self.vue || self.angular || self.nextjs || self.nuxt
    }
}
