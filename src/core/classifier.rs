//! Keyword classifier for native category names.
//!
//! Turns a source's category label into a canonical global type id. The
//! built-in table targets the Chinese labels used by common video listing
//! APIs. Rules are evaluated in order and the first match wins.

use serde::{Deserialize, Serialize};

/// Strategy that proposes a global type for a native category name
pub trait Classifier: Send + Sync {
    /// `None` means the category needs manual mapping
    fn classify(&self, category_name: &str) -> Option<String>;
}

/// One keyword set for a global type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub global_type: String,
    pub keywords: Vec<String>,
}

impl KeywordRule {
    pub fn new(global_type: impl Into<String>, keywords: &[&str]) -> Self {
        Self {
            global_type: global_type.into(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    fn matches(&self, lowered_name: &str) -> bool {
        self.keywords.iter().any(|k| lowered_name.contains(k.as_str()))
    }
}

const BUILTIN_RULES: &[(&str, &[&str])] = &[
    (
        "movie",
        &["电影", "动作", "喜剧", "爱情", "科幻", "恐怖", "剧情", "战争", "理论", "动画片"],
    ),
    (
        "tv",
        &[
            "连续剧", "国产剧", "香港剧", "韩国剧", "台湾剧", "日本剧", "海外剧", "泰国剧", "欧美剧",
            "短剧",
        ],
    ),
    ("variety", &["综艺", "娱乐"]),
    (
        "anime",
        &["动漫", "动画", "日韩动漫", "欧美动漫", "港台动漫", "海外动漫"],
    ),
    ("documentary", &["纪录片", "记录片"]),
    ("sport", &["体育", "足球", "篮球", "网球", "斯诺克"]),
    ("adult", &["福利", "伦理"]),
];

/// Case-insensitive substring classifier over an ordered rule table
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    rules: Vec<KeywordRule>,
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::builtin()
    }
}

impl KeywordClassifier {
    /// The built-in table: movie, tv, variety, anime, documentary, sport, adult
    pub fn builtin() -> Self {
        let rules = BUILTIN_RULES
            .iter()
            .map(|(global_type, keywords)| KeywordRule::new(*global_type, keywords))
            .collect();
        Self { rules }
    }

    pub fn from_rules(rules: Vec<KeywordRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|rule| KeywordRule {
                keywords: rule.keywords.iter().map(|k| k.to_lowercase()).collect(),
                ..rule
            })
            .collect();
        Self { rules }
    }

    /// Append rules evaluated after the existing ones
    pub fn with_rules(mut self, extra: impl IntoIterator<Item = KeywordRule>) -> Self {
        self.rules.extend(
            Self::from_rules(extra.into_iter().collect()).rules,
        );
        self
    }

    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }
}

impl Classifier for KeywordClassifier {
    fn classify(&self, category_name: &str) -> Option<String> {
        let lowered = category_name.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&lowered))
            .map(|rule| rule.global_type.clone())
    }
}
