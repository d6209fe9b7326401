//! Computer science / IT topic gate and per-topic research hints.

use serde::Serialize;

/// Keywords that mark a topic as CS/IT.
///
/// Multi-word keywords match as substrings of the lowercased topic; single
/// words must match a whole word so that `"ai"` does not match `"detail"`.
const CS_IT_KEYWORDS: &[&str] = &[
    "artificial intelligence",
    "machine learning",
    "deep learning",
    "neural network",
    "computer vision",
    "natural language processing",
    "nlp",
    "data science",
    "software engineering",
    "programming",
    "algorithm",
    "data structure",
    "database",
    "cybersecurity",
    "cryptography",
    "blockchain",
    "distributed system",
    "cloud computing",
    "web development",
    "mobile development",
    "devops",
    "computer science",
    "information technology",
    "computing",
    "technology",
    "software",
    "hardware",
    "networking",
    "operating system",
    "computer graphics",
    "human computer interaction",
    "hci",
    "robotics",
    "automation",
    "ai",
    "ml",
    "dl",
    "cv",
    "api",
    "framework",
    "library",
    "tool",
    "platform",
    "architecture",
    "design pattern",
    "optimization",
    "performance",
    "scalability",
    "reliability",
    "security",
    "privacy",
    "data mining",
    "big data",
    "analytics",
    "visualization",
    "user interface",
    "ux",
    "ui",
];

/// A topic family: trigger keywords and what it suggests.
struct Family {
    keywords: &'static [&'static str],
    categories: &'static [&'static str],
    directions: &'static [&'static str],
    technologies: &'static [&'static str],
}

const FAMILIES: &[Family] = &[
    Family {
        keywords: &["ai", "artificial intelligence", "machine learning", "ml", "deep learning"],
        categories: &["cs.AI", "cs.LG", "cs.CV", "cs.CL"],
        directions: &["Neural Networks", "Deep Learning", "Computer Vision", "NLP"],
        technologies: &["TensorFlow", "PyTorch", "Transformers", "GANs"],
    },
    Family {
        keywords: &["software", "programming", "development", "engineering"],
        categories: &["cs.SE", "cs.PL", "cs.DS"],
        directions: &["Software Architecture", "Code Quality", "Testing", "DevOps"],
        technologies: &["Git", "Docker", "Kubernetes", "CI/CD"],
    },
    Family {
        keywords: &["security", "cybersecurity", "cryptography", "privacy"],
        categories: &["cs.CR", "cs.CY"],
        directions: &["Cryptography", "Network Security", "Privacy", "Threat Detection"],
        technologies: &["Blockchain", "Zero-Knowledge Proofs", "Encryption"],
    },
    Family {
        keywords: &["data", "analytics", "database", "big data"],
        categories: &["cs.DB", "cs.DS", "cs.LG"],
        directions: &["Data Mining", "Big Data", "Data Visualization", "Analytics"],
        technologies: &["Hadoop", "Spark", "Pandas", "SQL"],
    },
];

/// Lowercased topic split into words for keyword matching.
struct TopicWords {
    lower: String,
    words: Vec<String>,
}

impl TopicWords {
    fn new(topic: &str) -> Self {
        let lower = topic.to_lowercase();
        let words = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect();
        Self { lower, words }
    }

    /// Multi-word keywords match as substrings; single words match a whole
    /// word or its simple plural.
    fn mentions(&self, keyword: &str) -> bool {
        if keyword.contains(' ') {
            self.lower.contains(keyword)
        } else {
            self.words
                .iter()
                .any(|w| w == keyword || w.strip_suffix('s') == Some(keyword))
        }
    }
}

/// Returns `true` if the topic mentions a CS/IT keyword.
///
/// Single-word keywords also match their simple plural (`"databases"`,
/// `"algorithms"`).
#[must_use]
pub fn is_cs_it_topic(topic: &str) -> bool {
    let words = TopicWords::new(topic);
    CS_IT_KEYWORDS.iter().any(|keyword| words.mentions(keyword))
}

/// Research hints for a topic, passed to the synthesis prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DomainInsights {
    /// Broad domain label.
    pub domain: String,
    /// arXiv categories worth searching.
    pub suggested_categories: Vec<String>,
    /// Research directions in the topic's families.
    pub research_directions: Vec<String>,
    /// Technologies commonly involved.
    pub key_technologies: Vec<String>,
}

impl DomainInsights {
    /// `true` when no topic family matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.suggested_categories.is_empty()
            && self.research_directions.is_empty()
            && self.key_technologies.is_empty()
    }
}

fn extend_unique(target: &mut Vec<String>, items: &[&str]) {
    for item in items {
        if !target.iter().any(|t| t == item) {
            target.push((*item).to_string());
        }
    }
}

/// Suggested arXiv categories, research directions and key technologies
/// for every topic family the topic touches.
#[must_use]
pub fn insights(topic: &str) -> DomainInsights {
    let words = TopicWords::new(topic);
    let mut insights = DomainInsights {
        domain: "Computer Science & Information Technology".to_string(),
        ..DomainInsights::default()
    };
    for family in FAMILIES
        .iter()
        .filter(|f| f.keywords.iter().any(|k| words.mentions(k)))
    {
        extend_unique(&mut insights.suggested_categories, family.categories);
        extend_unique(&mut insights.research_directions, family.directions);
        extend_unique(&mut insights.key_technologies, family.technologies);
    }
    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("transformer model compression techniques", false ; "no keyword")]
    #[test_case("Machine Learning for compilers", true ; "multi word")]
    #[test_case("vector databases", true ; "plural")]
    #[test_case("AI safety", true ; "acronym")]
    #[test_case("Rust async runtime performance", true ; "single word")]
    #[test_case("history of the roman empire", false ; "off domain")]
    #[test_case("a detailed guide to baking", false ; "acronym inside word")]
    #[test_case("distributed systems consensus", true ; "multi word substring")]
    fn test_is_cs_it_topic(topic: &str, expected: bool) {
        assert_eq!(is_cs_it_topic(topic), expected);
    }

    #[test_case("deep learning for code search", &["cs.AI", "cs.LG", "cs.CV", "cs.CL"] ; "ai family")]
    #[test_case("software testing at scale", &["cs.SE", "cs.PL", "cs.DS"] ; "software family")]
    #[test_case("privacy in federated systems", &["cs.CR", "cs.CY"] ; "security family")]
    #[test_case("ML on big data", &["cs.AI", "cs.LG", "cs.CV", "cs.CL", "cs.DB", "cs.DS"] ; "two families deduplicated")]
    #[test_case("detailed raft walkthrough", &[] ; "acronym inside word")]
    fn test_insights_categories(topic: &str, expected: &[&str]) {
        assert_eq!(insights(topic).suggested_categories, expected);
    }

    #[test]
    fn test_insights_directions_and_technologies() {
        let hints = insights("vector databases");
        assert_eq!(hints.domain, "Computer Science & Information Technology");
        assert!(hints.research_directions.contains(&"Data Mining".to_string()));
        assert!(hints.key_technologies.contains(&"SQL".to_string()));
        assert!(!hints.is_empty());
        assert!(insights("sourdough baking").is_empty());
    }
}
