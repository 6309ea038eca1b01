//! Category taxonomies: risk tolerance and behavioral bias, each defined by
//! exemplar phrases that responses are compared against.

use crate::error::{ProfilerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Identifier of one of the two independent taxonomies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxonomyId {
    Risk,
    Bias,
}

impl TaxonomyId {
    pub const ALL: [TaxonomyId; 2] = [TaxonomyId::Risk, TaxonomyId::Bias];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaxonomyId::Risk => "risk",
            TaxonomyId::Bias => "bias",
        }
    }
}

impl fmt::Display for TaxonomyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaxonomyId {
    type Err = ProfilerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "risk" => Ok(TaxonomyId::Risk),
            "bias" => Ok(TaxonomyId::Bias),
            other => Err(ProfilerError::Validation {
                message: format!("unknown taxonomy '{}'", other),
            }),
        }
    }
}

/// A named category and the phrases that exemplify it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub exemplars: Vec<String>,
}

impl Category {
    pub fn new(name: impl Into<String>, exemplars: &[&str]) -> Self {
        Self {
            name: name.into(),
            exemplars: exemplars.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Ordered, validated set of categories. Immutable once built.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    id: TaxonomyId,
    categories: Vec<Category>,
}

impl Taxonomy {
    /// Build a taxonomy, enforcing unique names, at least one exemplar per
    /// category and no blank exemplar.
    pub fn new(id: TaxonomyId, categories: Vec<Category>) -> Result<Self> {
        if categories.is_empty() {
            return Err(ProfilerError::Taxonomy {
                message: format!("taxonomy '{}' has no categories", id),
            });
        }
        let mut seen = HashSet::new();
        for category in &categories {
            if category.name.trim().is_empty() {
                return Err(ProfilerError::Taxonomy {
                    message: format!("taxonomy '{}' has a category with a blank name", id),
                });
            }
            if !seen.insert(category.name.as_str()) {
                return Err(ProfilerError::Taxonomy {
                    message: format!(
                        "taxonomy '{}' declares category '{}' more than once",
                        id, category.name
                    ),
                });
            }
            if category.exemplars.is_empty() {
                return Err(ProfilerError::Taxonomy {
                    message: format!(
                        "category '{}' in taxonomy '{}' has no exemplar phrases",
                        category.name, id
                    ),
                });
            }
            if category.exemplars.iter().any(|p| p.trim().is_empty()) {
                return Err(ProfilerError::Taxonomy {
                    message: format!(
                        "category '{}' in taxonomy '{}' has a blank exemplar phrase",
                        category.name, id
                    ),
                });
            }
        }
        Ok(Self { id, categories })
    }

    pub fn id(&self) -> TaxonomyId {
        self.id
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Category names in declared order
    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.categories.iter().any(|c| c.name == name)
    }

    /// Every (category, exemplar) pair in declared order
    pub fn exemplars(&self) -> impl Iterator<Item = (&str, &str)> {
        self.categories.iter().flat_map(|c| {
            c.exemplars
                .iter()
                .map(move |p| (c.name.as_str(), p.as_str()))
        })
    }

    pub fn exemplar_count(&self) -> usize {
        self.categories.iter().map(|c| c.exemplars.len()).sum()
    }
}

/// Holds both taxonomies for the life of the process
#[derive(Debug, Clone)]
pub struct TaxonomyStore {
    risk: Taxonomy,
    bias: Taxonomy,
}

/// On-disk shape of a phrase-set override file
#[derive(Debug, Default, Deserialize)]
struct TaxonomyFile {
    #[serde(default)]
    risk: Option<Vec<Category>>,
    #[serde(default)]
    bias: Option<Vec<Category>>,
}

impl TaxonomyStore {
    /// The reference phrase sets compiled into the binary
    pub fn builtin() -> Result<Self> {
        Ok(Self {
            risk: Taxonomy::new(TaxonomyId::Risk, to_categories(RISK_CATEGORIES))?,
            bias: Taxonomy::new(TaxonomyId::Bias, to_categories(BIAS_CATEGORIES))?,
        })
    }

    /// Built-in taxonomies, optionally with phrase sets replaced from a TOML file
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            None => Self::builtin(),
            Some(p) => {
                let content = std::fs::read_to_string(p).map_err(|e| ProfilerError::Config {
                    message: format!("cannot read taxonomy file {}: {}", p.display(), e),
                })?;
                tracing::info!("Loading taxonomy phrase sets from {}", p.display());
                Self::from_toml_str(&content)
            }
        }
    }

    /// Apply overrides from TOML text. An override must keep exactly the
    /// built-in category names of the taxonomy it replaces.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: TaxonomyFile = toml::from_str(content)?;
        let mut store = Self::builtin()?;
        if let Some(categories) = file.risk {
            store.risk = replace_phrases(&store.risk, categories)?;
        }
        if let Some(categories) = file.bias {
            store.bias = replace_phrases(&store.bias, categories)?;
        }
        Ok(store)
    }

    pub fn get(&self, id: TaxonomyId) -> &Taxonomy {
        match id {
            TaxonomyId::Risk => &self.risk,
            TaxonomyId::Bias => &self.bias,
        }
    }

    /// Both taxonomies in fixed order: risk, then bias
    pub fn all(&self) -> [&Taxonomy; 2] {
        [&self.risk, &self.bias]
    }

    pub fn exemplar_count(&self) -> usize {
        self.risk.exemplar_count() + self.bias.exemplar_count()
    }
}

fn replace_phrases(current: &Taxonomy, categories: Vec<Category>) -> Result<Taxonomy> {
    let expected: HashSet<&str> = current.category_names().collect();
    let given: HashSet<&str> = categories.iter().map(|c| c.name.as_str()).collect();
    if expected != given || categories.len() != expected.len() {
        let mut names: Vec<&str> = expected.into_iter().collect();
        names.sort_unstable();
        return Err(ProfilerError::Taxonomy {
            message: format!(
                "override for taxonomy '{}' must declare exactly: {}",
                current.id(),
                names.join(", ")
            ),
        });
    }
    Taxonomy::new(current.id(), categories)
}

fn to_categories(table: &[(&str, &[&str])]) -> Vec<Category> {
    table
        .iter()
        .map(|(name, phrases)| Category::new(*name, phrases))
        .collect()
}

const RISK_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Conservative",
        &[
            "low risk",
            "safe",
            "stable",
            "capital preservation",
            "predictable returns",
            "guaranteed returns",
            "minimize losses",
            "secure investment",
            "steady growth",
            "fixed income",
            "bonds",
            "long-term stability",
            "principal protection",
            "low volatility",
            "risk-averse",
            "safety first",
            "preserve wealth",
            "risk minimization",
            "preservation of capital",
            "income stability",
            "low-risk assets",
            "familiar investments",
            "local investments",
            "community bank",
            "tried and true",
            "what I know",
            "avoiding the unknown",
            "invest in what I know",
            "avoid new things",
            "stick to what works",
            "careful growth",
            "protect my savings",
            "slow and steady wins",
            "predictable income",
        ],
    ),
    (
        "Moderate",
        &[
            "balanced risk",
            "diversified",
            "moderate growth",
            "acceptable risk",
            "growth with stability",
            "medium volatility",
            "not too risky, not too safe",
            "risk-balanced portfolio",
            "moderate volatility",
            "equity and fixed income mix",
            "steady growth potential",
            "long-term growth with some risk",
            "diversified investments",
            "sustainable returns",
            "moderate capital appreciation",
            "some risk",
            "mix of investments",
            "reasonable returns",
            "managed risk",
            "strategic investing",
        ],
    ),
    (
        "Aggressive",
        &[
            "high risk",
            "high return potential",
            "market speculation",
            "capital appreciation",
            "bold investments",
            "growth at all costs",
            "short-term gains",
            "risk-taker",
            "highly volatile",
            "speculative",
            "big bets",
            "fast-growing sectors",
            "leveraged investing",
            "chasing high returns",
            "exponential growth",
            "maximize profit",
            "venture investments",
            "high-growth potential",
            "venture capital opportunities",
            "innovative investments",
            "dynamic growth",
        ],
    ),
];

const BIAS_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Loss Aversion",
        &[
            "fear of loss",
            "avoid losses",
            "hesitate to sell",
            "hold losing investments",
            "pain of losing money",
            "underperforming assets",
            "protecting principal",
            "cutting losses is hard",
            "minimize downside",
            "losses hurt more than gains",
            "risk avoidance",
            "prefer stability",
            "selling at a loss is difficult",
        ],
    ),
    (
        "Overconfidence Bias",
        &[
            "beat the market",
            "trust my instincts",
            "rarely wrong",
            "confident predictions",
            "superior judgment",
            "my strategy always works",
            "believe in my expertise",
            "highly skilled investor",
            "better than average",
            "rarely consult others",
            "strong market knowledge",
            "trust my analysis",
            "not worried about risk",
            "self-assured decisions",
            "high conviction trades",
        ],
    ),
    (
        "Status Quo Bias",
        &[
            "stick to familiar",
            "avoid change",
            "same asset classes",
            "resist adjustments",
            "prefer past strategies",
            "safe over change",
            "loyal to my portfolio",
            "fear of switching",
            "no need to adjust",
            "prefer familiarity",
            "unchanged strategy",
            "comfortable with routine",
            "don’t fix what isn’t broken",
        ],
    ),
    (
        "Regret Aversion",
        &[
            "fear of regret",
            "hesitate on opportunities",
            "avoid bold decisions",
            "worry about mistakes",
            "play it safe",
            "miss out due to fear",
            "second-guessing",
            "safer options",
            "scared to take a chance",
            "afraid of making the wrong choice",
            "prefer low risk",
            "what if I’m wrong?",
            "overthink investment choices",
        ],
    ),
    (
        "Affinity Bias",
        &[
            "invest in familiar brands",
            "trust industries I know",
            "invest in products I use",
            "align with values",
            "emotional connection",
            "personal loyalty",
            "ignore red flags",
            "feel good about investment",
            "trust based on recognition",
            "support companies I like",
            "buy stocks from favorite brands",
            "invest in what I love",
            "brand loyalty",
            "comfort in familiarity",
            "familarity",
            "people I know",
            "local ties",
            "companies I understand",
            "investments that reflect my values",
            "local",
            "support local business",
            "investment in my neighbourhood",
        ],
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_taxonomies_have_expected_categories() {
        let store = TaxonomyStore::builtin().unwrap();
        let risk: Vec<&str> = store.get(TaxonomyId::Risk).category_names().collect();
        assert_eq!(risk, vec!["Conservative", "Moderate", "Aggressive"]);
        let bias: Vec<&str> = store.get(TaxonomyId::Bias).category_names().collect();
        assert_eq!(
            bias,
            vec![
                "Loss Aversion",
                "Overconfidence Bias",
                "Status Quo Bias",
                "Regret Aversion",
                "Affinity Bias"
            ]
        );
    }

    #[test]
    fn every_category_has_an_exemplar() {
        let store = TaxonomyStore::builtin().unwrap();
        for taxonomy in store.all() {
            for category in taxonomy.categories() {
                assert!(
                    !category.exemplars.is_empty(),
                    "{} has no exemplars",
                    category.name
                );
            }
        }
    }

    #[test]
    fn rejects_empty_category() {
        let err = Taxonomy::new(
            TaxonomyId::Risk,
            vec![Category::new("A", &["low risk"]), Category::new("B", &[])],
        )
        .unwrap_err();
        assert!(matches!(err, ProfilerError::Taxonomy { .. }));
    }

    #[test]
    fn rejects_duplicate_category() {
        let err = Taxonomy::new(
            TaxonomyId::Bias,
            vec![
                Category::new("A", &["low risk"]),
                Category::new("A", &["high risk"]),
            ],
        )
        .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn rejects_blank_exemplar() {
        let err = Taxonomy::new(TaxonomyId::Risk, vec![Category::new("A", &["  "])]).unwrap_err();
        assert!(err.to_string().contains("blank exemplar"));
    }

    #[test]
    fn exemplars_iterate_in_declared_order() {
        let t = Taxonomy::new(
            TaxonomyId::Risk,
            vec![
                Category::new("A", &["low risk", "safe"]),
                Category::new("B", &["high risk"]),
            ],
        )
        .unwrap();
        let pairs: Vec<(&str, &str)> = t.exemplars().collect();
        assert_eq!(
            pairs,
            vec![("A", "low risk"), ("A", "safe"), ("B", "high risk")]
        );
        assert_eq!(t.exemplar_count(), 3);
    }

    #[test]
    fn override_replaces_phrases() {
        let toml = r#"
            [[risk]]
            name = "Conservative"
            exemplars = ["keep it safe"]

            [[risk]]
            name = "Moderate"
            exemplars = ["a bit of both"]

            [[risk]]
            name = "Aggressive"
            exemplars = ["all in"]
        "#;
        let store = TaxonomyStore::from_toml_str(toml).unwrap();
        let risk = store.get(TaxonomyId::Risk);
        assert_eq!(risk.exemplar_count(), 3);
        assert!(risk.contains("Moderate"));
        // bias untouched
        assert!(store.get(TaxonomyId::Bias).exemplar_count() > 50);
    }

    #[test]
    fn override_must_keep_category_names() {
        let toml = r#"
            [[risk]]
            name = "Cautious"
            exemplars = ["keep it safe"]
        "#;
        let err = TaxonomyStore::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, ProfilerError::Taxonomy { .. }));
    }

    #[test]
    fn taxonomy_id_parses() {
        assert_eq!("Risk".parse::<TaxonomyId>().unwrap(), TaxonomyId::Risk);
        assert!("mood".parse::<TaxonomyId>().is_err());
    }
}
