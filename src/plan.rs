use crate::error::ConfigError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use url::form_urlencoded;

/// Matches a `{...}` placeholder in a search template.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}]*)\}").expect("placeholder pattern is valid"));

/// A configured shopping site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    /// Display name of the site
    pub site_name: String,

    /// Scheme and host, e.g. `https://shop.example`
    #[serde(rename = "siteHostName")]
    pub host_name: String,

    /// Path template with a single `{0}` placeholder for the search phrase
    #[serde(alias = "searchURITemplate")]
    pub search_uri_template: String,
}

impl Site {
    pub fn new(site_name: &str, host_name: &str, search_uri_template: &str) -> Self {
        Self {
            site_name: site_name.to_string(),
            host_name: host_name.to_string(),
            search_uri_template: search_uri_template.to_string(),
        }
    }
}

/// A validated search template, split around its placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTemplate {
    prefix: String,
    suffix: String,
}

impl SearchTemplate {
    /// Validates a template. It must contain exactly one `{0}` and no stray braces.
    pub fn parse(site_name: &str, template: &str) -> Result<Self, ConfigError> {
        let remainder = PLACEHOLDER.replace_all(template, "");
        if remainder.contains('{') || remainder.contains('}') {
            return Err(ConfigError::UnbalancedBrace {
                site: site_name.to_string(),
            });
        }

        let placeholders: Vec<_> = PLACEHOLDER.captures_iter(template).collect();
        let placeholder = match placeholders.as_slice() {
            [] => {
                return Err(ConfigError::MissingPlaceholder {
                    site: site_name.to_string(),
                });
            }
            [only] => only,
            many => {
                return Err(ConfigError::MultiplePlaceholders {
                    site: site_name.to_string(),
                    count: many.len(),
                });
            }
        };

        if placeholder[1].trim() != "0" {
            return Err(ConfigError::UnsupportedPlaceholder {
                site: site_name.to_string(),
                placeholder: placeholder[0].to_string(),
            });
        }

        let whole = placeholder.get(0).map(|m| m.range()).unwrap_or(0..0);
        Ok(Self {
            prefix: template[..whole.start].to_string(),
            suffix: template[whole.end..].to_string(),
        })
    }

    /// Substitutes the form-encoded phrase (space becomes `+`)
    pub fn render(&self, phrase: &str) -> String {
        let encoded: String = form_urlencoded::byte_serialize(phrase.as_bytes()).collect();
        format!("{}{}{}", self.prefix, encoded, self.suffix)
    }
}

/// One (site, search phrase) unit of work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPlanItem {
    pub site_name: String,
    pub host_name: String,
    pub search_phrase: String,
    pub search_path: String,
    #[serde(rename = "fullURL")]
    pub full_url: String,
}

/// A (site, search phrase) pair whose site template was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedItem {
    pub search_phrase: String,
    pub error: ConfigError,
}

/// One slot of the plan: a runnable item or the reason it cannot run
pub type PlanEntry = Result<SearchPlanItem, RejectedItem>;

/// Builds the sites x phrases cross product, sites in the outer loop.
///
/// A site with a malformed template yields one `RejectedItem` per phrase, so
/// every pair keeps its slot in the plan.
pub fn build_plan(sites: &[Site], phrases: &[String]) -> Vec<PlanEntry> {
    let mut plan = Vec::with_capacity(sites.len() * phrases.len());

    for site in sites {
        let template = SearchTemplate::parse(&site.site_name, &site.search_uri_template);
        if let Err(e) = &template {
            ::log::error!("Rejecting site {}: {}", site.site_name, e);
        }

        for phrase in phrases {
            let entry = match &template {
                Ok(template) => {
                    let search_path = template.render(phrase);
                    Ok(SearchPlanItem {
                        site_name: site.site_name.clone(),
                        host_name: site.host_name.clone(),
                        search_phrase: phrase.clone(),
                        full_url: format!("{}{}", site.host_name, search_path),
                        search_path,
                    })
                }
                Err(e) => Err(RejectedItem {
                    search_phrase: phrase.clone(),
                    error: e.clone(),
                }),
            };
            plan.push(entry);
        }
    }

    ::log::debug!(
        "Built search plan of {} items ({} sites, {} phrases)",
        plan.len(),
        sites.len(),
        phrases.len()
    );
    plan
}
