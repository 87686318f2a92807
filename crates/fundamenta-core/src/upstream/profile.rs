//! Built-in upstream profiles.

use url::Url;

/// Where the credential goes on the probe request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialPlacement {
    /// Appended as a query parameter with this name
    Query(&'static str),
    /// `Authorization: Bearer <key>`
    Bearer,
}

/// Static description of a metered upstream and how to probe it cheaply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiProfile {
    pub name: &'static str,
    pub base_url: String,
    pub probe_path: &'static str,
    pub probe_query: &'static [(&'static str, &'static str)],
    pub credential: CredentialPlacement,
    pub env_var: &'static str,
}

impl ApiProfile {
    pub fn spoonacular() -> Self {
        Self {
            name: "spoonacular",
            base_url: "https://api.spoonacular.com".to_string(),
            probe_path: "/recipes/complexSearch",
            probe_query: &[("number", "1")],
            credential: CredentialPlacement::Query("apiKey"),
            env_var: "SPOONACULAR_API_KEY",
        }
    }

    pub fn usda() -> Self {
        Self {
            name: "usda",
            base_url: "https://api.nal.usda.gov".to_string(),
            probe_path: "/fdc/v1/foods/search",
            probe_query: &[("query", "apple"), ("pageSize", "1")],
            credential: CredentialPlacement::Query("api_key"),
            env_var: "USDA_API_KEY",
        }
    }

    pub fn openai() -> Self {
        Self {
            name: "openai",
            base_url: "https://api.openai.com".to_string(),
            probe_path: "/v1/models",
            probe_query: &[],
            credential: CredentialPlacement::Bearer,
            env_var: "OPENAI_API_KEY",
        }
    }

    pub fn builtin() -> Vec<Self> {
        vec![Self::spoonacular(), Self::usda(), Self::openai()]
    }

    pub fn by_name(name: &str) -> Option<Self> {
        Self::builtin().into_iter().find(|p| p.name == name)
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Probe URL, with the key attached when it travels in the query string.
    pub fn probe_url(&self, api_key: &str) -> Result<Url, url::ParseError> {
        let base = self.base_url.trim_end_matches('/');
        let mut url = Url::parse(&format!("{}{}", base, self.probe_path))?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in self.probe_query {
                pairs.append_pair(key, value);
            }
            if let CredentialPlacement::Query(param) = self.credential {
                pairs.append_pair(param, api_key);
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        Ok(url)
    }
}
