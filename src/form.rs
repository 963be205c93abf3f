//! Form parsing and submission
//!
//! CAPTCHA gates on mirror sites are plain HTML forms: an image, a text input
//! for the answer and a handful of hidden fields. Submission copies every
//! declared field as-is and overrides only the answer field.

use std::collections::HashMap;

use scraper::{ElementRef, Html, Selector};

use crate::error::{Result, ScoutError};

/// A parsed HTML form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    /// Form action URL (may be relative or empty)
    pub action: String,
    /// HTTP method, upper-cased
    pub method: String,
    /// Every named field with its default value
    pub fields: HashMap<String, String>,
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|_| ScoutError::selector(css))
}

impl Form {
    /// Parse all forms from a parsed document
    pub fn parse_all(document: &Html) -> Result<Vec<Self>> {
        let form_selector = selector("form")?;
        let mut forms = Vec::new();
        for form_elem in document.select(&form_selector) {
            forms.push(Self::from_element(form_elem)?);
        }
        Ok(forms)
    }

    /// First form in document order, if any
    pub fn first(document: &Html) -> Result<Option<Self>> {
        let form_selector = selector("form")?;
        document
            .select(&form_selector)
            .next()
            .map(Self::from_element)
            .transpose()
    }

    fn from_element(form_elem: ElementRef<'_>) -> Result<Self> {
        let input_selector = selector("input")?;
        let select_selector = selector("select")?;
        let option_selector = selector("option")?;
        let textarea_selector = selector("textarea")?;

        let action = form_elem.value().attr("action").unwrap_or("").to_string();
        let method = form_elem
            .value()
            .attr("method")
            .unwrap_or("get")
            .to_uppercase();

        let mut fields = HashMap::new();

        for input in form_elem.select(&input_selector) {
            let name = input.value().attr("name").unwrap_or("");
            if !name.is_empty() {
                let value = input.value().attr("value").unwrap_or("");
                fields.insert(name.to_string(), value.to_string());
            }
        }

        // Selected option, else the first one
        for select in form_elem.select(&select_selector) {
            let name = select.value().attr("name").unwrap_or("");
            if name.is_empty() {
                continue;
            }
            let options: Vec<_> = select.select(&option_selector).collect();
            let chosen = options
                .iter()
                .find(|o| o.value().attr("selected").is_some())
                .or_else(|| options.first());
            let value = chosen
                .and_then(|o| o.value().attr("value"))
                .unwrap_or("");
            fields.insert(name.to_string(), value.to_string());
        }

        for textarea in form_elem.select(&textarea_selector) {
            let name = textarea.value().attr("name").unwrap_or("");
            if !name.is_empty() {
                fields.insert(name.to_string(), textarea.text().collect::<String>());
            }
        }

        Ok(Form {
            action,
            method,
            fields,
        })
    }

    /// Override (or add) a single field
    #[must_use]
    pub fn with_field(mut self, name: &str, value: &str) -> Self {
        self.fields.insert(name.to_string(), value.to_string());
        self
    }

    /// Resolve action URL against the page URL. An empty action targets the page itself.
    pub fn resolve_action(&self, page_url: &str) -> Result<String> {
        if self.action.trim().is_empty() {
            return Ok(page_url.to_string());
        }

        let base = url::Url::parse(page_url)?;
        Ok(base.join(self.action.trim())?.to_string())
    }

    /// Fields as submission pairs, sorted by name for stable requests
    pub fn into_pairs(self) -> Vec<(String, String)> {
        let mut pairs: Vec<_> = self.fields.into_iter().collect();
        pairs.sort();
        pairs
    }
}
