//! CAPTCHA challenge detection, solving and submission.
//!
//! A challenge only exists between detection on a search page and the form
//! POST that answers it. Solving is best-effort: an [`CaptchaOutcome::Unsolved`]
//! result sends the adapter on with the page it already has.

pub mod ocr;

use std::collections::HashMap;

use async_trait::async_trait;
use scraper::Html;

use crate::error::Result;
use crate::form::Form;
use crate::site::{absolute_link, selector, Page};

pub use ocr::{binarize, OcrSolver};

/// Result of one solve attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptchaOutcome {
    Solved(String),
    Unsolved,
}

impl CaptchaOutcome {
    /// `Solved` for non-blank text, `Unsolved` otherwise.
    pub fn from_text(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            CaptchaOutcome::Unsolved
        } else {
            CaptchaOutcome::Solved(text.to_string())
        }
    }
}

/// Turns a challenge image into a text guess.
///
/// Never fails: every error is an [`CaptchaOutcome::Unsolved`]. No retries and
/// no confidence cutoff; a misread is returned as-is.
#[async_trait]
pub trait CaptchaSolver: Send + Sync {
    async fn solve(&self, image_url: &str) -> CaptchaOutcome;
}

/// A CAPTCHA gate found on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptchaChallenge {
    pub image_url: String,
    pub form_action: String,
    /// Declared fields and their default values
    pub form_fields: HashMap<String, String>,
}

impl CaptchaChallenge {
    /// Look for a challenge on `page`.
    ///
    /// `marker` selects the challenge image. A marker without a form to
    /// submit is not a challenge the adapter can answer, so it yields `None`.
    pub fn detect(page: &Page, marker: &str) -> Result<Option<Self>> {
        let document = Html::parse_document(&page.html);
        let marker_selector = selector(marker)?;

        let Some(image_src) = document
            .select(&marker_selector)
            .next()
            .and_then(|img| img.value().attr("src"))
            .and_then(|src| absolute_link(&page.url, src))
        else {
            return Ok(None);
        };

        let Some(form) = Form::first(&document)? else {
            tracing::debug!(image = %image_src, "Captcha image without a form");
            return Ok(None);
        };

        Ok(Some(Self {
            image_url: image_src,
            form_action: form.resolve_action(&page.url)?,
            form_fields: form.fields,
        }))
    }

    /// Submission pairs: every declared field verbatim, `answer_field` set to `answer`.
    pub fn submission(&self, answer_field: &str, answer: &str) -> Vec<(String, String)> {
        Form {
            action: self.form_action.clone(),
            method: "POST".to_string(),
            fields: self.form_fields.clone(),
        }
        .with_field(answer_field, answer)
        .into_pairs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(html: &str) -> Page {
        Page {
            url: "https://site.test/film/?s=matrix".into(),
            html: html.into(),
        }
    }

    #[test]
    fn outcome_from_text() {
        assert_eq!(CaptchaOutcome::from_text("  aB3d \n"), CaptchaOutcome::Solved("aB3d".into()));
        assert_eq!(CaptchaOutcome::from_text(" \n"), CaptchaOutcome::Unsolved);
    }

    #[test]
    fn detect_challenge() {
        let html = r#"
            <img src="/captcha/image.php?r=1">
            <form method="post"><input type="hidden" name="k" value="v"><input name="captcha"></form>
        "#;
        let challenge = CaptchaChallenge::detect(&page(html), r#"img[src*="captcha"]"#)
            .unwrap()
            .unwrap();

        assert_eq!(challenge.image_url, "https://site.test/captcha/image.php?r=1");
        assert_eq!(challenge.form_action, "https://site.test/film/?s=matrix");
        assert_eq!(challenge.form_fields.len(), 2);
    }

    #[test]
    fn no_marker_no_challenge() {
        let html = r#"<img src="/logo.png"><form><input name="s"></form>"#;
        assert_eq!(
            CaptchaChallenge::detect(&page(html), r#"img[src*="captcha"]"#).unwrap(),
            None
        );
    }

    #[test]
    fn marker_without_form_is_ignored() {
        let html = r#"<img src="https://cdn.test/captcha.png">"#;
        assert_eq!(
            CaptchaChallenge::detect(&page(html), r#"img[src*="captcha"]"#).unwrap(),
            None
        );
    }

    #[test]
    fn submission_keeps_other_fields() {
        let challenge = CaptchaChallenge {
            image_url: "https://site.test/captcha.png".into(),
            form_action: "https://site.test/verify".into(),
            form_fields: HashMap::from([
                ("captcha".to_string(), String::new()),
                ("token".to_string(), "abc".to_string()),
                ("empty".to_string(), String::new()),
            ]),
        };
        let pairs = challenge.submission("captcha", "Zx9");
        assert_eq!(
            pairs,
            vec![
                ("captcha".to_string(), "Zx9".to_string()),
                ("empty".to_string(), String::new()),
                ("token".to_string(), "abc".to_string()),
            ]
        );
    }
}
