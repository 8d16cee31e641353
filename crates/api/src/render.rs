//! HTML page for the prediction form

use feature_validator::{FeatureKind, FieldError, FEATURE_SPECS};
use predictor_client::{PriceCategory, PLACEHOLDER_IMAGE};
use std::collections::HashMap;
use std::fmt::Write;

pub const PAGE_TITLE: &str = "Smartphone Price Predictor";

/// What to show under the form
#[derive(Debug, Clone)]
pub enum PageOutcome {
    /// Fresh form
    Empty,
    /// Classifier answer
    Prediction(PriceCategory),
    /// One message per failing field
    Invalid(Vec<FieldError>),
    /// Generic service failure message
    Failed(&'static str),
}

/// Escape text for HTML element and attribute content
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render the full page. `values` re-populates the inputs.
pub fn render_page(values: &HashMap<String, String>, outcome: &PageOutcome) -> String {
    let mut fields = String::new();
    for spec in FEATURE_SPECS.iter() {
        let value = values.get(spec.name).map(String::as_str).unwrap_or("");
        let step = match spec.kind {
            FeatureKind::Integer => "1",
            FeatureKind::Float => "any",
        };
        let invalid = matches!(outcome, PageOutcome::Invalid(errors) if errors.iter().any(|e| e.field() == spec.name));
        let _ = write!(
            fields,
            r#"      <label for="{name}"{class}>{label}
        <input type="number" id="{name}" name="{name}" min="{min}" max="{max}" step="{step}" value="{value}" required>
      </label>
"#,
            name = spec.name,
            class = if invalid { r#" class="invalid""# } else { "" },
            label = escape_html(spec.label),
            min = spec.min,
            max = spec.max,
            step = step,
            value = escape_html(value),
        );
    }

    let (message, image) = match outcome {
        PageOutcome::Empty => (String::new(), PLACEHOLDER_IMAGE),
        PageOutcome::Prediction(category) => (
            format!(
                r#"<p class="prediction">{}</p>"#,
                escape_html(category.description())
            ),
            category.image(),
        ),
        PageOutcome::Invalid(errors) => {
            let mut list = String::from(
                "<div class=\"errors\"><p>Input validation error:</p>\n<ul>\n",
            );
            for e in errors {
                let _ = writeln!(list, "<li>{}</li>", escape_html(&e.to_string()));
            }
            list.push_str("</ul></div>");
            (list, PLACEHOLDER_IMAGE)
        }
        PageOutcome::Failed(message) => (
            format!(r#"<p class="error">{}</p>"#, escape_html(message)),
            PLACEHOLDER_IMAGE,
        ),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{title}</title>
  <link rel="icon" href="/favicon.ico">
  <style>
    body {{ font-family: sans-serif; max-width: 960px; margin: 2rem auto; }}
    form {{ display: grid; grid-template-columns: repeat(auto-fill, minmax(200px, 1fr)); gap: 0.75rem; }}
    label {{ display: flex; flex-direction: column; font-size: 0.9rem; }}
    label.invalid {{ color: #b00020; }}
    .errors, .error {{ color: #b00020; }}
    .result img {{ max-width: 240px; }}
  </style>
</head>
<body>
  <h1>{title}</h1>
  <form method="post" action="/">
{fields}    <button type="submit">Predict</button>
  </form>
  <section class="result">
    {message}
    <img src="/static/{image}" alt="prediction">
  </section>
</body>
</html>
"#,
        title = PAGE_TITLE,
        fields = fields,
        message = message,
        image = image,
    )
}
