//! HTML rendering with Handlebars. Templates are compiled into the binary.

use handlebars::{Handlebars, RenderError, TemplateError};
use serde::Serialize;
use shared::dto::{ComparisonResult, DEFAULT_ANALYZER, DEFAULT_NGRAM_RANGE};

use crate::forms::Submission;
use crate::session::SessionPreview;

const LAYOUT_HEAD: &str = include_str!("../templates/layout_head.hbs");
const LAYOUT_FOOT: &str = include_str!("../templates/layout_foot.hbs");
const FORM: &str = include_str!("../templates/form.hbs");
const RESULT: &str = include_str!("../templates/result.hbs");

pub const MISSING_TEXT_ALERT: &str = "Preencha os dois campos de texto antes de comparar.";
pub const BACKEND_ERROR_ALERT: &str =
    "Não foi possível analisar os textos. Verifique o backend e tente novamente.";

pub const UPLOAD_TOO_LARGE_ALERT: &str = "O arquivo enviado excede o tamanho máximo permitido.";
pub const INVALID_FORM_ALERT: &str = "Não foi possível ler o formulário enviado. Tente novamente.";
pub const UPLOAD_FAILED_ALERT: &str = "Não foi possível processar o arquivo enviado. Tente novamente.";

const KNOWN_ANALYZERS: &[(&str, &str)] = &[("word", "Palavras"), ("char", "Caracteres")];

pub struct Views {
    hb: Handlebars<'static>,
}

impl Views {
    pub fn new() -> Result<Self, TemplateError> {
        let mut hb = Handlebars::new();
        hb.set_strict_mode(false);
        hb.register_partial("layout_head", LAYOUT_HEAD)?;
        hb.register_partial("layout_foot", LAYOUT_FOOT)?;
        hb.register_template_string("form", FORM)?;
        hb.register_template_string("result", RESULT)?;
        Ok(Self { hb })
    }

    pub fn form(&self, view: &FormView) -> Result<String, RenderError> {
        self.hb.render("form", view)
    }

    pub fn result(&self, view: &ResultView<'_>) -> Result<String, RenderError> {
        self.hb.render("result", view)
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct AnalyzerOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

#[derive(Debug, Serialize)]
pub struct FormView {
    pub text_a: String,
    pub text_b: String,
    pub analyzer: String,
    pub analyzers: Vec<AnalyzerOption>,
    pub ngram_min: i64,
    pub ngram_max: i64,
    pub alert: Option<String>,
}

impl FormView {
    fn build(text_a: String, text_b: String, analyzer: String, range: (i64, i64)) -> Self {
        let mut analyzers: Vec<AnalyzerOption> = KNOWN_ANALYZERS
            .iter()
            .map(|(value, label)| AnalyzerOption {
                value: value.to_string(),
                label: label.to_string(),
                selected: *value == analyzer,
            })
            .collect();
        if !analyzers.iter().any(|o| o.selected) {
            analyzers.push(AnalyzerOption {
                value: analyzer.clone(),
                label: analyzer.clone(),
                selected: true,
            });
        }
        Self {
            text_a,
            text_b,
            analyzer,
            analyzers,
            ngram_min: range.0,
            ngram_max: range.1,
            alert: None,
        }
    }

    pub fn defaults() -> Self {
        Self::build(
            String::new(),
            String::new(),
            DEFAULT_ANALYZER.to_string(),
            DEFAULT_NGRAM_RANGE,
        )
    }

    /// Form state restored from the previous comparison. File-sourced sides
    /// stay empty.
    pub fn from_session(preview: Option<&SessionPreview>) -> Self {
        let Some(p) = preview else {
            return Self::defaults();
        };
        let text = |t: &str, from_file: bool| if from_file { String::new() } else { t.to_string() };
        Self::build(
            text(&p.text_a, p.a_from_file),
            text(&p.text_b, p.b_from_file),
            p.analyzer
                .clone()
                .unwrap_or_else(|| DEFAULT_ANALYZER.to_string()),
            p.ngram_range.unwrap_or(DEFAULT_NGRAM_RANGE),
        )
    }

    /// Echo a rejected submission back into the form. Text extracted from
    /// uploads is not echoed.
    pub fn from_submission(sub: &Submission) -> Self {
        let text = |t: &str, from_file: bool| if from_file { String::new() } else { t.to_string() };
        Self::build(
            text(&sub.text_a, sub.a_from_file),
            text(&sub.text_b, sub.b_from_file),
            sub.analyzer.clone(),
            sub.ngram_range,
        )
    }

    pub fn with_alert(mut self, alert: &str) -> Self {
        self.alert = Some(alert.to_string());
        self
    }
}

#[derive(Debug, Serialize)]
pub struct ResultView<'a> {
    #[serde(flatten)]
    pub result: &'a ComparisonResult,
    pub similarity_percent: String,
    pub ngram_label: Option<String>,
}

impl<'a> ResultView<'a> {
    pub fn new(result: &'a ComparisonResult) -> Self {
        Self {
            result,
            similarity_percent: format!("{:.2}%", result.similarity * 100.0),
            ngram_label: result.ngram_range.map(|(lo, hi)| format!("{lo}–{hi}")),
        }
    }
}
