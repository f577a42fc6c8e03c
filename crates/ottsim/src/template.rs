// References:
// 1. https://github.com/clitic/vsd/blob/30ca1985e4a467ea3304b11c08d3176deaafd22a/vsd/src/dash/template.rs
// 2. https://github.com/emarsden/dash-mpd-rs/blob/6ebdfb4759adbda8233b5b3520804e23ff86e7de/src/fetch.rs#L435-L466

use regex::{Regex, Replacer};
use std::{collections::HashMap, sync::LazyLock};

// From https://dashif.org/docs/DASH-IF-IOP-v4.3.pdf:
// "For the avoidance of doubt, only %0[width]d is permitted and no other identifiers. The reason
// is that such a string replacement can be easily implemented without requiring a specific library."
//
// Example template: "$RepresentationID$/$Number%06d$.m4s"
// `$$` is the escape sequence of a literal `$`.
static DASH_TEMPLATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:(RepresentationID|Number|Time|Bandwidth)(?:%0(\d+)d)?)?\$").unwrap()
});

// Example template: "QualityLevels({bitrate})/Fragments(video={start time})"
static SMOOTH_TEMPLATE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(bitrate|Bitrate|start time|start_time)\}").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateSyntax {
    /// `$Identifier$` and `$Identifier%0<width>d$`
    Dash,
    /// `{identifier}`
    Smooth,
}

/// A set of placeholder values applied to chunk url templates.
///
/// Every placeholder occurrence is replaced exactly once, in a single pass:
/// substituted values are never scanned again.
pub struct Template {
    syntax: TemplateSyntax,
    args: HashMap<&'static str, String>,
}

impl Template {
    pub const REPRESENTATION_ID: &'static str = "RepresentationID";
    pub const NUMBER: &'static str = "Number";
    pub const TIME: &'static str = "Time";
    pub const BANDWIDTH: &'static str = "Bandwidth";

    pub fn new(syntax: TemplateSyntax) -> Self {
        Self {
            syntax,
            args: HashMap::with_capacity(4),
        }
    }

    pub fn dash() -> Self {
        Self::new(TemplateSyntax::Dash)
    }

    pub fn smooth() -> Self {
        Self::new(TemplateSyntax::Smooth)
    }

    pub fn insert(&mut self, key: &'static str, value: impl ToString) {
        self.args.insert(key, value.to_string());
    }

    pub fn resolve(&self, template: &str) -> String {
        match self.syntax {
            TemplateSyntax::Dash => DASH_TEMPLATE_REGEX
                .replace_all(template, DashReplacer(&self.args))
                .into_owned(),
            TemplateSyntax::Smooth => SMOOTH_TEMPLATE_REGEX
                .replace_all(template, SmoothReplacer(&self.args))
                .into_owned(),
        }
    }
}

struct DashReplacer<'a>(&'a HashMap<&'static str, String>);

impl Replacer for DashReplacer<'_> {
    fn replace_append(&mut self, caps: &regex::Captures<'_>, dst: &mut String) {
        let Some(key) = caps.get(1) else {
            // `$$`
            dst.push('$');
            return;
        };
        let Some(value) = self.0.get(key.as_str()) else {
            dst.push_str(&caps[0]);
            return;
        };

        match caps.get(2).and_then(|m| m.as_str().parse::<usize>().ok()) {
            Some(width) => dst.push_str(&format!("{value:0>width$}")),
            None => dst.push_str(value),
        }
    }
}

struct SmoothReplacer<'a>(&'a HashMap<&'static str, String>);

impl Replacer for SmoothReplacer<'_> {
    fn replace_append(&mut self, caps: &regex::Captures<'_>, dst: &mut String) {
        let key = match &caps[1] {
            "bitrate" | "Bitrate" => Template::BANDWIDTH,
            _ => Template::TIME,
        };
        match self.0.get(key) {
            Some(value) => dst.push_str(value),
            None => dst.push_str(&caps[0]),
        }
    }
}
