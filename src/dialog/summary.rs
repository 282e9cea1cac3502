//! Final listing summary

use super::state::{CarColor, CarType, Session, NOT_PROVIDED};
use super::Effect;
use crate::gateway::PhotoRef;

const HEADER: &str = "<b>Here's what you told me about your car:\n</b>";

/// Snapshot of a session at the moment the dialog completes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub car_type: Option<CarType>,
    pub car_color: Option<CarColor>,
    pub mileage: Option<String>,
    pub photo: Option<PhotoRef>,
}

impl Summary {
    pub fn compile(session: &Session) -> Self {
        Self {
            car_type: session.car_type,
            car_color: session.car_color,
            mileage: session.mileage.clone(),
            photo: session.photo_ref.clone(),
        }
    }

    /// The four reported fields, in display order
    pub fn fields(&self) -> [(&'static str, String); 4] {
        [
            (
                "Car Type",
                self.car_type.map_or(NOT_PROVIDED, CarType::label).to_string(),
            ),
            (
                "Color",
                self.car_color.map_or(NOT_PROVIDED, CarColor::label).to_string(),
            ),
            (
                "Mileage",
                self.mileage.clone().unwrap_or_else(|| NOT_PROVIDED.to_string()),
            ),
            ("Photo", self.photo_status().to_string()),
        ]
    }

    pub fn photo_status(&self) -> &'static str {
        if self.photo.is_some() {
            "Uploaded"
        } else {
            NOT_PROVIDED
        }
    }

    /// HTML report; user-typed values are escaped
    pub fn render(&self) -> String {
        let lines: Vec<String> = self
            .fields()
            .iter()
            .map(|(name, value)| format!("<b>{name}:</b> {}", escape_html(value)))
            .collect();
        format!("{HEADER}{}", lines.join("\n"))
    }

    /// The single send that delivers the summary: the photo with the report
    /// as its caption when one was uploaded, plain text otherwise.
    pub fn into_effect(self) -> Effect {
        let text = self.render();
        match self.photo {
            Some(photo) => Effect::SendPhoto {
                photo,
                caption: text,
            },
            None => Effect::text(text),
        }
    }
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
