//! Point-to-polygon correspondences and their textual rendering.

use serde::{Deserialize, Serialize};

/// Outcome of matching a single point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Correspondence {
    /// 0-based ID of the first polygon found to contain the point
    Polygon(usize),
    Unmatched,
}

impl Correspondence {
    pub fn polygon_id(&self) -> Option<usize> {
        match self {
            Correspondence::Polygon(id) => Some(*id),
            Correspondence::Unmatched => None,
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, Correspondence::Polygon(_))
    }
}

/// Placeholder values used when rendering correspondences as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentinels {
    /// Written for unmatched points when no label lookup is used
    pub unmatched: String,
    /// Written when a label lookup misses, including for unmatched points
    pub empty: String,
}

impl Default for Sentinels {
    fn default() -> Self {
        Self {
            unmatched: "out".to_string(),
            empty: "empty".to_string(),
        }
    }
}

/// Secondary ID lookup: polygon ID `i` maps to `labels[i]`.
#[derive(Debug, Clone)]
pub struct LabelLookup {
    labels: Vec<String>,
}

impl LabelLookup {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label for a correspondence. Misses fall back to `empty`, never an error.
    pub fn label<'a>(&'a self, correspondence: Correspondence, empty: &'a str) -> &'a str {
        correspondence
            .polygon_id()
            .and_then(|id| self.labels.get(id))
            .map(String::as_str)
            .unwrap_or(empty)
    }
}

/// Render correspondences as text, optionally through a label lookup.
pub fn render(
    correspondences: &[Correspondence],
    labels: Option<&LabelLookup>,
    sentinels: &Sentinels,
) -> Vec<String> {
    correspondences
        .iter()
        .map(|c| match (labels, c) {
            (Some(lookup), _) => lookup.label(*c, &sentinels.empty).to_string(),
            (None, Correspondence::Polygon(id)) => id.to_string(),
            (None, Correspondence::Unmatched) => sentinels.unmatched.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_without_labels() {
        let out = render(
            &[Correspondence::Polygon(2), Correspondence::Unmatched],
            None,
            &Sentinels::default(),
        );
        assert_eq!(out, vec!["2", "out"]);
    }

    #[test]
    fn test_label_miss_uses_empty() {
        let lookup = LabelLookup::new(vec!["north".to_string(), "south".to_string()]);
        let sentinels = Sentinels {
            unmatched: "out".to_string(),
            empty: "n/a".to_string(),
        };
        let out = render(
            &[
                Correspondence::Polygon(1),
                Correspondence::Polygon(5),
                Correspondence::Unmatched,
            ],
            Some(&lookup),
            &sentinels,
        );
        assert_eq!(out, vec!["south", "n/a", "n/a"]);
    }
}
