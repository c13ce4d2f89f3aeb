//! Harvested data model
//!
//! A [`Link`] is what the listing stage discovers; a [`Record`] is what the
//! extraction stage produces for one detail page. Every attribute of a record is
//! optional: an absent source value leaves it at its zero value.

use serde::{Deserialize, Serialize};

/// A detail page discovered on a listing page
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    /// Display name from the listing table
    pub name: String,

    /// Absolute URL of the detail page; empty when the row had no anchor
    #[serde(rename = "link")]
    pub url: String,
}

impl Link {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// One entry of the molecular weight field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MolWeight {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(rename = "weight")]
    pub value: f64,

    #[serde(rename = "units")]
    pub unit: String,
}

/// One row of the mechanism-of-action table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoaRow {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub action: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub organism: String,

    /// Cells beyond the third column
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unknown: Vec<String>,
}

/// InChI identifier with its hashed key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InchiPair {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hash: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
}

impl InchiPair {
    pub fn is_empty(&self) -> bool {
        self.hash.is_empty() && self.id.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        !self.hash.is_empty() && !self.id.is_empty()
    }
}

/// A pairwise interaction with another drug
///
/// Serialized as the triple `[other_id, other_name, description]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String, String)", into = "(String, String, String)")]
pub struct Interaction {
    pub other_id: String,
    pub other_name: String,
    pub description: String,
}

impl From<(String, String, String)> for Interaction {
    fn from((other_id, other_name, description): (String, String, String)) -> Self {
        Self {
            other_id,
            other_name,
            description,
        }
    }
}

impl From<Interaction> for (String, String, String) {
    fn from(value: Interaction) -> Self {
        (value.other_id, value.other_name, value.description)
    }
}

/// A harvested drug record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Record {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub smiles: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub molecule: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cas: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub iupac_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub background: String,
    #[serde(skip_serializing_if = "InchiPair::is_empty")]
    pub inchi: InchiPair,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub weight: Vec<MolWeight>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub formula: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub link: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub synonyms: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub indication: String,
    pub is_stub: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pharmacodynamics: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub moa: Vec<MoaRow>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub adverse_effects: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub drug_interactions: Vec<Interaction>,
    /// Row count the interactions endpoint reported
    #[serde(skip_serializing_if = "is_zero")]
    pub interactions_total: u64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub half_life: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub route_of_elimination: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub toxicity: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub clearance: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub absorption: String,
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

/// How one attribute of a record looks to the statistics stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldProfile {
    pub name: &'static str,
    pub is_set: bool,
    /// Text length, for scalar attributes only
    pub text_len: Option<usize>,
}

impl FieldProfile {
    fn scalar(name: &'static str, value: &str) -> Self {
        Self {
            name,
            is_set: !value.is_empty(),
            text_len: Some(value.chars().count()),
        }
    }

    fn composite(name: &'static str, is_set: bool) -> Self {
        Self {
            name,
            is_set,
            text_len: None,
        }
    }
}

impl Record {
    /// Scalar attributes in declaration order
    pub fn scalars(&self) -> [(&'static str, &str); 19] {
        [
            ("smiles", self.smiles.as_str()),
            ("id", self.id.as_str()),
            ("molecule", self.molecule.as_str()),
            ("cas", self.cas.as_str()),
            ("iupac_name", self.iupac_name.as_str()),
            ("background", self.background.as_str()),
            ("summary", self.summary.as_str()),
            ("formula", self.formula.as_str()),
            ("description", self.description.as_str()),
            ("link", self.link.as_str()),
            ("type", self.kind.as_str()),
            ("indication", self.indication.as_str()),
            ("pharmacodynamics", self.pharmacodynamics.as_str()),
            ("adverse_effects", self.adverse_effects.as_str()),
            ("half_life", self.half_life.as_str()),
            ("route_of_elimination", self.route_of_elimination.as_str()),
            ("toxicity", self.toxicity.as_str()),
            ("clearance", self.clearance.as_str()),
            ("absorption", self.absorption.as_str()),
        ]
    }

    /// Every profiled attribute, scalar and composite
    pub fn profile(&self) -> Vec<FieldProfile> {
        let mut fields: Vec<FieldProfile> = self
            .scalars()
            .into_iter()
            .map(|(name, value)| FieldProfile::scalar(name, value))
            .collect();

        fields.extend([
            FieldProfile::composite("inchi", !self.inchi.is_empty()),
            FieldProfile::composite("weight", !self.weight.is_empty()),
            FieldProfile::composite("categories", !self.categories.is_empty()),
            FieldProfile::composite("groups", !self.groups.is_empty()),
            FieldProfile::composite("synonyms", !self.synonyms.is_empty()),
            FieldProfile::composite("moa", !self.moa.is_empty()),
            FieldProfile::composite("drug_interactions", !self.drug_interactions.is_empty()),
        ]);

        fields
    }

    /// Number of attributes that carry a value
    pub fn set_attribute_count(&self) -> usize {
        self.profile().iter().filter(|field| field.is_set).count()
    }
}
